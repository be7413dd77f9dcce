//! Frequency-domain analysis: cardiac coherence and HRV band powers.
//!
//! The cleaned RR series is resampled onto a uniform grid, the first `window_size`
//! points are mean-centred and Hann windowed, and the power spectrum of that segment is
//! integrated over frequency bands. Coherence is the share of power concentrated around
//! the resonance frequency of roughly 0.1 Hz.
//!
//! # Example
//!
//! ```
//! use hrv_coherence::analysis::frequency::{CoherenceEstimator, CoherenceLevel};
//!
//! // paced breathing at 0.1 Hz modulates the heart period
//! let mut rr = Vec::new();
//! let mut t = 0.0;
//! for _ in 0..300 {
//!     let interval = 1000.0 + 50.0 * (2.0 * std::f64::consts::PI * 0.1 * t).sin();
//!     rr.push(interval);
//!     t += interval / 1000.0;
//! }
//! let result = CoherenceEstimator::default().estimate(&rr).unwrap();
//! assert_eq!(result.level(), CoherenceLevel::VeryHigh);
//! assert!((result.peak_frequency - 0.1).abs() < 0.02);
//! ```

use std::ops::RangeInclusive;

use anyhow::Result;
use nalgebra::DVectorView;
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::HrvError;
use crate::preprocessing::artifacts::{artifact_percentage, ArtifactFilter};
use crate::preprocessing::resample::{Resampler, ResamplingStrategy};

/// Minimum raw and cleaned beat count for any spectral estimate.
pub const MIN_COHERENCE_SAMPLES: usize = 30;
/// Frequency range used as the reference total power (Hz).
pub const TOTAL_POWER_BAND: (f64, f64) = (0.003, 0.4);
/// Very low frequency band (Hz).
pub const VLF_BAND: (f64, f64) = (0.003, 0.04);
/// Low frequency band (Hz).
pub const LF_BAND: (f64, f64) = (0.04, 0.15);
/// High frequency band (Hz).
pub const HF_BAND: (f64, f64) = (0.15, 0.4);

/// Computes a one-sided power spectrum of an already windowed signal.
#[cfg_attr(test, mockall::automock)]
pub trait PowerSpectrum {
    /// Returns `len / 2` bins of `re^2 + im^2`.
    fn power_spectrum(&self, signal: &[f64]) -> Result<Vec<f64>>;
}

/// Power spectrum through a radix-2 FFT.
pub struct FftPowerSpectrum;

impl PowerSpectrum for FftPowerSpectrum {
    fn power_spectrum(&self, signal: &[f64]) -> Result<Vec<f64>> {
        let n = signal.len();
        if n < 2 || !n.is_power_of_two() {
            return Err(HrvError::InvalidParameter(format!(
                "FFT length must be a power of two, got {n}"
            ))
            .into());
        }
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(n);
        let mut buffer: Vec<Complex<f64>> =
            signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
        fft.process(&mut buffer);
        Ok(buffer[..n / 2].iter().map(|c| c.norm_sqr()).collect())
    }
}

/// Available spectral estimators.
/// User provided algorithms can be passed via the `Custom` variant.
#[derive(Default)]
pub enum SpectrumStrategy {
    #[default]
    Fft,
    Custom(Box<dyn PowerSpectrum + Sync + Send>),
}

impl PowerSpectrum for SpectrumStrategy {
    fn power_spectrum(&self, signal: &[f64]) -> Result<Vec<f64>> {
        match self {
            SpectrumStrategy::Fft => FftPowerSpectrum.power_spectrum(signal),
            SpectrumStrategy::Custom(spectrum) => spectrum.power_spectrum(signal),
        }
    }
}

impl std::fmt::Debug for SpectrumStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpectrumStrategy::Fft => write!(f, "Fft"),
            SpectrumStrategy::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// Symmetric Hann window, `w[i] = 0.5 * (1 - cos(2 pi i / (n - 1)))`.
pub fn hann_window(n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![1.0];
    }
    let denom = (n - 1) as f64;
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / denom).cos()))
        .collect()
}

/// Parameters of the coherence estimator.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoherenceConfig {
    /// Centre of the coherence band (Hz).
    pub center_frequency: f64,
    /// Half width of the coherence band (Hz).
    pub bandwidth: f64,
    /// Number of resampled points fed to the transform, a power of two.
    pub window_size: usize,
    /// Rate of the uniform grid the RR series is resampled to (Hz).
    pub resampling_rate: f64,
}

impl Default for CoherenceConfig {
    fn default() -> Self {
        Self {
            center_frequency: 0.1,
            bandwidth: 0.04,
            window_size: 256,
            resampling_rate: 4.0,
        }
    }
}

impl CoherenceConfig {
    /// # Errors
    ///
    /// [`HrvError::InvalidParameter`] unless the window is a power of two of at least 4
    /// and all frequencies are positive and finite.
    pub fn validate(&self) -> Result<()> {
        if self.window_size < 4 || !self.window_size.is_power_of_two() {
            return Err(HrvError::InvalidParameter(format!(
                "window_size must be a power of two >= 4, got {}",
                self.window_size
            ))
            .into());
        }
        for (name, value) in [
            ("center_frequency", self.center_frequency),
            ("bandwidth", self.bandwidth),
            ("resampling_rate", self.resampling_rate),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(
                    HrvError::InvalidParameter(format!("{name} must be positive, got {value}"))
                        .into(),
                );
            }
        }
        Ok(())
    }

    /// Width of one spectral bin (Hz).
    pub fn frequency_resolution(&self) -> f64 {
        self.resampling_rate / self.window_size as f64
    }
}

/// Display classification of a coherence ratio.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CoherenceLevel {
    /// [0, 0.3)
    Low,
    /// [0.3, 0.6)
    Medium,
    /// [0.6, 0.8)
    High,
    /// [0.8, 1.0]
    VeryHigh,
}

impl CoherenceLevel {
    pub const ALL: [CoherenceLevel; 4] = [
        CoherenceLevel::Low,
        CoherenceLevel::Medium,
        CoherenceLevel::High,
        CoherenceLevel::VeryHigh,
    ];

    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= 0.8 {
            CoherenceLevel::VeryHigh
        } else if ratio >= 0.6 {
            CoherenceLevel::High
        } else if ratio >= 0.3 {
            CoherenceLevel::Medium
        } else {
            CoherenceLevel::Low
        }
    }

    /// Position in [`CoherenceLevel::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// Outcome of one coherence estimate.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoherenceResult {
    /// Share of power in the coherence band, scaled and capped to [0, 1].
    pub coherence_ratio: f64,
    /// Frequency of the strongest bin inside the coherence band (Hz).
    pub peak_frequency: f64,
    /// Power of that bin.
    pub peak_power: f64,
    /// Power between 0.003 and 0.4 Hz.
    pub total_power: f64,
    /// 1 for artifact-free input, decreasing to 0 at 20% rejected samples.
    pub quality_score: f64,
}

impl CoherenceResult {
    pub fn level(&self) -> CoherenceLevel {
        CoherenceLevel::from_ratio(self.coherence_ratio)
    }
}

/// Classical HRV band powers taken from the coherence spectrum.
///
/// A bin belongs to a band if its centre frequency lies in `[low, high)`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandPowers {
    pub vlf: f64,
    pub lf: f64,
    pub hf: f64,
    /// Same reference power as [`CoherenceResult::total_power`].
    pub total: f64,
    /// `None` when there is no HF power.
    pub lf_hf_ratio: Option<f64>,
}

struct Spectrum {
    power: Vec<f64>,
    resolution: f64,
    artifact_percentage: f64,
}

impl Spectrum {
    /// Bins between `low` and `high` Hz, both converted by truncation.
    fn truncated_bins(&self, low: f64, high: f64) -> Option<RangeInclusive<usize>> {
        let last = self.power.len().checked_sub(1)?;
        let first = (low / self.resolution).max(0.0) as usize;
        let end = ((high / self.resolution).max(0.0) as usize).min(last);
        (first <= end).then_some(first..=end)
    }

    fn band_power(&self, bins: RangeInclusive<usize>) -> f64 {
        self.power[bins].iter().sum()
    }

    fn total_power(&self) -> Result<f64> {
        let bins = self
            .truncated_bins(TOTAL_POWER_BAND.0, TOTAL_POWER_BAND.1)
            .map(|bins| (*bins.start()).max(1)..=*bins.end())
            .filter(|bins| !bins.is_empty())
            .ok_or_else(|| {
                HrvError::DegenerateInput("total power band lies outside the spectrum".into())
            })?;
        let total = self.band_power(bins);
        if total <= 0.0 {
            log::debug!("coherence: total spectral power is zero");
            return Err(HrvError::DegenerateInput("total spectral power is zero".into()).into());
        }
        Ok(total)
    }

    fn half_open_power(&self, (low, high): (f64, f64)) -> f64 {
        self.power
            .iter()
            .enumerate()
            .filter(|(bin, _)| {
                let freq = *bin as f64 * self.resolution;
                freq >= low && freq < high
            })
            .map(|(_, power)| power)
            .sum()
    }
}

/// Estimates cardiac coherence from raw RR interval series.
///
/// The estimator is immutable and `Sync`, one instance can serve many threads.
#[derive(Debug)]
pub struct CoherenceEstimator {
    config: CoherenceConfig,
    filter: ArtifactFilter,
    resampling: ResamplingStrategy,
    spectrum: SpectrumStrategy,
}

impl Default for CoherenceEstimator {
    fn default() -> Self {
        Self {
            config: CoherenceConfig::default(),
            filter: ArtifactFilter::default(),
            resampling: ResamplingStrategy::default(),
            spectrum: SpectrumStrategy::default(),
        }
    }
}

impl CoherenceEstimator {
    /// Creates an estimator with the default artifact filter, zero-order hold
    /// resampling and an FFT spectrum.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` does not pass [`CoherenceConfig::validate`].
    pub fn new(config: CoherenceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Default::default()
        })
    }

    pub fn with_filter(mut self, filter: ArtifactFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_resampling(mut self, resampling: ResamplingStrategy) -> Self {
        self.resampling = resampling;
        self
    }

    pub fn with_spectrum(mut self, spectrum: SpectrumStrategy) -> Self {
        self.spectrum = spectrum;
        self
    }

    pub fn config(&self) -> &CoherenceConfig {
        &self.config
    }

    pub fn filter(&self) -> &ArtifactFilter {
        &self.filter
    }

    fn spectrum(&self, data: &[f64]) -> Result<Spectrum> {
        if data.is_empty() {
            return Err(HrvError::EmptyInput.into());
        }
        if data.len() < MIN_COHERENCE_SAMPLES {
            return Err(HrvError::insufficient("coherence", MIN_COHERENCE_SAMPLES, data.len()).into());
        }
        let cleaned = self.filter.filter(data);
        if cleaned.len() < MIN_COHERENCE_SAMPLES {
            return Err(
                HrvError::insufficient("coherence", MIN_COHERENCE_SAMPLES, cleaned.len()).into(),
            );
        }

        let n = self.config.window_size;
        let resampled = self
            .resampling
            .resample(&cleaned, self.config.resampling_rate)?;
        if resampled.len() < n {
            return Err(HrvError::insufficient("coherence spectrum", n, resampled.len()).into());
        }

        let segment = &resampled[..n];
        let mean = DVectorView::from(segment).mean();
        let window = hann_window(n);
        let windowed: Vec<f64> = segment
            .par_iter()
            .zip(window.par_iter())
            .map(|(&x, &w)| (x - mean) * w)
            .collect();

        let power = self.spectrum.power_spectrum(&windowed)?;
        if power.is_empty() {
            return Err(HrvError::DegenerateInput("empty power spectrum".into()).into());
        }
        log::trace!(
            "coherence: {} resampled points, {} bins at {} Hz",
            resampled.len(),
            power.len(),
            self.config.frequency_resolution()
        );
        Ok(Spectrum {
            power,
            resolution: self.config.frequency_resolution(),
            artifact_percentage: artifact_percentage(data.len(), cleaned.len()),
        })
    }

    /// Computes the coherence ratio, its spectral peak and a quality score.
    ///
    /// # Errors
    ///
    /// - [`HrvError::EmptyInput`] for an empty series.
    /// - [`HrvError::InsufficientSamples`] for fewer than 30 raw or cleaned beats, or
    ///   when the resampled series is shorter than the transform window.
    /// - [`HrvError::DegenerateInput`] when the total power is zero (a perfectly flat
    ///   series) or the coherence band lies outside the spectrum.
    pub fn estimate(&self, data: &[f64]) -> Result<CoherenceResult> {
        let spectrum = self.spectrum(data)?;
        let low = self.config.center_frequency - self.config.bandwidth;
        let high = self.config.center_frequency + self.config.bandwidth;
        let band = spectrum.truncated_bins(low, high).ok_or_else(|| {
            HrvError::DegenerateInput("coherence band lies outside the spectrum".into())
        })?;

        let (peak_bin, peak_power) = band
            .clone()
            .map(|bin| (bin, spectrum.power[bin]))
            .fold((*band.start(), f64::NEG_INFINITY), |best, candidate| {
                if candidate.1 > best.1 {
                    candidate
                } else {
                    best
                }
            });
        let coherence_power = spectrum.band_power(band);
        let total_power = spectrum.total_power()?;

        Ok(CoherenceResult {
            coherence_ratio: (coherence_power / total_power * 2.0).min(1.0),
            peak_frequency: peak_bin as f64 * spectrum.resolution,
            peak_power,
            total_power,
            quality_score: (1.0 - spectrum.artifact_percentage / 20.0).max(0.0),
        })
    }

    /// Computes VLF, LF and HF power from the same spectrum as [`Self::estimate`].
    ///
    /// # Errors
    ///
    /// Same as [`Self::estimate`].
    pub fn band_powers(&self, data: &[f64]) -> Result<BandPowers> {
        let spectrum = self.spectrum(data)?;
        let lf = spectrum.half_open_power(LF_BAND);
        let hf = spectrum.half_open_power(HF_BAND);
        Ok(BandPowers {
            vlf: spectrum.half_open_power(VLF_BAND),
            lf,
            hf,
            total: spectrum.total_power()?,
            lf_hf_ratio: (hf > 0.0).then(|| lf / hf),
        })
    }
}
