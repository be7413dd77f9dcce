//! This module provides functions to calculate time-domain measures of heart rate variability (HRV).
//!
//! All functions take the raw RR series, run it through an [`ArtifactFilter`] and compute
//! the metric on the cleaned intervals, following the Task Force (1996) definitions:
//! - Mean RR interval and mean heart rate
//! - Standard Deviation of NN intervals (SDNN)
//! - Root Mean Square of Successive Differences (RMSSD)
//! - Percentage of successive differences above 50 ms (pNN50)
//!
//! # Example
//!
//! ```
//! use hrv_coherence::analysis::time::TimeDomainReport;
//! use hrv_coherence::preprocessing::artifacts::ArtifactFilter;
//!
//! let rr = vec![800.0; 300];
//! let report = TimeDomainReport::new(&rr, &ArtifactFilter::default());
//! assert_eq!(report.heart_rate, Some(75.0));
//! assert_eq!(report.sdnn, Some(0.0));
//! ```

use anyhow::Result;
use nalgebra::{DVector, DVectorView};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::HrvError;
use crate::preprocessing::artifacts::ArtifactFilter;

/// Minimum raw recording length for SDNN.
pub const SDNN_MIN_RECORDING: usize = 256;
/// Minimum raw and cleaned sample count for the remaining statistics.
pub const MIN_SAMPLES: usize = 10;
/// Successive difference threshold used by pNN50, in milliseconds.
pub const NN50_THRESHOLD_MS: f64 = 50.0;

fn clean(data: &[f64], filter: &ArtifactFilter) -> Result<Vec<f64>> {
    if data.is_empty() {
        return Err(HrvError::EmptyInput.into());
    }
    Ok(filter.filter(data))
}

fn require(stage: &'static str, required: usize, actual: usize) -> Result<()> {
    if actual < required {
        Err(HrvError::insufficient(stage, required, actual).into())
    } else {
        Ok(())
    }
}

fn mean_of(cleaned: &[f64]) -> Result<f64> {
    require("mean RR", 1, cleaned.len())?;
    Ok(DVectorView::from(cleaned).mean())
}

fn heart_rate_of(mean_rr: f64) -> Result<f64> {
    if mean_rr == 0.0 {
        return Err(HrvError::DegenerateInput("mean RR interval is zero".to_string()).into());
    }
    Ok(60_000.0 / mean_rr)
}

fn sdnn_of(raw_len: usize, cleaned: &[f64]) -> Result<f64> {
    require("SDNN", SDNN_MIN_RECORDING, raw_len)?;
    require("SDNN", MIN_SAMPLES, cleaned.len())?;
    let n = cleaned.len() as f64;
    // nalgebra's variance is the population variance
    let variance = DVectorView::from(cleaned).variance() * n / (n - 1.0);
    Ok(variance.sqrt())
}

fn successive_diffs(stage: &'static str, raw_len: usize, cleaned: &[f64]) -> Result<DVector<f64>> {
    require(stage, MIN_SAMPLES, raw_len)?;
    require(stage, MIN_SAMPLES, cleaned.len())?;
    let rr_points_a = DVectorView::from(&cleaned[0..cleaned.len() - 1]);
    let rr_points_b = DVectorView::from(&cleaned[1..]);
    Ok(rr_points_b - rr_points_a)
}

fn rmssd_of(raw_len: usize, cleaned: &[f64]) -> Result<f64> {
    let diffs = successive_diffs("RMSSD", raw_len, cleaned)?;
    Ok((diffs.dot(&diffs) / diffs.len() as f64).sqrt())
}

fn pnn50_of(raw_len: usize, cleaned: &[f64]) -> Result<f64> {
    let diffs = successive_diffs("pNN50", raw_len, cleaned)?;
    let nn50 = diffs.iter().filter(|d| d.abs() > NN50_THRESHOLD_MS).count();
    Ok(nn50 as f64 / diffs.len() as f64 * 100.0)
}

/// Calculates the mean of the artifact-free RR intervals in milliseconds.
///
/// # Errors
///
/// Returns [`HrvError::EmptyInput`] for an empty series and
/// [`HrvError::InsufficientSamples`] if every sample was rejected.
pub fn calc_mean_rr(data: &[f64], filter: &ArtifactFilter) -> Result<f64> {
    mean_of(&clean(data, filter)?)
}

/// Calculates the mean heart rate in BPM as `60000 / mean RR`.
///
/// # Errors
///
/// Fails like [`calc_mean_rr`], and with [`HrvError::DegenerateInput`] if the mean is zero.
pub fn calc_heart_rate(data: &[f64], filter: &ArtifactFilter) -> Result<f64> {
    heart_rate_of(calc_mean_rr(data, filter)?)
}

/// Calculates the Standard Deviation of NN intervals (SDNN).
///
/// SDNN is the sample standard deviation (N-1 normalisation) of the cleaned intervals.
/// Short recordings do not give meaningful SDNN values, so the raw series must hold at
/// least [`SDNN_MIN_RECORDING`] samples and at least [`MIN_SAMPLES`] must survive the
/// artifact filter.
///
/// # Errors
///
/// [`HrvError::EmptyInput`] or [`HrvError::InsufficientSamples`] if either gate fails.
pub fn calc_sdnn(data: &[f64], filter: &ArtifactFilter) -> Result<f64> {
    sdnn_of(data.len(), &clean(data, filter)?)
}

/// Calculates the Root Mean Square of Successive Differences (RMSSD).
///
/// RMSSD is the square root of the mean of the squared differences between adjacent
/// cleaned RR intervals. Both the raw and the cleaned series need at least
/// [`MIN_SAMPLES`] samples.
///
/// # Errors
///
/// [`HrvError::EmptyInput`] or [`HrvError::InsufficientSamples`].
pub fn calc_rmssd(data: &[f64], filter: &ArtifactFilter) -> Result<f64> {
    rmssd_of(data.len(), &clean(data, filter)?)
}

/// Calculates pNN50, the percentage of successive differences larger than 50 ms.
///
/// # Errors
///
/// [`HrvError::EmptyInput`] or [`HrvError::InsufficientSamples`], with the same gates as
/// [`calc_rmssd`].
pub fn calc_pnn50(data: &[f64], filter: &ArtifactFilter) -> Result<f64> {
    pnn50_of(data.len(), &clean(data, filter)?)
}

/// All time-domain metrics of one RR series; `None` marks a metric without enough data.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimeDomainReport {
    /// Mean RR interval (ms)
    pub mean_rr: Option<f64>,
    /// Mean heart rate (BPM)
    pub heart_rate: Option<f64>,
    /// SDNN (ms)
    pub sdnn: Option<f64>,
    /// RMSSD (ms)
    pub rmssd: Option<f64>,
    /// pNN50 (%)
    pub pnn50: Option<f64>,
}

impl TimeDomainReport {
    /// Computes every metric from a single pass of the artifact filter.
    pub fn new(data: &[f64], filter: &ArtifactFilter) -> Self {
        if data.is_empty() {
            log::debug!("time domain: empty RR series");
            return Self::default();
        }
        let cleaned = filter.filter(data);
        let mean_rr = mean_of(&cleaned).ok();
        Self {
            mean_rr,
            heart_rate: mean_rr.and_then(|mean| heart_rate_of(mean).ok()),
            sdnn: sdnn_of(data.len(), &cleaned).ok(),
            rmssd: rmssd_of(data.len(), &cleaned).ok(),
            pnn50: pnn50_of(data.len(), &cleaned).ok(),
        }
    }

    /// Whether every metric is defined.
    pub fn is_complete(&self) -> bool {
        self.mean_rr.is_some()
            && self.heart_rate.is_some()
            && self.sdnn.is_some()
            && self.rmssd.is_some()
            && self.pnn50.is_some()
    }
}
