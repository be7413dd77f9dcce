//! Conversion of beat-indexed RR series into uniformly sampled signals.
//!
//! Spectral analysis needs samples on a regular time grid, while RR intervals arrive
//! once per heartbeat. Beat `i` starts at the sum of all previous intervals (the first
//! beat starts at 0 s) and lasts `rr[i]` milliseconds. The resampled signal has
//! `floor(duration * rate)` points at `t_k = k / rate`.
//!
//! # Example
//!
//! ```
//! use hrv_coherence::preprocessing::resample::{Resampler, ResamplingStrategy};
//!
//! // two beats of 500 ms and 1000 ms sampled at 4 Hz
//! let resampled = ResamplingStrategy::ZeroOrderHold.resample(&[500.0, 1000.0], 4.0).unwrap();
//! assert_eq!(resampled, vec![500.0, 500.0, 1000.0, 1000.0, 1000.0, 1000.0]);
//! ```

use anyhow::Result;

use crate::error::HrvError;

/// Strategy used to place RR values on a uniform time grid.
#[cfg_attr(test, mockall::automock)]
pub trait Resampler {
    /// Resamples `rr` (milliseconds, one value per beat) at `rate` Hz.
    ///
    /// # Errors
    ///
    /// Implementations return an error if `rate` is not positive or if `rr` contains
    /// non-positive or non-finite intervals.
    fn resample(&self, rr: &[f64], rate: f64) -> Result<Vec<f64>>;
}

/// Available resampling strategies for the coherence estimator.
/// User provided algorithms can be passed via the `Custom` variant.
#[derive(Default)]
pub enum ResamplingStrategy {
    /// Holds the value of the beat whose time bracket contains the sample time.
    #[default]
    ZeroOrderHold,
    /// Interpolates linearly between the values at consecutive beat onsets.
    Linear,
    /// A custom resampler, must be thread safe so estimators can run in parallel.
    Custom(Box<dyn Resampler + Sync + Send>),
}

impl Resampler for ResamplingStrategy {
    fn resample(&self, rr: &[f64], rate: f64) -> Result<Vec<f64>> {
        match self {
            ResamplingStrategy::ZeroOrderHold => ZeroOrderHold.resample(rr, rate),
            ResamplingStrategy::Linear => LinearResampler.resample(rr, rate),
            ResamplingStrategy::Custom(resampler) => resampler.resample(rr, rate),
        }
    }
}

impl std::fmt::Debug for ResamplingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResamplingStrategy::ZeroOrderHold => write!(f, "ZeroOrderHold"),
            ResamplingStrategy::Linear => write!(f, "Linear"),
            ResamplingStrategy::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// Beat onset times in seconds plus the total duration of the series.
fn beat_onsets(rr: &[f64], rate: f64) -> Result<(Vec<f64>, f64)> {
    if !(rate.is_finite() && rate > 0.0) {
        return Err(HrvError::InvalidParameter(format!(
            "resampling rate must be positive, got {rate}"
        ))
        .into());
    }
    if let Some(bad) = rr.iter().find(|&&v| !(v.is_finite() && v > 0.0)) {
        return Err(HrvError::InvalidParameter(format!(
            "RR intervals must be positive, got {bad}"
        ))
        .into());
    }
    let mut duration = 0.0;
    let onsets = rr
        .iter()
        .map(|&interval| {
            let onset = duration;
            duration += interval / 1000.0;
            onset
        })
        .collect();
    Ok((onsets, duration))
}

fn sample_count(duration: f64, rate: f64) -> usize {
    (duration * rate).floor() as usize
}

/// Zero-order hold: every sample takes the value of the most recent beat.
pub struct ZeroOrderHold;

impl Resampler for ZeroOrderHold {
    fn resample(&self, rr: &[f64], rate: f64) -> Result<Vec<f64>> {
        let (onsets, duration) = beat_onsets(rr, rate)?;
        let mut beat = 0;
        Ok((0..sample_count(duration, rate))
            .map(|k| {
                let t = k as f64 / rate;
                while beat + 1 < onsets.len() && onsets[beat + 1] <= t {
                    beat += 1;
                }
                rr[beat]
            })
            .collect())
    }
}

/// Linear interpolation between the values at consecutive beat onsets.
/// Samples after the last onset hold the last value.
pub struct LinearResampler;

impl Resampler for LinearResampler {
    fn resample(&self, rr: &[f64], rate: f64) -> Result<Vec<f64>> {
        let (onsets, duration) = beat_onsets(rr, rate)?;
        let mut beat = 0;
        Ok((0..sample_count(duration, rate))
            .map(|k| {
                let t = k as f64 / rate;
                while beat + 1 < onsets.len() && onsets[beat + 1] <= t {
                    beat += 1;
                }
                match onsets.get(beat + 1) {
                    Some(&next) => {
                        let frac = (t - onsets[beat]) / (next - onsets[beat]);
                        rr[beat] + (rr[beat + 1] - rr[beat]) * frac
                    }
                    None => rr[beat],
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_order_hold_brackets() {
        let rr = [1000.0, 500.0, 750.0];
        let resampled = ZeroOrderHold.resample(&rr, 4.0).unwrap();
        // onsets at 0.0, 1.0 and 1.5 s, duration 2.25 s -> 9 samples
        assert_eq!(
            resampled,
            vec![1000.0, 1000.0, 1000.0, 1000.0, 500.0, 500.0, 750.0, 750.0, 750.0]
        );
    }

    #[test]
    fn test_zero_order_hold_length() {
        let rr = vec![500.0; 100];
        let resampled = ZeroOrderHold.resample(&rr, 4.0).unwrap();
        // 50 s at 4 Hz
        assert_eq!(resampled.len(), 200);
        assert!(resampled.iter().all(|&v| v == 500.0));
    }

    #[test]
    fn test_linear_interpolation() {
        let rr = [1000.0, 2000.0];
        let resampled = LinearResampler.resample(&rr, 2.0).unwrap();
        // onsets at 0 and 1 s, duration 3 s
        assert_eq!(resampled, vec![1000.0, 1500.0, 2000.0, 2000.0, 2000.0, 2000.0]);
    }

    #[test]
    fn test_empty_series() {
        assert!(ZeroOrderHold.resample(&[], 4.0).unwrap().is_empty());
        assert!(LinearResampler.resample(&[], 4.0).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_rate() {
        assert!(ZeroOrderHold.resample(&[800.0], 0.0).is_err());
        assert!(ZeroOrderHold.resample(&[800.0], f64::NAN).is_err());
        assert!(LinearResampler.resample(&[800.0], -4.0).is_err());
    }

    #[test]
    fn test_invalid_interval() {
        let err = ZeroOrderHold.resample(&[800.0, -1.0], 4.0).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HrvError>(),
            Some(HrvError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_strategy_dispatch() {
        let rr = [1000.0, 2000.0];
        assert_eq!(
            ResamplingStrategy::ZeroOrderHold.resample(&rr, 2.0).unwrap(),
            ZeroOrderHold.resample(&rr, 2.0).unwrap()
        );
        assert_eq!(
            ResamplingStrategy::Linear.resample(&rr, 2.0).unwrap(),
            LinearResampler.resample(&rr, 2.0).unwrap()
        );

        let mut custom = MockResampler::new();
        custom
            .expect_resample()
            .times(1)
            .returning(|rr, _| Ok(rr.to_vec()));
        let strategy = ResamplingStrategy::Custom(Box::new(custom));
        assert_eq!(strategy.resample(&rr, 2.0).unwrap(), rr.to_vec());
    }
}
