//! Artifact rejection for RR interval series.
//!
//! A sample is kept only if it maps to a plausible heart rate and does not jump
//! too far away from the last sample that was kept. Rejected samples never become
//! the reference for later comparisons, so a single spurious beat cannot drag the
//! baseline with it.
//!
//! # Example
//!
//! ```
//! use hrv_coherence::preprocessing::artifacts::{artifact_percentage, ArtifactFilter};
//!
//! let rr = [800.0, 810.0, 50.0, 805.0, 1500.0, 798.0];
//! let filter = ArtifactFilter::default();
//! let cleaned = filter.filter(&rr);
//! assert_eq!(cleaned, vec![800.0, 810.0, 805.0, 798.0]);
//! assert!((artifact_percentage(rr.len(), cleaned.len()) - 100.0 / 3.0).abs() < 1e-9);
//! ```

use anyhow::Result;
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::HrvError;

const MS_PER_MINUTE: f64 = 60_000.0;

/// Classification of a single RR sample.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ArtifactType {
    /// Plausible heartbeat
    None,
    /// Outside the interval range derived from the heart rate bounds
    OutOfRange,
    /// Relative change from the last accepted beat exceeds the allowed ratio
    AbruptChange,
}

impl ArtifactType {
    pub fn is_artifact(&self) -> bool {
        !matches!(self, ArtifactType::None)
    }
}

/// Thresholds used by [`ArtifactFilter`].
///
/// The defaults follow common cardiology QA practice: 30-220 BPM and at most 25%
/// change between consecutive accepted beats.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArtifactFilterConfig {
    /// Highest plausible heart rate in BPM, sets the shortest accepted interval.
    pub max_heart_rate: f64,
    /// Lowest plausible heart rate in BPM, sets the longest accepted interval.
    pub min_heart_rate: f64,
    /// Maximum relative change from the last accepted interval.
    pub max_change_ratio: f64,
}

impl Default for ArtifactFilterConfig {
    fn default() -> Self {
        Self {
            max_heart_rate: 220.0,
            min_heart_rate: 30.0,
            max_change_ratio: 0.25,
        }
    }
}

impl ArtifactFilterConfig {
    /// Checks that the thresholds describe a non-empty, finite acceptance region.
    ///
    /// # Errors
    ///
    /// Returns [`HrvError::InvalidParameter`] if a heart rate bound is not positive and
    /// finite, if `min_heart_rate >= max_heart_rate`, or if `max_change_ratio` is negative.
    pub fn validate(&self) -> Result<()> {
        if !(self.max_heart_rate.is_finite() && self.max_heart_rate > 0.0) {
            return Err(HrvError::InvalidParameter(format!(
                "max_heart_rate must be positive, got {}",
                self.max_heart_rate
            ))
            .into());
        }
        if !(self.min_heart_rate.is_finite() && self.min_heart_rate > 0.0) {
            return Err(HrvError::InvalidParameter(format!(
                "min_heart_rate must be positive, got {}",
                self.min_heart_rate
            ))
            .into());
        }
        if self.min_heart_rate >= self.max_heart_rate {
            return Err(HrvError::InvalidParameter(
                "min_heart_rate must be below max_heart_rate".to_string(),
            )
            .into());
        }
        if !(self.max_change_ratio >= 0.0) {
            return Err(HrvError::InvalidParameter(format!(
                "max_change_ratio must not be negative, got {}",
                self.max_change_ratio
            ))
            .into());
        }
        Ok(())
    }
}

/// Rejects RR samples that cannot be genuine heartbeats.
#[derive(Debug, Clone)]
pub struct ArtifactFilter {
    config: ArtifactFilterConfig,
    min_rr: f64,
    max_rr: f64,
}

impl Default for ArtifactFilter {
    fn default() -> Self {
        Self::from_valid(ArtifactFilterConfig::default())
    }
}

impl ArtifactFilter {
    /// Creates a filter from the given thresholds.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration does not pass [`ArtifactFilterConfig::validate`].
    pub fn new(config: ArtifactFilterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    fn from_valid(config: ArtifactFilterConfig) -> Self {
        Self {
            min_rr: MS_PER_MINUTE / config.max_heart_rate,
            max_rr: MS_PER_MINUTE / config.min_heart_rate,
            config,
        }
    }

    pub fn config(&self) -> &ArtifactFilterConfig {
        &self.config
    }

    /// Shortest accepted interval in milliseconds.
    pub fn min_rr(&self) -> f64 {
        self.min_rr
    }

    /// Longest accepted interval in milliseconds.
    pub fn max_rr(&self) -> f64 {
        self.max_rr
    }

    fn in_range(&self, rr: f64) -> bool {
        // NaN fails both comparisons
        rr >= self.min_rr && rr <= self.max_rr
    }

    /// Classifies every sample of `data`, in order.
    ///
    /// The change criterion compares against the last sample classified as
    /// [`ArtifactType::None`]; the very first accepted sample is only range checked.
    pub fn classify(&self, data: &[f64]) -> Vec<ArtifactType> {
        let mut last_kept: Option<f64> = None;
        data.iter()
            .map(|&rr| {
                if !self.in_range(rr) {
                    return ArtifactType::OutOfRange;
                }
                if let Some(reference) = last_kept {
                    if ((rr - reference) / reference).abs() > self.config.max_change_ratio {
                        return ArtifactType::AbruptChange;
                    }
                }
                last_kept = Some(rr);
                ArtifactType::None
            })
            .collect()
    }

    /// Returns a fresh sequence holding only the accepted samples, in their original order.
    ///
    /// Never fails: degenerate input simply yields an empty sequence, so callers have
    /// to check the length before using the result.
    pub fn filter(&self, data: &[f64]) -> Vec<f64> {
        let classification = self.classify(data);
        let cleaned: Vec<f64> = data
            .par_iter()
            .zip(classification.par_iter())
            .filter_map(|(&rr, class)| if class.is_artifact() { None } else { Some(rr) })
            .collect();
        if cleaned.len() != data.len() {
            log::debug!(
                "artifact filter rejected {} of {} samples",
                data.len() - cleaned.len(),
                data.len()
            );
        }
        cleaned
    }
}

/// Percentage of samples removed by the filter.
///
/// Defined as 0 for an empty original sequence.
pub fn artifact_percentage(original_len: usize, cleaned_len: usize) -> f64 {
    if original_len == 0 {
        return 0.0;
    }
    original_len.saturating_sub(cleaned_len) as f64 / original_len as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};

    use super::*;

    fn noisy_series(size: usize, seed: u64) -> Vec<f64> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        (0..size)
            .map(|_| 800.0 + rng.gen_range(-300.0..300.0))
            .collect()
    }

    #[test]
    fn test_default_bounds() {
        let filter = ArtifactFilter::default();
        assert!((filter.min_rr() - 60_000.0 / 220.0).abs() < 1e-12);
        assert!((filter.max_rr() - 2000.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_input() {
        let filter = ArtifactFilter::default();
        assert!(filter.filter(&[]).is_empty());
        assert!(filter.classify(&[]).is_empty());
    }

    #[test]
    fn test_single_outlier_removed() {
        let mut signal: Vec<f64> = (0..300).map(|i| 800.0 + (i % 7) as f64).collect();
        signal.insert(150, 50.0);
        let cleaned = ArtifactFilter::default().filter(&signal);
        assert_eq!(cleaned.len(), 300);
        assert!(!cleaned.contains(&50.0));
    }

    #[test]
    fn test_rejection_does_not_cascade() {
        // the 1300 ms beat is rejected, the following beats are compared to 800 ms again
        let signal = [800.0, 1300.0, 810.0, 820.0];
        let filter = ArtifactFilter::default();
        assert_eq!(
            filter.classify(&signal),
            vec![
                ArtifactType::None,
                ArtifactType::AbruptChange,
                ArtifactType::None,
                ArtifactType::None,
            ]
        );
        assert_eq!(filter.filter(&signal), vec![800.0, 810.0, 820.0]);
    }

    #[test]
    fn test_first_sample_out_of_range() {
        let signal = [5000.0, 900.0, 950.0];
        let filter = ArtifactFilter::default();
        assert_eq!(filter.classify(&signal)[0], ArtifactType::OutOfRange);
        assert_eq!(filter.filter(&signal), vec![900.0, 950.0]);
    }

    #[test]
    fn test_non_finite_rejected() {
        let signal = [800.0, f64::NAN, f64::INFINITY, 805.0];
        assert_eq!(ArtifactFilter::default().filter(&signal), vec![800.0, 805.0]);
    }

    #[test]
    fn test_change_ratio_boundary() {
        // exactly 25% change is still accepted
        let signal = [800.0, 1000.0];
        assert_eq!(ArtifactFilter::default().filter(&signal).len(), 2);
    }

    #[test]
    fn test_filter_invariant() {
        let filter = ArtifactFilter::default();
        let cleaned = filter.filter(&noisy_series(2000, 7));
        assert!(!cleaned.is_empty());
        assert!(cleaned
            .iter()
            .all(|&rr| rr >= filter.min_rr() && rr <= filter.max_rr()));
        assert!(cleaned
            .windows(2)
            .all(|w| ((w[1] - w[0]) / w[0]).abs() <= filter.config().max_change_ratio));
    }

    #[test]
    fn test_filter_is_deterministic() {
        let signal = noisy_series(1000, 42);
        let filter = ArtifactFilter::default();
        assert_eq!(filter.filter(&signal), filter.filter(&signal));
    }

    #[test]
    fn test_custom_config() {
        let config = ArtifactFilterConfig {
            max_heart_rate: 120.0,
            min_heart_rate: 40.0,
            max_change_ratio: 0.1,
        };
        let filter = ArtifactFilter::new(config).unwrap();
        let signal = [400.0, 900.0, 1000.0, 950.0, 1600.0];
        assert_eq!(filter.min_rr(), 500.0);
        assert_eq!(filter.max_rr(), 1500.0);
        assert_eq!(filter.filter(&signal), vec![900.0, 950.0]);
    }

    #[test]
    fn test_invalid_config() {
        let swapped = ArtifactFilterConfig {
            max_heart_rate: 30.0,
            min_heart_rate: 220.0,
            ..Default::default()
        };
        assert!(ArtifactFilter::new(swapped).is_err());
        let negative = ArtifactFilterConfig {
            max_change_ratio: -0.1,
            ..Default::default()
        };
        let err = ArtifactFilter::new(negative).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HrvError>(),
            Some(HrvError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_artifact_percentage() {
        assert_eq!(artifact_percentage(0, 0), 0.0);
        assert_eq!(artifact_percentage(10, 10), 0.0);
        assert_eq!(artifact_percentage(10, 0), 100.0);
        assert!((artifact_percentage(300, 299) - 100.0 / 300.0).abs() < 1e-12);
    }
}
