//! Nonlinear analysis module for HRV algorithms.
//!
//! This module provides the Poincaré plot descriptors SD1 and SD2 of an RR series.
//! Each point of the plot pairs an interval with its successor; SD1 measures the spread
//! perpendicular to the line of identity (short-term variability) and SD2 the spread
//! along it (long-term variability).
//!
//! # Example
//! ```rust
//! use hrv_coherence::analysis::nonlinear::calc_poincare_metrics;
//! use hrv_coherence::preprocessing::artifacts::ArtifactFilter;
//!
//! let data = [1000.0, 1010.0, 1001.0, 1030.0, 1049.0, 1020.0, 1005.0, 990.0, 1012.0, 1040.0];
//! let poincare = calc_poincare_metrics(&data, &ArtifactFilter::default()).unwrap();
//! println!("SD1: {}, SD2: {}", poincare.sd1, poincare.sd2);
//! ```

use std::f64::consts::{FRAC_1_SQRT_2, PI};

use anyhow::Result;
use nalgebra::{DVector, DVectorView};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::analysis::time::MIN_SAMPLES;
use crate::error::HrvError;
use crate::preprocessing::artifacts::ArtifactFilter;

/// Results of Poincaré plot analysis.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PoincareReport {
    pub sd1: f64,
    pub sd2: f64,
    /// `None` when SD2 is zero.
    pub sd1_sd2_ratio: Option<f64>,
    /// Area of the fitted ellipse, `pi * SD1 * SD2`.
    pub ellipse_area: f64,
}

fn sample_std(values: &DVector<f64>) -> f64 {
    let n = values.len() as f64;
    (values.variance() * n / (n - 1.0)).sqrt()
}

/// Calculates SD1 and SD2 of the artifact-free intervals.
///
/// # Errors
///
/// [`HrvError::EmptyInput`] for an empty series, [`HrvError::InsufficientSamples`] if
/// fewer than 10 intervals survive the artifact filter.
pub fn calc_poincare_metrics(data: &[f64], filter: &ArtifactFilter) -> Result<PoincareReport> {
    if data.is_empty() {
        return Err(HrvError::EmptyInput.into());
    }
    let cleaned = filter.filter(data);
    if cleaned.len() < MIN_SAMPLES {
        return Err(HrvError::insufficient("Poincaré", MIN_SAMPLES, cleaned.len()).into());
    }

    let rr_points_a = DVectorView::from(&cleaned[0..cleaned.len() - 1]);
    let rr_points_b = DVectorView::from(&cleaned[1..]);
    // rotate the plot by 45 degrees onto the line of identity
    let across = (&rr_points_b - &rr_points_a) * FRAC_1_SQRT_2;
    let along = (&rr_points_b + &rr_points_a) * FRAC_1_SQRT_2;

    let sd1 = sample_std(&across);
    let sd2 = sample_std(&along);
    Ok(PoincareReport {
        sd1,
        sd2,
        sd1_sd2_ratio: (sd2 > 0.0).then(|| sd1 / sd2),
        ellipse_area: PI * sd1 * sd2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poincare_metrics() {
        let data = [
            1000.0, 1010.0, 1001.0, 1030.0, 1049.0, 1020.0, 1005.0, 990.0, 1012.0, 1040.0,
        ];
        let poincare = calc_poincare_metrics(&data, &ArtifactFilter::default()).unwrap();
        assert!(poincare.sd1 > 0.0, "SD1 should be positive.");
        assert!(poincare.sd2 > 0.0, "SD2 should be positive.");
        assert!(poincare.sd1_sd2_ratio.is_some());
        assert!((poincare.ellipse_area - PI * poincare.sd1 * poincare.sd2).abs() < 1e-9);
    }

    #[test]
    fn test_alternating_series() {
        // pure beat-to-beat alternation has no spread along the identity line
        let data: Vec<f64> = (0..20)
            .map(|i| if i % 2 == 0 { 800.0 } else { 860.0 })
            .collect();
        let poincare = calc_poincare_metrics(&data, &ArtifactFilter::default()).unwrap();
        assert!(poincare.sd2.abs() < 1e-9);
        assert!(poincare.sd1 > 40.0);
    }

    #[test]
    fn test_slow_drift() {
        // a slow ramp varies along the identity line far more than across it
        let data: Vec<f64> = (0..50).map(|i| 800.0 + 4.0 * i as f64).collect();
        let poincare = calc_poincare_metrics(&data, &ArtifactFilter::default()).unwrap();
        assert!(poincare.sd1 < 1e-9);
        assert!(poincare.sd2 > 50.0);
        assert_eq!(poincare.sd1_sd2_ratio.map(|r| r < 1e-9), Some(true));
    }

    #[test]
    fn test_poincare_metrics_error() {
        let data = [1000.0, 1010.0, 1020.0];
        let err = calc_poincare_metrics(&data, &ArtifactFilter::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HrvError>(),
            Some(HrvError::InsufficientSamples { .. })
        ));
        assert!(calc_poincare_metrics(&[], &ArtifactFilter::default()).is_err());
    }
}
