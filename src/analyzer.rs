//! One-call analysis of an RR series and parallel analysis of many recordings.

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::analysis::frequency::{BandPowers, CoherenceEstimator, CoherenceResult};
use crate::analysis::nonlinear::{calc_poincare_metrics, PoincareReport};
use crate::analysis::time::TimeDomainReport;
use crate::preprocessing::artifacts::{artifact_percentage, ArtifactFilter};

/// Every metric the crate computes for one recording. Stages without enough data are `None`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HrvSummary {
    pub artifact_percentage: f64,
    pub time_domain: TimeDomainReport,
    pub coherence: Option<CoherenceResult>,
    pub band_powers: Option<BandPowers>,
    pub poincare: Option<PoincareReport>,
}

/// Runs the full pipeline with one shared artifact filter.
#[derive(Debug, Default)]
pub struct HrvAnalyzer {
    filter: ArtifactFilter,
    coherence: CoherenceEstimator,
}

impl HrvAnalyzer {
    /// The estimator's own filter is replaced by `filter` so every stage rejects the
    /// same samples.
    pub fn new(filter: ArtifactFilter, coherence: CoherenceEstimator) -> Self {
        Self {
            coherence: coherence.with_filter(filter.clone()),
            filter,
        }
    }

    pub fn analyze(&self, data: &[f64]) -> HrvSummary {
        let cleaned_len = self.filter.filter(data).len();
        HrvSummary {
            artifact_percentage: artifact_percentage(data.len(), cleaned_len),
            time_domain: TimeDomainReport::new(data, &self.filter),
            coherence: self.coherence.estimate(data).ok(),
            band_powers: self.coherence.band_powers(data).ok(),
            poincare: calc_poincare_metrics(data, &self.filter).ok(),
        }
    }

    /// Analyzes independent recordings in parallel; the output keeps the input order.
    pub fn analyze_batch(&self, recordings: &[Vec<f64>]) -> Vec<HrvSummary> {
        log::debug!("analyzing {} recordings", recordings.len());
        recordings
            .par_iter()
            .map(|recording| self.analyze(recording))
            .collect()
    }
}
