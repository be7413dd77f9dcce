//! Accumulation of coherence results over a practice session.
//!
//! The session is an ordinary value owned by the caller; recording a result is the
//! only mutation and there is no shared state between sessions.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::analysis::frequency::{CoherenceLevel, CoherenceResult};

/// Aggregate view of a session.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSummary {
    pub samples: usize,
    pub mean_coherence: f64,
    pub peak_coherence: f64,
    pub mean_quality: f64,
    /// Number of results per level, indexed by [`CoherenceLevel::index`].
    pub level_counts: [usize; 4],
    /// Most frequent level; ties go to the higher level.
    pub dominant_level: CoherenceLevel,
}

impl SessionSummary {
    /// Share of results at `level`, in [0, 1].
    pub fn time_in_level(&self, level: CoherenceLevel) -> f64 {
        self.level_counts[level.index()] as f64 / self.samples as f64
    }
}

#[derive(Debug, Clone, Default)]
pub struct CoherenceSession {
    ratio_sum: f64,
    quality_sum: f64,
    peak: f64,
    level_counts: [usize; 4],
    samples: usize,
}

impl CoherenceSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: &CoherenceResult) {
        self.ratio_sum += result.coherence_ratio;
        self.quality_sum += result.quality_score;
        self.peak = self.peak.max(result.coherence_ratio);
        self.level_counts[result.level().index()] += 1;
        self.samples += 1;
    }

    pub fn len(&self) -> usize {
        self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples == 0
    }

    /// `None` until at least one result was recorded.
    pub fn summary(&self) -> Option<SessionSummary> {
        if self.is_empty() {
            return None;
        }
        let n = self.samples as f64;
        let dominant_level = CoherenceLevel::ALL
            .iter()
            .copied()
            .max_by_key(|level| self.level_counts[level.index()])
            .unwrap_or(CoherenceLevel::Low);
        Some(SessionSummary {
            samples: self.samples,
            mean_coherence: self.ratio_sum / n,
            peak_coherence: self.peak,
            mean_quality: self.quality_sum / n,
            level_counts: self.level_counts,
            dominant_level,
        })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(ratio: f64, quality: f64) -> CoherenceResult {
        CoherenceResult {
            coherence_ratio: ratio,
            peak_frequency: 0.1,
            peak_power: 1.0,
            total_power: 2.0,
            quality_score: quality,
        }
    }

    #[test]
    fn test_empty_session() {
        let session = CoherenceSession::new();
        assert!(session.is_empty());
        assert!(session.summary().is_none());
    }

    #[test]
    fn test_summary() {
        let mut session = CoherenceSession::new();
        for (ratio, quality) in [(0.2, 1.0), (0.5, 0.8), (0.9, 0.9), (0.85, 0.5)] {
            session.record(&result(ratio, quality));
        }
        let summary = session.summary().unwrap();
        assert_eq!(summary.samples, 4);
        assert!((summary.mean_coherence - 0.6125).abs() < 1e-12);
        assert_eq!(summary.peak_coherence, 0.9);
        assert!((summary.mean_quality - 0.8).abs() < 1e-12);
        assert_eq!(summary.level_counts, [1, 1, 0, 2]);
        assert_eq!(summary.dominant_level, CoherenceLevel::VeryHigh);
        assert_eq!(summary.time_in_level(CoherenceLevel::VeryHigh), 0.5);
    }

    #[test]
    fn test_dominant_level_tie() {
        let mut session = CoherenceSession::new();
        session.record(&result(0.1, 1.0));
        session.record(&result(0.7, 1.0));
        assert_eq!(session.summary().unwrap().dominant_level, CoherenceLevel::High);
    }

    #[test]
    fn test_reset() {
        let mut session = CoherenceSession::new();
        session.record(&result(0.4, 1.0));
        assert_eq!(session.len(), 1);
        session.reset();
        assert!(session.is_empty());
    }
}
