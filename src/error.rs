//! Error taxonomy for the analysis pipeline.
//!
//! Every fallible function in this crate returns an [`anyhow::Result`] whose error
//! is an [`HrvError`]. Callers that need to branch on the failure kind can recover
//! it with [`anyhow::Error::downcast_ref`]:
//!
//! ```
//! use hrv_coherence::analysis::time::calc_rmssd;
//! use hrv_coherence::error::HrvError;
//! use hrv_coherence::preprocessing::artifacts::ArtifactFilter;
//!
//! let err = calc_rmssd(&[], &ArtifactFilter::default()).unwrap_err();
//! assert!(matches!(err.downcast_ref::<HrvError>(), Some(HrvError::EmptyInput)));
//! ```

use thiserror::Error;

/// Reasons an analysis stage produced no result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HrvError {
    /// The raw RR sequence was empty.
    #[error("RR interval sequence is empty")]
    EmptyInput,

    /// A raw or cleaned sample count fell below the minimum a stage needs.
    #[error("{stage} needs at least {required} samples, got {actual}")]
    InsufficientSamples {
        stage: &'static str,
        required: usize,
        actual: usize,
    },

    /// The data has the right size but cannot produce a finite result.
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// A configuration value is outside its valid domain.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl HrvError {
    pub(crate) fn insufficient(stage: &'static str, required: usize, actual: usize) -> Self {
        log::debug!("{stage}: insufficient data ({actual} < {required})");
        HrvError::InsufficientSamples {
            stage,
            required,
            actual,
        }
    }

    /// Whether this error only means "collect more data and try again".
    pub fn is_insufficient_data(&self) -> bool {
        matches!(
            self,
            HrvError::EmptyInput | HrvError::InsufficientSamples { .. }
        )
    }
}
