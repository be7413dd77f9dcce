//! HRV (Heart Rate Variability) and cardiac coherence computation
//!
//! This crate turns RR interval series (milliseconds between heartbeats) into HRV metrics.
//! Every stage is a pure function of its input: the raw series is cleaned by an
//! [`preprocessing::artifacts::ArtifactFilter`], then fed to time-domain statistics,
//! Poincaré descriptors or the spectral coherence estimator. Stages that lack data
//! report an [`error::HrvError`] instead of a sentinel value.
//!
//! ```
//! use hrv_coherence::analyzer::HrvAnalyzer;
//!
//! let rr = vec![800.0; 300];
//! let summary = HrvAnalyzer::default().analyze(&rr);
//! assert_eq!(summary.time_domain.heart_rate, Some(75.0));
//! // a perfectly regular series has no spectral power to compare
//! assert!(summary.coherence.is_none());
//! ```

pub mod analysis;
pub mod analyzer;
pub mod error;
pub mod preprocessing;
