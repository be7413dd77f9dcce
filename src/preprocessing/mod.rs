//! This module contains submodules for preprocessing RR interval series before analysis.
//!
//! The `artifacts` submodule rejects samples that cannot represent genuine heartbeats.
//! The `resample` submodule converts beat-indexed RR series into uniformly sampled signals.
pub mod artifacts;
pub mod resample;
