/// This module contains various submodules for heart rate variability (HRV) analysis.
///
/// The available submodules are:
///
/// - `time`: Provides time-domain analysis methods for HRV.
/// - `frequency`: Cardiac coherence and spectral band powers.
/// - `nonlinear`: Contains nonlinear analysis methods for HRV.
/// - `session`: Aggregates coherence results over a session.
pub mod frequency;
pub mod nonlinear;
pub mod session;
pub mod time;
