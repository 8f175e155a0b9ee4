//! Default implementations of the four metric families.
//!
//! - `time`: time-domain statistics of the NN series.
//! - `frequency`: Welch band powers of the resampled NN series.
//! - `nonlinear`: Poincaré dispersion, detrended fluctuation exponents and
//!   sample entropy.
//! - `fragmentation`: heart-rate fragmentation indices.
pub mod fragmentation;
pub mod frequency;
pub mod nonlinear;
pub mod time;
