//! Preprocessing of raw beat-interval series.
//!
//! The `filter` submodule provides the default artifact filter applied
//! between beat extraction and metric computation.
pub mod filter;
