//! Windowed HRV (Heart Rate Variability) analysis pipeline.
//!
//! This crate segments a continuous ECG recording into fixed-length time
//! windows and runs a fixed stage sequence per window: beat-interval
//! extraction, artifact filtering, an optional interval transform, and
//! four metric families (time-domain, frequency-domain, nonlinear,
//! fragmentation). Per-window rows are assembled into one ordered metrics
//! table, summarized once across windows, and optionally rendered as
//! diagnostic figures.
//!
//! Record access, beat extraction and figure drawing are behind traits in
//! [`stages`] and [`report`]; default implementations of the artifact
//! filter and the metric families live in [`preprocessing`] and
//! [`analysis`].
//!
//! # Example
//!
//! ```no_run
//! use hrv_pipeline::config::RunConfig;
//! use hrv_pipeline::pipeline::run_analysis;
//! use hrv_pipeline::stages::{BeatExtractor, EcgRecord, StageSet};
//!
//! fn analyze(record: &dyn EcgRecord, extractor: Box<dyn BeatExtractor + Send + Sync>)
//!     -> anyhow::Result<()>
//! {
//!     let config = RunConfig::builder().window_minutes(5.0).build()?;
//!     let stages = StageSet::with_defaults(extractor);
//!     let output = run_analysis(record, &config, &stages)?;
//!     println!("{}", output.metrics);
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod preprocessing;
pub mod report;
pub mod stages;
pub mod table;
pub mod windowing;

pub use config::{RunConfig, RunMode};
pub use error::PipelineError;
pub use pipeline::{run_analysis, run_and_report, AnalysisOutput};
