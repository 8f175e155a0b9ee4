//! Fatal error taxonomy for pipeline runs.
//!
//! Collaborator failures (record I/O, metric stages) travel as plain
//! [`anyhow::Error`] values; the variants below cover the conditions the
//! pipeline itself detects before or while planning a run. A window that
//! yields no usable beats is not an error: it is logged and skipped.

use thiserror::Error;

/// Fatal conditions raised by the pipeline itself.
///
/// All variants abort the run with no partial output. They are wrapped in
/// [`anyhow::Error`] at the public entry points, so callers match on them
/// via `err.downcast_ref::<PipelineError>()`.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A run option failed validation before any signal processing began.
    #[error("invalid configuration: {0}")]
    ConfigValidation(String),

    /// No ECG channel was configured and the record reports none.
    #[error("record '{record}' has no resolvable ECG channel and none was specified")]
    NoChannel { record: String },

    /// The requested window offset lies past the end of the window plan.
    #[error(
        "window offset {offset} is out of range: the signal yields \
         {total_windows} window(s) of {window_samples} samples"
    )]
    InvalidOffset {
        offset: usize,
        total_windows: usize,
        window_samples: usize,
    },
}
