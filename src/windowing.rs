//! Sample-accurate window planning over a continuous signal.
//!
//! A [`WindowPlan`] converts the signal length, sampling rate and requested
//! window duration into a bounds-checked set of equal-length, contiguous,
//! non-overlapping sample ranges. Any trailing partial window is discarded.

use crate::config::{RunConfig, WindowLength};
use crate::error::PipelineError;

/// Shape of the signal under analysis, as reported by the record source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalDescriptor {
    /// Sampling rate in Hz. Must be positive.
    pub sampling_rate_hz: f64,
    /// Total number of samples in the selected channel. Must be positive.
    pub total_samples: usize,
}

impl SignalDescriptor {
    pub fn duration_seconds(&self) -> f64 {
        self.total_samples as f64 / self.sampling_rate_hz
    }
}

/// Half-open 0-based sample range `[start, end)` of one window.
///
/// Equivalent to the 1-based inclusive range `[start + 1, end]` used by
/// record readers that count samples from one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRange {
    pub start: usize,
    pub end: usize,
}

impl SampleRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Concrete, bounds-checked window plan for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlan {
    /// Samples per window. Never exceeds the signal length.
    pub window_samples: usize,
    /// Number of full windows the signal holds.
    pub total_windows: usize,
    /// First window index processed (0-based).
    pub first: usize,
    /// Last window index processed (0-based, inclusive).
    pub last: usize,
}

impl WindowPlan {
    /// Plans the windows for `signal` under `config`.
    ///
    /// The requested duration is clipped to the signal's total duration, so
    /// a window longer than the signal degenerates to one whole-signal
    /// window. The effective run length is clamped to the available
    /// windows even if the caller requested more.
    ///
    /// # Errors
    ///
    /// * [`PipelineError::ConfigValidation`] if the descriptor itself is
    ///   degenerate (non-positive sampling rate or empty signal).
    /// * [`PipelineError::InvalidOffset`] if the configured offset lies at
    ///   or past `total_windows`.
    pub fn new(signal: &SignalDescriptor, config: &RunConfig) -> Result<Self, PipelineError> {
        if !signal.sampling_rate_hz.is_finite() || signal.sampling_rate_hz <= 0.0 {
            return Err(PipelineError::ConfigValidation(format!(
                "sampling rate must be positive, got {} Hz",
                signal.sampling_rate_hz
            )));
        }
        if signal.total_samples == 0 {
            return Err(PipelineError::ConfigValidation(
                "signal must contain at least one sample".into(),
            ));
        }

        let window_samples = match config.window {
            WindowLength::WholeSignal => signal.total_samples,
            WindowLength::Minutes(minutes) => {
                let seconds = (minutes * 60.0).min(signal.duration_seconds());
                (((seconds * signal.sampling_rate_hz).round() as usize).max(1))
                    .min(signal.total_samples)
            }
        };
        let total_windows = signal.total_samples / window_samples;

        if config.window_offset >= total_windows {
            return Err(PipelineError::InvalidOffset {
                offset: config.window_offset,
                total_windows,
                window_samples,
            });
        }

        let first = config.window_offset;
        let last = total_windows.min(first.saturating_add(config.window_limit)) - 1;

        Ok(Self {
            window_samples,
            total_windows,
            first,
            last,
        })
    }

    /// Sample range covered by window `index`.
    pub fn sample_range(&self, index: usize) -> SampleRange {
        SampleRange {
            start: index * self.window_samples,
            end: (index + 1) * self.window_samples,
        }
    }

    /// Indices processed by this plan, in increasing order.
    pub fn indices(&self) -> impl Iterator<Item = usize> {
        self.first..=self.last
    }

    /// Number of windows this plan will attempt to process.
    pub fn planned_count(&self) -> usize {
        self.last - self.first + 1
    }
}
