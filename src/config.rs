//! Run configuration and validation.
//!
//! A [`RunConfig`] is assembled through [`RunConfigBuilder`], which checks
//! every option before any signal processing begins. Violations surface as
//! [`PipelineError::ConfigValidation`].

use std::fmt;
use std::sync::Arc;

use crate::error::PipelineError;

/// Requested analysis window length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowLength {
    /// Fixed window length in minutes. Must be positive and finite.
    Minutes(f64),
    /// One window spanning the whole signal.
    WholeSignal,
}

/// Parameter profile handed to the extraction and filtering stages.
///
/// Either the name of a predefined profile or an explicit list of
/// name/value overrides. The pipeline passes it through opaquely.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamProfile {
    Named(String),
    Overrides(Vec<(String, f64)>),
}

impl Default for ParamProfile {
    fn default() -> Self {
        ParamProfile::Named("default".into())
    }
}

/// Whether a run only computes tables or also prints and renders them.
///
/// Replaces the source behavior of inferring "display" from whether the
/// caller consumed the outputs; the caller decides explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    Compute,
    ComputeAndDisplay,
}

/// Which stage's interval sequence drives the Poincaré ellipse figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EllipseSource {
    /// Plot the filtered interval sequence.
    #[default]
    Filtered,
    /// Plot the sequence seen by the nonlinear metric stage.
    Metrics,
}

/// A pure mapping from one NN-interval sequence to another.
///
/// The function must be stateless and side-effect free and must return
/// intervals in the same unit (milliseconds). Purity cannot be enforced
/// statically; it is a contract the caller must honor.
pub type Transform = Arc<dyn Fn(&[f64]) -> Vec<f64> + Send + Sync>;

/// Validated options for one analysis run.
#[derive(Clone)]
pub struct RunConfig {
    /// ECG channel index, overriding the record's auto-detected channel.
    pub ecg_channel: Option<usize>,
    /// Window length policy.
    pub window: WindowLength,
    /// Number of windows skipped from the start of the plan.
    pub window_offset: usize,
    /// Maximum number of windows processed after the offset.
    /// `usize::MAX` means unbounded.
    pub window_limit: usize,
    /// Parameter profile for the downstream stages.
    pub params: ParamProfile,
    /// Optional transform applied to clean intervals before any metric
    /// computation.
    pub transform: Option<Transform>,
    /// Collect plot-data bundles per processed window. Bundles are always
    /// collected in [`RunMode::ComputeAndDisplay`].
    pub plot: bool,
    /// Compute-only or compute-and-display.
    pub mode: RunMode,
    /// Source sequence for the Poincaré ellipse figure.
    pub ellipse_source: EllipseSource,
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("ecg_channel", &self.ecg_channel)
            .field("window", &self.window)
            .field("window_offset", &self.window_offset)
            .field("window_limit", &self.window_limit)
            .field("params", &self.params)
            .field("transform", &self.transform.as_ref().map(|_| "<fn>"))
            .field("plot", &self.plot)
            .field("mode", &self.mode)
            .field("ellipse_source", &self.ellipse_source)
            .finish()
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ecg_channel: None,
            window: WindowLength::WholeSignal,
            window_offset: 0,
            window_limit: usize::MAX,
            params: ParamProfile::default(),
            transform: None,
            plot: false,
            mode: RunMode::default(),
            ellipse_source: EllipseSource::default(),
        }
    }
}

impl RunConfig {
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }
}

/// Builder collecting run options; validation happens in [`build`].
///
/// [`build`]: RunConfigBuilder::build
#[derive(Default)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    /// Overrides the auto-detected ECG channel.
    pub fn ecg_channel(mut self, channel: usize) -> Self {
        self.config.ecg_channel = Some(channel);
        self
    }

    /// Requests fixed-length windows of `minutes` minutes.
    pub fn window_minutes(mut self, minutes: f64) -> Self {
        self.config.window = WindowLength::Minutes(minutes);
        self
    }

    /// Requests a single window spanning the whole signal.
    pub fn whole_signal(mut self) -> Self {
        self.config.window = WindowLength::WholeSignal;
        self
    }

    /// Skips the first `offset` windows of the plan.
    pub fn window_offset(mut self, offset: usize) -> Self {
        self.config.window_offset = offset;
        self
    }

    /// Caps the number of windows processed after the offset.
    pub fn window_limit(mut self, limit: usize) -> Self {
        self.config.window_limit = limit;
        self
    }

    /// Selects a parameter profile for the downstream stages.
    pub fn params(mut self, params: ParamProfile) -> Self {
        self.config.params = params;
        self
    }

    /// Installs a transform applied to clean intervals before metrics.
    pub fn transform(mut self, transform: Transform) -> Self {
        self.config.transform = Some(transform);
        self
    }

    /// Enables collection of per-window plot-data bundles.
    pub fn plot(mut self, plot: bool) -> Self {
        self.config.plot = plot;
        self
    }

    pub fn mode(mut self, mode: RunMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn ellipse_source(mut self, source: EllipseSource) -> Self {
        self.config.ellipse_source = source;
        self
    }

    /// Validates all options and produces the final [`RunConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ConfigValidation`] if the window length is
    /// not a positive finite number, the window limit is zero, or the
    /// parameter profile is degenerate.
    pub fn build(self) -> Result<RunConfig, PipelineError> {
        if let WindowLength::Minutes(minutes) = self.config.window {
            if !minutes.is_finite() || minutes <= 0.0 {
                return Err(PipelineError::ConfigValidation(format!(
                    "window length must be a positive number of minutes, got {minutes}"
                )));
            }
        }
        if self.config.window_limit == 0 {
            return Err(PipelineError::ConfigValidation(
                "window limit must be at least 1".into(),
            ));
        }
        match &self.config.params {
            ParamProfile::Named(name) if name.trim().is_empty() => {
                return Err(PipelineError::ConfigValidation(
                    "parameter profile name must not be empty".into(),
                ));
            }
            ParamProfile::Overrides(overrides) => {
                if let Some((name, value)) =
                    overrides.iter().find(|(_, value)| !value.is_finite())
                {
                    return Err(PipelineError::ConfigValidation(format!(
                        "parameter override '{name}' must be finite, got {value}"
                    )));
                }
            }
            _ => {}
        }
        Ok(self.config)
    }
}
