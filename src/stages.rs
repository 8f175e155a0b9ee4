//! Collaborator seams of the pipeline.
//!
//! The executor drives a fixed stage sequence per window; each stage is a
//! trait object so record formats, detectors and metric algorithms can be
//! swapped without touching the loop. Default implementations for the
//! metric families and the artifact filter live in [`crate::analysis`] and
//! [`crate::preprocessing`]; beat extraction is always supplied by the
//! caller.

use anyhow::Result;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::ParamProfile;
use crate::metrics::{
    FragmentationMetrics, FrequencyDomainMetrics, NonlinearMetrics, TimeDomainMetrics,
};
use crate::table::{MetricsTable, StatsTable};
use crate::windowing::{SampleRange, SignalDescriptor};

/// One named curve inside a plot-data bundle.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlotSeries {
    pub label: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// Stage-produced payload sufficient to render one diagnostic figure
/// without recomputation. The presentation layer passes it through
/// without inspecting the series.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlotData {
    /// Figure kind tag, e.g. `"rr"`, `"psd"`, `"dfa"`.
    pub kind: String,
    pub series: Vec<PlotSeries>,
}

impl PlotData {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            series: Vec::new(),
        }
    }

    pub fn with_series(
        mut self,
        label: impl Into<String>,
        x: Vec<f64>,
        y: Vec<f64>,
    ) -> Self {
        self.series.push(PlotSeries {
            label: label.into(),
            x,
            y,
        });
        self
    }
}

/// Beat intervals produced by the extractor over one window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeatSeries {
    /// RR intervals in milliseconds.
    pub intervals_ms: Vec<f64>,
    /// Onset time of each interval, seconds from window start.
    pub onsets_s: Vec<f64>,
    /// Detection diagnostic bundle.
    pub plot: PlotData,
}

/// Intervals surviving artifact filtering, with their onsets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredSeries {
    /// NN intervals in milliseconds.
    pub intervals_ms: Vec<f64>,
    /// Onset time of each surviving interval, seconds from window start.
    pub onsets_s: Vec<f64>,
    /// Filtering diagnostic bundle.
    pub plot: PlotData,
}

/// Source of ECG signal data. Record decoding and channel layout are the
/// implementor's concern; the pipeline only asks for shape and slices.
#[cfg_attr(test, mockall::automock)]
pub trait EcgRecord {
    /// Stable identifier of the recording, used in tables and figure titles.
    fn id(&self) -> String;
    /// Shape of the selected-channel signal.
    fn descriptor(&self) -> SignalDescriptor;
    /// Channel the record considers its ECG lead, if it can tell.
    fn default_ecg_channel(&self) -> Option<usize>;
    /// Reads the samples of `range` from `channel`.
    fn read_window(&self, channel: usize, range: SampleRange) -> Result<Vec<f64>>;
}

/// Beat-interval extraction over one window of signal.
#[cfg_attr(test, mockall::automock)]
pub trait BeatExtractor {
    fn extract(
        &self,
        record: &dyn EcgRecord,
        channel: usize,
        range: SampleRange,
        params: &ParamProfile,
    ) -> Result<BeatSeries>;
}

/// Artifact filtering of a raw beat-interval series.
///
/// An empty output is a valid result meaning the window holds no usable
/// beats; the executor skips such windows without failing.
#[cfg_attr(test, mockall::automock)]
pub trait IntervalFilter {
    fn filter(&self, raw: &BeatSeries, params: &ParamProfile) -> Result<FilteredSeries>;
}

/// Time-domain metric family.
#[cfg_attr(test, mockall::automock)]
pub trait TimeDomainStage {
    fn analyze(&self, nn_ms: &[f64]) -> Result<(TimeDomainMetrics, PlotData)>;
}

/// Frequency-domain metric family. Receives interval onsets so the
/// spectrum can be computed over a uniformly resampled series.
#[cfg_attr(test, mockall::automock)]
pub trait FrequencyDomainStage {
    fn analyze(&self, nn_ms: &[f64], onsets_s: &[f64])
        -> Result<(FrequencyDomainMetrics, PlotData)>;
}

/// Nonlinear metric family.
#[cfg_attr(test, mockall::automock)]
pub trait NonlinearStage {
    fn analyze(&self, nn_ms: &[f64]) -> Result<(NonlinearMetrics, PlotData)>;
}

/// Heart-rate fragmentation family. The only family without a figure.
#[cfg_attr(test, mockall::automock)]
pub trait FragmentationStage {
    fn analyze(&self, nn_ms: &[f64]) -> Result<FragmentationMetrics>;
}

/// Cross-window summary statistics over the completed table.
#[cfg_attr(test, mockall::automock)]
pub trait SummaryStats {
    fn summarize(&self, table: &MetricsTable) -> Result<StatsTable>;
}

/// The full set of collaborators for one run.
pub struct StageSet {
    pub extractor: Box<dyn BeatExtractor + Send + Sync>,
    pub filter: Box<dyn IntervalFilter + Send + Sync>,
    pub time: Box<dyn TimeDomainStage + Send + Sync>,
    pub frequency: Box<dyn FrequencyDomainStage + Send + Sync>,
    pub nonlinear: Box<dyn NonlinearStage + Send + Sync>,
    pub fragmentation: Box<dyn FragmentationStage + Send + Sync>,
    pub summary: Box<dyn SummaryStats + Send + Sync>,
}

impl StageSet {
    /// Builds a stage set from the crate's default filter, analyzers and
    /// summary statistics, with the caller-supplied beat extractor.
    pub fn with_defaults(extractor: Box<dyn BeatExtractor + Send + Sync>) -> Self {
        Self {
            extractor,
            filter: Box::new(crate::preprocessing::filter::MedianRatioFilter::default()),
            time: Box::new(crate::analysis::time::TimeDomainAnalyzer),
            frequency: Box::new(crate::analysis::frequency::WelchAnalyzer::default()),
            nonlinear: Box::new(crate::analysis::nonlinear::NonlinearAnalyzer::default()),
            fragmentation: Box::new(crate::analysis::fragmentation::FragmentationAnalyzer),
            summary: Box::new(crate::pipeline::DefaultSummaryStats),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plot_data_accumulates_series() {
        let plot = PlotData::new("rr")
            .with_series("raw", vec![0.0, 1.0], vec![800.0, 820.0])
            .with_series("trend", vec![0.0, 1.0], vec![810.0, 810.0]);
        assert_eq!(plot.kind, "rr");
        assert_eq!(plot.series.len(), 2);
        assert_eq!(plot.series[0].label, "raw");
    }
}
