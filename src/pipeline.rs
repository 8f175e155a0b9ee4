//! Window pipeline executor and result aggregation.
//!
//! [`run_analysis`] is the primary entry point: it plans the windows,
//! drives the fixed stage sequence for each index in increasing order,
//! folds the per-window results into one [`MetricsTable`], and computes
//! the cross-window [`StatsTable`] exactly once at the end. A window
//! whose filtered interval sequence is empty is logged and skipped; every
//! other stage failure aborts the run.

use std::collections::BTreeMap;
use std::fmt;
use std::mem;
use std::time::Instant;

use anyhow::{Context, Result};
use log::{info, warn};
use nalgebra::DVectorView;

use crate::config::{RunConfig, RunMode};
use crate::error::PipelineError;
use crate::metrics::IntervalCounts;
use crate::stages::{BeatSeries, EcgRecord, FilteredSeries, PlotData, StageSet, SummaryStats};
use crate::table::{MetricsRow, MetricsTable, StatsTable};
use crate::windowing::WindowPlan;

/// Elapsed-time progress reporter created at run start and threaded
/// through the stage loop; one line per stage transition.
pub struct Progress {
    started: Instant,
}

impl Progress {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Emits one `[<elapsed>] >> <component>: <message>` diagnostic line.
    pub fn report(&self, component: &str, message: fmt::Arguments<'_>) {
        info!("[{:.3}] >> {component}: {message}", self.elapsed_seconds());
    }
}

/// The five plot-data bundles of one processed window, in figure order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowPlots {
    pub detection: PlotData,
    pub filtering: PlotData,
    pub time: PlotData,
    pub frequency: PlotData,
    pub nonlinear: PlotData,
}

/// Everything one window produced. Assembled per iteration, folded into
/// the aggregate outputs, then dropped.
#[derive(Debug, Clone)]
pub struct WindowResult {
    /// 0-based window index.
    pub index: usize,
    pub raw: BeatSeries,
    pub filtered: FilteredSeries,
    pub counts: IntervalCounts,
    pub time: crate::metrics::TimeDomainMetrics,
    pub frequency: crate::metrics::FrequencyDomainMetrics,
    pub nonlinear: crate::metrics::NonlinearMetrics,
    pub fragmentation: crate::metrics::FragmentationMetrics,
    pub plots: WindowPlots,
}

impl WindowResult {
    /// The wide table row for this window, labeled 1-based.
    pub fn to_row(&self) -> MetricsRow {
        MetricsRow {
            window: self.index + 1,
            counts: self.counts,
            time: self.time,
            frequency: self.frequency,
            nonlinear: self.nonlinear,
            fragmentation: self.fragmentation,
        }
    }
}

/// Aggregate outputs of one run.
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    /// The window plan the run executed.
    pub plan: WindowPlan,
    /// One row per successfully processed window.
    pub metrics: MetricsTable,
    /// Cross-window summary, one labeled row per statistic.
    pub stats: StatsTable,
    /// Plot bundles keyed by 1-based window number; windows that were
    /// skipped (or compute-only runs without `plot`) have no key.
    pub plots: BTreeMap<usize, WindowPlots>,
}

/// Resolves the ECG channel: explicit configuration wins, then the
/// record's own detection.
pub fn resolve_channel(record: &dyn EcgRecord, config: &RunConfig) -> Result<usize> {
    config
        .ecg_channel
        .or_else(|| record.default_ecg_channel())
        .ok_or_else(|| {
            PipelineError::NoChannel {
                record: record.id(),
            }
            .into()
        })
}

/// Runs the full windowed analysis over `record`.
///
/// Windows are processed strictly in increasing index order; the row
/// order of the metrics table and the key order of the plot map follow
/// from it. Identical inputs and collaborators produce identical
/// outputs.
///
/// # Errors
///
/// Fatal configuration and planning errors ([`PipelineError`]) and any
/// collaborator failure abort the run with no partial output. A window
/// with no usable beats only produces a warning.
pub fn run_analysis(
    record: &dyn EcgRecord,
    config: &RunConfig,
    stages: &StageSet,
) -> Result<AnalysisOutput> {
    let progress = Progress::start();
    let channel = resolve_channel(record, config)?;
    let signal = record.descriptor();
    let plan = WindowPlan::new(&signal, config)?;
    progress.report(
        "plan",
        format_args!(
            "{}: {} window(s) of {} samples, processing {}..={}",
            record.id(),
            plan.total_windows,
            plan.window_samples,
            plan.first + 1,
            plan.last + 1
        ),
    );

    let mut table = MetricsTable::new();
    let mut plots = BTreeMap::new();
    // Display mode always needs the bundles, whether or not `plot` is set.
    let collect_plots = config.plot || config.mode == RunMode::ComputeAndDisplay;

    for index in plan.indices() {
        let window = index + 1;
        let total = plan.total_windows;

        progress.report("extract", format_args!("window {window}/{total}"));
        let mut raw = stages
            .extractor
            .extract(record, channel, plan.sample_range(index), &config.params)
            .with_context(|| format!("beat extraction failed in window {window}"))?;

        progress.report("filter", format_args!("window {window}/{total}"));
        let mut filtered = stages
            .filter
            .filter(&raw, &config.params)
            .with_context(|| format!("artifact filtering failed in window {window}"))?;

        if filtered.intervals_ms.is_empty() {
            warn!("window {window}/{total} has no usable beats, skipping");
            continue;
        }

        // Counts are fixed before any transform runs.
        let counts = IntervalCounts {
            raw_count: raw.intervals_ms.len(),
            clean_count: filtered.intervals_ms.len(),
        };

        let nn: Vec<f64> = match &config.transform {
            Some(transform) => transform(&filtered.intervals_ms),
            None => filtered.intervals_ms.clone(),
        };
        let onsets = aligned_onsets(&nn, &filtered.onsets_s);

        progress.report("time", format_args!("window {window}/{total}"));
        let (time, time_plot) = stages
            .time
            .analyze(&nn)
            .with_context(|| format!("time-domain stage failed in window {window}"))?;

        progress.report("frequency", format_args!("window {window}/{total}"));
        let (frequency, frequency_plot) = stages
            .frequency
            .analyze(&nn, &onsets)
            .with_context(|| format!("frequency-domain stage failed in window {window}"))?;

        progress.report("nonlinear", format_args!("window {window}/{total}"));
        let (nonlinear, nonlinear_plot) = stages
            .nonlinear
            .analyze(&nn)
            .with_context(|| format!("nonlinear stage failed in window {window}"))?;

        progress.report("fragmentation", format_args!("window {window}/{total}"));
        let fragmentation = stages
            .fragmentation
            .analyze(&nn)
            .with_context(|| format!("fragmentation stage failed in window {window}"))?;

        let result = WindowResult {
            index,
            plots: WindowPlots {
                detection: mem::take(&mut raw.plot),
                filtering: mem::take(&mut filtered.plot),
                time: time_plot,
                frequency: frequency_plot,
                nonlinear: nonlinear_plot,
            },
            raw,
            filtered,
            counts,
            time,
            frequency,
            nonlinear,
            fragmentation,
        };

        table.append(result.to_row())?;
        if collect_plots {
            plots.insert(window, result.plots);
        }
    }

    table.set_description(record.id());

    progress.report(
        "stats",
        format_args!("summarizing {} window row(s)", table.len()),
    );
    let stats = stages
        .summary
        .summarize(&table)
        .context("summary statistics failed")?;

    Ok(AnalysisOutput {
        plan,
        metrics: table,
        stats,
        plots,
    })
}

/// Runs the analysis and, in display mode, prints the tables and renders
/// the collected figures through `renderer`.
pub fn run_and_report(
    record: &dyn EcgRecord,
    config: &RunConfig,
    stages: &StageSet,
    renderer: &mut dyn crate::report::Renderer,
) -> Result<AnalysisOutput> {
    let output = run_analysis(record, config, stages)?;
    if config.mode == RunMode::ComputeAndDisplay {
        print!("{}", crate::report::report_text(&output));
        crate::report::render_plots(&output, config, renderer)?;
    }
    Ok(output)
}

/// Onsets matching the metric-stage input. A transform that preserves
/// length keeps the measured onsets; otherwise onsets are rebuilt from
/// the cumulative transformed intervals.
fn aligned_onsets(nn_ms: &[f64], measured_onsets_s: &[f64]) -> Vec<f64> {
    if nn_ms.len() == measured_onsets_s.len() {
        return measured_onsets_s.to_vec();
    }
    let mut t = 0.0;
    nn_ms
        .iter()
        .map(|&interval| {
            let onset = t;
            t += interval / 1000.0;
            onset
        })
        .collect()
}

/// Default cross-window summary: mean, standard deviation, minimum and
/// maximum per metric column.
pub struct DefaultSummaryStats;

impl SummaryStats for DefaultSummaryStats {
    fn summarize(&self, table: &MetricsTable) -> Result<StatsTable> {
        let column_count = MetricsRow::columns().len();
        let mut mean = vec![f64::NAN; column_count];
        let mut sd = vec![f64::NAN; column_count];
        let mut min = vec![f64::NAN; column_count];
        let mut max = vec![f64::NAN; column_count];

        if !table.is_empty() {
            for column in 0..column_count {
                let values = table.column_values(column);
                let vector = DVectorView::from(values.as_slice());
                mean[column] = vector.mean();
                sd[column] = vector.variance().sqrt();
                min[column] = values.iter().copied().fold(f64::INFINITY, f64::min);
                max[column] = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            }
        }

        let mut stats = StatsTable::new();
        stats.push("mean", mean)?;
        stats.push("sd", sd)?;
        stats.push("min", min)?;
        stats.push("max", max)?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::metrics::{
        FragmentationMetrics, FrequencyDomainMetrics, NonlinearMetrics, TimeDomainMetrics,
    };
    use crate::stages::MockEcgRecord;
    use crate::windowing::SignalDescriptor;

    fn sample_row(window: usize, mean_nn: f64) -> MetricsRow {
        MetricsRow {
            window,
            counts: IntervalCounts {
                raw_count: 10,
                clean_count: 9,
            },
            time: TimeDomainMetrics {
                mean_nn,
                sdnn: 1.0,
                rmssd: 1.0,
                pnn50: 0.0,
            },
            frequency: FrequencyDomainMetrics {
                vlf_power: 0.0,
                lf_power: 0.0,
                hf_power: 0.0,
                total_power: 0.0,
                lf_hf_ratio: 0.0,
                lf_peak_hz: 0.0,
                hf_peak_hz: 0.0,
            },
            nonlinear: NonlinearMetrics {
                sd1: 0.0,
                sd2: 0.0,
                sd_ratio: 0.0,
                dfa_alpha1: 0.0,
                dfa_alpha2: 0.0,
                sampen: 0.0,
            },
            fragmentation: FragmentationMetrics {
                pip: 0.0,
                ials: 0.0,
                pss: 0.0,
                pas: 0.0,
            },
        }
    }

    #[test]
    fn default_summary_computes_column_statistics() {
        let mut table = MetricsTable::new();
        table.append(sample_row(1, 800.0)).unwrap();
        table.append(sample_row(2, 900.0)).unwrap();
        let stats = DefaultSummaryStats.summarize(&table).unwrap();

        let mean_nn_index = MetricsRow::columns()
            .iter()
            .position(|&c| c == "mean_nn")
            .unwrap();
        let mean_row = &stats.rows()[0];
        assert_eq!(mean_row.statistic, "mean");
        assert_eq!(mean_row.values[mean_nn_index], 850.0);
        let min_row = &stats.rows()[2];
        assert_eq!(min_row.values[mean_nn_index], 800.0);
        let max_row = &stats.rows()[3];
        assert_eq!(max_row.values[mean_nn_index], 900.0);
    }

    #[test]
    fn empty_table_summarizes_to_nan_rows() {
        let stats = DefaultSummaryStats.summarize(&MetricsTable::new()).unwrap();
        assert_eq!(stats.rows().len(), 4);
        assert!(stats.rows()[0].values.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn channel_resolution_prefers_configuration() {
        let mut record = MockEcgRecord::new();
        record.expect_default_ecg_channel().return_const(Some(2usize));
        let config = RunConfig::builder().ecg_channel(0).build().unwrap();
        assert_eq!(resolve_channel(&record, &config).unwrap(), 0);
    }

    #[test]
    fn channel_resolution_falls_back_to_record() {
        let mut record = MockEcgRecord::new();
        record.expect_default_ecg_channel().return_const(Some(3usize));
        let config = RunConfig::builder().build().unwrap();
        assert_eq!(resolve_channel(&record, &config).unwrap(), 3);
    }

    #[test]
    fn missing_channel_is_fatal() {
        let mut record = MockEcgRecord::new();
        record.expect_default_ecg_channel().return_const(None);
        record.expect_id().return_const("rec007".to_string());
        let config = RunConfig::builder().build().unwrap();
        let err = resolve_channel(&record, &config).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::NoChannel { record }) if record == "rec007"
        ));
    }

    #[test]
    fn aligned_onsets_rebuilds_after_length_change() {
        let measured = vec![0.0, 1.0, 2.0];
        // Same length: measured onsets pass through.
        assert_eq!(aligned_onsets(&[1000.0; 3], &measured), measured);
        // Length change: onsets are the cumulative intervals.
        let rebuilt = aligned_onsets(&[500.0, 500.0], &measured);
        assert_eq!(rebuilt, vec![0.0, 0.5]);
    }

    #[test]
    fn descriptor_planning_error_surfaces() {
        let mut record = MockEcgRecord::new();
        record.expect_default_ecg_channel().return_const(Some(0usize));
        record.expect_id().return_const("rec001".to_string());
        record.expect_descriptor().return_const(SignalDescriptor {
            sampling_rate_hz: 360.0,
            total_samples: 1_296_000,
        });
        let config = RunConfig::builder()
            .window_minutes(10.0)
            .window_offset(6)
            .build()
            .unwrap();
        let stages = StageSet::with_defaults(Box::new(
            crate::stages::MockBeatExtractor::new(),
        ));
        let err = run_analysis(&record, &config, &stages).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::InvalidOffset {
                offset: 6,
                total_windows: 6,
                ..
            })
        ));
    }
}
