//! Presentation layer: table printing and figure sequencing.
//!
//! This module decides *what* to draw and in which order; drawing itself
//! is behind the [`Renderer`] trait. For every processed window the
//! figure sequence is fixed: raw intervals, filtered intervals, Poincaré
//! ellipse, NN histogram, power spectrum, three-panel nonlinear plot.

use std::fmt::Write as _;

use anyhow::Result;

use crate::config::{EllipseSource, RunConfig};
use crate::pipeline::AnalysisOutput;
use crate::stages::PlotData;

/// Figure backend. Each call renders one figure from a stage-produced
/// plot bundle; implementations own figure and window management.
#[cfg_attr(test, mockall::automock)]
pub trait Renderer {
    fn raw_intervals(&mut self, title: &str, plot: &PlotData) -> Result<()>;
    fn filtered_intervals(&mut self, title: &str, plot: &PlotData) -> Result<()>;
    /// Poincaré ellipse; `plot` is the bundle selected by
    /// [`EllipseSource`].
    fn poincare(&mut self, title: &str, plot: &PlotData) -> Result<()>;
    fn histogram(&mut self, title: &str, plot: &PlotData) -> Result<()>;
    /// Spectrum figure; `annotate_peaks` enables the legend and per-band
    /// peak markers.
    fn spectrum(&mut self, title: &str, plot: &PlotData, annotate_peaks: bool) -> Result<()>;
    /// Three-panel figure: detrended fluctuation, scaling exponents,
    /// multiscale entropy.
    fn nonlinear_panels(&mut self, title: &str, plot: &PlotData) -> Result<()>;
}

/// Tabular text report: the metrics table, followed by the summary
/// statistics when more than one window produced a row.
pub fn report_text(output: &AnalysisOutput) -> String {
    let mut text = String::new();
    let _ = write!(text, "{}", output.metrics);
    if output.metrics.len() > 1 {
        let _ = writeln!(text);
        let _ = write!(text, "{}", output.stats);
    }
    text
}

/// Renders every collected plot entry in window order.
pub fn render_plots(
    output: &AnalysisOutput,
    config: &RunConfig,
    renderer: &mut dyn Renderer,
) -> Result<()> {
    let record = output.metrics.description().unwrap_or("recording");
    let total = output.plan.total_windows;

    for (&window, plots) in &output.plots {
        let title = format!("{record}: window {window}/{total}");
        renderer.raw_intervals(&title, &plots.detection)?;
        renderer.filtered_intervals(&title, &plots.filtering)?;
        let ellipse = match config.ellipse_source {
            EllipseSource::Filtered => &plots.filtering,
            EllipseSource::Metrics => &plots.nonlinear,
        };
        renderer.poincare(&title, ellipse)?;
        renderer.histogram(&title, &plots.time)?;
        renderer.spectrum(&title, &plots.frequency, true)?;
        renderer.nonlinear_panels(&title, &plots.nonlinear)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::pipeline::WindowPlots;
    use crate::table::{MetricsTable, StatsTable};
    use crate::windowing::WindowPlan;
    use mockall::Sequence;
    use std::collections::BTreeMap;

    fn output_with_plots(windows: &[usize]) -> AnalysisOutput {
        let mut metrics = MetricsTable::new();
        metrics.set_description("rec001");
        let mut plots = BTreeMap::new();
        for &window in windows {
            plots.insert(window, WindowPlots::default());
        }
        AnalysisOutput {
            plan: WindowPlan {
                window_samples: 216_000,
                total_windows: 6,
                first: 0,
                last: 5,
            },
            metrics,
            stats: StatsTable::new(),
            plots,
        }
    }

    #[test]
    fn figures_follow_the_fixed_order_per_window() {
        let output = output_with_plots(&[2]);
        let config = RunConfig::builder().plot(true).build().unwrap();

        let mut renderer = MockRenderer::new();
        let mut seq = Sequence::new();
        renderer
            .expect_raw_intervals()
            .once()
            .in_sequence(&mut seq)
            .withf(|title, _| title == "rec001: window 2/6")
            .returning(|_, _| Ok(()));
        renderer
            .expect_filtered_intervals()
            .once()
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        renderer
            .expect_poincare()
            .once()
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        renderer
            .expect_histogram()
            .once()
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        renderer
            .expect_spectrum()
            .once()
            .in_sequence(&mut seq)
            .withf(|_, _, annotate| *annotate)
            .returning(|_, _, _| Ok(()));
        renderer
            .expect_nonlinear_panels()
            .once()
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        render_plots(&output, &config, &mut renderer).unwrap();
    }

    #[test]
    fn skipped_windows_render_nothing() {
        let output = output_with_plots(&[]);
        let config = RunConfig::builder().build().unwrap();
        let mut renderer = MockRenderer::new();
        // No expectations: any call would panic.
        render_plots(&output, &config, &mut renderer).unwrap();
    }

    #[test]
    fn ellipse_source_switch_selects_the_bundle() {
        let mut output = output_with_plots(&[1]);
        let plots = output.plots.get_mut(&1).unwrap();
        plots.filtering = PlotData::new("filtering");
        plots.nonlinear = PlotData::new("nonlinear");

        for (source, expected_kind) in [
            (EllipseSource::Filtered, "filtering"),
            (EllipseSource::Metrics, "nonlinear"),
        ] {
            let config = RunConfig::builder().ellipse_source(source).build().unwrap();
            let mut renderer = MockRenderer::new();
            renderer.expect_raw_intervals().returning(|_, _| Ok(()));
            renderer
                .expect_filtered_intervals()
                .returning(|_, _| Ok(()));
            let expected = expected_kind.to_string();
            renderer
                .expect_poincare()
                .once()
                .withf(move |_, plot| plot.kind == expected)
                .returning(|_, _| Ok(()));
            renderer.expect_histogram().returning(|_, _| Ok(()));
            renderer.expect_spectrum().returning(|_, _, _| Ok(()));
            renderer
                .expect_nonlinear_panels()
                .returning(|_, _| Ok(()));
            render_plots(&output, &config, &mut renderer).unwrap();
        }
    }

    #[test]
    fn stats_are_reported_only_for_multiple_rows() {
        use crate::stages::SummaryStats;
        use crate::table::tests_support::sample_row;

        let mut output = output_with_plots(&[]);
        output.metrics.append(sample_row(1)).unwrap();
        let single = report_text(&output);
        assert!(!single.contains("statistic"));

        output.metrics.append(sample_row(2)).unwrap();
        crate::pipeline::DefaultSummaryStats
            .summarize(&output.metrics)
            .map(|stats| output.stats = stats)
            .unwrap();
        let double = report_text(&output);
        assert!(double.contains("statistic"));
        assert!(double.contains("mean"));
    }
}
