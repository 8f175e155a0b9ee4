//! Time-domain metric family.
//!
//! Computes mean NN, SDNN, RMSSD and pNN50 over one window of NN
//! intervals and produces the histogram plot bundle for the time-domain
//! figure.

use anyhow::{anyhow, Result};
use nalgebra::DVectorView;

use crate::metrics::TimeDomainMetrics;
use crate::stages::{PlotData, TimeDomainStage};

/// Width of one histogram bin in milliseconds.
const HISTOGRAM_BIN_MS: f64 = 25.0;

/// Default time-domain stage.
pub struct TimeDomainAnalyzer;

impl TimeDomainStage for TimeDomainAnalyzer {
    fn analyze(&self, nn_ms: &[f64]) -> Result<(TimeDomainMetrics, PlotData)> {
        if nn_ms.len() < 2 {
            return Err(anyhow!(
                "time-domain metrics need at least two NN intervals, got {}",
                nn_ms.len()
            ));
        }

        let nn = DVectorView::from(nn_ms);
        let mean_nn = nn.mean();
        let sdnn = nn.variance().sqrt();

        let mut sum_sq_diff = 0.0;
        let mut over_50 = 0usize;
        for pair in nn_ms.windows(2) {
            let diff = pair[1] - pair[0];
            sum_sq_diff += diff * diff;
            if diff.abs() > 50.0 {
                over_50 += 1;
            }
        }
        let diff_count = nn_ms.len() - 1;
        let rmssd = (sum_sq_diff / diff_count as f64).sqrt();
        let pnn50 = over_50 as f64 / diff_count as f64 * 100.0;

        let metrics = TimeDomainMetrics {
            mean_nn,
            sdnn,
            rmssd,
            pnn50,
        };
        Ok((metrics, histogram(nn_ms)))
    }
}

/// NN-interval histogram with fixed-width bins, as (bin center, count)
/// series.
fn histogram(nn_ms: &[f64]) -> PlotData {
    let min = nn_ms.iter().copied().fold(f64::INFINITY, f64::min);
    let max = nn_ms.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let bin_count = (((max - min) / HISTOGRAM_BIN_MS).floor() as usize + 1).max(1);

    let mut counts = vec![0usize; bin_count];
    for &value in nn_ms {
        let bin = (((value - min) / HISTOGRAM_BIN_MS) as usize).min(bin_count - 1);
        counts[bin] += 1;
    }

    let centers: Vec<f64> = (0..bin_count)
        .map(|bin| min + (bin as f64 + 0.5) * HISTOGRAM_BIN_MS)
        .collect();
    let counts: Vec<f64> = counts.into_iter().map(|c| c as f64).collect();
    PlotData::new("nn_hist").with_series("nn", centers, counts)
}
