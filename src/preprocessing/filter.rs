//! Default artifact filter: rolling-median ratio criterion.
//!
//! An interval is kept when it lies within a configurable ratio of the
//! median of its local neighborhood. Ectopic beats, missed detections and
//! spurious extra detections all land far from the local median, so this
//! single criterion covers the common artifact shapes while staying
//! cheap enough for long recordings.

use anyhow::{anyhow, Result};
use log::trace;
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};

use crate::config::ParamProfile;
use crate::stages::{BeatSeries, FilteredSeries, IntervalFilter, PlotData};

/// Rolling-median artifact filter.
#[derive(Debug, Clone, Copy)]
pub struct MedianRatioFilter {
    /// Neighborhood size in beats (both sides of the tested interval).
    pub window: usize,
    /// Maximum tolerated deviation from the local median, as a fraction
    /// of the median.
    pub ratio: f64,
}

impl Default for MedianRatioFilter {
    fn default() -> Self {
        Self {
            window: 11,
            ratio: 0.2,
        }
    }
}

impl MedianRatioFilter {
    /// Effective (window, ratio) after applying a parameter profile.
    ///
    /// Recognized override names: `filter.window`, `filter.ratio`.
    /// Unknown named profiles fall back to the configured defaults.
    fn resolve(&self, params: &ParamProfile) -> Result<(usize, f64)> {
        let mut window = self.window;
        let mut ratio = self.ratio;
        match params {
            ParamProfile::Named(name) => {
                if name != "default" {
                    trace!("no filter profile named '{name}', using defaults");
                }
            }
            ParamProfile::Overrides(overrides) => {
                for (name, value) in overrides {
                    match name.as_str() {
                        "filter.window" => {
                            if *value < 1.0 {
                                return Err(anyhow!(
                                    "filter.window must be at least 1, got {value}"
                                ));
                            }
                            window = *value as usize;
                        }
                        "filter.ratio" => {
                            if *value <= 0.0 {
                                return Err(anyhow!(
                                    "filter.ratio must be positive, got {value}"
                                ));
                            }
                            ratio = *value;
                        }
                        _ => {}
                    }
                }
            }
        }
        Ok((window, ratio))
    }
}

impl IntervalFilter for MedianRatioFilter {
    fn filter(&self, raw: &BeatSeries, params: &ParamProfile) -> Result<FilteredSeries> {
        let (window, ratio) = self.resolve(params)?;

        if raw.intervals_ms.is_empty() {
            return Ok(FilteredSeries {
                intervals_ms: Vec::new(),
                onsets_s: Vec::new(),
                plot: PlotData::new("filtering"),
            });
        }
        if raw.intervals_ms.len() != raw.onsets_s.len() {
            return Err(anyhow!(
                "raw intervals and onsets differ in length ({} vs {})",
                raw.intervals_ms.len(),
                raw.onsets_s.len()
            ));
        }

        let medians = rolling_median(&raw.intervals_ms, window);
        let mut intervals_ms = Vec::with_capacity(raw.intervals_ms.len());
        let mut onsets_s = Vec::with_capacity(raw.onsets_s.len());
        for ((&value, &onset), &median) in raw
            .intervals_ms
            .iter()
            .zip(&raw.onsets_s)
            .zip(&medians)
        {
            if (value - median).abs() <= ratio * median {
                intervals_ms.push(value);
                onsets_s.push(onset);
            }
        }
        trace!(
            "median filter kept {}/{} intervals (window {window}, ratio {ratio})",
            intervals_ms.len(),
            raw.intervals_ms.len()
        );

        let plot = PlotData::new("filtering")
            .with_series("raw", raw.onsets_s.clone(), raw.intervals_ms.clone())
            .with_series("median", raw.onsets_s.clone(), medians)
            .with_series("accepted", onsets_s.clone(), intervals_ms.clone());

        Ok(FilteredSeries {
            intervals_ms,
            onsets_s,
            plot,
        })
    }
}

/// Centered rolling median, shrinking the neighborhood at the edges.
fn rolling_median(signal: &[f64], window: usize) -> Vec<f64> {
    let back = window / 2;
    let fwd = window - back;
    signal
        .par_iter()
        .enumerate()
        .map(|(idx, _)| {
            let start = idx.saturating_sub(back);
            let end = signal.len().min(idx + fwd);
            let mut neighborhood = signal[start..end].to_vec();
            neighborhood.sort_by(|a, b| a.total_cmp(b));
            let mid = neighborhood.len() / 2;
            if neighborhood.len() % 2 == 1 {
                neighborhood[mid]
            } else {
                (neighborhood[mid - 1] + neighborhood[mid]) / 2.0
            }
        })
        .collect()
}
