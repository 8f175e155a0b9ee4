//! Fixed-schema metric records, one struct per metric family.
//!
//! Every stage always returns the full field set of its family; a field
//! that could not be computed is `NaN`, never absent. The wide table row
//! is the field union of the families, established at the type level by
//! [`MetricRecord`] rather than by runtime schema merging.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Column contract of one metric family.
///
/// `columns()` and `values()` must have the same length and order for
/// every instance, which fixes the table schema at compile time.
pub trait MetricRecord {
    /// Column labels of this family, in row order.
    fn columns() -> &'static [&'static str];
    /// Field values in the same order as [`columns`](MetricRecord::columns).
    fn values(&self) -> Vec<f64>;
}

/// Time-domain HRV metrics over one window, in milliseconds unless noted.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeDomainMetrics {
    /// Mean NN interval.
    pub mean_nn: f64,
    /// Standard deviation of NN intervals.
    pub sdnn: f64,
    /// Root mean square of successive differences.
    pub rmssd: f64,
    /// Percentage of successive differences exceeding 50 ms.
    pub pnn50: f64,
}

impl MetricRecord for TimeDomainMetrics {
    fn columns() -> &'static [&'static str] {
        &["mean_nn", "sdnn", "rmssd", "pnn50"]
    }

    fn values(&self) -> Vec<f64> {
        vec![self.mean_nn, self.sdnn, self.rmssd, self.pnn50]
    }
}

/// Frequency-domain HRV metrics over one window.
///
/// Band powers are in ms²; peak frequencies in Hz. Bands follow the
/// conventional VLF 0.003–0.04, LF 0.04–0.15, HF 0.15–0.4 Hz split.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrequencyDomainMetrics {
    pub vlf_power: f64,
    pub lf_power: f64,
    pub hf_power: f64,
    pub total_power: f64,
    pub lf_hf_ratio: f64,
    pub lf_peak_hz: f64,
    pub hf_peak_hz: f64,
}

impl MetricRecord for FrequencyDomainMetrics {
    fn columns() -> &'static [&'static str] {
        &[
            "vlf_power",
            "lf_power",
            "hf_power",
            "total_power",
            "lf_hf_ratio",
            "lf_peak_hz",
            "hf_peak_hz",
        ]
    }

    fn values(&self) -> Vec<f64> {
        vec![
            self.vlf_power,
            self.lf_power,
            self.hf_power,
            self.total_power,
            self.lf_hf_ratio,
            self.lf_peak_hz,
            self.hf_peak_hz,
        ]
    }
}

/// Nonlinear HRV metrics over one window.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NonlinearMetrics {
    /// Poincaré short-axis dispersion.
    pub sd1: f64,
    /// Poincaré long-axis dispersion.
    pub sd2: f64,
    /// SD1 / SD2.
    pub sd_ratio: f64,
    /// Short-scale DFA exponent (4–16 beats).
    pub dfa_alpha1: f64,
    /// Long-scale DFA exponent (16–64 beats).
    pub dfa_alpha2: f64,
    /// Sample entropy (m = 2, r = 0.2·SD).
    pub sampen: f64,
}

impl MetricRecord for NonlinearMetrics {
    fn columns() -> &'static [&'static str] {
        &["sd1", "sd2", "sd_ratio", "dfa_alpha1", "dfa_alpha2", "sampen"]
    }

    fn values(&self) -> Vec<f64> {
        vec![
            self.sd1,
            self.sd2,
            self.sd_ratio,
            self.dfa_alpha1,
            self.dfa_alpha2,
            self.sampen,
        ]
    }
}

/// Heart-rate fragmentation metrics (Costa et al., 2017), all percentages
/// except `ials`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FragmentationMetrics {
    /// Percentage of inflection points in the NN series.
    pub pip: f64,
    /// Inverse of the average acceleration/deceleration segment length.
    pub ials: f64,
    /// Percentage of NN intervals in short (< 3 beat) segments.
    pub pss: f64,
    /// Percentage of NN intervals in alternation segments of 4+ beats.
    pub pas: f64,
}

impl MetricRecord for FragmentationMetrics {
    fn columns() -> &'static [&'static str] {
        &["pip", "ials", "pss", "pas"]
    }

    fn values(&self) -> Vec<f64> {
        vec![self.pip, self.ials, self.pss, self.pas]
    }
}

/// Raw and clean beat counts for one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IntervalCounts {
    /// Beat intervals produced by the extractor.
    pub raw_count: usize,
    /// Intervals surviving artifact filtering.
    pub clean_count: usize,
}

impl MetricRecord for IntervalCounts {
    fn columns() -> &'static [&'static str] {
        &["raw_count", "clean_count"]
    }

    fn values(&self) -> Vec<f64> {
        vec![self.raw_count as f64, self.clean_count as f64]
    }
}
