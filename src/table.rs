//! Ordered result tables.
//!
//! [`MetricsTable`] collects one wide row per successfully processed
//! window; [`StatsTable`] holds one labeled row per cross-window summary
//! statistic. Both share the same metric column schema, fixed at compile
//! time by the metric record types.

use std::fmt;

use anyhow::{bail, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::metrics::{
    FragmentationMetrics, FrequencyDomainMetrics, IntervalCounts, MetricRecord, NonlinearMetrics,
    TimeDomainMetrics,
};

/// One wide table row: interval counts plus all four metric families for
/// a single window.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetricsRow {
    /// 1-based window number. Not necessarily contiguous across rows when
    /// windows were skipped.
    pub window: usize,
    pub counts: IntervalCounts,
    pub time: TimeDomainMetrics,
    pub frequency: FrequencyDomainMetrics,
    pub nonlinear: NonlinearMetrics,
    pub fragmentation: FragmentationMetrics,
}

impl MetricsRow {
    /// Column labels of the full row schema, counts first, then the metric
    /// families in stage order.
    pub fn columns() -> Vec<&'static str> {
        let mut columns = Vec::new();
        columns.extend(IntervalCounts::columns());
        columns.extend(TimeDomainMetrics::columns());
        columns.extend(FrequencyDomainMetrics::columns());
        columns.extend(NonlinearMetrics::columns());
        columns.extend(FragmentationMetrics::columns());
        columns
    }

    /// Cell values in [`columns`](MetricsRow::columns) order.
    pub fn values(&self) -> Vec<f64> {
        let mut values = Vec::new();
        values.extend(self.counts.values());
        values.extend(self.time.values());
        values.extend(self.frequency.values());
        values.extend(self.nonlinear.values());
        values.extend(self.fragmentation.values());
        values
    }
}

/// Append-only table of per-window metrics, ordered by window number.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetricsTable {
    rows: Vec<MetricsRow>,
    description: Option<String>,
}

impl MetricsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one row. Rows must arrive in strictly increasing window
    /// order; the executor processes windows in index order, so a
    /// violation indicates a broken aggregation path.
    pub fn append(&mut self, row: MetricsRow) -> Result<()> {
        if let Some(last) = self.rows.last() {
            if row.window <= last.window {
                bail!(
                    "rows must be appended in increasing window order \
                     (got window {} after {})",
                    row.window,
                    last.window
                );
            }
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn rows(&self) -> &[MetricsRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All values of one column, in row order.
    pub fn column_values(&self, column_index: usize) -> Vec<f64> {
        self.rows
            .iter()
            .map(|row| row.values()[column_index])
            .collect()
    }

    /// Attaches a human-readable description, typically the record
    /// identifier; set once when the run completes.
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// One row of a [`StatsTable`]: a statistic label plus one value per
/// metric column.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StatsRow {
    pub statistic: String,
    pub values: Vec<f64>,
}

/// Read-only cross-window summary, computed exactly once from the final
/// [`MetricsTable`].
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StatsTable {
    rows: Vec<StatsRow>,
}

impl StatsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one statistic row. The value vector must cover every metric
    /// column of the row schema.
    pub fn push(&mut self, statistic: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let expected = MetricsRow::columns().len();
        if values.len() != expected {
            bail!(
                "statistic row must have {expected} values, got {}",
                values.len()
            );
        }
        self.rows.push(StatsRow {
            statistic: statistic.into(),
            values,
        });
        Ok(())
    }

    pub fn rows(&self) -> &[StatsRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

const CELL_WIDTH: usize = 11;

fn write_header(f: &mut fmt::Formatter<'_>, label: &str) -> fmt::Result {
    write!(f, "{label:>CELL_WIDTH$}")?;
    for column in MetricsRow::columns() {
        write!(f, " {column:>CELL_WIDTH$}")?;
    }
    writeln!(f)
}

fn write_cells(f: &mut fmt::Formatter<'_>, values: &[f64]) -> fmt::Result {
    for value in values {
        write!(f, " {value:>CELL_WIDTH$.3}")?;
    }
    writeln!(f)
}

impl fmt::Display for MetricsTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(description) = &self.description {
            writeln!(f, "{description}")?;
        }
        write_header(f, "window")?;
        for row in &self.rows {
            write!(f, "{:>CELL_WIDTH$}", row.window)?;
            write_cells(f, &row.values())?;
        }
        Ok(())
    }
}

impl fmt::Display for StatsTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_header(f, "statistic")?;
        for row in &self.rows {
            write!(f, "{:>CELL_WIDTH$}", row.statistic)?;
            write_cells(f, &row.values)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests_support {
    use super::*;

    pub(crate) fn sample_row(window: usize) -> MetricsRow {
        MetricsRow {
            window,
            counts: IntervalCounts {
                raw_count: 600,
                clean_count: 590,
            },
            time: TimeDomainMetrics {
                mean_nn: 900.0,
                sdnn: 40.0,
                rmssd: 30.0,
                pnn50: 12.0,
            },
            frequency: FrequencyDomainMetrics {
                vlf_power: 500.0,
                lf_power: 700.0,
                hf_power: 350.0,
                total_power: 1550.0,
                lf_hf_ratio: 2.0,
                lf_peak_hz: 0.1,
                hf_peak_hz: 0.25,
            },
            nonlinear: NonlinearMetrics {
                sd1: 21.0,
                sd2: 52.0,
                sd_ratio: 21.0 / 52.0,
                dfa_alpha1: 1.05,
                dfa_alpha2: 0.95,
                sampen: 1.4,
            },
            fragmentation: FragmentationMetrics {
                pip: 35.0,
                ials: 0.4,
                pss: 22.0,
                pas: 8.0,
            },
        }
    }
}
