//! Descriptive statistics per ticker column

use crate::engine::PerTicker;
use crate::series::{ImputedTable, Side};
use serde::{Deserialize, Serialize};

/// The eight summary statistics reported for one column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnStatistics {
    pub count: usize,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Sample variance (divisor n - 1), 0 for a single value
    pub variance: f64,
    pub std_deviation: f64,
}

/// Statistics keyed by ticker, in request order
pub type StatisticsReport = PerTicker<ColumnStatistics>;

impl ColumnStatistics {
    /// Compute statistics for a non-empty column of finite values
    pub fn from_values(values: &[f64]) -> Self {
        let count = values.len();
        let n = count as f64;
        let sum: f64 = values.iter().sum();
        let mean = if count > 0 { sum / n } else { f64::NAN };

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let variance = if count > 1 {
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)
        } else {
            0.0
        };

        Self {
            count,
            sum,
            min,
            max,
            mean,
            median: median(values),
            variance,
            std_deviation: variance.sqrt(),
        }
    }
}

/// Compute the report for both columns of a table
pub fn describe(table: &ImputedTable) -> StatisticsReport {
    PerTicker::from_fn(
        table.symbol(Side::First),
        table.symbol(Side::Second),
        |side| ColumnStatistics::from_values(table.column(side)),
    )
}

/// Median with linear interpolation between the two middle values
fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
