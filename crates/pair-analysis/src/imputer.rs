//! Column-mean imputation of missing cells

use crate::error::{Result, StockError};
use crate::series::{AlignedTable, ImputedTable, Side};

/// Replace every missing cell with the mean of the non-missing values of the
/// same column. Fails when a column has no value at all.
pub fn impute_mean(table: AlignedTable) -> Result<ImputedTable> {
    let missing = table.missing_count();
    let means = [column_mean(&table, Side::First)?, column_mean(&table, Side::Second)?];

    if missing > 0 {
        tracing::debug!(
            "Imputing {} missing cells (means: {:.4}, {:.4})",
            missing,
            means[0],
            means[1]
        );
    }

    let (symbols, dates, [first, second]) = table.into_parts();
    let fill = |column: Vec<Option<f64>>, mean: f64| -> Vec<f64> {
        column.into_iter().map(|v| v.unwrap_or(mean)).collect()
    };

    Ok(ImputedTable::from_parts(
        symbols,
        dates,
        [fill(first, means[0]), fill(second, means[1])],
    ))
}

fn column_mean(table: &AlignedTable, side: Side) -> Result<f64> {
    let (sum, count) = table
        .column(side)
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        return Err(StockError::InsufficientData {
            reason: format!("no valid prices for {}", table.symbol(side)),
        });
    }

    Ok(sum / count as f64)
}
