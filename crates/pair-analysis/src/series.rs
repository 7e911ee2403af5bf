//! Price series and the two-column tables built from them

use crate::error::{Result, StockError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One daily closing price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Daily closes for one symbol, strictly increasing by date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series from points in any order.
    ///
    /// When a date appears more than once the last point wins, so an intraday
    /// quote appended by the provider replaces the earlier bar.
    pub fn new(symbol: impl Into<String>, points: impl IntoIterator<Item = PricePoint>) -> Self {
        let by_date: BTreeMap<NaiveDate, f64> =
            points.into_iter().map(|p| (p.date, p.close)).collect();

        Self {
            symbol: symbol.into(),
            points: by_date
                .into_iter()
                .map(|(date, close)| PricePoint { date, close })
                .collect(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Which column of a two-ticker table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    First,
    Second,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::First, Side::Second];

    pub fn other(self) -> Self {
        match self {
            Side::First => Side::Second,
            Side::Second => Side::First,
        }
    }

    fn index(self) -> usize {
        match self {
            Side::First => 0,
            Side::Second => 1,
        }
    }
}

/// Two series inner-joined on date. Cells may be missing (`None`) when the
/// provider returned a non-finite close, but never both cells of one row.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedTable {
    symbols: [String; 2],
    dates: Vec<NaiveDate>,
    columns: [Vec<Option<f64>>; 2],
}

impl AlignedTable {
    /// Build a table from pre-aligned columns
    pub fn new(
        ticker1: impl Into<String>,
        ticker2: impl Into<String>,
        dates: Vec<NaiveDate>,
        first: Vec<Option<f64>>,
        second: Vec<Option<f64>>,
    ) -> Result<Self> {
        if first.len() != dates.len() || second.len() != dates.len() {
            return Err(StockError::Other(format!(
                "column lengths {} and {} do not match {} dates",
                first.len(),
                second.len(),
                dates.len()
            )));
        }
        if dates.windows(2).any(|w| w[0] >= w[1]) {
            return Err(StockError::Other(
                "dates must be strictly increasing".to_string(),
            ));
        }
        if let Some(i) = (0..dates.len()).find(|&i| first[i].is_none() && second[i].is_none()) {
            return Err(StockError::Other(format!(
                "row {} is missing both values",
                dates[i]
            )));
        }

        Ok(Self {
            symbols: [ticker1.into(), ticker2.into()],
            dates,
            columns: [first, second],
        })
    }

    /// Keep only the dates present in both series.
    ///
    /// Non-finite closes become missing cells; a date where both closes are
    /// non-finite is dropped. Fails with `NoOverlap` when no date is shared and
    /// with `InsufficientData` when every shared date was dropped.
    pub fn inner_join(first: &PriceSeries, second: &PriceSeries) -> Result<Self> {
        let lookup: BTreeMap<NaiveDate, f64> =
            second.points().iter().map(|p| (p.date, p.close)).collect();

        let mut dates = Vec::new();
        let mut left = Vec::new();
        let mut right = Vec::new();
        let mut shared = 0usize;

        for point in first.points() {
            let Some(&other) = lookup.get(&point.date) else {
                continue;
            };
            shared += 1;
            let a = finite(point.close);
            let b = finite(other);
            if a.is_none() && b.is_none() {
                continue;
            }
            dates.push(point.date);
            left.push(a);
            right.push(b);
        }

        if dates.is_empty() && shared > 0 {
            return Err(StockError::InsufficientData {
                reason: format!(
                    "{} and {} share {shared} trading days but none has a valid price",
                    first.symbol(),
                    second.symbol()
                ),
            });
        }

        if dates.is_empty() {
            return Err(StockError::NoOverlap {
                ticker1: first.symbol().to_string(),
                ticker2: second.symbol().to_string(),
            });
        }

        Ok(Self {
            symbols: [first.symbol().to_string(), second.symbol().to_string()],
            dates,
            columns: [left, right],
        })
    }

    pub fn symbol(&self, side: Side) -> &str {
        &self.symbols[side.index()]
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn column(&self, side: Side) -> &[Option<f64>] {
        &self.columns[side.index()]
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Number of missing cells across both columns
    pub fn missing_count(&self) -> usize {
        self.columns
            .iter()
            .map(|c| c.iter().filter(|v| v.is_none()).count())
            .sum()
    }

    pub(crate) fn into_parts(self) -> ([String; 2], Vec<NaiveDate>, [Vec<Option<f64>>; 2]) {
        (self.symbols, self.dates, self.columns)
    }
}

/// An aligned table with every cell filled
#[derive(Debug, Clone, PartialEq)]
pub struct ImputedTable {
    symbols: [String; 2],
    dates: Vec<NaiveDate>,
    columns: [Vec<f64>; 2],
}

impl ImputedTable {
    /// Build a table from complete columns
    pub fn new(
        ticker1: impl Into<String>,
        ticker2: impl Into<String>,
        dates: Vec<NaiveDate>,
        first: Vec<f64>,
        second: Vec<f64>,
    ) -> Result<Self> {
        let table = AlignedTable::new(
            ticker1,
            ticker2,
            dates,
            first.into_iter().map(finite).collect(),
            second.into_iter().map(finite).collect(),
        )?;
        if table.missing_count() > 0 {
            return Err(StockError::Other(
                "imputed columns must contain only finite values".to_string(),
            ));
        }

        let (symbols, dates, [first, second]) = table.into_parts();
        Ok(Self::from_parts(
            symbols,
            dates,
            [first.into_iter().flatten().collect(), second.into_iter().flatten().collect()],
        ))
    }

    pub(crate) fn from_parts(
        symbols: [String; 2],
        dates: Vec<NaiveDate>,
        columns: [Vec<f64>; 2],
    ) -> Self {
        Self {
            symbols,
            dates,
            columns,
        }
    }

    pub fn symbol(&self, side: Side) -> &str {
        &self.symbols[side.index()]
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn column(&self, side: Side) -> &[f64] {
        &self.columns[side.index()]
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Value of the latest row for one side
    pub fn last(&self, side: Side) -> Option<f64> {
        self.column(side).last().copied()
    }
}

impl From<ImputedTable> for AlignedTable {
    fn from(table: ImputedTable) -> Self {
        let [first, second] = table.columns;
        Self {
            symbols: table.symbols,
            dates: table.dates,
            columns: [
                first.into_iter().map(Some).collect(),
                second.into_iter().map(Some).collect(),
            ],
        }
    }
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
