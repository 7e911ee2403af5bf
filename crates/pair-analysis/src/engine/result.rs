//! Analysis result types

use crate::charts::ChartSet;
use crate::metrics::MetricsResult;
use crate::predictor::PredictionResult;
use crate::series::Side;
use crate::statistics::StatisticsReport;
use chrono::{DateTime, Utc};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;

/// A value for each of the two analysed tickers, in request order.
///
/// Serializes as a JSON object keyed by symbol: `{"AAPL": .., "MSFT": ..}`.
#[derive(Debug, Clone, PartialEq)]
pub struct PerTicker<T> {
    entries: [(String, T); 2],
}

impl<T> PerTicker<T> {
    pub fn new<A, B>(first: (A, T), second: (B, T)) -> Self
    where
        A: Into<String>,
        B: Into<String>,
    {
        Self {
            entries: [(first.0.into(), first.1), (second.0.into(), second.1)],
        }
    }

    /// Build both entries from a function of the table side
    pub fn from_fn(
        ticker1: impl Into<String>,
        ticker2: impl Into<String>,
        mut f: impl FnMut(Side) -> T,
    ) -> Self {
        let first = f(Side::First);
        let second = f(Side::Second);
        Self::new((ticker1.into(), first), (ticker2.into(), second))
    }

    /// Look up the entry for a symbol
    pub fn get(&self, symbol: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, value)| value)
    }

    pub fn side(&self, side: Side) -> &T {
        match side {
            Side::First => &self.entries[0].1,
            Side::Second => &self.entries[1].1,
        }
    }

    pub fn symbol(&self, side: Side) -> &str {
        match side {
            Side::First => &self.entries[0].0,
            Side::Second => &self.entries[1].0,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(s, v)| (s.as_str(), v))
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> PerTicker<U> {
        PerTicker::new(
            (self.entries[0].0.clone(), f(&self.entries[0].1)),
            (self.entries[1].0.clone(), f(&self.entries[1].1)),
        )
    }
}

impl<T: Serialize> Serialize for PerTicker<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        for (symbol, value) in &self.entries {
            map.serialize_entry(symbol, value)?;
        }
        map.end()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for PerTicker<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct PerTickerVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for PerTickerVisitor<T> {
            type Value = PerTicker<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map with exactly two distinct tickers")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> std::result::Result<Self::Value, M::Error> {
                let mut entries: Vec<(String, T)> = Vec::with_capacity(2);
                while let Some((symbol, value)) = access.next_entry::<String, T>()? {
                    if entries.iter().any(|(s, _)| *s == symbol) {
                        return Err(de::Error::custom(format!("duplicate ticker {symbol}")));
                    }
                    entries.push((symbol, value));
                }

                let len = entries.len();
                let entries: [(String, T); 2] = entries
                    .try_into()
                    .map_err(|_| de::Error::invalid_length(len, &self))?;
                Ok(PerTicker { entries })
            }
        }

        deserializer.deserialize_map(PerTickerVisitor(PhantomData))
    }
}

/// Everything computed for one pair request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub ticker1: String,
    pub ticker2: String,
    pub statistics: StatisticsReport,
    pub charts: ChartSet,
    pub predictions: PerTicker<PredictionResult>,
    pub metrics: PerTicker<MetricsResult>,
    pub data_points: usize,
    /// Degenerate cases the caller should surface, e.g. undefined MAPE
    #[serde(default)]
    pub warnings: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl AnalysisResult {
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn summary(&self) -> String {
        let line = |side: Side| {
            let p = self.predictions.side(side);
            format!(
                "{} {:.2} -> {:.2}",
                self.predictions.symbol(side),
                p.current_price,
                p.predicted_price
            )
        };

        format!(
            "{} vs {} ({} days): {}; {}",
            self.ticker1,
            self.ticker2,
            self.data_points,
            line(Side::First),
            line(Side::Second)
        )
    }
}
