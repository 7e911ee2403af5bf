//! Yahoo Finance API client

use crate::error::{Result, StockError};
use crate::loader::PriceSource;
use crate::series::{PricePoint, PriceSeries};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use yahoo_finance_api as yahoo;

/// Yahoo Finance API client
#[derive(Debug, Clone)]
pub struct YahooFinanceClient {
    use_adjusted_close: bool,
}

/// Daily bar as returned by Yahoo, stamped in the exchange's local offset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub timestamp: DateTime<FixedOffset>,
    pub close: f64,
    pub adjclose: f64,
}

impl Quote {
    /// Trading session the bar belongs to
    pub fn trading_date(&self) -> chrono::NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Exchange offset from the response's `gmtoffset`, falling back to UTC
fn exchange_offset(symbol: &str, gmtoffset: Option<i32>) -> FixedOffset {
    let utc = Utc.fix();
    match gmtoffset {
        Some(secs) => FixedOffset::east_opt(secs).unwrap_or_else(|| {
            tracing::warn!("Ignoring invalid gmtoffset {} for {}", secs, symbol);
            utc
        }),
        None => utc,
    }
}

impl YahooFinanceClient {
    /// Create a new Yahoo Finance client reading adjusted closes
    pub fn new() -> Self {
        Self {
            use_adjusted_close: true,
        }
    }

    /// Choose between adjusted and raw closes
    pub fn with_adjusted_close(mut self, adjusted: bool) -> Self {
        self.use_adjusted_close = adjusted;
        self
    }

    /// Get historical quotes for a symbol
    pub async fn get_historical_quotes(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Quote>> {
        let provider = yahoo::YahooConnector::new()
            .map_err(|e| StockError::YahooFinanceError(e.to_string()))?;

        // Convert chrono DateTime to time OffsetDateTime
        let start_odt = OffsetDateTime::from_unix_timestamp(start.timestamp())
            .map_err(|e| StockError::YahooFinanceError(format!("Invalid start timestamp: {e}")))?;
        let end_odt = OffsetDateTime::from_unix_timestamp(end.timestamp())
            .map_err(|e| StockError::YahooFinanceError(format!("Invalid end timestamp: {e}")))?;

        let response = provider
            .get_quote_history(symbol, start_odt, end_odt)
            .await
            .map_err(|e| StockError::YahooFinanceError(e.to_string()))?;

        let quotes = response
            .quotes()
            .map_err(|e| StockError::YahooFinanceError(e.to_string()))?;

        // daily bars are keyed by the exchange's trading date, not the UTC date
        let gmtoffset = match response.metadata() {
            Ok(meta) => Some(meta.gmtoffset),
            Err(e) => {
                tracing::warn!("No exchange metadata for {}, dating bars in UTC: {}", symbol, e);
                None
            }
        };
        let offset = exchange_offset(symbol, gmtoffset);

        Ok(quotes
            .iter()
            .filter_map(|q| {
                let timestamp = DateTime::from_timestamp(q.timestamp as i64, 0)?;
                Some(Quote {
                    symbol: symbol.to_string(),
                    timestamp: timestamp.with_timezone(&offset),
                    close: q.close,
                    adjclose: q.adjclose,
                })
            })
            .collect())
    }

    fn to_series(&self, symbol: &str, quotes: &[Quote]) -> PriceSeries {
        PriceSeries::new(
            symbol,
            quotes.iter().map(|q| {
                let close = if self.use_adjusted_close { q.adjclose } else { q.close };
                PricePoint::new(q.trading_date(), close)
            }),
        )
    }
}

impl Default for YahooFinanceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceSource for YahooFinanceClient {
    async fn daily_closes(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<PriceSeries> {
        tracing::debug!("Requesting Yahoo history for {}", symbol);

        // Yahoo answers unknown symbols with an error rather than an empty chart
        let quotes = self
            .get_historical_quotes(symbol, start, end)
            .await
            .map_err(|e| match e {
                StockError::YahooFinanceError(reason) => StockError::DataUnavailable {
                    symbol: symbol.to_string(),
                    reason,
                },
                other => other,
            })?;

        Ok(self.to_series(symbol, &quotes))
    }
}
