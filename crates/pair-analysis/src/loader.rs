//! Fetching and aligning the two price series of a request

use crate::config::AnalysisConfig;
use crate::error::{Result, StockError};
use crate::series::{AlignedTable, PriceSeries};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// A provider of daily closing prices
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Daily closes for `symbol` between `start` and `end`.
    ///
    /// An unknown symbol may yield either an error or an empty series.
    async fn daily_closes(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<PriceSeries>;
}

/// Trim and upper-case both tickers, rejecting blanks and identical pairs
pub fn normalize_pair(ticker1: &str, ticker2: &str) -> Result<(String, String)> {
    let ticker1 = ticker1.trim().to_uppercase();
    let ticker2 = ticker2.trim().to_uppercase();

    if ticker1.is_empty() || ticker2.is_empty() {
        return Err(StockError::InvalidSymbol(
            "Please provide both ticker symbols".to_string(),
        ));
    }
    if ticker1 == ticker2 {
        return Err(StockError::InvalidSymbol(format!(
            "{ticker1} cannot be compared with itself"
        )));
    }

    Ok((ticker1, ticker2))
}

/// Loads two series over the lookback window and inner-joins them
pub struct SeriesLoader {
    source: Arc<dyn PriceSource>,
    lookback: Duration,
    request_timeout: std::time::Duration,
}

impl SeriesLoader {
    pub fn new(source: Arc<dyn PriceSource>, config: &AnalysisConfig) -> Self {
        Self {
            source,
            lookback: Duration::days(i64::from(config.lookback_days)),
            request_timeout: config.request_timeout,
        }
    }

    /// Load the window ending now
    pub async fn load(&self, ticker1: &str, ticker2: &str) -> Result<AlignedTable> {
        self.load_until(ticker1, ticker2, Utc::now()).await
    }

    /// Load the window ending at `end`. Tickers are expected to be normalized.
    pub async fn load_until(
        &self,
        ticker1: &str,
        ticker2: &str,
        end: DateTime<Utc>,
    ) -> Result<AlignedTable> {
        let start = end.checked_sub_signed(self.lookback).ok_or_else(|| {
            StockError::ConfigError(format!(
                "lookback of {} days reaches before the earliest representable date",
                self.lookback.num_days()
            ))
        })?;

        let first = self.fetch(ticker1, start, end).await?;
        let second = self.fetch(ticker2, start, end).await?;

        let table = AlignedTable::inner_join(&first, &second)?;
        tracing::debug!(
            "Aligned {} ({} rows) and {} ({} rows) into {} rows",
            ticker1,
            first.len(),
            ticker2,
            second.len(),
            table.len()
        );
        Ok(table)
    }

    async fn fetch(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<PriceSeries> {
        tracing::debug!("Fetching {} from {} to {}", symbol, start, end);

        let series = tokio::time::timeout(
            self.request_timeout,
            self.source.daily_closes(symbol, start, end),
        )
        .await
        .map_err(|_| StockError::Timeout {
            symbol: symbol.to_string(),
        })??;

        if series.is_empty() {
            return Err(StockError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "no price history in the requested window".to_string(),
            });
        }

        Ok(series)
    }
}
