//! Error types for pair analysis operations

use thiserror::Error;

/// Pair analysis specific errors
#[derive(Debug, Error)]
pub enum StockError {
    /// Price history could not be obtained for a symbol
    #[error("Unable to fetch data for {symbol}: {reason}. Please check the ticker symbols.")]
    DataUnavailable {
        symbol: String,
        reason: String,
    },

    /// The two series share no trading day
    #[error("No overlapping data available for {ticker1} and {ticker2}")]
    NoOverlap {
        ticker1: String,
        ticker2: String,
    },

    /// Too few rows (or values) to impute or fit a model
    #[error("Insufficient data: {reason}")]
    InsufficientData {
        reason: String,
    },

    /// Invalid ticker input
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Yahoo Finance API error
    #[error("Yahoo Finance error: {0}")]
    YahooFinanceError(String),

    /// Provider call exceeded the configured request timeout
    #[error("Request timed out while fetching {symbol}")]
    Timeout {
        symbol: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// History store error
    #[error("History error: {0}")]
    HistoryError(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl StockError {
    /// Whether the error is caused by the request itself and can be fixed by
    /// retrying with different tickers.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::DataUnavailable { .. }
                | Self::NoOverlap { .. }
                | Self::InsufficientData { .. }
                | Self::InvalidSymbol(_)
        )
    }

    /// HTTP status a collaborator should answer with
    pub fn status_code(&self) -> u16 {
        if self.is_user_facing() { 400 } else { 500 }
    }

    /// Message safe to show to an end user.
    ///
    /// Internal errors are reduced to their kind so provider payloads and
    /// file paths do not leak.
    pub fn public_message(&self) -> String {
        if self.is_user_facing() {
            return self.to_string();
        }

        let kind = match self {
            Self::YahooFinanceError(_) => "market data provider failure",
            Self::Timeout { .. } => "market data request timed out",
            Self::ConfigError(_) => "invalid configuration",
            Self::HistoryError(_) | Self::Io(_) => "storage failure",
            Self::JsonError(_) => "serialization failure",
            _ => "internal failure",
        };
        format!("An error occurred: {kind}")
    }
}

/// Result type alias for pair analysis operations
pub type Result<T> = std::result::Result<T, StockError>;
