//! Configuration for pair analysis operations

use crate::error::{Result, StockError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Longest lookback accepted, matching Yahoo's "max" range of 100 years
pub const MAX_LOOKBACK_DAYS: u32 = 36_500;

/// Configuration for pair analysis operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Calendar days of history fetched, ending now
    pub lookback_days: u32,

    /// Number of neighbours used by the k-NN regressors
    pub neighbors: usize,

    /// Smallest aligned table accepted for modelling
    pub min_rows: usize,

    /// Use split/dividend adjusted closes instead of raw closes
    pub use_adjusted_close: bool,

    /// Upper bound for a single provider fetch
    pub request_timeout: Duration,

    /// Lifetime of cached price series, `None` disables caching
    pub cache_ttl: Option<Duration>,

    /// JSON-lines file the analysis history is appended to
    pub history_path: Option<PathBuf>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            lookback_days: 90,
            neighbors: 5,
            min_rows: 5,
            use_adjusted_close: true,
            request_timeout: Duration::from_secs(30),
            cache_ttl: None,
            history_path: None,
        }
    }
}

impl AnalysisConfig {
    /// Create a new configuration builder
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.lookback_days == 0 {
            return Err(StockError::ConfigError(
                "lookback_days must be greater than 0".to_string(),
            ));
        }

        if self.lookback_days > MAX_LOOKBACK_DAYS {
            return Err(StockError::ConfigError(format!(
                "lookback_days must be at most {MAX_LOOKBACK_DAYS}, got {}",
                self.lookback_days
            )));
        }

        if self.neighbors == 0 {
            return Err(StockError::ConfigError(
                "neighbors must be greater than 0".to_string(),
            ));
        }

        if self.min_rows < self.neighbors {
            return Err(StockError::ConfigError(format!(
                "min_rows ({}) must be at least neighbors ({})",
                self.min_rows, self.neighbors
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(StockError::ConfigError(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for AnalysisConfig
#[derive(Debug, Default)]
pub struct AnalysisConfigBuilder {
    lookback_days: Option<u32>,
    neighbors: Option<usize>,
    min_rows: Option<usize>,
    use_adjusted_close: Option<bool>,
    request_timeout: Option<Duration>,
    cache_ttl: Option<Duration>,
    history_path: Option<PathBuf>,
}

impl AnalysisConfigBuilder {
    /// Set the lookback window in calendar days
    pub fn lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = Some(days);
        self
    }

    /// Set k for the k-NN regressors
    pub fn neighbors(mut self, k: usize) -> Self {
        self.neighbors = Some(k);
        self
    }

    /// Set the minimum accepted row count
    pub fn min_rows(mut self, rows: usize) -> Self {
        self.min_rows = Some(rows);
        self
    }

    /// Choose adjusted or raw closing prices
    pub fn use_adjusted_close(mut self, adjusted: bool) -> Self {
        self.use_adjusted_close = Some(adjusted);
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Enable the price series cache with the given lifetime
    pub fn cache_ttl(mut self, duration: Duration) -> Self {
        self.cache_ttl = Some(duration);
        self
    }

    /// Set the history log location
    pub fn history_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.history_path = Some(path.into());
        self
    }

    /// Load overrides from `STOCK_PAIR_*` environment variables.
    ///
    /// Unparseable values are ignored.
    pub fn with_env(mut self) -> Self {
        if let Some(days) = env_parse("STOCK_PAIR_LOOKBACK_DAYS") {
            self.lookback_days = Some(days);
        }
        if let Some(k) = env_parse("STOCK_PAIR_NEIGHBORS") {
            self.neighbors = Some(k);
        }
        if let Some(secs) = env_parse::<u64>("STOCK_PAIR_CACHE_TTL_SECS") {
            self.cache_ttl = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Ok(path) = std::env::var("STOCK_PAIR_HISTORY_PATH") {
            self.history_path = Some(PathBuf::from(path));
        }
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AnalysisConfig> {
        let defaults = AnalysisConfig::default();
        let neighbors = self.neighbors.unwrap_or(defaults.neighbors);

        let config = AnalysisConfig {
            lookback_days: self.lookback_days.unwrap_or(defaults.lookback_days),
            neighbors,
            // min_rows follows k unless set explicitly
            min_rows: self.min_rows.unwrap_or(neighbors),
            use_adjusted_close: self.use_adjusted_close.unwrap_or(defaults.use_adjusted_close),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            cache_ttl: self.cache_ttl,
            history_path: self.history_path,
        };

        config.validate()?;
        Ok(config)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.trim().parse().ok()
}
