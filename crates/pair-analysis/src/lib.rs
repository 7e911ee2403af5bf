//! Comparative analysis of two stock tickers
//!
//! Given two symbols, this crate fetches roughly 90 days of daily closes,
//! joins them on trading date, fills gaps with the column mean and then
//! produces:
//!
//! - Descriptive statistics for each ticker
//! - Chart specifications (line, scatter, histogram, correlation heatmap)
//!   as Plotly-compatible JSON
//! - A next-price prediction per ticker from a k-nearest-neighbours model
//!   that uses the other ticker's price as its only feature
//! - In-sample error metrics (MAE, MSE, RMSE, MAPE) for both models
//!
//! Completed analyses can be recorded in a [`HistoryStore`].
//!
//! # Architecture
//!
//! Each stage is a plain function or a small value type, wired together by
//! [`PairAnalysisEngine`]:
//!
//! - [`SeriesLoader`]: fetches both series through a [`PriceSource`] and inner-joins them
//! - [`impute_mean`]: fills missing cells
//! - [`describe`]: per-ticker statistics
//! - [`PairModels`]: the two cross-ticker k-NN regressors
//! - [`evaluate_pair`]: error metrics
//! - [`build_charts`]: chart specifications
//!
//! # Example
//!
//! ```rust,ignore
//! use pair_analysis::{AnalysisConfig, PairAnalysisEngine};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Arc::new(AnalysisConfig::builder().with_env().build()?);
//!     let engine = PairAnalysisEngine::yahoo(config);
//!
//!     let result = engine.analyze("AAPL", "MSFT").await?;
//!     println!("{}", result.summary());
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod charts;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod imputer;
pub mod loader;
pub mod metrics;
pub mod predictor;
pub mod series;
pub mod service;
pub mod statistics;

// Re-export main types for convenience
pub use api::YahooFinanceClient;
pub use cache::CachedPriceSource;
pub use charts::{ChartSet, ChartSpec, build_charts};
pub use config::{AnalysisConfig, AnalysisConfigBuilder};
pub use engine::{AnalysisResult, PairAnalysisEngine, PerTicker, analyze_table};
pub use error::{Result, StockError};
pub use history::{AnalysisRecord, HistoryStore, JsonlHistoryStore, MemoryHistoryStore};
pub use imputer::impute_mean;
pub use loader::{PriceSource, SeriesLoader};
pub use metrics::{MetricsResult, evaluate_pair};
pub use predictor::{PairModels, PredictionResult};
pub use series::{AlignedTable, ImputedTable, PricePoint, PriceSeries, Side};
pub use service::AnalysisService;
pub use statistics::{ColumnStatistics, StatisticsReport, describe};
