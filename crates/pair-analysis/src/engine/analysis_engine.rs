//! Pair analysis engine - runs the full pipeline for one request

use crate::api::YahooFinanceClient;
use crate::cache::CachedPriceSource;
use crate::charts::build_charts;
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::imputer::impute_mean;
use crate::loader::{PriceSource, SeriesLoader, normalize_pair};
use crate::metrics::evaluate_pair;
use crate::predictor::PairModels;
use crate::series::{AlignedTable, Side};
use crate::statistics::describe;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::result::AnalysisResult;

/// Fetches two tickers and produces statistics, charts, predictions and
/// metrics. Holds no per-request state, so one engine serves every request.
pub struct PairAnalysisEngine {
    loader: SeriesLoader,
    config: Arc<AnalysisConfig>,
}

impl PairAnalysisEngine {
    /// Create an engine over any price source, adding the series cache when
    /// the configuration enables it
    pub fn new(source: Arc<dyn PriceSource>, config: Arc<AnalysisConfig>) -> Self {
        let source: Arc<dyn PriceSource> = match config.cache_ttl {
            Some(ttl) => Arc::new(CachedPriceSource::new(source, ttl)),
            None => source,
        };

        Self {
            loader: SeriesLoader::new(source, &config),
            config,
        }
    }

    /// Create an engine backed by Yahoo Finance
    pub fn yahoo(config: Arc<AnalysisConfig>) -> Self {
        let client = YahooFinanceClient::new().with_adjusted_close(config.use_adjusted_close);
        Self::new(Arc::new(client), config)
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze two tickers over the lookback window ending now
    pub async fn analyze(&self, ticker1: &str, ticker2: &str) -> Result<AnalysisResult> {
        self.analyze_until(ticker1, ticker2, Utc::now()).await
    }

    /// Analyze two tickers over the lookback window ending at `end`
    pub async fn analyze_until(
        &self,
        ticker1: &str,
        ticker2: &str,
        end: DateTime<Utc>,
    ) -> Result<AnalysisResult> {
        let (ticker1, ticker2) = normalize_pair(ticker1, ticker2)?;
        tracing::info!("Starting pair analysis for {} vs {}", ticker1, ticker2);

        let table = self.loader.load_until(&ticker1, &ticker2, end).await?;
        let result = analyze_table(table, &self.config)?;

        tracing::info!("Finished pair analysis: {}", result.summary());
        Ok(result)
    }
}

/// Run every computation stage on an already aligned table
pub fn analyze_table(table: AlignedTable, config: &AnalysisConfig) -> Result<AnalysisResult> {
    let table = impute_mean(table)?;
    let models = PairModels::fit(&table, config.neighbors, config.min_rows)?;

    let mut result = AnalysisResult {
        ticker1: table.symbol(Side::First).to_string(),
        ticker2: table.symbol(Side::Second).to_string(),
        statistics: describe(&table),
        charts: build_charts(&table),
        predictions: models.predictions(),
        metrics: evaluate_pair(&models),
        data_points: table.len(),
        warnings: Vec::new(),
        timestamp: Utc::now(),
    };

    let undefined: Vec<String> = result
        .metrics
        .iter()
        .filter(|(_, m)| !m.mape_defined())
        .map(|(symbol, _)| symbol.to_string())
        .collect();
    for symbol in undefined {
        result.add_warning(format!(
            "MAPE is undefined for {symbol} because a closing price is zero"
        ));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StockError;
    use crate::loader::MockPriceSource;
    use crate::series::{PricePoint, PriceSeries};
    use chrono::{Duration, NaiveDate, TimeZone};
    use std::time::Duration as StdDuration;

    fn end() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 21, 0, 0).unwrap()
    }

    fn linear(symbol: &str, days: i64, f: impl Fn(i64) -> f64) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        PriceSeries::new(
            symbol,
            (0..days).map(|i| PricePoint::new(start + Duration::days(i), f(i))),
        )
    }

    fn engine_with(source: MockPriceSource, config: AnalysisConfig) -> PairAnalysisEngine {
        PairAnalysisEngine::new(Arc::new(source), Arc::new(config))
    }

    fn pair_source(first: PriceSeries, second: PriceSeries) -> MockPriceSource {
        let mut source = MockPriceSource::new();
        let a = first.symbol().to_string();
        source
            .expect_daily_closes()
            .withf(move |symbol, _, _| symbol == a)
            .returning(move |_, _, _| Ok(first.clone()));
        let b = second.symbol().to_string();
        source
            .expect_daily_closes()
            .withf(move |symbol, _, _| symbol == b)
            .returning(move |_, _, _| Ok(second.clone()));
        source
    }

    #[tokio::test]
    async fn test_linear_relationship_is_learned() {
        let source = pair_source(
            linear("AAA", 90, |i| 100.0 + i as f64),
            linear("BBB", 90, |i| 2.0 * (100.0 + i as f64)),
        );
        let engine = engine_with(source, AnalysisConfig::default());

        let result = engine.analyze_until("aaa", "bbb", end()).await.unwrap();
        assert_eq!(result.ticker1, "AAA");
        assert_eq!(result.data_points, 90);
        assert!(result.warnings.is_empty());

        for (symbol, metrics) in result.metrics.iter() {
            assert!(metrics.rmse < 1.0, "{symbol} rmse {}", metrics.rmse);
            assert!(metrics.mape.unwrap() < 0.1, "{symbol} mape {:?}", metrics.mape);
            assert_eq!(metrics.rmse, metrics.mse.sqrt());
        }

        let a = result.predictions.get("AAA").unwrap();
        assert_eq!(a.current_price, 189.0);
        assert!((a.predicted_price - 187.0).abs() < 1e-9);

        let stats = result.statistics.get("BBB").unwrap();
        assert_eq!(stats.count, 90);
        assert_eq!(stats.min, 200.0);
        assert_eq!(stats.max, 378.0);
    }

    #[tokio::test]
    async fn test_result_serializes_with_all_sections() {
        let source = pair_source(
            linear("AAA", 30, |i| 50.0 + (i as f64 * 0.4).sin()),
            linear("BBB", 30, |i| 20.0 + (i as f64 * 0.2).cos()),
        );
        let engine = engine_with(source, AnalysisConfig::default());
        let result = engine.analyze_until("AAA", "BBB", end()).await.unwrap();

        let json = serde_json::to_value(&result).unwrap();
        for key in ["statistics", "charts", "predictions", "metrics", "data_points"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["data_points"], 30);
        assert!(json["predictions"]["AAA"]["predicted_price"].is_number());
        assert!(json["charts"]["correlation_heatmap"]["data"].is_array());
    }

    #[tokio::test]
    async fn test_four_common_rows_is_insufficient() {
        let source = pair_source(
            linear("AAA", 4, |i| 10.0 + i as f64),
            linear("BBB", 4, |i| 20.0 + i as f64),
        );
        let engine = engine_with(source, AnalysisConfig::default());

        let err = engine.analyze_until("AAA", "BBB", end()).await.unwrap_err();
        assert!(matches!(err, StockError::InsufficientData { .. }));
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_no_common_dates_is_no_overlap() {
        let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let late = PriceSeries::new(
            "BBB",
            (0..10).map(|i| PricePoint::new(start + Duration::days(i), 5.0)),
        );
        let source = pair_source(linear("AAA", 10, |_| 1.0), late);
        let engine = engine_with(source, AnalysisConfig::default());

        let err = engine.analyze_until("AAA", "BBB", end()).await.unwrap_err();
        assert!(matches!(err, StockError::NoOverlap { .. }));
    }

    #[tokio::test]
    async fn test_identical_tickers_rejected_before_fetch() {
        // no expectations: any fetch would panic
        let engine = engine_with(MockPriceSource::new(), AnalysisConfig::default());
        let err = engine.analyze_until("msft", "MSFT ", end()).await.unwrap_err();
        assert!(matches!(err, StockError::InvalidSymbol(_)));
    }

    #[tokio::test]
    async fn test_zero_price_reports_undefined_mape() {
        let source = pair_source(
            linear("AAA", 20, |i| if i == 3 { 0.0 } else { 10.0 + i as f64 }),
            linear("BBB", 20, |i| 30.0 + i as f64),
        );
        let engine = engine_with(source, AnalysisConfig::default());
        let result = engine.analyze_until("AAA", "BBB", end()).await.unwrap();

        assert!(result.metrics.get("AAA").unwrap().mape.is_none());
        assert!(result.metrics.get("BBB").unwrap().mape.is_some());
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("AAA"));
    }

    #[tokio::test]
    async fn test_cache_ttl_reuses_fetched_series() {
        let mut source = MockPriceSource::new();
        source
            .expect_daily_closes()
            .withf(|symbol, _, _| symbol == "AAA")
            .times(1)
            .returning(|_, _, _| Ok(linear("AAA", 20, |i| 10.0 + i as f64)));
        source
            .expect_daily_closes()
            .withf(|symbol, _, _| symbol == "BBB")
            .times(1)
            .returning(|_, _, _| Ok(linear("BBB", 20, |i| 40.0 - i as f64)));

        let config = AnalysisConfig::builder()
            .cache_ttl(StdDuration::from_secs(300))
            .build()
            .unwrap();
        let engine = engine_with(source, config);

        let first = engine.analyze_until("AAA", "BBB", end()).await.unwrap();
        let second = engine.analyze_until("AAA", "BBB", end()).await.unwrap();
        assert_eq!(first.predictions, second.predictions);
    }

    #[test]
    fn test_analyze_table_without_network() {
        let dates: Vec<NaiveDate> = (1..=6)
            .map(|d| NaiveDate::from_ymd_opt(2024, 7, d).unwrap())
            .collect();
        let table = AlignedTable::new(
            "AAA",
            "BBB",
            dates,
            vec![Some(1.0), None, Some(3.0), Some(4.0), Some(5.0), Some(6.0)],
            vec![Some(2.0), Some(4.0), Some(6.0), Some(8.0), Some(10.0), Some(12.0)],
        )
        .unwrap();

        let result = analyze_table(table, &AnalysisConfig::default()).unwrap();
        assert_eq!(result.data_points, 6);
        // the missing cell is filled with the mean of 1, 3, 4, 5, 6
        let sum = result.statistics.get("AAA").unwrap().sum;
        assert!((sum - 22.8).abs() < 1e-9);
    }
}
