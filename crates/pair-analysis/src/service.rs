//! Request-level entry point: analysis plus history bookkeeping

use crate::engine::{AnalysisResult, PairAnalysisEngine};
use crate::error::Result;
use crate::history::{AnalysisRecord, HistoryStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Records returned by `recent` when no limit is given
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

pub struct AnalysisService {
    engine: PairAnalysisEngine,
    history: Arc<dyn HistoryStore>,
}

impl AnalysisService {
    pub fn new(engine: PairAnalysisEngine, history: Arc<dyn HistoryStore>) -> Self {
        Self { engine, history }
    }

    pub fn engine(&self) -> &PairAnalysisEngine {
        &self.engine
    }

    /// Analyze a pair and record it for `user`. A failed write to history
    /// is logged; the analysis is still returned.
    pub async fn analyze(
        &self,
        user: Option<&str>,
        ticker1: &str,
        ticker2: &str,
    ) -> Result<AnalysisResult> {
        self.analyze_until(user, ticker1, ticker2, Utc::now()).await
    }

    pub async fn analyze_until(
        &self,
        user: Option<&str>,
        ticker1: &str,
        ticker2: &str,
        end: DateTime<Utc>,
    ) -> Result<AnalysisResult> {
        let result = self.engine.analyze_until(ticker1, ticker2, end).await?;

        let record = AnalysisRecord::from_result(&result, user.map(String::from));
        let id = record.id;
        match self.history.append(record).await {
            Ok(()) => tracing::debug!("Saved analysis {} to history", id),
            Err(e) => tracing::warn!(
                "Error saving analysis for {} vs {}: {}",
                result.ticker1,
                result.ticker2,
                e
            ),
        }

        Ok(result)
    }

    /// Most recent analyses, newest first
    pub async fn recent(
        &self,
        user: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<AnalysisRecord>> {
        self.history
            .recent(user, limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::error::StockError;
    use crate::history::MemoryHistoryStore;
    use crate::loader::MockPriceSource;
    use crate::series::{PricePoint, PriceSeries};
    use async_trait::async_trait;
    use chrono::{Duration, NaiveDate, TimeZone};

    struct BrokenStore;

    #[async_trait]
    impl HistoryStore for BrokenStore {
        async fn append(&self, _record: AnalysisRecord) -> Result<()> {
            Err(StockError::HistoryError("disk full".to_string()))
        }

        async fn recent(&self, _user: Option<&str>, _limit: usize) -> Result<Vec<AnalysisRecord>> {
            Err(StockError::HistoryError("disk full".to_string()))
        }
    }

    fn source() -> MockPriceSource {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut source = MockPriceSource::new();
        source.expect_daily_closes().returning(move |symbol, _, _| {
            let base = if symbol == "AAA" { 10.0 } else { 70.0 };
            Ok(PriceSeries::new(
                symbol,
                (0..12).map(|i| PricePoint::new(start + Duration::days(i), base + i as f64)),
            ))
        });
        source
    }

    fn service(history: Arc<dyn HistoryStore>) -> AnalysisService {
        let engine = PairAnalysisEngine::new(Arc::new(source()), Arc::new(AnalysisConfig::default()));
        AnalysisService::new(engine, history)
    }

    fn end() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_analysis_is_recorded() {
        let store = Arc::new(MemoryHistoryStore::new());
        let service = service(store.clone());

        service
            .analyze_until(Some("ana"), "aaa", "bbb", end())
            .await
            .unwrap();
        service.analyze_until(None, "BBB", "AAA", end()).await.unwrap();
        assert_eq!(store.len().await, 2);

        let mine = service.recent(Some("ana"), None).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].ticker1, "AAA");
        assert_eq!(mine[0].data_points, 12);
    }

    #[tokio::test]
    async fn test_history_failure_does_not_fail_analysis() {
        let service = service(Arc::new(BrokenStore));

        let result = service.analyze_until(None, "AAA", "BBB", end()).await;
        assert!(result.is_ok());
        assert!(service.recent(None, Some(5)).await.is_err());
    }

    #[tokio::test]
    async fn test_failed_analysis_is_not_recorded() {
        let store = Arc::new(MemoryHistoryStore::new());
        let service = service(store.clone());

        let err = service
            .analyze_until(None, "AAA", "aaa", end())
            .await
            .unwrap_err();
        assert!(matches!(err, StockError::InvalidSymbol(_)));
        assert!(store.is_empty().await);
    }
}
