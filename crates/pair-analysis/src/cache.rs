//! Caching layer for fetched price series to reduce provider calls

use crate::error::Result;
use crate::loader::PriceSource;
use crate::series::PriceSeries;
use async_trait::async_trait;
use cached::{Cached, TimedCache};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Cache key for a series request. The window is keyed by calendar date so
/// requests issued during the same day share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CacheKey {
    pub fn new(symbol: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            start: start.date_naive(),
            end: end.date_naive(),
        }
    }
}

/// A `PriceSource` that remembers non-empty series for a fixed lifetime
pub struct CachedPriceSource {
    inner: Arc<dyn PriceSource>,
    cache: RwLock<TimedCache<CacheKey, PriceSeries>>,
}

impl CachedPriceSource {
    /// Wrap a source with the given TTL
    pub fn new(inner: Arc<dyn PriceSource>, ttl: Duration) -> Self {
        Self {
            inner,
            cache: RwLock::new(TimedCache::with_lifespan(ttl)),
        }
    }

    /// Clear all cached entries
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        cache.cache_clear();
    }

    /// Get the number of cached entries
    pub async fn len(&self) -> usize {
        let cache = self.cache.read().await;
        cache.cache_size()
    }

    /// Check if the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl PriceSource for CachedPriceSource {
    async fn daily_closes(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<PriceSeries> {
        let key = CacheKey::new(symbol, start, end);

        // TimedCache::cache_get needs &mut to evict expired entries
        if let Some(series) = self.cache.write().await.cache_get(&key).cloned() {
            tracing::debug!("Cache hit for key: {:?}", key);
            return Ok(series);
        }

        tracing::debug!("Cache miss for key: {:?}", key);

        let series = self.inner.daily_closes(symbol, start, end).await?;

        // empty answers usually mean an outage or a typo; don't pin them
        if !series.is_empty() {
            let _ = self.cache.write().await.cache_set(key, series.clone());
        }

        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MockPriceSource;
    use crate::series::PricePoint;
    use chrono::TimeZone;

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 31, 9, 0, 0).unwrap(),
        )
    }

    fn one_point(symbol: &str) -> PriceSeries {
        PriceSeries::new(
            symbol,
            vec![PricePoint::new(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), 10.0)],
        )
    }

    #[test]
    fn test_cache_key_uses_dates() {
        let (start, end) = window();
        let later = end + chrono::Duration::hours(3);
        assert_eq!(CacheKey::new("AAPL", start, end), CacheKey::new("AAPL", start, later));
    }

    #[tokio::test]
    async fn test_second_fetch_is_served_from_cache() {
        let mut inner = MockPriceSource::new();
        inner
            .expect_daily_closes()
            .times(1)
            .returning(|symbol, _, _| Ok(one_point(symbol)));

        let source = CachedPriceSource::new(Arc::new(inner), Duration::from_secs(60));
        let (start, end) = window();

        let first = source.daily_closes("AAPL", start, end).await.unwrap();
        let second = source.daily_closes("AAPL", start, end).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(source.len().await, 1);
    }

    #[tokio::test]
    async fn test_empty_series_not_cached() {
        let mut inner = MockPriceSource::new();
        inner
            .expect_daily_closes()
            .times(2)
            .returning(|symbol, _, _| Ok(PriceSeries::new(symbol, Vec::new())));

        let source = CachedPriceSource::new(Arc::new(inner), Duration::from_secs(60));
        let (start, end) = window();

        assert!(source.daily_closes("NOPE", start, end).await.unwrap().is_empty());
        assert!(source.daily_closes("NOPE", start, end).await.unwrap().is_empty());
        assert!(source.is_empty().await);
    }

    #[tokio::test]
    async fn test_clear() {
        let mut inner = MockPriceSource::new();
        inner
            .expect_daily_closes()
            .returning(|symbol, _, _| Ok(one_point(symbol)));

        let source = CachedPriceSource::new(Arc::new(inner), Duration::from_secs(60));
        let (start, end) = window();
        for symbol in ["A", "B", "C"] {
            source.daily_closes(symbol, start, end).await.unwrap();
        }
        assert_eq!(source.len().await, 3);

        source.clear().await;
        assert!(source.is_empty().await);
    }
}
