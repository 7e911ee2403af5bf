//! Append-only log of completed analyses

use crate::engine::{AnalysisResult, PerTicker};
use crate::error::{Result, StockError};
use crate::metrics::MetricsResult;
use crate::predictor::PredictionResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Snapshot of one successful analysis. Never updated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub user: Option<String>,
    pub ticker1: String,
    pub ticker2: String,
    pub analysis_date: DateTime<Utc>,
    pub data_points: usize,
    pub predictions: PerTicker<PredictionResult>,
    pub metrics: PerTicker<MetricsResult>,
}

impl AnalysisRecord {
    /// Snapshot a result, keeping prices to 2 decimals and metrics to 4
    pub fn from_result(result: &AnalysisResult, user: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user,
            ticker1: result.ticker1.clone(),
            ticker2: result.ticker2.clone(),
            analysis_date: Utc::now(),
            data_points: result.data_points,
            predictions: result.predictions.map(|p| PredictionResult {
                current_price: round_to(p.current_price, 2),
                predicted_price: round_to(p.predicted_price, 2),
            }),
            metrics: result.metrics.map(|m| MetricsResult {
                mae: round_to(m.mae, 4),
                mse: round_to(m.mse, 4),
                rmse: round_to(m.rmse, 4),
                mape: m.mape.map(|v| round_to(v, 4)),
            }),
        }
    }
}

impl fmt::Display for AnalysisRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} vs {} - {}",
            self.ticker1,
            self.ticker2,
            self.analysis_date.format("%Y-%m-%d %H:%M")
        )
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}

/// Storage for analysis records
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persist one record
    async fn append(&self, record: AnalysisRecord) -> Result<()>;

    /// Newest records first, optionally only those of `user`
    async fn recent(&self, user: Option<&str>, limit: usize) -> Result<Vec<AnalysisRecord>>;
}

fn newest_first(
    records: impl IntoIterator<Item = AnalysisRecord>,
    user: Option<&str>,
    limit: usize,
) -> Vec<AnalysisRecord> {
    let mut selected: Vec<AnalysisRecord> = records
        .into_iter()
        .filter(|r| user.is_none_or(|u| r.user.as_deref() == Some(u)))
        .collect();
    selected.sort_by(|a, b| b.analysis_date.cmp(&a.analysis_date));
    selected.truncate(limit);
    selected
}

/// In-process history, lost on exit
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    records: RwLock<Vec<AnalysisRecord>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, record: AnalysisRecord) -> Result<()> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn recent(&self, user: Option<&str>, limit: usize) -> Result<Vec<AnalysisRecord>> {
        let records = self.records.read().await;
        Ok(newest_first(records.iter().cloned(), user, limit))
    }
}

/// History kept as one JSON record per line
#[derive(Debug)]
pub struct JsonlHistoryStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlHistoryStore {
    /// The file and its parent directories are created on first append
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl HistoryStore for JsonlHistoryStore {
    async fn append(&self, record: AnalysisRecord) -> Result<()> {
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                StockError::HistoryError(format!("cannot open {}: {e}", self.path.display()))
            })?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }

    async fn recent(&self, user: Option<&str>, limit: usize) -> Result<Vec<AnalysisRecord>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let records = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(i, line)| match serde_json::from_str::<AnalysisRecord>(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(
                        "Skipping unreadable history line {} in {}: {}",
                        i + 1,
                        self.path.display(),
                        e
                    );
                    None
                }
            });

        Ok(newest_first(records, user, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(user: Option<&str>, ticker1: &str, minutes_ago: i64) -> AnalysisRecord {
        AnalysisRecord {
            id: Uuid::new_v4(),
            user: user.map(String::from),
            ticker1: ticker1.to_string(),
            ticker2: "SPY".to_string(),
            analysis_date: Utc::now() - Duration::minutes(minutes_ago),
            data_points: 60,
            predictions: PerTicker::new(
                (
                    ticker1,
                    PredictionResult {
                        current_price: 101.25,
                        predicted_price: 100.5,
                    },
                ),
                (
                    "SPY",
                    PredictionResult {
                        current_price: 520.0,
                        predicted_price: 518.75,
                    },
                ),
            ),
            metrics: PerTicker::new(
                (
                    ticker1,
                    MetricsResult {
                        mae: 1.0,
                        mse: 2.0,
                        rmse: 1.4142,
                        mape: Some(0.8),
                    },
                ),
                (
                    "SPY",
                    MetricsResult {
                        mae: 3.0,
                        mse: 9.5,
                        rmse: 3.0822,
                        mape: None,
                    },
                ),
            ),
        }
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(1.23456, 4), 1.2346);
    }

    #[test]
    fn test_display() {
        let r = record(None, "AAPL", 0);
        let text = r.to_string();
        assert!(text.starts_with("AAPL vs SPY - "));
        assert_eq!(text.len(), "AAPL vs SPY - 2024-01-01 00:00".len());
    }

    #[tokio::test]
    async fn test_memory_store_newest_first_and_filtered() {
        let store = MemoryHistoryStore::new();
        store.append(record(Some("ana"), "OLD", 30)).await.unwrap();
        store.append(record(Some("ana"), "NEW", 1)).await.unwrap();
        store.append(record(Some("bo"), "BO", 5)).await.unwrap();

        let all = store.recent(None, 10).await.unwrap();
        let order: Vec<_> = all.iter().map(|r| r.ticker1.as_str()).collect();
        assert_eq!(order, vec!["NEW", "BO", "OLD"]);

        let ana = store.recent(Some("ana"), 1).await.unwrap();
        assert_eq!(ana.len(), 1);
        assert_eq!(ana[0].ticker1, "NEW");
    }

    #[tokio::test]
    async fn test_jsonl_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlHistoryStore::new(dir.path().join("nested").join("history.jsonl"));

        assert!(store.recent(None, 10).await.unwrap().is_empty());

        let first = record(Some("ana"), "AAPL", 10);
        let second = record(None, "MSFT", 2);
        store.append(first.clone()).await.unwrap();
        store.append(second.clone()).await.unwrap();

        let records = store.recent(None, 10).await.unwrap();
        assert_eq!(records, vec![second, first]);
    }

    #[tokio::test]
    async fn test_jsonl_store_skips_corrupt_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        let store = JsonlHistoryStore::new(&path);

        store.append(record(None, "AAPL", 1)).await.unwrap();
        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("{\"truncated\": \n");
        std::fs::write(&path, content).unwrap();

        let records = store.recent(None, 10).await.unwrap();
        assert_eq!(records.len(), 1);
    }
}
