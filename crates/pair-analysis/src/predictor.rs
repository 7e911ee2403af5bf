//! Cross-ticker k-nearest-neighbour regression.
//!
//! Each ticker gets its own model that predicts the ticker's price from the
//! *other* ticker's standardized price. Models and scalers live only as long
//! as the request that fitted them.

use crate::engine::PerTicker;
use crate::error::{Result, StockError};
use crate::series::{ImputedTable, Side};
use serde::{Deserialize, Serialize};

/// Latest observed price and the model's next-step prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub current_price: f64,
    pub predicted_price: f64,
}

/// Zero-mean, unit-variance scaling fitted on one feature column
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandardScaler {
    mean: f64,
    scale: f64,
}

impl StandardScaler {
    /// Fit on a non-empty column using the population standard deviation.
    /// A constant column keeps scale 1 and is only centred.
    pub fn fit(values: &[f64]) -> Self {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
        let scale = if std < 10.0 * f64::EPSILON { 1.0 } else { std };
        Self { mean, scale }
    }

    pub fn transform(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }
}

/// Uniformly weighted k-NN regressor over a single feature
#[derive(Debug, Clone)]
pub struct KnnRegressor {
    k: usize,
    features: Vec<f64>,
    targets: Vec<f64>,
}

impl KnnRegressor {
    pub fn fit(k: usize, features: Vec<f64>, targets: Vec<f64>) -> Result<Self> {
        if k == 0 {
            return Err(StockError::ConfigError("k must be greater than 0".to_string()));
        }
        if features.len() != targets.len() {
            return Err(StockError::Other(format!(
                "{} features for {} targets",
                features.len(),
                targets.len()
            )));
        }
        if features.len() < k {
            return Err(StockError::InsufficientData {
                reason: format!("k-NN with k={k} needs at least {k} rows, got {}", features.len()),
            });
        }

        Ok(Self {
            k,
            features,
            targets,
        })
    }

    /// Mean target of the k training points closest to `x`.
    ///
    /// Equal distances are broken by training row order.
    pub fn predict(&self, x: f64) -> f64 {
        let mut candidates: Vec<(f64, usize)> = self
            .features
            .iter()
            .enumerate()
            .map(|(i, f)| ((f - x).abs(), i))
            .collect();

        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        candidates[..self.k]
            .iter()
            .map(|&(_, i)| self.targets[i])
            .sum::<f64>()
            / self.k as f64
    }

    pub fn k(&self) -> usize {
        self.k
    }
}

/// Scaler and regressor predicting one ticker from the other
#[derive(Debug, Clone)]
pub struct TickerModel {
    symbol: String,
    scaler: StandardScaler,
    regressor: KnnRegressor,
    scaled_features: Vec<f64>,
    targets: Vec<f64>,
    latest_feature: f64,
}

impl TickerModel {
    /// Fit the model for `side`, using the opposite column as the feature
    pub fn fit(table: &ImputedTable, side: Side, k: usize) -> Result<Self> {
        let raw_features = table.column(side.other());
        let targets = table.column(side).to_vec();

        let latest_feature = table.last(side.other()).ok_or_else(|| StockError::InsufficientData {
            reason: format!("no rows to fit a model for {}", table.symbol(side)),
        })?;

        let scaler = StandardScaler::fit(raw_features);
        let scaled_features: Vec<f64> = raw_features.iter().map(|&v| scaler.transform(v)).collect();
        let regressor = KnnRegressor::fit(k, scaled_features.clone(), targets.clone())?;

        Ok(Self {
            symbol: table.symbol(side).to_string(),
            scaler,
            regressor,
            scaled_features,
            targets,
            latest_feature,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// Predict this ticker's price for a raw value of the other ticker
    pub fn predict(&self, other_price: f64) -> f64 {
        self.regressor.predict(self.scaler.transform(other_price))
    }

    /// Prediction from the table's latest row
    pub fn predict_next(&self) -> PredictionResult {
        PredictionResult {
            // fit() rejects empty tables
            current_price: self.targets[self.targets.len() - 1],
            predicted_price: self.predict(self.latest_feature),
        }
    }

    /// Re-predict every training row
    pub fn in_sample_predictions(&self) -> Vec<f64> {
        self.scaled_features
            .iter()
            .map(|&x| self.regressor.predict(x))
            .collect()
    }

    pub fn targets(&self) -> &[f64] {
        &self.targets
    }
}

/// The two per-ticker models of one analysis
#[derive(Debug, Clone)]
pub struct PairModels {
    first: TickerModel,
    second: TickerModel,
}

impl PairModels {
    /// Fit both directions. Tables shorter than `min_rows` (or k) are rejected.
    pub fn fit(table: &ImputedTable, k: usize, min_rows: usize) -> Result<Self> {
        let required = min_rows.max(k);
        if table.len() < required {
            return Err(StockError::InsufficientData {
                reason: format!(
                    "{} and {} share {} trading days, at least {} are required",
                    table.symbol(Side::First),
                    table.symbol(Side::Second),
                    table.len(),
                    required
                ),
            });
        }

        tracing::debug!("Fitting k-NN models (k={}) on {} rows", k, table.len());

        Ok(Self {
            first: TickerModel::fit(table, Side::First, k)?,
            second: TickerModel::fit(table, Side::Second, k)?,
        })
    }

    pub fn model(&self, side: Side) -> &TickerModel {
        match side {
            Side::First => &self.first,
            Side::Second => &self.second,
        }
    }

    pub fn predictions(&self) -> PerTicker<PredictionResult> {
        PerTicker::from_fn(self.first.symbol(), self.second.symbol(), |side| {
            self.model(side).predict_next()
        })
    }
}
