//! In-sample accuracy metrics for the fitted models

use crate::engine::PerTicker;
use crate::predictor::{PairModels, TickerModel};
use crate::series::Side;
use serde::{Deserialize, Serialize};

/// Error measures of one model against its own training targets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsResult {
    pub mae: f64,
    pub mse: f64,
    pub rmse: f64,
    /// Percentage error; `None` when an actual value is zero
    pub mape: Option<f64>,
}

impl MetricsResult {
    /// Compare predictions with actual values of the same non-zero length
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Self {
        debug_assert_eq!(actual.len(), predicted.len());
        let n = actual.len() as f64;

        let errors: Vec<f64> = actual
            .iter()
            .zip(predicted)
            .map(|(a, p)| a - p)
            .collect();

        let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
        let mse = errors.iter().map(|e| e.powi(2)).sum::<f64>() / n;

        let mape = if actual.iter().any(|&a| a == 0.0) {
            None
        } else {
            Some(
                actual
                    .iter()
                    .zip(&errors)
                    .map(|(a, e)| (e / a).abs())
                    .sum::<f64>()
                    / n
                    * 100.0,
            )
        };

        Self {
            mae,
            mse,
            rmse: mse.sqrt(),
            mape,
        }
    }

    pub fn mape_defined(&self) -> bool {
        self.mape.is_some()
    }
}

/// Re-predict every training row of a model and score it
pub fn evaluate(model: &TickerModel) -> MetricsResult {
    MetricsResult::compute(model.targets(), &model.in_sample_predictions())
}

/// Metrics for both models, keyed by the ticker each one predicts
pub fn evaluate_pair(models: &PairModels) -> PerTicker<MetricsResult> {
    PerTicker::from_fn(
        models.model(Side::First).symbol(),
        models.model(Side::Second).symbol(),
        |side| {
            let metrics = evaluate(models.model(side));
            if !metrics.mape_defined() {
                tracing::warn!(
                    "MAPE undefined for {}: a training price is zero",
                    models.model(side).symbol()
                );
            }
            metrics
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_predictions() {
        let m = MetricsResult::compute(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.mse, 0.0);
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.mape, Some(0.0));
    }

    #[test]
    fn test_known_errors() {
        let m = MetricsResult::compute(&[100.0, 200.0], &[110.0, 180.0]);
        assert!((m.mae - 15.0).abs() < 1e-12);
        assert!((m.mse - 250.0).abs() < 1e-12);
        assert_eq!(m.rmse, m.mse.sqrt());
        assert!((m.mape.unwrap() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_actual_leaves_mape_undefined() {
        let m = MetricsResult::compute(&[0.0, 2.0], &[1.0, 2.0]);
        assert!(m.mape.is_none());
        assert!(!m.mape_defined());
        assert_eq!(m.mae, 0.5);
    }

    #[test]
    fn test_non_negative_for_arbitrary_inputs() {
        let actual: Vec<f64> = (0..50).map(|i| (i as f64 * 1.3).sin() * 40.0 - 5.0).collect();
        let predicted: Vec<f64> = (0..50).map(|i| (i as f64 * 0.7).cos() * 25.0).collect();

        let m = MetricsResult::compute(&actual, &predicted);
        assert!(m.mae >= 0.0);
        assert!(m.mse >= 0.0);
        assert!(m.rmse >= 0.0);
        assert_eq!(m.rmse, m.mse.sqrt());
    }

    #[test]
    fn test_json_round_trip() {
        let m = MetricsResult {
            mae: 1.23456,
            mse: 2.34567,
            rmse: 2.34567_f64.sqrt(),
            mape: Some(0.98765),
        };

        let back: MetricsResult = serde_json::from_str(&serde_json::to_string(&m).unwrap()).unwrap();
        assert!((back.mae - m.mae).abs() < 1e-4);
        assert!((back.rmse - m.rmse).abs() < 1e-4);
        assert!((back.mape.unwrap() - 0.98765).abs() < 1e-4);

        let undefined = MetricsResult { mape: None, ..m };
        let json = serde_json::to_value(undefined).unwrap();
        assert!(json["mape"].is_null());
    }
}
