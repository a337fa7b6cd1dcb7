//! Contract for forecasting models that consume the daily series.
//!
//! Models live outside this workspace; they plug in by implementing
//! [`Forecaster`]. Scoring is shared so every model is evaluated the same way.

use serde::{Deserialize, Serialize};

use crate::error::{DemandError, Result};
use crate::series::DailySeries;

/// Error metrics of a forecast against held-out actuals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetrics {
    pub mae: f64,
    pub mse: f64,
    pub rmse: f64,
    /// Mean absolute percentage error in percent, over non-zero actuals only.
    /// `None` when every actual is zero.
    pub mape: Option<f64>,
}

impl ForecastMetrics {
    /// Score `predicted` against `actual` point by point.
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Result<Self> {
        if actual.len() != predicted.len() {
            return Err(DemandError::Forecast(format!(
                "length mismatch: {} actual vs {} predicted",
                actual.len(),
                predicted.len()
            )));
        }
        if actual.is_empty() {
            return Err(DemandError::Forecast("nothing to evaluate".to_string()));
        }

        let mse = mse(actual, predicted);
        Ok(Self {
            mae: mae(actual, predicted),
            mse,
            rmse: mse.sqrt(),
            mape: mape(actual, predicted),
        })
    }
}

/// Mean absolute error.
pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / n as f64
}

/// Mean squared error.
pub fn mse(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / n as f64
}

/// Mean absolute percentage error, skipping zero actuals.
pub fn mape(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    let terms: Vec<f64> = actual
        .iter()
        .zip(predicted)
        .filter(|(a, _)| **a != 0.0)
        .map(|(a, p)| ((a - p) / a).abs())
        .collect();
    if terms.is_empty() {
        return None;
    }
    Some(100.0 * terms.iter().sum::<f64>() / terms.len() as f64)
}

/// A forecasting model fed by the daily consumption series.
pub trait Forecaster {
    fn name(&self) -> &str;

    /// Fit the model to `series`.
    fn fit(&mut self, series: &DailySeries) -> Result<()>;

    /// Predict the `horizon` days following the fitted series.
    fn forecast(&self, horizon: usize) -> Result<DailySeries>;

    /// Fit on `train`, forecast the length of `test` and score it.
    fn evaluate(&mut self, train: &DailySeries, test: &DailySeries) -> Result<ForecastMetrics> {
        self.fit(train)?;
        let predicted = self.forecast(test.len())?;
        ForecastMetrics::compute(&test.values(), &predicted.values())
    }
}
