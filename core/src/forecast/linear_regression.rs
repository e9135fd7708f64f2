//! Ordinary least squares on day offsets
//!
//! Prediction intervals use the textbook OLS prediction standard error
//! `s * sqrt(1 + 1/n + (x0 - x̄)² / Sxx)`.

use linfa::prelude::*;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2};

use super::series::{day_offsets, residual_std, WeightPoint};
use super::ModelOutput;
use crate::config::ForecastConfig;
use crate::errors::{CoreError, CoreResult};

const MODEL: &str = "LinearRegression";

pub(crate) fn forecast(points: &[WeightPoint], horizon: usize, config: &ForecastConfig) -> CoreResult<ModelOutput> {
    let x = day_offsets(points);
    let y: Vec<f64> = points.iter().map(|p| p.weight_kg).collect();
    let n = x.len();

    let records = Array2::from_shape_vec((n, 1), x.clone()).map_err(|e| CoreError::ModelConvergence {
        model: MODEL,
        reason: e.to_string(),
    })?;
    let targets = Array1::from_vec(y.clone());
    let dataset = Dataset::new(records, targets);

    let model = LinearRegression::default()
        .fit(&dataset)
        .map_err(|e| CoreError::ModelConvergence {
            model: MODEL,
            reason: e.to_string(),
        })?;
    let slope = model.params()[0];
    let intercept = model.intercept();
    if !slope.is_finite() || !intercept.is_finite() {
        return Err(CoreError::ModelConvergence {
            model: MODEL,
            reason: "non-finite coefficients".to_string(),
        });
    }

    let residuals: Vec<f64> = x
        .iter()
        .zip(&y)
        .map(|(xi, yi)| yi - (intercept + slope * xi))
        .collect();
    let s = residual_std(&residuals, n.saturating_sub(2)).max(config.min_std_error_kg);

    let x_mean = x.iter().sum::<f64>() / n as f64;
    let sxx: f64 = x.iter().map(|xi| (xi - x_mean).powi(2)).sum();
    let last_x = x[n - 1];

    let (means, std_errors) = (1..=horizon)
        .map(|h| {
            let x0 = last_x + h as f64;
            let leverage = if sxx > 0.0 { (x0 - x_mean).powi(2) / sxx } else { 0.0 };
            (intercept + slope * x0, s * (1.0 + 1.0 / n as f64 + leverage).sqrt())
        })
        .unzip();

    Ok(ModelOutput { means, std_errors })
}
