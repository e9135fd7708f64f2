//! Holt's linear exponential smoothing on a daily grid
//!
//! Smoothing parameters are picked by grid search over one-step-ahead squared
//! error. Also serves as the ARIMA fallback.

use super::series::{daily_grid, WeightPoint};
use super::ModelOutput;
use crate::config::ForecastConfig;

const GRID_STEP: f64 = 0.05;
const GRID_SIZE: usize = 19;
const INITIAL_TREND_WINDOW: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq)]
struct HoltFit {
    alpha: f64,
    beta: f64,
    level: f64,
    trend: f64,
    sse: f64,
    steps: usize,
}

fn initial_trend(y: &[f64]) -> f64 {
    let window = INITIAL_TREND_WINDOW.min(y.len() - 1);
    if window == 0 {
        return 0.0;
    }
    (y[window] - y[0]) / window as f64
}

fn run(y: &[f64], alpha: f64, beta: f64) -> HoltFit {
    let mut level = y[0];
    let mut trend = initial_trend(y);
    let mut sse = 0.0;
    for &observed in &y[1..] {
        let error = observed - (level + trend);
        sse += error * error;
        let next_level = alpha * observed + (1.0 - alpha) * (level + trend);
        trend = beta * (next_level - level) + (1.0 - beta) * trend;
        level = next_level;
    }
    HoltFit {
        alpha,
        beta,
        level,
        trend,
        sse,
        steps: y.len() - 1,
    }
}

fn fit(y: &[f64]) -> HoltFit {
    let grid = (1..=GRID_SIZE).map(|i| i as f64 * GRID_STEP);
    let mut best: Option<HoltFit> = None;
    for alpha in grid.clone() {
        for beta in grid.clone() {
            let candidate = run(y, alpha, beta);
            // Strict comparison keeps the first minimum on ties
            if best.map_or(true, |b| candidate.sse < b.sse) {
                best = Some(candidate);
            }
        }
    }
    best.unwrap_or_else(|| run(y, GRID_STEP, GRID_STEP))
}

pub(crate) fn forecast(points: &[WeightPoint], horizon: usize, config: &ForecastConfig) -> ModelOutput {
    let y = daily_grid(points);
    let fit = fit(&y);

    // Two smoothing parameters are estimated from the errors
    let dof = fit.steps.saturating_sub(2).max(1);
    let sigma2 = (fit.sse / dof as f64).max(config.min_std_error_kg.powi(2));

    let mut means = Vec::with_capacity(horizon);
    let mut std_errors = Vec::with_capacity(horizon);
    let mut psi_sum = 0.0;
    for h in 1..=horizon {
        if h > 1 {
            let j = (h - 1) as f64;
            psi_sum += (fit.alpha * (1.0 + j * fit.beta)).powi(2);
        }
        means.push(fit.level + h as f64 * fit.trend);
        std_errors.push((sigma2 * (1.0 + psi_sum)).sqrt());
    }

    ModelOutput { means, std_errors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn points(weights: &[f64]) -> Vec<WeightPoint> {
        let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        weights
            .iter()
            .enumerate()
            .map(|(i, w)| WeightPoint::new(start + Duration::days(i as i64), *w))
            .collect()
    }

    #[test]
    fn test_linear_series_is_tracked_exactly() {
        let weights: Vec<f64> = (0..20).map(|i| 70.0 + 0.05 * i as f64).collect();
        let out = forecast(&points(&weights), 10, &ForecastConfig::default());
        assert!((out.means[0] - 71.0).abs() < 1e-9);
        assert!((out.means[9] - 71.45).abs() < 1e-9);
    }

    #[test]
    fn test_parameters_stay_on_grid() {
        let weights = [80.0, 80.5, 79.7, 80.2, 79.4, 80.0, 79.1, 79.8, 79.0, 79.3, 78.6, 79.1, 78.4, 78.9];
        let fit = fit(&weights);
        assert!(fit.alpha >= GRID_STEP && fit.alpha <= 0.95 + 1e-9);
        assert!(fit.beta >= GRID_STEP && fit.beta <= 0.95 + 1e-9);
    }

    #[test]
    fn test_standard_error_non_decreasing() {
        let weights = [80.0, 80.5, 79.7, 80.2, 79.4, 80.0, 79.1, 79.8, 79.0, 79.3, 78.6, 79.1, 78.4, 78.9];
        let out = forecast(&points(&weights), 30, &ForecastConfig::default());
        assert!(out.std_errors.windows(2).all(|w| w[1] >= w[0]));
    }
}
