//! Straight line through the first and last weigh-in
//!
//! Used when there are too few points to fit anything. The standard error
//! starts at the scatter around the line and grows linearly with the horizon.

use super::series::{day_offsets, residual_std, WeightPoint};
use super::ModelOutput;
use crate::config::ForecastConfig;

pub(crate) fn forecast(points: &[WeightPoint], horizon: usize, config: &ForecastConfig) -> ModelOutput {
    let offsets = day_offsets(points);
    let first = points[0].weight_kg;
    let last = points[points.len() - 1].weight_kg;
    let span = offsets[offsets.len() - 1];
    let slope = if span > 0.0 { (last - first) / span } else { 0.0 };

    let residuals: Vec<f64> = points
        .iter()
        .zip(&offsets)
        .map(|(p, x)| p.weight_kg - (first + slope * x))
        .collect();
    // Both endpoints sit on the line, hence n - 2
    let base = residual_std(&residuals, points.len().saturating_sub(2)).max(config.min_std_error_kg);

    let (means, std_errors) = (1..=horizon)
        .map(|h| {
            let h = h as f64;
            (last + slope * h, base + config.simple_trend_daily_growth_kg * h)
        })
        .unzip();

    ModelOutput { means, std_errors }
}
