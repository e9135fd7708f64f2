//! Weight series preparation shared by the forecast models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::CoreResult;
use crate::validation::{validate_weight_kg, ValidationError};

/// A single dated weigh-in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightPoint {
    pub date: NaiveDate,
    pub weight_kg: f64,
}

impl WeightPoint {
    pub fn new(date: NaiveDate, weight_kg: f64) -> Self {
        Self { date, weight_kg }
    }
}

/// Weights must be valid and dates strictly increasing
pub(crate) fn validate_points(points: &[WeightPoint]) -> CoreResult<()> {
    for point in points {
        validate_weight_kg(point.weight_kg)?;
    }
    if points.windows(2).any(|w| w[1].date <= w[0].date) {
        return Err(ValidationError::new("history", "dates must be strictly increasing").into());
    }
    Ok(())
}

/// Days elapsed since the first point, as f64
pub(crate) fn day_offsets(points: &[WeightPoint]) -> Vec<f64> {
    match points.first() {
        Some(first) => points
            .iter()
            .map(|p| (p.date - first.date).num_days() as f64)
            .collect(),
        None => Vec::new(),
    }
}

/// Resample onto one value per calendar day, interpolating linearly across
/// missing days. The grid runs from the first to the last weigh-in.
pub(crate) fn daily_grid(points: &[WeightPoint]) -> Vec<f64> {
    let mut grid = Vec::new();
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let gap = (b.date - a.date).num_days();
        for step in 0..gap {
            let t = step as f64 / gap as f64;
            grid.push(a.weight_kg + t * (b.weight_kg - a.weight_kg));
        }
    }
    if let Some(last) = points.last() {
        grid.push(last.weight_kg);
    }
    grid
}

/// Residual standard error with `dof` degrees of freedom
pub(crate) fn residual_std(residuals: &[f64], dof: usize) -> f64 {
    if dof == 0 {
        return 0.0;
    }
    let ssr: f64 = residuals.iter().map(|r| r * r).sum();
    (ssr / dof as f64).sqrt()
}
