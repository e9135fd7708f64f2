//! ARIMA(1,1,1) with drift
//!
//! Works on the daily grid. First differences are centred on their mean (the
//! drift) and an ARMA(1,1) is fitted to them by conditional sum of squares.
//! The AR and MA coefficients are optimised as `tanh` of unconstrained values
//! with a two-dimensional Nelder-Mead simplex.
//!
//! The fit fails with [`CoreError::ModelConvergence`] when the simplex does
//! not converge within the iteration cap, when it runs over the time budget,
//! or when the coefficients end up on the edge of the stationary/invertible
//! region. The caller falls back to exponential smoothing.

use std::time::Instant;

use tracing::debug;

use super::series::{daily_grid, WeightPoint};
use super::ModelOutput;
use crate::config::ForecastConfig;
use crate::errors::{CoreError, CoreResult};

const MODEL: &str = "ARIMA";

/// |φ| and |θ| at or above this are treated as a failed fit
const MAX_COEFFICIENT: f64 = 0.99;

const FLAT_SERIES_EPSILON: f64 = 1e-10;

const INITIAL_STEP: f64 = 0.5;
const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

type Point = [f64; 2];

fn failure(reason: impl Into<String>) -> CoreError {
    CoreError::ModelConvergence {
        model: MODEL,
        reason: reason.into(),
    }
}

/// Conditional sum of squares residuals for ARMA(1,1) on `x`
fn residuals(x: &[f64], phi: f64, theta: f64) -> Vec<f64> {
    let mut errors = Vec::with_capacity(x.len().saturating_sub(1));
    let mut previous = 0.0;
    for t in 1..x.len() {
        let e = x[t] - phi * x[t - 1] - theta * previous;
        errors.push(e);
        previous = e;
    }
    errors
}

fn objective(x: &[f64], p: Point) -> f64 {
    let errors = residuals(x, p[0].tanh(), p[1].tanh());
    if errors.is_empty() {
        return f64::INFINITY;
    }
    errors.iter().map(|e| e * e).sum::<f64>() / errors.len() as f64
}

fn lerp(from: Point, to: Point, t: f64) -> Point {
    [from[0] + t * (to[0] - from[0]), from[1] + t * (to[1] - from[1])]
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Minimum {
    point: Point,
    value: f64,
    iterations: usize,
}

/// Minimise `f` from `start` with a Nelder-Mead simplex
fn nelder_mead<F>(f: F, start: Point, config: &ForecastConfig) -> CoreResult<Minimum>
where
    F: Fn(Point) -> f64,
{
    let started = Instant::now();
    let tolerance = config.arima_tolerance;
    let spread_tolerance = tolerance.sqrt() * 10.0;

    let mut simplex = [
        (start, f(start)),
        ([start[0] + INITIAL_STEP, start[1]], f([start[0] + INITIAL_STEP, start[1]])),
        ([start[0], start[1] + INITIAL_STEP], f([start[0], start[1] + INITIAL_STEP])),
    ];

    for iteration in 0..config.arima_max_iterations {
        if started.elapsed().as_millis() >= u128::from(config.arima_time_budget_ms) {
            return Err(failure(format!(
                "exceeded time budget of {} ms",
                config.arima_time_budget_ms
            )));
        }

        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        let (best, worst) = (simplex[0], simplex[2]);

        let value_spread = worst.1 - best.1;
        let point_spread = simplex[1..]
            .iter()
            .flat_map(|(p, _)| [(p[0] - best.0[0]).abs(), (p[1] - best.0[1]).abs()])
            .fold(0.0, f64::max);
        if value_spread <= tolerance * (1.0 + best.1.abs()) && point_spread <= spread_tolerance {
            return Ok(Minimum {
                point: best.0,
                value: best.1,
                iterations: iteration,
            });
        }

        let centroid = lerp(simplex[0].0, simplex[1].0, 0.5);
        let reflected = lerp(centroid, worst.0, -REFLECTION);
        let f_reflected = f(reflected);

        if f_reflected < best.1 {
            let expanded = lerp(centroid, worst.0, -EXPANSION);
            let f_expanded = f(expanded);
            simplex[2] = if f_expanded < f_reflected {
                (expanded, f_expanded)
            } else {
                (reflected, f_reflected)
            };
            continue;
        }
        if f_reflected < simplex[1].1 {
            simplex[2] = (reflected, f_reflected);
            continue;
        }

        let contracted = if f_reflected < worst.1 {
            lerp(centroid, reflected, CONTRACTION)
        } else {
            lerp(centroid, worst.0, CONTRACTION)
        };
        let f_contracted = f(contracted);
        if f_contracted < f_reflected.min(worst.1) {
            simplex[2] = (contracted, f_contracted);
            continue;
        }

        for vertex in simplex.iter_mut().skip(1) {
            let shrunk = lerp(best.0, vertex.0, SHRINK);
            *vertex = (shrunk, f(shrunk));
        }
    }

    Err(failure(format!(
        "no convergence within {} iterations",
        config.arima_max_iterations
    )))
}

/// Mean first difference and the differences centred on it
fn centred_differences(y: &[f64]) -> (f64, Vec<f64>) {
    let diffs: Vec<f64> = y.windows(2).map(|w| w[1] - w[0]).collect();
    let drift = diffs.iter().sum::<f64>() / diffs.len() as f64;
    (drift, diffs.iter().map(|d| d - drift).collect())
}

/// Fit (φ, θ) of an ARMA(1,1) to the centred differences
fn fit_coefficients(x: &[f64], config: &ForecastConfig) -> CoreResult<(f64, f64)> {
    // Perfectly steady series leave nothing to fit and a flat objective
    let minimum = if x.iter().all(|v| v.abs() < FLAT_SERIES_EPSILON) {
        Minimum {
            point: [0.0, 0.0],
            value: 0.0,
            iterations: 0,
        }
    } else {
        nelder_mead(|p| objective(x, p), [0.0, 0.0], config)?
    };
    let phi = minimum.point[0].tanh();
    let theta = minimum.point[1].tanh();
    if !minimum.value.is_finite() || !phi.is_finite() || !theta.is_finite() {
        return Err(failure("non-finite fit"));
    }
    if phi.abs() >= MAX_COEFFICIENT || theta.abs() >= MAX_COEFFICIENT {
        return Err(failure(format!(
            "coefficients outside the stationary region (phi = {phi:.3}, theta = {theta:.3})"
        )));
    }
    debug!(iterations = minimum.iterations, "ARMA(1,1) simplex converged");
    Ok((phi, theta))
}

pub(crate) fn forecast(points: &[WeightPoint], horizon: usize, config: &ForecastConfig) -> CoreResult<ModelOutput> {
    let y = daily_grid(points);
    if y.len() < 4 {
        return Err(failure("series too short"));
    }

    let (drift, x) = centred_differences(&y);
    let (phi, theta) = fit_coefficients(&x, config)?;
    debug!(phi, theta, drift, "Fitted ARIMA(1,1,1)");

    let errors = residuals(&x, phi, theta);
    let sse: f64 = errors.iter().map(|e| e * e).sum();
    // Drift, phi and theta are estimated
    let dof = errors.len().saturating_sub(3).max(1);
    let sigma2 = (sse / dof as f64).max(config.min_std_error_kg.powi(2));

    let last_x = x[x.len() - 1];
    let last_error = errors.last().copied().unwrap_or(0.0);
    let mut level = y[y.len() - 1];
    let mut x_hat = phi * last_x + theta * last_error;

    // Ψ_j accumulates the MA(∞) weights of the differenced process
    let mut psi_weight = 1.0;
    let mut psi_cumulative = 1.0;
    let mut variance_sum = 0.0;

    let mut means = Vec::with_capacity(horizon);
    let mut std_errors = Vec::with_capacity(horizon);
    for h in 1..=horizon {
        if h > 1 {
            x_hat *= phi;
            psi_weight = if h == 2 { phi + theta } else { psi_weight * phi };
            psi_cumulative += psi_weight;
        }
        level += drift + x_hat;
        variance_sum += psi_cumulative * psi_cumulative;
        means.push(level);
        std_errors.push((sigma2 * variance_sum).sqrt());
    }

    Ok(ModelOutput { means, std_errors })
}
