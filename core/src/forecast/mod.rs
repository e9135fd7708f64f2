//! Weight forecasting engine
//!
//! Picks a model from the number of available weigh-ins, fits it, and turns
//! the model's point forecasts and standard errors into dated predictions with
//! symmetric confidence bounds.
//!
//! | Points   | Model                                  |
//! |----------|----------------------------------------|
//! | n < 7    | [`ForecastModel::SimpleTrend`]         |
//! | 7..14    | [`ForecastModel::LinearRegression`]    |
//! | 14..30   | [`ForecastModel::ExponentialSmoothing`]|
//! | n >= 30  | [`ForecastModel::Arima`], falling back to exponential smoothing |

mod arima;
mod holt;
mod linear_regression;
mod series;
mod simple_trend;

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ForecastConfig;
use crate::errors::{CoreError, CoreResult};
use crate::history::ProgressHistory;
use crate::validation::{validate_days_ahead, ValidationError};

pub use series::WeightPoint;

/// Minimum weigh-ins needed for any forecast
pub const MIN_FORECAST_POINTS: usize = 2;

/// Weight change below which a forecast counts as a plateau (kg)
pub const STABLE_TREND_THRESHOLD_KG: f64 = 0.5;

const LINEAR_REGRESSION_MIN_POINTS: usize = 7;
const EXPONENTIAL_SMOOTHING_MIN_POINTS: usize = 14;
const ARIMA_MIN_POINTS: usize = 30;

/// Forecasting model kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForecastModel {
    SimpleTrend,
    LinearRegression,
    ExponentialSmoothing,
    #[serde(rename = "ARIMA")]
    Arima,
}

impl ForecastModel {
    /// Model chosen for `n` data points
    pub fn select(n: usize) -> Self {
        if n < LINEAR_REGRESSION_MIN_POINTS {
            ForecastModel::SimpleTrend
        } else if n < EXPONENTIAL_SMOOTHING_MIN_POINTS {
            ForecastModel::LinearRegression
        } else if n < ARIMA_MIN_POINTS {
            ForecastModel::ExponentialSmoothing
        } else {
            ForecastModel::Arima
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ForecastModel::SimpleTrend => "SimpleTrend",
            ForecastModel::LinearRegression => "LinearRegression",
            ForecastModel::ExponentialSmoothing => "ExponentialSmoothing",
            ForecastModel::Arima => "ARIMA",
        }
    }
}

impl fmt::Display for ForecastModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Supported confidence levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "f64", try_from = "f64")]
pub enum ConfidenceLevel {
    /// 0.68, about one standard error
    P68,
    /// 0.95
    P95,
    /// 0.99
    P99,
}

impl ConfidenceLevel {
    pub fn value(&self) -> f64 {
        match self {
            ConfidenceLevel::P68 => 0.68,
            ConfidenceLevel::P95 => 0.95,
            ConfidenceLevel::P99 => 0.99,
        }
    }

    /// Two-sided normal multiplier applied to a standard error
    pub fn z_score(&self) -> f64 {
        match self {
            ConfidenceLevel::P68 => 1.0,
            ConfidenceLevel::P95 => 1.96,
            ConfidenceLevel::P99 => 2.576,
        }
    }
}

impl TryFrom<f64> for ConfidenceLevel {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        [ConfidenceLevel::P68, ConfidenceLevel::P95, ConfidenceLevel::P99]
            .into_iter()
            .find(|level| (level.value() - value).abs() < 1e-9)
            .ok_or_else(|| ValidationError::new("confidence_level", "must be one of 0.68, 0.95, 0.99"))
    }
}

impl From<ConfidenceLevel> for f64 {
    fn from(level: ConfidenceLevel) -> Self {
        level.value()
    }
}

/// Direction of the forecast trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Decreasing,
    Increasing,
    Stable,
}

/// Classify a forecast's first-to-last change
///
/// A change of exactly the threshold is already a trend.
pub fn classify_trend(magnitude_kg: f64) -> TrendDirection {
    if magnitude_kg <= -STABLE_TREND_THRESHOLD_KG {
        TrendDirection::Decreasing
    } else if magnitude_kg >= STABLE_TREND_THRESHOLD_KG {
        TrendDirection::Increasing
    } else {
        TrendDirection::Stable
    }
}

/// One forecast day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted_weight_kg: f64,
    pub lower_bound_kg: f64,
    pub upper_bound_kg: f64,
}

/// Weight forecast result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightForecast {
    pub profile_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// Model that produced the predictions
    pub model_used: ForecastModel,
    /// Why `model_used` differs from the model selected by point count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    pub confidence_level: ConfidenceLevel,
    pub data_points_used: usize,
    pub trend_direction: TrendDirection,
    pub trend_magnitude_kg: f64,
    pub predictions: Vec<ForecastPoint>,
}

/// Point forecasts and standard errors for horizons 1..=H days past the last
/// observation
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ModelOutput {
    pub means: Vec<f64>,
    pub std_errors: Vec<f64>,
}

/// Forecast a profile's weight from its progress history
pub fn forecast_weight(
    profile_id: Uuid,
    history: &ProgressHistory,
    days_ahead: u32,
    confidence_level: f64,
    config: &ForecastConfig,
) -> CoreResult<WeightForecast> {
    forecast_weight_at(profile_id, history, days_ahead, confidence_level, config, Utc::now())
}

/// As [`forecast_weight`] with a caller-supplied generation timestamp, which
/// makes the whole result reproducible
pub fn forecast_weight_at(
    profile_id: Uuid,
    history: &ProgressHistory,
    days_ahead: u32,
    confidence_level: f64,
    config: &ForecastConfig,
    generated_at: DateTime<Utc>,
) -> CoreResult<WeightForecast> {
    let points: Vec<WeightPoint> = history
        .iter()
        .map(|r| WeightPoint::new(r.date, r.weight_kg))
        .collect();
    forecast_series(profile_id, &points, days_ahead, confidence_level, config, generated_at)
}

/// Forecast from raw (date, weight) points, which must be strictly ordered
pub fn forecast_series(
    profile_id: Uuid,
    points: &[WeightPoint],
    days_ahead: u32,
    confidence_level: f64,
    config: &ForecastConfig,
    generated_at: DateTime<Utc>,
) -> CoreResult<WeightForecast> {
    validate_days_ahead(days_ahead)?;
    let confidence = ConfidenceLevel::try_from(confidence_level)?;
    series::validate_points(points)?;
    if points.len() < MIN_FORECAST_POINTS {
        return Err(CoreError::InsufficientData {
            required: MIN_FORECAST_POINTS,
            available: points.len(),
        });
    }

    let last_date = points[points.len() - 1].date;
    if last_date
        .checked_add_signed(Duration::days(i64::from(days_ahead)))
        .is_none()
    {
        return Err(CoreError::validation("history", "forecast would run past the latest supported date"));
    }

    let horizon = days_ahead as usize;
    let selected = ForecastModel::select(points.len());
    debug!(points = points.len(), model = %selected, days_ahead, "Selected forecast model");

    let (model_used, fallback_reason, output) = fit_with_fallback(selected, points, horizon, config)?;

    let z = confidence.z_score();
    let predictions: Vec<ForecastPoint> = last_date
        .iter_days()
        .skip(1)
        .zip(output.means.iter().zip(&output.std_errors))
        .map(|(date, (mean, se))| {
            let half_width = z * se.max(config.min_std_error_kg);
            ForecastPoint {
                date,
                predicted_weight_kg: *mean,
                lower_bound_kg: mean - half_width,
                upper_bound_kg: mean + half_width,
            }
        })
        .collect();

    let trend_magnitude_kg = match (predictions.first(), predictions.last()) {
        (Some(first), Some(last)) => last.predicted_weight_kg - first.predicted_weight_kg,
        _ => 0.0,
    };

    Ok(WeightForecast {
        profile_id,
        generated_at,
        model_used,
        fallback_reason,
        confidence_level: confidence,
        data_points_used: points.len(),
        trend_direction: classify_trend(trend_magnitude_kg),
        trend_magnitude_kg,
        predictions,
    })
}

/// Fit the selected model. ARIMA failures degrade to exponential smoothing.
fn fit_with_fallback(
    selected: ForecastModel,
    points: &[WeightPoint],
    horizon: usize,
    config: &ForecastConfig,
) -> CoreResult<(ForecastModel, Option<String>, ModelOutput)> {
    match selected {
        ForecastModel::SimpleTrend => Ok((selected, None, simple_trend::forecast(points, horizon, config))),
        ForecastModel::LinearRegression => Ok((selected, None, linear_regression::forecast(points, horizon, config)?)),
        ForecastModel::ExponentialSmoothing => Ok((selected, None, holt::forecast(points, horizon, config))),
        ForecastModel::Arima => match arima::forecast(points, horizon, config) {
            Ok(output) => Ok((selected, None, output)),
            Err(CoreError::ModelConvergence { model, reason }) => {
                warn!(
                    model,
                    reason = %reason,
                    fallback = %ForecastModel::ExponentialSmoothing,
                    "Forecast model failed, falling back"
                );
                Ok((
                    ForecastModel::ExponentialSmoothing,
                    Some(format!("{model} did not converge: {reason}")),
                    holt::forecast(points, horizon, config),
                ))
            }
            Err(other) => Err(other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn generated_at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn daily(weights: &[f64]) -> Vec<WeightPoint> {
        weights
            .iter()
            .enumerate()
            .map(|(i, w)| WeightPoint::new(start() + Duration::days(i as i64), *w))
            .collect()
    }

    fn declining(n: usize, per_day: f64) -> Vec<WeightPoint> {
        let weights: Vec<f64> = (0..n).map(|i| 90.0 - per_day * i as f64).collect();
        daily(&weights)
    }

    /// Deterministic small wobble so fits have non-zero residuals
    fn wobbly(n: usize) -> Vec<WeightPoint> {
        let weights: Vec<f64> = (0..n)
            .map(|i| 85.0 - 0.05 * i as f64 + 0.3 * ((i * 7 % 5) as f64 - 2.0) / 2.0)
            .collect();
        daily(&weights)
    }

    /// Seeded ARIMA(1,1,1) path: φ = 0.5, θ = 0.3, drift −0.05 kg/day,
    /// uniform shocks in ±0.3 kg from a 64-bit LCG
    pub(super) fn seeded_path(n: usize, seed: u64) -> Vec<f64> {
        let mut state = seed;
        let (mut level, mut x, mut previous_shock) = (85.0, 0.0, 0.0);
        (0..n)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                let shock = ((state >> 11) as f64 / (1u64 << 53) as f64 - 0.5) * 0.6;
                x = 0.5 * x + shock + 0.3 * previous_shock;
                previous_shock = shock;
                level += -0.05 + x;
                level
            })
            .collect()
    }

    fn run(points: &[WeightPoint], days: u32, confidence: f64) -> CoreResult<WeightForecast> {
        forecast_series(Uuid::nil(), points, days, confidence, &ForecastConfig::default(), generated_at())
    }

    #[rstest]
    #[case(2, ForecastModel::SimpleTrend)]
    #[case(5, ForecastModel::SimpleTrend)]
    #[case(6, ForecastModel::SimpleTrend)]
    #[case(7, ForecastModel::LinearRegression)]
    #[case(10, ForecastModel::LinearRegression)]
    #[case(13, ForecastModel::LinearRegression)]
    #[case(14, ForecastModel::ExponentialSmoothing)]
    #[case(20, ForecastModel::ExponentialSmoothing)]
    #[case(29, ForecastModel::ExponentialSmoothing)]
    #[case(30, ForecastModel::Arima)]
    #[case(40, ForecastModel::Arima)]
    fn test_model_selection(#[case] n: usize, #[case] expected: ForecastModel) {
        assert_eq!(ForecastModel::select(n), expected);
    }

    #[rstest]
    #[case(5, ForecastModel::SimpleTrend)]
    #[case(10, ForecastModel::LinearRegression)]
    #[case(20, ForecastModel::ExponentialSmoothing)]
    fn test_forecast_reports_selected_model(#[case] n: usize, #[case] expected: ForecastModel) {
        let forecast = run(&wobbly(n), 14, 0.95).unwrap();
        assert_eq!(forecast.model_used, expected);
        assert_eq!(forecast.fallback_reason, None);
        assert_eq!(forecast.data_points_used, n);
    }

    #[rstest]
    #[case(40, 1)]
    #[case(40, 2024)]
    #[case(60, 7)]
    #[case(60, 42)]
    fn test_noisy_history_is_fitted_by_arima(#[case] n: usize, #[case] seed: u64) {
        let forecast = run(&daily(&seeded_path(n, seed)), 14, 0.95).unwrap();
        assert_eq!(forecast.model_used, ForecastModel::Arima);
        assert_eq!(forecast.fallback_reason, None);
        assert_eq!(forecast.predictions.len(), 14);
    }

    #[test]
    fn test_arima_failure_falls_back_to_exponential_smoothing() {
        let config = ForecastConfig {
            arima_max_iterations: 1,
            ..ForecastConfig::default()
        };
        let forecast =
            forecast_series(Uuid::nil(), &wobbly(40), 10, 0.95, &config, generated_at()).unwrap();
        assert_eq!(forecast.model_used, ForecastModel::ExponentialSmoothing);
        assert!(forecast.fallback_reason.unwrap().contains("ARIMA"));
        assert_eq!(forecast.predictions.len(), 10);
    }

    #[test]
    fn test_arima_time_budget_falls_back() {
        let config = ForecastConfig {
            arima_time_budget_ms: 0,
            ..ForecastConfig::default()
        };
        let forecast =
            forecast_series(Uuid::nil(), &wobbly(35), 5, 0.68, &config, generated_at()).unwrap();
        assert_eq!(forecast.model_used, ForecastModel::ExponentialSmoothing);
        assert!(forecast.fallback_reason.unwrap().contains("time budget"));
    }

    #[test]
    fn test_single_point_is_insufficient() {
        let err = run(&daily(&[80.0]), 7, 0.95).unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientData {
                required: 2,
                available: 1
            }
        );
        assert!(matches!(run(&[], 7, 0.95), Err(CoreError::InsufficientData { .. })));
    }

    #[test]
    fn test_parameters_validated_before_data() {
        // Even with too little data, a bad horizon is reported first
        let err = run(&daily(&[80.0]), 0, 0.95).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ref v) if v.field == "days_ahead"));

        let err = run(&daily(&[80.0, 79.0]), 91, 0.95).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ref v) if v.field == "days_ahead"));

        let err = run(&daily(&[80.0, 79.0]), 7, 0.9).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ref v) if v.field == "confidence_level"));
    }

    #[test]
    fn test_non_positive_weight_rejected() {
        let err = run(&daily(&[80.0, 0.0, 79.0]), 7, 0.95).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ref v) if v.field == "weight_kg"));
        let err = run(&daily(&[80.0, -3.0]), 7, 0.95).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_unordered_points_rejected() {
        let mut points = daily(&[80.0, 79.5, 79.0]);
        points.swap(0, 2);
        assert!(matches!(run(&points, 7, 0.95), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_horizon_past_latest_date_rejected() {
        let points = vec![
            WeightPoint::new(NaiveDate::MAX.pred_opt().unwrap(), 80.0),
            WeightPoint::new(NaiveDate::MAX, 79.8),
        ];
        let err = run(&points, 7, 0.95).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ref v) if v.field == "history"));
    }

    #[rstest]
    #[case(0.5, TrendDirection::Increasing)]
    #[case(-0.5, TrendDirection::Decreasing)]
    #[case(0.49, TrendDirection::Stable)]
    #[case(-0.49, TrendDirection::Stable)]
    #[case(0.0, TrendDirection::Stable)]
    #[case(3.2, TrendDirection::Increasing)]
    fn test_trend_boundary(#[case] magnitude: f64, #[case] expected: TrendDirection) {
        assert_eq!(classify_trend(magnitude), expected);
    }

    #[test]
    fn test_constant_weights_forecast_flat_and_stable() {
        for n in [3usize, 10, 20, 30] {
            let forecast = run(&daily(&vec![80.0; n]), 30, 0.95).unwrap();
            assert_eq!(forecast.trend_direction, TrendDirection::Stable, "n = {n}");
            assert!(forecast.trend_magnitude_kg.abs() < 1e-6, "n = {n}");
            assert_eq!(forecast.predictions.len(), 30);
            for p in &forecast.predictions {
                assert!((p.predicted_weight_kg - 80.0).abs() < 1e-6, "n = {n}");
                assert!(p.lower_bound_kg.is_finite() && p.upper_bound_kg.is_finite());
                let width = p.upper_bound_kg - p.lower_bound_kg;
                assert!(width > 0.0, "n = {n}: interval collapsed");
                assert!(width < 5.0, "n = {n}: interval too wide ({width})");
            }
        }
    }

    #[test]
    fn test_declining_history_classified_decreasing() {
        for n in [5usize, 10, 20, 40] {
            let forecast = run(&declining(n, 0.1), 30, 0.95).unwrap();
            assert_eq!(forecast.trend_direction, TrendDirection::Decreasing, "n = {n}");
            assert!((forecast.trend_magnitude_kg - (-2.9)).abs() < 0.3, "n = {n}");
        }
    }

    #[test]
    fn test_prediction_dates_follow_last_weigh_in() {
        let points = daily(&[80.0, 79.8, 79.9, 79.5]);
        let forecast = run(&points, 3, 0.95).unwrap();
        let last = points[3].date;
        let dates: Vec<_> = forecast.predictions.iter().map(|p| p.date).collect();
        assert_eq!(
            dates,
            vec![last + Duration::days(1), last + Duration::days(2), last + Duration::days(3)]
        );
    }

    #[test]
    fn test_wider_confidence_gives_wider_bounds() {
        let points = wobbly(20);
        let narrow = run(&points, 10, 0.68).unwrap();
        let wide = run(&points, 10, 0.99).unwrap();
        for (n, w) in narrow.predictions.iter().zip(&wide.predictions) {
            assert_eq!(n.predicted_weight_kg, w.predicted_weight_kg);
            assert!(w.upper_bound_kg - w.lower_bound_kg > n.upper_bound_kg - n.lower_bound_kg);
        }
    }

    #[test]
    fn test_forecast_is_byte_identical_across_calls() {
        for n in [4usize, 9, 18, 45] {
            let points = wobbly(n);
            let a = serde_json::to_string(&run(&points, 60, 0.95).unwrap()).unwrap();
            let b = serde_json::to_string(&run(&points, 60, 0.95).unwrap()).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_forecast_serialization_names() {
        let forecast = run(&daily(&vec![80.0; 30]), 2, 0.99).unwrap();
        let json = serde_json::to_value(&forecast).unwrap();
        assert_eq!(json["model_used"], "ARIMA");
        assert_eq!(json["confidence_level"], 0.99);
        assert_eq!(json["trend_direction"], "stable");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property: bounds always bracket the prediction
        #[test]
        fn prop_bounds_bracket_prediction(
            weights in prop::collection::vec(60.0f64..120.0, 2..45),
            days in 1u32..=90
        ) {
            let forecast = run(&daily(&weights), days, 0.95).unwrap();
            prop_assert_eq!(forecast.predictions.len(), days as usize);
            for p in &forecast.predictions {
                prop_assert!(p.predicted_weight_kg.is_finite());
                prop_assert!(p.lower_bound_kg < p.predicted_weight_kg);
                prop_assert!(p.upper_bound_kg > p.predicted_weight_kg);
            }
        }
    }
}
