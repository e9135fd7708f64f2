//! Tunable engine parameters
//!
//! The noise constants and ARIMA settings are calibration parameters rather
//! than known truths, so they live here instead of in the algorithms. Every
//! section deserializes with defaults, so a partial config file only needs
//! the keys it overrides.

use serde::{Deserialize, Serialize};

/// All engine parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub kalman: KalmanConfig,
    pub forecast: ForecastConfig,
    pub analytics: AnalyticsConfig,
    pub recalculation: RecalculationConfig,
}

/// Adaptive TDEE filter noise parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KalmanConfig {
    /// Daily process variance of body weight (kg²)
    pub process_noise_weight: f64,
    /// Daily process variance of TDEE (kcal²)
    pub process_noise_tdee: f64,
    /// Variance of a single scale reading (kg²)
    pub observation_noise: f64,
    /// Initial variance of the weight estimate (kg²)
    pub initial_weight_variance: f64,
    /// Initial variance of the formula TDEE (kcal²)
    pub initial_tdee_variance: f64,
}

impl Default for KalmanConfig {
    fn default() -> Self {
        Self {
            process_noise_weight: 0.01,
            process_noise_tdee: 100.0,
            observation_noise: 0.36,
            initial_weight_variance: 0.25,
            initial_tdee_variance: 250_000.0,
        }
    }
}

/// Forecasting engine parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Nelder-Mead iteration cap for the ARIMA fit
    pub arima_max_iterations: usize,
    /// Simplex spread below which the ARIMA fit counts as converged
    pub arima_tolerance: f64,
    /// Wall-clock budget for the ARIMA fit (ms); exceeding it triggers the fallback
    pub arima_time_budget_ms: u64,
    /// Floor on every model's standard error (kg)
    pub min_std_error_kg: f64,
    /// Extra standard error per forecast day for SimpleTrend (kg/day)
    pub simple_trend_daily_growth_kg: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            arima_max_iterations: 500,
            arima_tolerance: 1e-8,
            arima_time_budget_ms: 2000,
            min_std_error_kg: 0.05,
            simple_trend_daily_growth_kg: 0.02,
        }
    }
}

/// Progress analytics tolerances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Allowed distance from the goal's daily balance (kcal)
    pub deficit_tolerance_kcal: f64,
    /// Allowed distance from each macro target (g)
    pub macro_tolerance_g: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            deficit_tolerance_kcal: 200.0,
            macro_tolerance_g: 10.0,
        }
    }
}

/// Weekly recalculation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecalculationConfig {
    /// Forecast horizon (days)
    pub days_ahead: u32,
    /// One of 0.68, 0.95, 0.99
    pub confidence_level: f64,
    /// Length of the adherence window ending at the recalculation date (days)
    pub score_window_days: u32,
}

impl Default for RecalculationConfig {
    fn default() -> Self {
        Self {
            days_ahead: 30,
            confidence_level: 0.95,
            score_window_days: 7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.analytics.deficit_tolerance_kcal, 200.0);
        assert_eq!(config.analytics.macro_tolerance_g, 10.0);
        assert_eq!(config.forecast.arima_max_iterations, 500);
        assert!(config.kalman.observation_noise > 0.0);
        assert_eq!(config.recalculation.days_ahead, 30);
        assert_eq!(config.recalculation.score_window_days, 7);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"kalman": {"observation_noise": 0.5}}"#).unwrap();
        assert_eq!(config.kalman.observation_noise, 0.5);
        assert_eq!(config.kalman.process_noise_tdee, 100.0);
        assert_eq!(config.forecast, ForecastConfig::default());
    }
}
