//! NutriForecast core library
//!
//! Metabolic targets, progress analytics, adaptive TDEE estimation and weight
//! forecasting. Everything here is synchronous and side-effect free; stored
//! records come in through [`history::ProgressStore`] and results go back out
//! as plain values.

pub mod adaptive_tdee;
pub mod analytics;
pub mod config;
pub mod errors;
pub mod forecast;
pub mod history;
pub mod metabolic;
pub mod models;
pub mod recalculation;
pub mod validation;

// Re-export commonly used items
pub use adaptive_tdee::{estimate_adaptive_tdee, estimate_for_profile, AdaptiveTdeeEstimate, FilterState, FilterStep};
pub use analytics::{progress_score, score_from_store, score_profile, ProgressScore};
pub use config::{AnalyticsConfig, EngineConfig, ForecastConfig, KalmanConfig, RecalculationConfig};
pub use errors::*;
pub use forecast::{
    classify_trend, forecast_series, forecast_weight, forecast_weight_at, ConfidenceLevel, ForecastModel,
    ForecastPoint, TrendDirection, WeightForecast, WeightPoint,
};
pub use history::{InMemoryProgressStore, ProgressHistory, ProgressStore};
pub use metabolic::{
    calculate_bmr_mifflin, calorie_target, compute_profile, macro_split, ActivityLevel, BiologicalSex, Goal,
    MacroSplit, NutritionTargets,
};
pub use models::{NutritionalProfile, ProgressRecord, UserData};
pub use recalculation::{recalculate, recalculate_at, RecalculationReport};
