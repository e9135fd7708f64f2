//! Weekly recalculation
//!
//! A pure function an external scheduler can call once a week per profile.
//! It bundles the adaptive TDEE, the last week's adherence, a fresh forecast,
//! and targets re-derived from the adaptive TDEE. Components without enough
//! data are reported as `None`.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::adaptive_tdee::{estimate_adaptive_tdee, AdaptiveTdeeEstimate};
use crate::analytics::{progress_score, ProgressScore};
use crate::config::EngineConfig;
use crate::errors::{CoreError, CoreResult};
use crate::forecast::{forecast_weight_at, WeightForecast};
use crate::metabolic::{calorie_target, macro_split, MacroSplit, NutritionTargets};
use crate::models::NutritionalProfile;
use crate::validation::ValidationError;

/// Everything recomputed for one profile on one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecalculationReport {
    pub profile_id: Uuid,
    pub as_of: NaiveDate,
    pub generated_at: DateTime<Utc>,
    /// Formula targets from the profile's user data
    pub formula_targets: NutritionTargets,
    pub adaptive_tdee: Option<AdaptiveTdeeEstimate>,
    /// Goal-adjusted target using the adaptive TDEE
    pub adjusted_calorie_target: Option<f64>,
    pub adjusted_macros: Option<MacroSplit>,
    pub weekly_score: ProgressScore,
    pub forecast: Option<WeightForecast>,
}

/// Turn an insufficient-data error into an absent component
fn optional<T>(result: CoreResult<T>) -> CoreResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(CoreError::InsufficientData { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Recalculate a profile using only records dated on or before `as_of`
pub fn recalculate(profile: &NutritionalProfile, as_of: NaiveDate, config: &EngineConfig) -> CoreResult<RecalculationReport> {
    recalculate_at(profile, as_of, config, Utc::now())
}

/// As [`recalculate`] with a caller-supplied generation timestamp
pub fn recalculate_at(
    profile: &NutritionalProfile,
    as_of: NaiveDate,
    config: &EngineConfig,
    generated_at: DateTime<Utc>,
) -> CoreResult<RecalculationReport> {
    let settings = &config.recalculation;
    if settings.score_window_days == 0 {
        return Err(ValidationError::new("score_window_days", "must be at least 1 day").into());
    }
    let window_start = as_of
        .checked_sub_signed(Duration::days(i64::from(settings.score_window_days) - 1))
        .ok_or_else(|| ValidationError::new("score_window_days", "reaches before the earliest supported date"))?;

    let history = match profile.history().first() {
        Some(first) if first.date <= as_of => profile.history().slice(first.date, as_of),
        _ => Default::default(),
    };
    let targets = profile.targets().clone();

    let adaptive_tdee = optional(estimate_adaptive_tdee(&history, targets.tdee, &config.kalman))?;

    let (adjusted_calorie_target, adjusted_macros) = match (&adaptive_tdee, history.last()) {
        (Some(estimate), Some(latest)) => {
            let adjusted = calorie_target(estimate.tdee_kcal, profile.goal());
            if adjusted > 0.0 {
                (Some(adjusted), Some(macro_split(adjusted, latest.weight_kg, profile.goal())?))
            } else {
                warn!(
                    profile_id = %profile.profile_id(),
                    adaptive_tdee = estimate.tdee_kcal,
                    "Adaptive TDEE gives a non-positive calorie target; keeping formula targets"
                );
                (None, None)
            }
        }
        _ => (None, None),
    };

    let weekly_score = progress_score(&history, &targets, window_start, as_of, &config.analytics)?;

    let forecast = optional(forecast_weight_at(
        profile.profile_id(),
        &history,
        settings.days_ahead,
        settings.confidence_level,
        &config.forecast,
        generated_at,
    ))?;

    info!(
        profile_id = %profile.profile_id(),
        %as_of,
        records = history.len(),
        adaptive_tdee = adaptive_tdee.as_ref().map(|e| e.tdee_kcal),
        forecast_model = forecast.as_ref().map(|f| f.model_used.name()),
        "Recalculated profile"
    );

    Ok(RecalculationReport {
        profile_id: profile.profile_id(),
        as_of,
        generated_at,
        formula_targets: targets,
        adaptive_tdee,
        adjusted_calorie_target,
        adjusted_macros,
        weekly_score,
        forecast,
    })
}
