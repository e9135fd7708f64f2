//! Progress analytics
//!
//! Deficit/surplus adherence and macro adherence over an inclusive date range.
//! Aggregates are `None` when nothing feeds them; they are never reported as
//! zero for missing data.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AnalyticsConfig;
use crate::errors::CoreResult;
use crate::history::{ProgressHistory, ProgressStore};
use crate::metabolic::NutritionTargets;
use crate::models::{NutritionalProfile, ProgressRecord};
use crate::validation::validate_date_range;

/// Adherence statistics for a date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressScore {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Records found in the range
    pub days_with_data: usize,
    /// Last minus first weight in the range
    pub weight_delta_kg: Option<f64>,
    pub avg_daily_calories: Option<f64>,
    pub avg_calories_burned: Option<f64>,
    /// Mean calorie balance over days with both sides recorded
    pub avg_deficit: Option<f64>,
    pub avg_protein_g: Option<f64>,
    pub avg_carbs_g: Option<f64>,
    pub avg_fat_g: Option<f64>,
    /// Daily balance the goal aims for
    pub target_deficit: f64,
    pub days_deficit_on_track: usize,
    pub days_macros_on_track: usize,
    /// min(deficit days, macro days) / days with data
    pub adherence_rate: Option<f64>,
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

fn deficit_on_track(record: &ProgressRecord, target_deficit: f64, tolerance: f64) -> bool {
    record
        .calorie_balance()
        .map(|balance| (balance - target_deficit).abs() <= tolerance)
        .unwrap_or(false)
}

fn macros_on_track(record: &ProgressRecord, targets: &NutritionTargets, tolerance: f64) -> bool {
    match record.macros() {
        Some((protein, carbs, fat)) => {
            (protein - f64::from(targets.macros.protein_g)).abs() <= tolerance
                && (carbs - f64::from(targets.macros.carbs_g)).abs() <= tolerance
                && (fat - f64::from(targets.macros.fat_g)).abs() <= tolerance
        }
        None => false,
    }
}

/// Score a set of records that already fall in `[start, end]`
fn score_records(
    records: &[&ProgressRecord],
    targets: &NutritionTargets,
    start: NaiveDate,
    end: NaiveDate,
    config: &AnalyticsConfig,
) -> ProgressScore {
    let target_deficit = targets.goal.calorie_adjustment();
    let days_with_data = records.len();

    let weight_delta_kg = match (records.first(), records.last()) {
        (Some(first), Some(last)) if days_with_data >= 2 => Some(last.weight_kg - first.weight_kg),
        _ => None,
    };

    let days_deficit_on_track = records
        .iter()
        .filter(|r| deficit_on_track(r, target_deficit, config.deficit_tolerance_kcal))
        .count();
    let days_macros_on_track = records
        .iter()
        .filter(|r| macros_on_track(r, targets, config.macro_tolerance_g))
        .count();

    let adherence_rate = if days_with_data == 0 {
        None
    } else {
        Some(days_deficit_on_track.min(days_macros_on_track) as f64 / days_with_data as f64)
    };

    debug!(
        %start,
        %end,
        days_with_data,
        days_deficit_on_track,
        days_macros_on_track,
        "Scored progress range"
    );

    ProgressScore {
        start_date: start,
        end_date: end,
        days_with_data,
        weight_delta_kg,
        avg_daily_calories: mean(records.iter().filter_map(|r| r.consumed_calories)),
        avg_calories_burned: mean(records.iter().filter_map(|r| r.calories_burned())),
        avg_deficit: mean(records.iter().filter_map(|r| r.calorie_balance())),
        avg_protein_g: mean(records.iter().filter_map(|r| r.consumed_protein_g)),
        avg_carbs_g: mean(records.iter().filter_map(|r| r.consumed_carbs_g)),
        avg_fat_g: mean(records.iter().filter_map(|r| r.consumed_fat_g)),
        target_deficit,
        days_deficit_on_track,
        days_macros_on_track,
        adherence_rate,
    }
}

/// Score the records of `history` within `[start, end]` against `targets`
pub fn progress_score(
    history: &ProgressHistory,
    targets: &NutritionTargets,
    start: NaiveDate,
    end: NaiveDate,
    config: &AnalyticsConfig,
) -> CoreResult<ProgressScore> {
    validate_date_range(start, end)?;
    let records: Vec<&ProgressRecord> = history.range(start, end).collect();
    Ok(score_records(&records, targets, start, end, config))
}

/// Score a profile's own history against its current targets
pub fn score_profile(
    profile: &NutritionalProfile,
    start: NaiveDate,
    end: NaiveDate,
    config: &AnalyticsConfig,
) -> CoreResult<ProgressScore> {
    progress_score(profile.history(), profile.targets(), start, end, config)
}

/// Score a profile reading its records from a store
pub fn score_from_store<S: ProgressStore>(
    store: &S,
    profile: &NutritionalProfile,
    start: NaiveDate,
    end: NaiveDate,
    config: &AnalyticsConfig,
) -> CoreResult<ProgressScore> {
    let records = store.records_in_range(profile.profile_id(), start, end)?;
    let refs: Vec<&ProgressRecord> = records.iter().collect();
    Ok(score_records(&refs, profile.targets(), start, end, config))
}
