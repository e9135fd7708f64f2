//! Data models for the NutriForecast core

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::errors::CoreResult;
use crate::history::ProgressHistory;
use crate::metabolic::{compute_profile, ActivityLevel, BiologicalSex, Goal, NutritionTargets};
use crate::validation::{
    validate_calories, validate_height_cm, validate_macro_grams, validate_record_date,
    validate_weight_kg, ValidationError,
};

/// Physical profile of a user. Replaced wholesale on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct UserData {
    #[validate(range(min = 30.0, max = 300.0, message = "must be between 30 and 300 kg"))]
    pub weight_kg: f64,
    #[validate(range(min = 100.0, max = 250.0, message = "must be between 100 and 250 cm"))]
    pub height_cm: f64,
    #[validate(range(min = 18, max = 120, message = "must be between 18 and 120 years"))]
    pub age_years: u32,
    pub sex: BiologicalSex,
    pub activity_level: ActivityLevel,
}

impl UserData {
    pub fn new(
        weight_kg: f64,
        height_cm: f64,
        age_years: u32,
        sex: BiologicalSex,
        activity_level: ActivityLevel,
    ) -> Result<Self, ValidationError> {
        let data = Self {
            weight_kg,
            height_cm,
            age_years,
            sex,
            activity_level,
        };
        data.validate_ranges()?;
        Ok(data)
    }

    /// Re-check every range. Entry points call this because callers can build
    /// the struct directly.
    pub fn validate_ranges(&self) -> Result<(), ValidationError> {
        // range() lets NaN through, so finiteness is checked separately
        validate_weight_kg(self.weight_kg)?;
        validate_height_cm(self.height_cm)?;
        self.validate()?;
        Ok(())
    }
}

/// One day of tracked progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub date: NaiveDate,
    pub weight_kg: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumed_calories: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumed_protein_g: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumed_carbs_g: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumed_fat_g: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories_burned_bmr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories_burned_active: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ProgressRecord {
    /// Weight-only record
    pub fn new(date: NaiveDate, weight_kg: f64) -> Self {
        Self {
            date,
            weight_kg,
            consumed_calories: None,
            consumed_protein_g: None,
            consumed_carbs_g: None,
            consumed_fat_g: None,
            calories_burned_bmr: None,
            calories_burned_active: None,
            notes: None,
        }
    }

    pub fn with_intake(mut self, calories: f64) -> Self {
        self.consumed_calories = Some(calories);
        self
    }

    pub fn with_macros(mut self, protein_g: f64, carbs_g: f64, fat_g: f64) -> Self {
        self.consumed_protein_g = Some(protein_g);
        self.consumed_carbs_g = Some(carbs_g);
        self.consumed_fat_g = Some(fat_g);
        self
    }

    pub fn with_burned(mut self, bmr: f64, active: f64) -> Self {
        self.calories_burned_bmr = Some(bmr);
        self.calories_burned_active = Some(active);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Resting plus active calories burned, when both were recorded
    pub fn calories_burned(&self) -> Option<f64> {
        Some(self.calories_burned_bmr? + self.calories_burned_active?)
    }

    /// Consumed minus burned. Negative is a deficit. Undefined unless both
    /// sides were recorded.
    pub fn calorie_balance(&self) -> Option<f64> {
        let consumed = self.consumed_calories?;
        let burned = self.calories_burned()?;
        Some(consumed - burned)
    }

    /// (protein, carbs, fat) when all three were logged
    pub fn macros(&self) -> Option<(f64, f64, f64)> {
        Some((
            self.consumed_protein_g?,
            self.consumed_carbs_g?,
            self.consumed_fat_g?,
        ))
    }

    /// Validate every recorded field against `today`
    pub fn validate(&self, today: NaiveDate) -> Result<(), ValidationError> {
        validate_record_date(self.date, today)?;
        validate_weight_kg(self.weight_kg)?;

        let calorie_fields = [
            ("consumed_calories", self.consumed_calories),
            ("calories_burned_bmr", self.calories_burned_bmr),
            ("calories_burned_active", self.calories_burned_active),
        ];
        for (field, value) in calorie_fields {
            if let Some(v) = value {
                validate_calories(field, v)?;
            }
        }

        let macro_fields = [
            ("consumed_protein_g", self.consumed_protein_g),
            ("consumed_carbs_g", self.consumed_carbs_g),
            ("consumed_fat_g", self.consumed_fat_g),
        ];
        for (field, value) in macro_fields {
            if let Some(v) = value {
                validate_macro_grams(field, v)?;
            }
        }

        Ok(())
    }
}

/// Nutritional profile aggregate
///
/// Targets are derived state: every constructor and updater recomputes them,
/// so the fields are private and exposed through accessors only.
#[derive(Debug, Clone, Serialize)]
pub struct NutritionalProfile {
    profile_id: Uuid,
    user_id: Uuid,
    user_data: UserData,
    goal: Goal,
    targets: NutritionTargets,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    history: ProgressHistory,
}

impl NutritionalProfile {
    /// Create a profile with an empty history
    pub fn new(user_id: Uuid, user_data: UserData, goal: Goal) -> CoreResult<Self> {
        let targets = compute_profile(&user_data, goal)?;
        let now = Utc::now();

        Ok(Self {
            profile_id: Uuid::new_v4(),
            user_id,
            user_data,
            goal,
            targets,
            created_at: now,
            updated_at: now,
            history: ProgressHistory::new(),
        })
    }

    /// Rebuild a stored profile, recomputing its targets
    pub fn restore(
        profile_id: Uuid,
        user_id: Uuid,
        user_data: UserData,
        goal: Goal,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        history: ProgressHistory,
    ) -> CoreResult<Self> {
        let targets = compute_profile(&user_data, goal)?;
        Ok(Self {
            profile_id,
            user_id,
            user_data,
            goal,
            targets,
            created_at,
            updated_at,
            history,
        })
    }

    /// Replace the user data, returning the updated profile
    pub fn with_user_data(&self, user_data: UserData) -> CoreResult<Self> {
        let targets = compute_profile(&user_data, self.goal)?;
        Ok(Self {
            user_data,
            targets,
            updated_at: Utc::now(),
            ..self.clone()
        })
    }

    /// Replace the goal, returning the updated profile
    pub fn with_goal(&self, goal: Goal) -> CoreResult<Self> {
        let targets = compute_profile(&self.user_data, goal)?;
        Ok(Self {
            goal,
            targets,
            updated_at: Utc::now(),
            ..self.clone()
        })
    }

    /// Insert or replace the record for its date, returning the updated profile
    pub fn record_progress(&self, record: ProgressRecord) -> CoreResult<Self> {
        let history = self.history.record_progress(record)?;
        Ok(Self {
            history,
            updated_at: Utc::now(),
            ..self.clone()
        })
    }

    pub fn profile_id(&self) -> Uuid {
        self.profile_id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn user_data(&self) -> &UserData {
        &self.user_data
    }

    pub fn goal(&self) -> Goal {
        self.goal
    }

    pub fn targets(&self) -> &NutritionTargets {
        &self.targets
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn history(&self) -> &ProgressHistory {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn user_data() -> UserData {
        UserData::new(80.0, 180.0, 30, BiologicalSex::Male, ActivityLevel::Moderate).unwrap()
    }

    #[test]
    fn test_user_data_rejects_out_of_range() {
        assert!(UserData::new(25.0, 180.0, 30, BiologicalSex::Male, ActivityLevel::Light).is_err());
        assert!(UserData::new(80.0, 260.0, 30, BiologicalSex::Male, ActivityLevel::Light).is_err());
        let err = UserData::new(80.0, 180.0, 17, BiologicalSex::Male, ActivityLevel::Light).unwrap_err();
        assert_eq!(err.field, "age_years");
        assert!(UserData::new(f64::NAN, 180.0, 30, BiologicalSex::Male, ActivityLevel::Light).is_err());
    }

    #[test]
    fn test_calorie_balance_requires_both_sides() {
        let base = ProgressRecord::new(date(1), 80.0);
        assert_eq!(base.calorie_balance(), None);
        assert_eq!(base.clone().with_intake(2000.0).calorie_balance(), None);
        assert_eq!(base.clone().with_burned(1800.0, 400.0).calorie_balance(), None);

        let full = base.with_intake(2000.0).with_burned(1800.0, 400.0);
        assert_eq!(full.calorie_balance(), Some(-200.0));
    }

    #[test]
    fn test_partial_burn_leaves_balance_undefined() {
        let mut record = ProgressRecord::new(date(1), 80.0).with_intake(2000.0);
        record.calories_burned_bmr = Some(1700.0);
        assert_eq!(record.calories_burned(), None);
        assert_eq!(record.calorie_balance(), None);

        record.calories_burned_active = Some(0.0);
        assert_eq!(record.calories_burned(), Some(1700.0));
        assert_eq!(record.calorie_balance(), Some(300.0));
    }

    #[test]
    fn test_record_validation() {
        let today = date(10);
        assert!(ProgressRecord::new(date(5), 80.0).validate(today).is_ok());
        assert!(ProgressRecord::new(date(11), 80.0).validate(today).is_err());
        assert!(ProgressRecord::new(date(5), 0.0).validate(today).is_err());
        assert!(ProgressRecord::new(date(5), 80.0)
            .with_intake(-10.0)
            .validate(today)
            .is_err());
        assert!(ProgressRecord::new(date(5), 80.0)
            .with_macros(150.0, -1.0, 60.0)
            .validate(today)
            .is_err());
    }

    #[test]
    fn test_profile_targets_follow_goal_changes() {
        let profile = NutritionalProfile::new(Uuid::new_v4(), user_data(), Goal::Maintain).unwrap();
        let maintain_target = profile.targets().calorie_target;

        let cut = profile.with_goal(Goal::Cut).unwrap();
        assert_eq!(cut.goal(), Goal::Cut);
        assert!((cut.targets().calorie_target - (maintain_target - 500.0)).abs() < 1e-9);
        assert_eq!(cut.profile_id(), profile.profile_id());
        // Original is untouched
        assert_eq!(profile.goal(), Goal::Maintain);
    }

    #[test]
    fn test_profile_targets_follow_user_data_changes() {
        let profile = NutritionalProfile::new(Uuid::new_v4(), user_data(), Goal::Cut).unwrap();
        let lighter = UserData {
            weight_kg: 75.0,
            ..user_data()
        };
        let updated = profile.with_user_data(lighter).unwrap();
        assert!((profile.targets().bmr - updated.targets().bmr - 50.0).abs() < 1e-9);
        assert!(updated.updated_at() >= profile.updated_at());
    }

    #[test]
    fn test_profile_record_progress_replaces_by_date() {
        let today = Utc::now().date_naive();
        let profile = NutritionalProfile::new(Uuid::new_v4(), user_data(), Goal::Cut).unwrap();
        let profile = profile
            .record_progress(ProgressRecord::new(today, 80.0))
            .unwrap()
            .record_progress(ProgressRecord::new(today, 79.5))
            .unwrap();
        assert_eq!(profile.history().len(), 1);
        assert_eq!(profile.history().get(today).unwrap().weight_kg, 79.5);
    }
}
