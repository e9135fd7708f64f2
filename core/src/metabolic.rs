//! Metabolic calculations module
//!
//! Provides BMR, TDEE, goal-adjusted calorie targets and macro splits based on
//! a user's [`UserData`] and [`Goal`].
//!
//! # Design Principles
//!
//! 1. **Pure Functions**: All calculations are pure, no side effects
//! 2. **Evidence-Based**: Mifflin-St Jeor for resting expenditure
//! 3. **Consistent**: Macro grams always add back up to the calorie target

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CoreResult;
use crate::models::UserData;
use crate::validation::{
    invalid_choice, validate_calorie_target, validate_weight_kg, ValidationError,
    VALID_ACTIVITY_LEVELS, VALID_BIOLOGICAL_SEX, VALID_GOALS,
};

/// Energy per gram of protein (kcal)
pub const KCAL_PER_G_PROTEIN: f64 = 4.0;
/// Energy per gram of carbohydrate (kcal)
pub const KCAL_PER_G_CARBS: f64 = 4.0;
/// Energy per gram of fat (kcal)
pub const KCAL_PER_G_FAT: f64 = 9.0;

// ============================================================================
// Profile Enums
// ============================================================================

/// Biological sex for BMR calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiologicalSex {
    Male,
    Female,
}

impl FromStr for BiologicalSex {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "male" => Ok(BiologicalSex::Male),
            "female" => Ok(BiologicalSex::Female),
            _ => Err(invalid_choice("sex", "biological sex", VALID_BIOLOGICAL_SEX)),
        }
    }
}

impl fmt::Display for BiologicalSex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BiologicalSex::Male => write!(f, "male"),
            BiologicalSex::Female => write!(f, "female"),
        }
    }
}

/// Activity level for TDEE calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    /// Little or no exercise
    Sedentary,
    /// Light exercise 1-3 days/week
    #[default]
    Light,
    /// Moderate exercise 3-5 days/week
    Moderate,
    /// Hard exercise 6-7 days/week
    Active,
    /// Very hard exercise, physical job
    VeryActive,
}

impl ActivityLevel {
    /// Get the activity multiplier (PAL) for TDEE calculation
    pub fn multiplier(&self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::Light => 1.375,
            ActivityLevel::Moderate => 1.55,
            ActivityLevel::Active => 1.725,
            ActivityLevel::VeryActive => 1.9,
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "Little or no exercise",
            ActivityLevel::Light => "Light exercise 1-3 days/week",
            ActivityLevel::Moderate => "Moderate exercise 3-5 days/week",
            ActivityLevel::Active => "Hard exercise 6-7 days/week",
            ActivityLevel::VeryActive => "Very hard exercise or physical job",
        }
    }
}

impl FromStr for ActivityLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sedentary" => Ok(ActivityLevel::Sedentary),
            "light" => Ok(ActivityLevel::Light),
            "moderate" => Ok(ActivityLevel::Moderate),
            "active" => Ok(ActivityLevel::Active),
            "very_active" => Ok(ActivityLevel::VeryActive),
            _ => Err(invalid_choice(
                "activity_level",
                "activity level",
                VALID_ACTIVITY_LEVELS,
            )),
        }
    }
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::Light => "light",
            ActivityLevel::Moderate => "moderate",
            ActivityLevel::Active => "active",
            ActivityLevel::VeryActive => "very_active",
        };
        f.write_str(name)
    }
}

/// Body composition goal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Goal {
    Cut,
    #[default]
    Maintain,
    Bulk,
}

impl Goal {
    /// Daily calorie offset applied to TDEE. Also the daily energy balance a
    /// user on this goal is expected to hit.
    pub fn calorie_adjustment(&self) -> f64 {
        match self {
            Goal::Cut => -500.0,
            Goal::Maintain => 0.0,
            Goal::Bulk => 300.0,
        }
    }

    /// Protein target in grams per kg of body weight
    pub fn protein_g_per_kg(&self) -> f64 {
        match self {
            Goal::Cut => 2.2,
            Goal::Maintain => 1.8,
            Goal::Bulk => 2.0,
        }
    }

    /// Share of target calories that come from fat
    pub fn fat_ratio(&self) -> f64 {
        match self {
            Goal::Bulk => 0.20,
            Goal::Cut | Goal::Maintain => 0.25,
        }
    }
}

impl FromStr for Goal {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cut" => Ok(Goal::Cut),
            "maintain" => Ok(Goal::Maintain),
            "bulk" => Ok(Goal::Bulk),
            _ => Err(invalid_choice("goal", "goal", VALID_GOALS)),
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Goal::Cut => write!(f, "cut"),
            Goal::Maintain => write!(f, "maintain"),
            Goal::Bulk => write!(f, "bulk"),
        }
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Daily macronutrient targets in whole grams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroSplit {
    pub protein_g: u32,
    pub carbs_g: u32,
    pub fat_g: u32,
}

impl MacroSplit {
    /// Energy contained in the split (kcal)
    pub fn calories(&self) -> f64 {
        f64::from(self.protein_g) * KCAL_PER_G_PROTEIN
            + f64::from(self.carbs_g) * KCAL_PER_G_CARBS
            + f64::from(self.fat_g) * KCAL_PER_G_FAT
    }
}

/// Derived nutrition targets for a user and goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionTargets {
    /// Basal Metabolic Rate (kcal/day)
    pub bmr: f64,
    /// Total Daily Energy Expenditure (kcal/day)
    pub tdee: f64,
    /// Goal-adjusted intake target (kcal/day)
    pub calorie_target: f64,
    /// Macro split reproducing the calorie target
    pub macros: MacroSplit,
    /// Goal these targets were derived for
    pub goal: Goal,
}

// ============================================================================
// BMR and TDEE Calculations
// ============================================================================

/// Calculate Basal Metabolic Rate using Mifflin-St Jeor equation
///
/// Men: BMR = 10 × weight(kg) + 6.25 × height(cm) - 5 × age(y) + 5
/// Women: BMR = 10 × weight(kg) + 6.25 × height(cm) - 5 × age(y) - 161
pub fn calculate_bmr_mifflin(weight_kg: f64, height_cm: f64, age_years: u32, sex: BiologicalSex) -> f64 {
    let base = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age_years);
    match sex {
        BiologicalSex::Male => base + 5.0,
        BiologicalSex::Female => base - 161.0,
    }
}

/// BMR for a validated user
pub fn bmr(user_data: &UserData) -> CoreResult<f64> {
    user_data.validate_ranges()?;
    Ok(calculate_bmr_mifflin(
        user_data.weight_kg,
        user_data.height_cm,
        user_data.age_years,
        user_data.sex,
    ))
}

/// Calculate Total Daily Energy Expenditure
///
/// TDEE = BMR × Activity Multiplier
pub fn tdee(bmr: f64, activity_level: ActivityLevel) -> f64 {
    bmr * activity_level.multiplier()
}

/// Goal-adjusted daily calorie target
pub fn calorie_target(tdee: f64, goal: Goal) -> f64 {
    tdee + goal.calorie_adjustment()
}

/// Split a calorie target into protein, carbs and fat grams
///
/// Fat takes its goal share of calories first, protein follows at the goal's
/// g/kg rate (capped so protein and fat never exceed the target), and carbs
/// fill whatever remains. Because each macro is derived from the calories left
/// after the rounded grams before it, the split reproduces the target within
/// rounding error.
pub fn macro_split(calorie_target: f64, weight_kg: f64, goal: Goal) -> CoreResult<MacroSplit> {
    validate_calorie_target(calorie_target)?;
    validate_weight_kg(weight_kg)?;

    let fat_g = (calorie_target * goal.fat_ratio() / KCAL_PER_G_FAT).round();
    let after_fat = calorie_target - fat_g * KCAL_PER_G_FAT;

    let protein_wanted = (weight_kg * goal.protein_g_per_kg()).round();
    let protein_cap = (after_fat / KCAL_PER_G_PROTEIN).round().max(0.0);
    let protein_g = protein_wanted.min(protein_cap);

    let after_protein = after_fat - protein_g * KCAL_PER_G_PROTEIN;
    let carbs_g = (after_protein / KCAL_PER_G_CARBS).round().max(0.0);

    Ok(MacroSplit {
        protein_g: protein_g as u32,
        carbs_g: carbs_g as u32,
        fat_g: fat_g as u32,
    })
}

/// Compute all derived targets for a user and goal
pub fn compute_profile(user_data: &UserData, goal: Goal) -> CoreResult<NutritionTargets> {
    let bmr = bmr(user_data)?;
    let tdee = tdee(bmr, user_data.activity_level);
    let calorie_target = calorie_target(tdee, goal);
    let macros = macro_split(calorie_target, user_data.weight_kg, goal)?;

    Ok(NutritionTargets {
        bmr,
        tdee,
        calorie_target,
        macros,
        goal,
    })
}
