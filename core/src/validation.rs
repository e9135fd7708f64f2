//! Input validation functions
//!
//! Range checks shared by every entry point of the core. Profile inputs are
//! also covered by the `validator` derive on [`crate::models::UserData`]; the
//! helpers here add the finiteness checks the derive does not perform.

use chrono::NaiveDate;
use thiserror::Error;

/// Body weight bounds (kg)
pub const MIN_WEIGHT_KG: f64 = 30.0;
pub const MAX_WEIGHT_KG: f64 = 300.0;

/// Height bounds (cm)
pub const MIN_HEIGHT_CM: f64 = 100.0;
pub const MAX_HEIGHT_CM: f64 = 250.0;

/// Age bounds (years)
pub const MIN_AGE_YEARS: u32 = 18;
pub const MAX_AGE_YEARS: u32 = 120;

/// Forecast horizon bounds (days)
pub const MIN_DAYS_AHEAD: u32 = 1;
pub const MAX_DAYS_AHEAD: u32 = 90;

/// Upper sanity bound for a single day's calorie figure
const MAX_DAILY_CALORIES: f64 = 50000.0;

/// Upper sanity bound for a single day's macro intake (g)
const MAX_DAILY_MACRO_G: f64 = 2000.0;

/// Validation error with field context
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{display_label}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub display_label: String,
}

impl ValidationError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
            display_label: get_field_display_label(field).to_string(),
        }
    }

    /// Format as user-friendly error message
    pub fn user_message(&self) -> String {
        format!("{}: {}", self.display_label, self.message)
    }
}

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        // HashMap order is unstable; report the alphabetically first field
        let mut fields: Vec<(String, String)> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| "is out of range".to_string());
                (field.to_string(), message)
            })
            .collect();
        fields.sort();

        match fields.into_iter().next() {
            Some((field, message)) => ValidationError::new(&field, &message),
            None => ValidationError::new("input", "is invalid"),
        }
    }
}

// ============================================================================
// Numeric Validation
// ============================================================================

fn validate_finite(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_nan() || value.is_infinite() {
        return Err(ValidationError::new(field, "must be a valid number"));
    }
    Ok(())
}

/// Validate body weight (kg)
pub fn validate_weight_kg(weight_kg: f64) -> Result<(), ValidationError> {
    validate_finite("weight_kg", weight_kg)?;
    if weight_kg <= 0.0 {
        return Err(ValidationError::new("weight_kg", "must be greater than zero"));
    }
    if weight_kg < MIN_WEIGHT_KG {
        return Err(ValidationError::new("weight_kg", "must be at least 30 kg"));
    }
    if weight_kg > MAX_WEIGHT_KG {
        return Err(ValidationError::new("weight_kg", "must be at most 300 kg"));
    }
    Ok(())
}

/// Validate height (cm)
pub fn validate_height_cm(height_cm: f64) -> Result<(), ValidationError> {
    validate_finite("height_cm", height_cm)?;
    if height_cm < MIN_HEIGHT_CM {
        return Err(ValidationError::new("height_cm", "must be at least 100 cm"));
    }
    if height_cm > MAX_HEIGHT_CM {
        return Err(ValidationError::new("height_cm", "must be at most 250 cm"));
    }
    Ok(())
}

/// Validate age (years)
pub fn validate_age_years(age_years: u32) -> Result<(), ValidationError> {
    if !(MIN_AGE_YEARS..=MAX_AGE_YEARS).contains(&age_years) {
        return Err(ValidationError::new(
            "age_years",
            "must be between 18 and 120 years",
        ));
    }
    Ok(())
}

/// Validate forecast horizon
pub fn validate_days_ahead(days_ahead: u32) -> Result<(), ValidationError> {
    if !(MIN_DAYS_AHEAD..=MAX_DAYS_AHEAD).contains(&days_ahead) {
        return Err(ValidationError::new(
            "days_ahead",
            "must be between 1 and 90 days",
        ));
    }
    Ok(())
}

/// Validate a calorie figure (consumed or burned)
pub fn validate_calories(field: &str, calories: f64) -> Result<(), ValidationError> {
    validate_finite(field, calories)?;
    if calories < 0.0 {
        return Err(ValidationError::new(field, "cannot be negative"));
    }
    if calories > MAX_DAILY_CALORIES {
        return Err(ValidationError::new(field, "is unreasonably high"));
    }
    Ok(())
}

/// Validate a macro intake in grams
pub fn validate_macro_grams(field: &str, grams: f64) -> Result<(), ValidationError> {
    validate_finite(field, grams)?;
    if grams < 0.0 {
        return Err(ValidationError::new(field, "cannot be negative"));
    }
    if grams > MAX_DAILY_MACRO_G {
        return Err(ValidationError::new(field, "is unreasonably high"));
    }
    Ok(())
}

/// Validate a calorie target fed into the macro split
pub fn validate_calorie_target(calorie_target: f64) -> Result<(), ValidationError> {
    validate_finite("calorie_target", calorie_target)?;
    if calorie_target <= 0.0 {
        return Err(ValidationError::new("calorie_target", "must be positive"));
    }
    Ok(())
}

// ============================================================================
// Date Validation
// ============================================================================

/// Progress records cannot be dated in the future
pub fn validate_record_date(date: NaiveDate, today: NaiveDate) -> Result<(), ValidationError> {
    if date > today {
        return Err(ValidationError::new("date", "cannot be in the future"));
    }
    Ok(())
}

/// Validate an inclusive date range
pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<(), ValidationError> {
    if start > end {
        return Err(ValidationError::new(
            "date_range",
            "start date must not be after end date",
        ));
    }
    Ok(())
}

// ============================================================================
// Enumerated Values
// ============================================================================

/// Valid activity levels
pub const VALID_ACTIVITY_LEVELS: &[&str] = &["sedentary", "light", "moderate", "active", "very_active"];

/// Valid biological sex values
pub const VALID_BIOLOGICAL_SEX: &[&str] = &["male", "female"];

/// Valid goals
pub const VALID_GOALS: &[&str] = &["cut", "maintain", "bulk"];

/// Build the error returned when a string is not one of the allowed values
pub fn invalid_choice(field: &str, kind: &str, allowed: &[&str]) -> ValidationError {
    ValidationError::new(
        field,
        &format!("Invalid {}. Must be one of: {}", kind, allowed.join(", ")),
    )
}

// ============================================================================
// User-Friendly Field Labels
// ============================================================================

/// Map technical field names to user-friendly display labels
pub fn get_field_display_label(field_name: &str) -> &str {
    match field_name {
        "weight" | "weight_kg" => "Weight",
        "height" | "height_cm" => "Height",
        "age" | "age_years" => "Age",
        "sex" | "biological_sex" => "Biological Sex",
        "activity_level" => "Activity Level",
        "goal" => "Goal",
        "date" => "Date",
        "date_range" => "Date Range",
        "days_ahead" => "Forecast Horizon",
        "confidence_level" => "Confidence Level",
        "calorie_target" => "Calorie Target",
        "consumed_calories" => "Calories Consumed",
        "consumed_protein_g" => "Protein Consumed",
        "consumed_carbs_g" => "Carbs Consumed",
        "consumed_fat_g" => "Fat Consumed",
        "calories_burned_bmr" => "Resting Calories Burned",
        "calories_burned_active" => "Active Calories Burned",
        "prior_tdee" => "Starting TDEE",
        "history" => "Progress History",
        _ => field_name,
    }
}
