//! Adaptive TDEE estimation
//!
//! A two-state linear Kalman filter over `[weight_kg, tdee_kcal]`:
//!
//! ```text
//! weight(t) = weight(t-1) - (tdee(t-1) - calories_in(t)) / 7700
//! tdee(t)   = tdee(t-1)
//! ```
//!
//! Only weight is observed. The filter state is an immutable [`FilterState`]
//! threaded through [`predict`] and [`update`], so any prefix of a history can
//! be replayed step by step.
//!
//! # Design Principles
//!
//! - Walks every calendar day from the first to the last record
//! - Days without a record are predict-only
//! - Days without intake assume the intake matched the current TDEE estimate

use chrono::NaiveDate;
use ndarray::{arr1, arr2, Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::KalmanConfig;
use crate::errors::{CoreError, CoreResult};
use crate::history::ProgressHistory;
use crate::models::NutritionalProfile;
use crate::validation::{validate_weight_kg, ValidationError};

/// Energy content of one kilogram of body mass change (kcal)
pub const KCAL_PER_KG: f64 = 7700.0;

/// Records needed before the filter has anything to learn from
pub const MIN_TDEE_RECORDS: usize = 2;

const WEIGHT: usize = 0;
const TDEE: usize = 1;

// ============================================================================
// Filter State
// ============================================================================

/// Filter estimate and its covariance at one time step
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    pub state: Array1<f64>,
    pub covariance: Array2<f64>,
}

impl FilterState {
    /// Starting state from the first weigh-in and the formula TDEE
    pub fn initial(weight_kg: f64, tdee_kcal: f64, config: &KalmanConfig) -> Self {
        Self {
            state: arr1(&[weight_kg, tdee_kcal]),
            covariance: arr2(&[
                [config.initial_weight_variance, 0.0],
                [0.0, config.initial_tdee_variance],
            ]),
        }
    }

    pub fn weight(&self) -> f64 {
        self.state[WEIGHT]
    }

    pub fn tdee(&self) -> f64 {
        self.state[TDEE]
    }

    pub fn weight_std(&self) -> f64 {
        self.covariance[[WEIGHT, WEIGHT]].max(0.0).sqrt()
    }

    pub fn tdee_std(&self) -> f64 {
        self.covariance[[TDEE, TDEE]].max(0.0).sqrt()
    }
}

fn transition() -> Array2<f64> {
    arr2(&[[1.0, -1.0 / KCAL_PER_KG], [0.0, 1.0]])
}

fn process_noise(config: &KalmanConfig) -> Array2<f64> {
    arr2(&[
        [config.process_noise_weight, 0.0],
        [0.0, config.process_noise_tdee],
    ])
}

/// Advance one day. `calories_in` of `None` is treated as weight-neutral.
pub fn predict(previous: &FilterState, calories_in: Option<f64>, config: &KalmanConfig) -> FilterState {
    let f = transition();
    let intake = calories_in.unwrap_or_else(|| previous.tdee());

    let mut state = f.dot(&previous.state);
    state[WEIGHT] += intake / KCAL_PER_KG;

    let covariance = f.dot(&previous.covariance).dot(&f.t()) + process_noise(config);
    FilterState { state, covariance }
}

/// Fold in a weigh-in
pub fn update(prior: &FilterState, observed_weight_kg: f64, config: &KalmanConfig) -> FilterState {
    let h = arr2(&[[1.0, 0.0]]);
    let r = config.observation_noise;

    let innovation = observed_weight_kg - prior.weight();
    let innovation_variance = prior.covariance[[WEIGHT, WEIGHT]] + r;
    let gain: Array1<f64> = prior.covariance.column(WEIGHT).to_owned() / innovation_variance;

    let state = &prior.state + &(&gain * innovation);

    // Joseph form keeps the covariance symmetric positive semi-definite
    let gain_col = gain.view().insert_axis(Axis(1));
    let i_kh = Array2::<f64>::eye(2) - gain_col.dot(&h);
    let gain_outer = gain_col.dot(&gain.view().insert_axis(Axis(0)));
    let covariance = i_kh.dot(&prior.covariance).dot(&i_kh.t()) + gain_outer * r;

    FilterState { state, covariance }
}

// ============================================================================
// Estimation
// ============================================================================

/// Filter output for one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterStep {
    pub date: NaiveDate,
    pub weight_kg: f64,
    pub tdee_kcal: f64,
    pub tdee_std_kcal: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_weight_kg: Option<f64>,
}

/// Adaptive TDEE estimate at the latest recorded day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveTdeeEstimate {
    pub tdee_kcal: f64,
    pub tdee_std_kcal: f64,
    /// Filtered (smoothed) weight on the last day
    pub weight_kg: f64,
    /// TDEE the filter started from
    pub prior_tdee_kcal: f64,
    /// Calendar days walked, first and last included
    pub days_processed: usize,
    pub observations_used: usize,
    pub trajectory: Vec<FilterStep>,
}

fn validate_config(config: &KalmanConfig) -> Result<(), ValidationError> {
    let parameters = [
        ("process_noise_weight", config.process_noise_weight),
        ("process_noise_tdee", config.process_noise_tdee),
        ("observation_noise", config.observation_noise),
        ("initial_weight_variance", config.initial_weight_variance),
        ("initial_tdee_variance", config.initial_tdee_variance),
    ];
    for (field, value) in parameters {
        if !value.is_finite() || value <= 0.0 {
            return Err(ValidationError::new(field, "must be a positive number"));
        }
    }
    Ok(())
}

/// Estimate TDEE from the full weight/intake history
///
/// `prior_tdee` is the formula TDEE the filter starts from. Re-running on the
/// same history gives the same result.
pub fn estimate_adaptive_tdee(
    history: &ProgressHistory,
    prior_tdee: f64,
    config: &KalmanConfig,
) -> CoreResult<AdaptiveTdeeEstimate> {
    if !prior_tdee.is_finite() || prior_tdee <= 0.0 {
        return Err(CoreError::validation("prior_tdee", "must be a positive number"));
    }
    validate_config(config)?;
    for record in history.iter() {
        validate_weight_kg(record.weight_kg)?;
    }

    let (first, last) = match (history.first(), history.last()) {
        (Some(first), Some(last)) if history.len() >= MIN_TDEE_RECORDS => (first, last),
        _ => {
            return Err(CoreError::InsufficientData {
                required: MIN_TDEE_RECORDS,
                available: history.len(),
            })
        }
    };

    let mut filter = FilterState::initial(first.weight_kg, prior_tdee, config);
    let mut trajectory = vec![FilterStep {
        date: first.date,
        weight_kg: filter.weight(),
        tdee_kcal: filter.tdee(),
        tdee_std_kcal: filter.tdee_std(),
        observed_weight_kg: Some(first.weight_kg),
    }];
    let mut observations_used = 1;

    let mut day = first.date;
    while let Some(next) = day.succ_opt().filter(|d| *d <= last.date) {
        day = next;
        let record = history.get(day);
        filter = predict(&filter, record.and_then(|r| r.consumed_calories), config);
        if let Some(record) = record {
            filter = update(&filter, record.weight_kg, config);
            observations_used += 1;
        }
        trajectory.push(FilterStep {
            date: day,
            weight_kg: filter.weight(),
            tdee_kcal: filter.tdee(),
            tdee_std_kcal: filter.tdee_std(),
            observed_weight_kg: record.map(|r| r.weight_kg),
        });
    }

    debug!(
        days = trajectory.len(),
        observations_used,
        prior_tdee,
        tdee = filter.tdee(),
        "Adaptive TDEE filter finished"
    );

    Ok(AdaptiveTdeeEstimate {
        tdee_kcal: filter.tdee(),
        tdee_std_kcal: filter.tdee_std(),
        weight_kg: filter.weight(),
        prior_tdee_kcal: prior_tdee,
        days_processed: trajectory.len(),
        observations_used,
        trajectory,
    })
}

/// Estimate from a profile's own history, starting at its formula TDEE
pub fn estimate_for_profile(profile: &NutritionalProfile, config: &KalmanConfig) -> CoreResult<AdaptiveTdeeEstimate> {
    estimate_adaptive_tdee(profile.history(), profile.targets().tdee, config)
}
