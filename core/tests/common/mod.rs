//! Common fixtures for core integration tests

use chrono::{Duration, NaiveDate};
use nutriforecast_core::{ActivityLevel, BiologicalSex, ProgressHistory, ProgressRecord, UserData};

pub fn day(n: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(n)
}

/// "Today" far enough ahead that fixture records are never in the future
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()
}

pub fn user() -> UserData {
    UserData::new(80.0, 180.0, 30, BiologicalSex::Male, ActivityLevel::Sedentary).unwrap()
}

/// Daily weigh-ins of someone eating `intake` against a true TDEE of `true_tdee`,
/// with a fixed zig-zag of scale noise
pub fn cutting_history(days: usize, true_tdee: f64, intake: f64) -> ProgressHistory {
    let noise = [0.0, 0.3, -0.2, 0.1, -0.3, 0.2, -0.1];
    let records = (0..days).map(|i| {
        let weight = 90.0 - i as f64 * (true_tdee - intake) / 7700.0 + noise[i % noise.len()];
        ProgressRecord::new(day(i as i64), weight)
            .with_intake(intake)
            .with_burned(1800.0, true_tdee - 1800.0)
            .with_macros(180.0, 190.0, 60.0)
    });
    ProgressHistory::from_records_on(records, today()).unwrap()
}

/// Weigh-ins following a seeded ARIMA(1,1,1) path (φ 0.5, θ 0.3, −0.05 kg/day)
pub fn noisy_history(days: usize, seed: u64) -> ProgressHistory {
    let mut state = seed;
    let (mut weight, mut x, mut previous_shock) = (85.0, 0.0, 0.0);
    let records = (0..days).map(|i| {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let shock = ((state >> 11) as f64 / (1u64 << 53) as f64 - 0.5) * 0.6;
        x = 0.5 * x + shock + 0.3 * previous_shock;
        previous_shock = shock;
        weight += -0.05 + x;
        ProgressRecord::new(day(i as i64), weight)
    });
    ProgressHistory::from_records_on(records, today()).unwrap()
}
