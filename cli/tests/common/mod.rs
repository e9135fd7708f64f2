//! Common test utilities for integration tests
//!
//! Runs commands the way the binary does, against CSV files written to a
//! per-test scratch directory.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::Parser;
use nutriforecast_cli::commands::{execute, Cli, RunContext};
use nutriforecast_cli::error::CliError;
use nutriforecast_core::EngineConfig;
use uuid::Uuid;

pub const HEADER: &str = "date,weight_kg,consumed_calories,protein_g,carbs_g,fat_g,burned_bmr,burned_active,notes";

/// Test application wrapper
pub struct TestApp {
    pub dir: PathBuf,
    pub ctx: RunContext,
}

impl TestApp {
    pub fn new() -> Self {
        let dir = std::env::temp_dir().join(format!("nutriforecast-test-{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).expect("Failed to create scratch directory");
        let ctx = RunContext {
            engine: EngineConfig::default(),
            today: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            now: DateTime::parse_from_rfc3339("2024-12-31T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        };
        Self { dir, ctx }
    }

    /// Write a CSV file and return its path as a string argument
    pub fn write_csv(&self, name: &str, contents: &str) -> String {
        let path = self.dir.join(name);
        fs::write(&path, contents).expect("Failed to write CSV");
        path.display().to_string()
    }

    /// Parse and run a command line, returning stdout on success
    pub fn run(&self, args: &[&str]) -> Result<String, CliError> {
        let mut argv = vec!["nutriforecast"];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).expect("Invalid command line");
        execute(&cli.command, &self.ctx)
    }

    /// Run a command expected to succeed and parse its JSON output
    pub fn run_json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.run(args).expect("Command failed");
        serde_json::from_str(&output).expect("Output is not JSON")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.dir);
    }
}

/// `days` daily rows starting 2024-01-01 for someone eating 500 kcal under a
/// 2500 kcal expenditure, with a little scale noise
pub fn cutting_csv(days: usize) -> String {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let noise = [0.0, 0.2, -0.1, 0.1, -0.2];
    let mut csv = String::from(HEADER);
    csv.push('\n');
    for i in 0..days {
        let date = start + Duration::days(i as i64);
        let weight = 90.0 - i as f64 * 500.0 / 7700.0 + noise[i % noise.len()];
        csv.push_str(&format!("{date},{weight:.2},2000,176,198,56,1800,700,\n"));
    }
    csv
}

/// 90 kg sedentary man on a cut: formula TDEE 2256 kcal
pub const PROFILE_ARGS: [&str; 12] = [
    "--weight", "90", "--height", "180", "--age", "30", "--sex", "male", "--activity", "sedentary", "--goal", "cut",
];
