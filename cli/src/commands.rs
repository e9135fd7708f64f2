//! Command-line interface definition and command handlers
//!
//! Each subcommand reads a progress CSV (where it needs one), calls into the
//! core, and renders the result as pretty JSON. Handlers take already-loaded
//! histories so they can be exercised without touching the filesystem.

use std::path::PathBuf;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use nutriforecast_core::{
    compute_profile, estimate_adaptive_tdee, forecast_weight_at, progress_score, recalculate_at,
    AdaptiveTdeeEstimate, ActivityLevel, BiologicalSex, EngineConfig, Goal, NutritionTargets, NutritionalProfile,
    ProgressHistory, ProgressScore, RecalculationReport, UserData, WeightForecast,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::CliResult;
use crate::history_csv::{read_history_file, write_history};

/// Nutrition targets, adherence analytics, adaptive TDEE and weight forecasts
#[derive(Parser, Debug)]
#[command(name = "nutriforecast")]
#[command(about = "Nutrition targets, adherence analytics and weight forecasting")]
#[command(version)]
pub struct Cli {
    /// Config file to load instead of config/{RUST_ENV}.toml
    #[arg(long, global = true, env = "NF_CONFIG_FILE")]
    pub config: Option<String>,

    /// Date treated as today when validating records (defaults to the system date)
    #[arg(long, global = true)]
    pub today: Option<NaiveDate>,

    #[command(subcommand)]
    pub command: Command,
}

/// Physical profile and goal
#[derive(Args, Debug, Clone)]
pub struct ProfileArgs {
    /// Body weight (kg)
    #[arg(long)]
    pub weight: f64,

    /// Height (cm)
    #[arg(long)]
    pub height: f64,

    /// Age (years)
    #[arg(long)]
    pub age: u32,

    /// male or female
    #[arg(long)]
    pub sex: BiologicalSex,

    /// sedentary, light, moderate, active or very_active
    #[arg(long, default_value = "light")]
    pub activity: ActivityLevel,

    /// cut, maintain or bulk
    #[arg(long, default_value = "maintain")]
    pub goal: Goal,
}

impl ProfileArgs {
    pub fn user_data(&self) -> CliResult<UserData> {
        Ok(UserData::new(self.weight, self.height, self.age, self.sex, self.activity)?)
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute BMR, TDEE, calorie target and macro split
    Profile(ProfileArgs),

    /// Deficit and macro adherence over a date range
    Score {
        #[arg(long)]
        history: PathBuf,
        #[command(flatten)]
        profile: ProfileArgs,
        /// First day of the range (defaults to six days before --end)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Last day of the range (defaults to the last recorded day)
        #[arg(long)]
        end: Option<NaiveDate>,
    },

    /// Forecast body weight
    Forecast {
        #[arg(long)]
        history: PathBuf,
        /// Forecast horizon, 1 to 90 days
        #[arg(long, default_value_t = 30)]
        days: u32,
        /// 0.68, 0.95 or 0.99
        #[arg(long, default_value_t = 0.95)]
        confidence: f64,
        #[arg(long)]
        profile_id: Option<Uuid>,
    },

    /// Estimate TDEE from weight and intake history
    Tdee {
        #[arg(long)]
        history: PathBuf,
        #[command(flatten)]
        profile: ProfileArgs,
        /// Include the day-by-day filter trajectory
        #[arg(long)]
        trajectory: bool,
    },

    /// Run the weekly recalculation
    Recalc {
        #[arg(long)]
        history: PathBuf,
        #[command(flatten)]
        profile: ProfileArgs,
        /// Recalculation date (defaults to the last recorded day)
        #[arg(long)]
        as_of: Option<NaiveDate>,
        #[arg(long)]
        profile_id: Option<Uuid>,
    },

    /// Validate a progress CSV and print it sorted with one row per date
    History {
        #[arg(long)]
        history: PathBuf,
    },
}

/// Inputs shared by every command
#[derive(Debug, Clone)]
pub struct RunContext {
    pub engine: EngineConfig,
    pub today: NaiveDate,
    pub now: DateTime<Utc>,
}

impl RunContext {
    pub fn new(engine: EngineConfig, today: Option<NaiveDate>) -> Self {
        let now = Utc::now();
        Self {
            engine,
            today: today.unwrap_or_else(|| now.date_naive()),
            now,
        }
    }
}

// ============================================================================
// Command Handlers
// ============================================================================

pub fn profile(args: &ProfileArgs) -> CliResult<NutritionTargets> {
    Ok(compute_profile(&args.user_data()?, args.goal)?)
}

/// Score `[start, end]`, defaulting to the week ending on the last record
pub fn score(
    history: &ProgressHistory,
    args: &ProfileArgs,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    ctx: &RunContext,
) -> CliResult<ProgressScore> {
    let targets = profile(args)?;
    let end = end
        .or_else(|| history.last().map(|r| r.date))
        .unwrap_or(ctx.today);
    let start = start.unwrap_or_else(|| {
        end.checked_sub_signed(Duration::days(6))
            .unwrap_or(NaiveDate::MIN)
    });
    Ok(progress_score(history, &targets, start, end, &ctx.engine.analytics)?)
}

pub fn forecast(
    history: &ProgressHistory,
    days: u32,
    confidence: f64,
    profile_id: Option<Uuid>,
    ctx: &RunContext,
) -> CliResult<WeightForecast> {
    Ok(forecast_weight_at(
        profile_id.unwrap_or_else(Uuid::nil),
        history,
        days,
        confidence,
        &ctx.engine.forecast,
        ctx.now,
    )?)
}

/// Adaptive estimate next to the formula it started from
#[derive(Debug, Clone, Serialize)]
pub struct TdeeReport {
    pub formula_tdee_kcal: f64,
    pub adaptive: AdaptiveTdeeEstimate,
    /// Adaptive minus formula TDEE
    pub difference_kcal: f64,
}

pub fn tdee(
    history: &ProgressHistory,
    args: &ProfileArgs,
    include_trajectory: bool,
    ctx: &RunContext,
) -> CliResult<TdeeReport> {
    let targets = profile(args)?;
    let mut adaptive = estimate_adaptive_tdee(history, targets.tdee, &ctx.engine.kalman)?;
    if !include_trajectory {
        adaptive.trajectory.clear();
    }
    Ok(TdeeReport {
        formula_tdee_kcal: targets.tdee,
        difference_kcal: adaptive.tdee_kcal - targets.tdee,
        adaptive,
    })
}

pub fn recalc(
    history: ProgressHistory,
    args: &ProfileArgs,
    as_of: Option<NaiveDate>,
    profile_id: Option<Uuid>,
    ctx: &RunContext,
) -> CliResult<RecalculationReport> {
    let as_of = as_of
        .or_else(|| history.last().map(|r| r.date))
        .unwrap_or(ctx.today);
    let profile = NutritionalProfile::restore(
        profile_id.unwrap_or_else(Uuid::nil),
        Uuid::nil(),
        args.user_data()?,
        args.goal,
        ctx.now,
        ctx.now,
        history,
    )?;
    Ok(recalculate_at(&profile, as_of, &ctx.engine, ctx.now)?)
}

fn to_json<T: Serialize>(value: &T) -> CliResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Run a parsed command and return what should be printed
pub fn execute(command: &Command, ctx: &RunContext) -> CliResult<String> {
    match command {
        Command::Profile(args) => to_json(&profile(args)?),
        Command::Score {
            history,
            profile,
            start,
            end,
        } => {
            let history = read_history_file(history, ctx.today)?;
            to_json(&score(&history, profile, *start, *end, ctx)?)
        }
        Command::Forecast {
            history,
            days,
            confidence,
            profile_id,
        } => {
            let history = read_history_file(history, ctx.today)?;
            let result = forecast(&history, *days, *confidence, *profile_id, ctx)?;
            info!(
                model = %result.model_used,
                points = result.data_points_used,
                trend = ?result.trend_direction,
                "Forecast complete"
            );
            to_json(&result)
        }
        Command::Tdee {
            history,
            profile,
            trajectory,
        } => {
            let history = read_history_file(history, ctx.today)?;
            to_json(&tdee(&history, profile, *trajectory, ctx)?)
        }
        Command::Recalc {
            history,
            profile,
            as_of,
            profile_id,
        } => {
            let history = read_history_file(history, ctx.today)?;
            to_json(&recalc(history, profile, *as_of, *profile_id, ctx)?)
        }
        Command::History { history } => write_history(&read_history_file(history, ctx.today)?),
    }
}
