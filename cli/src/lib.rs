//! NutriForecast CLI library
//!
//! This library exposes the CLI modules for use in tests.

pub mod commands;
pub mod config;
pub mod error;
pub mod history_csv;
