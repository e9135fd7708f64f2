//! Progress history CSV import/export
//!
//! Columns: `date,weight_kg,consumed_calories,protein_g,carbs_g,fat_g,burned_bmr,burned_active,notes`.
//! Only `date` and `weight_kg` are required; empty cells and missing trailing
//! columns are read as absent. A later row for an already-seen date replaces
//! the earlier one.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use nutriforecast_core::{ProgressHistory, ProgressRecord};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CliError, CliResult};

/// One CSV row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryCsvRow {
    pub date: NaiveDate,
    pub weight_kg: f64,
    #[serde(default)]
    pub consumed_calories: Option<f64>,
    #[serde(default)]
    pub protein_g: Option<f64>,
    #[serde(default)]
    pub carbs_g: Option<f64>,
    #[serde(default)]
    pub fat_g: Option<f64>,
    #[serde(default)]
    pub burned_bmr: Option<f64>,
    #[serde(default)]
    pub burned_active: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl From<HistoryCsvRow> for ProgressRecord {
    fn from(row: HistoryCsvRow) -> Self {
        ProgressRecord {
            date: row.date,
            weight_kg: row.weight_kg,
            consumed_calories: row.consumed_calories,
            consumed_protein_g: row.protein_g,
            consumed_carbs_g: row.carbs_g,
            consumed_fat_g: row.fat_g,
            calories_burned_bmr: row.burned_bmr,
            calories_burned_active: row.burned_active,
            notes: row.notes.filter(|n| !n.trim().is_empty()),
        }
    }
}

impl From<&ProgressRecord> for HistoryCsvRow {
    fn from(record: &ProgressRecord) -> Self {
        HistoryCsvRow {
            date: record.date,
            weight_kg: record.weight_kg,
            consumed_calories: record.consumed_calories,
            protein_g: record.consumed_protein_g,
            carbs_g: record.consumed_carbs_g,
            fat_g: record.consumed_fat_g,
            burned_bmr: record.calories_burned_bmr,
            burned_active: record.calories_burned_active,
            notes: record.notes.clone(),
        }
    }
}

/// Read a history from any CSV source, validating each row against `today`
pub fn read_history<R: Read>(reader: R, today: NaiveDate) -> CliResult<ProgressHistory> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    for (index, result) in csv_reader.deserialize::<HistoryCsvRow>().enumerate() {
        let record = ProgressRecord::from(result?);
        // Header is line 1, so data rows start at line 2
        let line = index as u64 + 2;
        record
            .validate(today)
            .map_err(|source| CliError::InvalidRecord { line, source })?;
        records.push(record);
    }

    let rows = records.len();
    let history = ProgressHistory::from_records_on(records, today)?;
    debug!(rows, records = history.len(), "Imported progress history");
    Ok(history)
}

/// Read a history from a CSV file
pub fn read_history_file(path: &Path, today: NaiveDate) -> CliResult<ProgressHistory> {
    let file = File::open(path).map_err(|source| CliError::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_history(file, today)
}

/// Render a history back to CSV, one row per date in order
pub fn write_history(history: &ProgressHistory) -> CliResult<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for record in history.iter() {
        wtr.serialize(HistoryCsvRow::from(record))?;
    }
    let bytes = wtr.into_inner().map_err(|e| CliError::Csv(e.into_error().into()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
    }

    const HEADER: &str = "date,weight_kg,consumed_calories,protein_g,carbs_g,fat_g,burned_bmr,burned_active,notes\n";

    #[test]
    fn test_reads_optional_columns() {
        let data = format!(
            "{HEADER}2024-03-01,80.5,2100,150,220,70,1750,450,felt good\n2024-03-02,80.2,,,,,,,\n"
        );
        let history = read_history(data.as_bytes(), today()).unwrap();
        assert_eq!(history.len(), 2);

        let first = history.first().unwrap();
        assert_eq!(first.consumed_calories, Some(2100.0));
        assert_eq!(first.calorie_balance(), Some(-100.0));
        assert_eq!(first.notes.as_deref(), Some("felt good"));

        let second = history.last().unwrap();
        assert_eq!(second.consumed_calories, None);
        assert_eq!(second.calories_burned(), None);
        assert_eq!(second.notes, None);
    }

    #[test]
    fn test_weight_only_file() {
        let data = "date,weight_kg\n2024-03-02,80.0\n2024-03-01,81.0\n";
        let history = read_history(data.as_bytes(), today()).unwrap();
        let dates: Vec<_> = history.iter().map(|r| r.date.to_string()).collect();
        assert_eq!(dates, vec!["2024-03-01", "2024-03-02"]);
    }

    #[test]
    fn test_duplicate_date_keeps_last_row() {
        let data = "date,weight_kg\n2024-03-01,81.0\n2024-03-01,80.4\n";
        let history = read_history(data.as_bytes(), today()).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history.first().unwrap().weight_kg, 80.4);
    }

    #[test]
    fn test_out_of_range_weight_reports_line() {
        let data = "date,weight_kg\n2024-03-01,81.0\n2024-03-02,12.0\n";
        match read_history(data.as_bytes(), today()) {
            Err(CliError::InvalidRecord { line, source }) => {
                assert_eq!(line, 3);
                assert_eq!(source.field, "weight_kg");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_date_is_csv_error() {
        let data = "date,weight_kg\n03/01/2024,81.0\n";
        assert!(matches!(read_history(data.as_bytes(), today()), Err(CliError::Csv(_))));
    }

    #[test]
    fn test_write_history_round_trips_through_reader() {
        let data = format!("{HEADER}2024-03-01,80.5,2100,150,220,70,1750,450,\n2024-03-02,80.2,,,,,,,\n");
        let history = read_history(data.as_bytes(), today()).unwrap();
        let rendered = write_history(&history).unwrap();
        assert!(rendered.starts_with("date,weight_kg,"));
        assert_eq!(read_history(rendered.as_bytes(), today()).unwrap(), history);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property: one record per distinct date, whatever the row order
        #[test]
        fn prop_one_record_per_date(rows in prop::collection::vec((1u32..=28, 40.0f64..200.0), 1..40)) {
            let mut data = String::from("date,weight_kg\n");
            for (day, weight) in &rows {
                data.push_str(&format!("2024-02-{day:02},{weight}\n"));
            }
            let history = read_history(data.as_bytes(), today()).unwrap();
            let mut days: Vec<u32> = rows.iter().map(|(d, _)| *d).collect();
            days.sort_unstable();
            days.dedup();
            prop_assert_eq!(history.len(), days.len());
        }
    }
}
