//! Progress history and the read-side store accessor
//!
//! [`ProgressHistory`] is an immutable, date-ordered map of records. Writes go
//! through [`ProgressHistory::record_progress`], which returns a new history
//! and leaves the caller's copy untouched.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{CoreError, CoreResult};
use crate::models::ProgressRecord;
use crate::validation::validate_date_range;

/// Date-ordered progress records, one per calendar day
///
/// Serialized as a date-keyed map. Deserializing validates every record and
/// requires each key to match its record's date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    into = "BTreeMap<NaiveDate, ProgressRecord>",
    try_from = "BTreeMap<NaiveDate, ProgressRecord>"
)]
pub struct ProgressHistory {
    records: BTreeMap<NaiveDate, ProgressRecord>,
}

impl ProgressHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a history from records, validating each one against today.
    /// A later record for an already-seen date replaces the earlier one.
    pub fn from_records(records: impl IntoIterator<Item = ProgressRecord>) -> CoreResult<Self> {
        Self::from_records_on(records, Utc::now().date_naive())
    }

    /// As [`ProgressHistory::from_records`] with an explicit "today"
    pub fn from_records_on(
        records: impl IntoIterator<Item = ProgressRecord>,
        today: NaiveDate,
    ) -> CoreResult<Self> {
        let mut map = BTreeMap::new();
        for record in records {
            record.validate(today)?;
            map.insert(record.date, record);
        }
        Ok(Self { records: map })
    }

    /// Insert or replace the record for its date
    pub fn record_progress(&self, record: ProgressRecord) -> CoreResult<Self> {
        self.record_progress_on(record, Utc::now().date_naive())
    }

    /// As [`ProgressHistory::record_progress`] with an explicit "today"
    pub fn record_progress_on(&self, record: ProgressRecord, today: NaiveDate) -> CoreResult<Self> {
        record.validate(today)?;
        let mut records = self.records.clone();
        records.insert(record.date, record);
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&ProgressRecord> {
        self.records.get(&date)
    }

    pub fn first(&self) -> Option<&ProgressRecord> {
        self.records.values().next()
    }

    pub fn last(&self) -> Option<&ProgressRecord> {
        self.records.values().next_back()
    }

    /// Records in chronological order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ProgressRecord> + '_ {
        self.records.values()
    }

    /// Records within `[start, end]`, in chronological order
    pub fn range(&self, start: NaiveDate, end: NaiveDate) -> impl DoubleEndedIterator<Item = &ProgressRecord> + '_ {
        // BTreeMap::range panics on inverted bounds; map them to an empty range
        let upper = if start <= end {
            Bound::Included(end)
        } else {
            Bound::Excluded(start)
        };
        self.records
            .range((Bound::Included(start), upper))
            .map(|(_, r)| r)
    }

    /// (date, weight) pairs in chronological order
    pub fn weight_series(&self) -> Vec<(NaiveDate, f64)> {
        self.records.values().map(|r| (r.date, r.weight_kg)).collect()
    }

    /// Sub-history covering `[start, end]`
    pub fn slice(&self, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            records: self.range(start, end).map(|r| (r.date, r.clone())).collect(),
        }
    }
}

impl From<ProgressHistory> for BTreeMap<NaiveDate, ProgressRecord> {
    fn from(history: ProgressHistory) -> Self {
        history.records
    }
}

impl TryFrom<BTreeMap<NaiveDate, ProgressRecord>> for ProgressHistory {
    type Error = CoreError;

    fn try_from(map: BTreeMap<NaiveDate, ProgressRecord>) -> Result<Self, Self::Error> {
        if let Some((key, record)) = map.iter().find(|(key, record)| **key != record.date) {
            return Err(CoreError::validation(
                "history",
                &format!("record dated {} is stored under {}", record.date, key),
            ));
        }
        Self::from_records(map.into_values())
    }
}

/// Read access to stored progress, keyed by profile id and date
///
/// Implemented by the persistence collaborator. The core only reads.
pub trait ProgressStore {
    /// Full history of a profile. Unknown profiles have an empty history.
    fn history(&self, profile_id: Uuid) -> CoreResult<ProgressHistory>;

    /// Records of a profile in `[start, end]`, ordered by date
    fn records_in_range(
        &self,
        profile_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> CoreResult<Vec<ProgressRecord>> {
        validate_date_range(start, end)?;
        Ok(self
            .history(profile_id)?
            .range(start, end)
            .cloned()
            .collect())
    }
}

/// Append-or-replace in-memory store, used by the CLI and tests
#[derive(Debug, Clone, Default)]
pub struct InMemoryProgressStore {
    histories: HashMap<Uuid, ProgressHistory>,
}

impl InMemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the record under the profile, replacing any record for its date
    pub fn append(&mut self, profile_id: Uuid, record: ProgressRecord) -> CoreResult<()> {
        let current = self.histories.remove(&profile_id).unwrap_or_default();
        let updated = match current.record_progress(record) {
            Ok(updated) => updated,
            Err(e) => {
                self.histories.insert(profile_id, current);
                return Err(e);
            }
        };
        self.histories.insert(profile_id, updated);
        Ok(())
    }

    /// Replace a profile's whole history
    pub fn save(&mut self, profile_id: Uuid, history: ProgressHistory) {
        self.histories.insert(profile_id, history);
    }
}

impl ProgressStore for InMemoryProgressStore {
    fn history(&self, profile_id: Uuid) -> CoreResult<ProgressHistory> {
        Ok(self.histories.get(&profile_id).cloned().unwrap_or_default())
    }
}
