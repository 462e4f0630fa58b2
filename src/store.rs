// The immutable in-memory table of monthly group facts.
//
// A `RecordStore` is built once (by the loader or from test fixtures) and only
// ever handed out by shared reference afterwards. There is no setter; a reload
// builds a new store.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::NaiveDate;

use crate::filter::Dimension;
use crate::types::Record;

#[derive(Debug, Clone)]
pub struct RecordStore {
    records: Arc<[Record]>,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl RecordStore {
    /// Build a store, ordering rows by period so downstream series are stable.
    pub fn new(mut records: Vec<Record>) -> Self {
        // Stable sort keeps file order within a month.
        records.sort_by_key(|r| r.period);
        Self {
            records: records.into(),
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Earliest and latest period in the store, for the date range control.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.records.first()?.period;
        let last = self.records.last()?.period;
        Some((first, last))
    }

    /// Sorted distinct non-empty values of a categorical dimension.
    pub fn choices(&self, dimension: Dimension) -> Vec<String> {
        let values: BTreeSet<&str> = self
            .records
            .iter()
            .filter_map(|r| dimension.value_of(r))
            .collect();
        values.into_iter().map(str::to_string).collect()
    }

    /// Sorted distinct `(group_id, group_name)` pairs.
    ///
    /// When one id carries several names, the first one seen wins.
    pub fn groups(&self) -> Vec<(String, String)> {
        let mut out: BTreeMap<&str, &str> = BTreeMap::new();
        for r in self.records.iter() {
            out.entry(r.group_id.as_str()).or_insert(r.group_name.as_str());
        }
        out.into_iter()
            .map(|(id, name)| (id.to_string(), name.to_string()))
            .collect()
    }
}
