//! Writes aggregated rows into the target store.
//!
//! Signal ids are resolved first, then facts are upserted keyed on
//! `(timestamp, signal_id)` so re-running a day overwrites instead of
//! duplicating.

use chrono::{DateTime, Utc};
use core::fmt;
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet};

use crate::db::models::NewFact;
use crate::services::aggregate::AggregatedRow;
use crate::services::registry::{RegistryError, SignalRegistry};
use crate::store::{StoreError, TargetStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub rows_affected: usize,
    pub signals_created: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Nothing to write; the store was not touched.
    Empty,
    Upserted(LoadSummary),
}

#[derive(Debug)]
pub enum LoadError {
    Registry(RegistryError),
    Store(StoreError),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Registry(e) => write!(f, "{}", e),
            LoadError::Store(e) => write!(f, "upsert facts: {}", e),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Registry(e) => Some(e),
            LoadError::Store(e) => Some(e),
        }
    }
}

impl From<RegistryError> for LoadError {
    fn from(value: RegistryError) -> Self {
        LoadError::Registry(value)
    }
}

impl From<StoreError> for LoadError {
    fn from(value: StoreError) -> Self {
        LoadError::Store(value)
    }
}

/// Facts keyed on their primary key; a later row for the same key wins.
///
/// Postgres refuses an `ON CONFLICT DO UPDATE` that touches the same row
/// twice in one statement, so the batch must not carry duplicate keys.
#[derive(Debug, Default)]
pub struct FactBatch {
    facts: BTreeMap<(DateTime<Utc>, i32), f64>,
}

impl FactBatch {
    pub fn push(&mut self, timestamp: DateTime<Utc>, signal_id: i32, value: f64) {
        self.facts.insert((timestamp, signal_id), value);
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn to_rows(&self) -> Vec<NewFact> {
        self.facts
            .iter()
            .map(|(&(timestamp, signal_id), &value)| NewFact {
                timestamp,
                signal_id,
                value: Some(value),
            })
            .collect()
    }
}

pub struct Loader {
    registry: SignalRegistry,
}

impl Loader {
    pub fn new(registry: SignalRegistry) -> Self {
        Loader { registry }
    }

    pub fn load<S: TargetStore + ?Sized>(&mut self, store: &mut S, rows: &[AggregatedRow]) -> Result<LoadOutcome, LoadError> {
        if rows.is_empty() {
            debug!("Load: empty batch, nothing to write");
            return Ok(LoadOutcome::Empty);
        }

        let names: BTreeSet<String> = rows.iter().map(AggregatedRow::signal_name).collect();
        let created_before = self.registry.created();
        self.registry.resolve(store, &names)?;

        let mut batch = FactBatch::default();
        for row in rows {
            let name = row.signal_name();
            let id = self
                .registry
                .id(&name)
                .ok_or_else(|| RegistryError::Unresolved(vec![name.clone()]))?;
            batch.push(row.bucket_start, id, row.value);
        }

        let rows_affected = store.upsert_facts(&batch.to_rows())?;
        let summary = LoadSummary {
            rows_affected,
            signals_created: self.registry.created() - created_before,
        };
        info!(
            "Load: upserted {} fact(s) (signals={}, signals_created={})",
            summary.rows_affected,
            names.len(),
            summary.signals_created
        );
        Ok(LoadOutcome::Upserted(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sensor::{Metric, Statistic};
    use crate::store::memory::MemoryTargetStore;
    use chrono::TimeZone;

    fn ts(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, m, 0).unwrap()
    }

    fn row(bucket_start: DateTime<Utc>, metric: Metric, statistic: Statistic, value: f64) -> AggregatedRow {
        AggregatedRow {
            bucket_start,
            metric,
            statistic,
            value,
        }
    }

    #[test]
    fn empty_batch_touches_nothing() {
        let mut store = MemoryTargetStore::new();
        let outcome = Loader::new(SignalRegistry::new()).load(&mut store, &[]).unwrap();
        assert_eq!(outcome, LoadOutcome::Empty);
        assert_eq!(store.signal_reads, 0);
        assert_eq!(store.signal_inserts, 0);
        assert_eq!(store.upserts, 0);
    }

    #[test]
    fn new_signals_and_facts_are_written() {
        let mut store = MemoryTargetStore::new();
        let rows = vec![
            row(ts(10, 0), Metric::WindSpeed, Statistic::Mean, 15.0),
            row(ts(10, 0), Metric::Power, Statistic::Max, 200.0),
        ];
        let outcome = Loader::new(SignalRegistry::new()).load(&mut store, &rows).unwrap();

        assert_eq!(
            outcome,
            LoadOutcome::Upserted(LoadSummary {
                rows_affected: 2,
                signals_created: 2
            })
        );
        assert_eq!(store.signals().len(), 2);
        assert_eq!(store.fact(ts(10, 0), "wind_speed_mean"), Some(Some(15.0)));
        assert_eq!(store.fact(ts(10, 0), "power_max"), Some(Some(200.0)));
    }

    #[test]
    fn reloading_a_key_overwrites_its_value() {
        let mut store = MemoryTargetStore::new();
        let mut loader = Loader::new(SignalRegistry::new());
        loader
            .load(&mut store, &[row(ts(10, 0), Metric::WindSpeed, Statistic::Mean, 10.0)])
            .unwrap();
        let second = loader
            .load(&mut store, &[row(ts(10, 0), Metric::WindSpeed, Statistic::Mean, 20.0)])
            .unwrap();

        assert_eq!(
            second,
            LoadOutcome::Upserted(LoadSummary {
                rows_affected: 1,
                signals_created: 0
            })
        );
        assert_eq!(store.fact_count(), 1);
        assert_eq!(store.fact(ts(10, 0), "wind_speed_mean"), Some(Some(20.0)));
    }

    #[test]
    fn duplicate_keys_within_a_batch_collapse() {
        let mut batch = FactBatch::default();
        batch.push(ts(10, 0), 1, 1.0);
        batch.push(ts(10, 0), 1, 2.0);
        batch.push(ts(10, 10), 1, 3.0);
        assert_eq!(batch.len(), 2);
        let rows = batch.to_rows();
        assert_eq!(rows[0].value, Some(2.0));
        assert_eq!(rows[1].timestamp, ts(10, 10));
    }

    #[test]
    fn upsert_failure_is_reported() {
        let mut store = MemoryTargetStore::new();
        store.fail_upserts();
        let err = Loader::new(SignalRegistry::new())
            .load(&mut store, &[row(ts(0, 0), Metric::Power, Statistic::Min, 1.0)])
            .unwrap_err();
        assert!(matches!(err, LoadError::Store(StoreError::Database(_))));
        assert_eq!(store.fact_count(), 0);
    }
}
