//! In-memory `TargetStore` for pipeline tests.
//!
//! Can simulate a competing pipeline run that registers signals between our
//! registry read and our insert, and a failing upsert.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::db::models::{NewFact, Signal};
use crate::store::{StoreError, TargetStore};

/// How `insert_signals` reacts to a name that already exists.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Plain INSERT: the whole batch fails with a unique violation.
    #[default]
    Fail,
    /// INSERT … ON CONFLICT DO NOTHING: existing names are skipped.
    Skip,
}

#[derive(Debug, Default)]
pub struct MemoryTargetStore {
    signals: Vec<Signal>,
    facts: BTreeMap<(DateTime<Utc>, i32), Option<f64>>,
    policy: ConflictPolicy,
    competing_names: Vec<String>,
    fail_upserts: bool,
    pub signal_reads: usize,
    pub signal_inserts: usize,
    pub upserts: usize,
}

impl MemoryTargetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Names another writer registers right before our next `insert_signals`.
    pub fn race_with(&mut self, names: &[&str]) {
        self.competing_names.extend(names.iter().map(|n| n.to_string()));
    }

    pub fn fail_upserts(&mut self) {
        self.fail_upserts = true;
    }

    pub fn register(&mut self, name: &str) -> i32 {
        if let Some(existing) = self.signals.iter().find(|s| s.name == name) {
            return existing.id;
        }
        let id = self.signals.len() as i32 + 1;
        self.signals.push(Signal {
            id,
            name: name.to_string(),
        });
        id
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    pub fn fact(&self, timestamp: DateTime<Utc>, signal_name: &str) -> Option<Option<f64>> {
        let id = self.signals.iter().find(|s| s.name == signal_name)?.id;
        self.facts.get(&(timestamp, id)).copied()
    }
}

impl TargetStore for MemoryTargetStore {
    fn load_signals(&mut self) -> Result<Vec<Signal>, StoreError> {
        self.signal_reads += 1;
        Ok(self.signals.clone())
    }

    fn insert_signals(&mut self, names: &[String]) -> Result<Vec<Signal>, StoreError> {
        self.signal_inserts += 1;
        for name in std::mem::take(&mut self.competing_names) {
            self.register(&name);
        }

        let exists = |signals: &[Signal], name: &str| signals.iter().any(|s| s.name == name);
        if self.policy == ConflictPolicy::Fail
            && let Some(dup) = names.iter().find(|n| exists(&self.signals, n))
        {
            return Err(StoreError::Conflict(format!(
                "duplicate key value violates unique constraint \"signal_name_key\" ({})",
                dup
            )));
        }

        let mut created = Vec::new();
        for name in names {
            if exists(&self.signals, name) {
                continue;
            }
            let id = self.register(name);
            created.push(Signal { id, name: name.clone() });
        }
        Ok(created)
    }

    fn upsert_facts(&mut self, facts: &[NewFact]) -> Result<usize, StoreError> {
        self.upserts += 1;
        if self.fail_upserts {
            return Err(StoreError::Database("canceling statement due to statement timeout".to_string()));
        }
        for fact in facts {
            self.facts.insert((fact.timestamp, fact.signal_id), fact.value);
        }
        Ok(facts.len())
    }
}
