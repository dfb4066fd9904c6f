//! Signal-name → id resolution against the target store.
//!
//! Reads the whole registry once, inserts only the missing names in one
//! batch, and re-reads on conflict so a concurrent run that registered the
//! same names first is tolerated. Identity is the name.

use core::fmt;
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};

use crate::store::{StoreError, TargetStore};

/// Read → insert → re-read rounds before giving up.
pub const MAX_RESOLVE_ATTEMPTS: usize = 3;

#[derive(Debug)]
pub enum RegistryError {
    Store(StoreError),
    /// Names still missing after every attempt.
    Unresolved(Vec<String>),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Store(e) => write!(f, "signal registry: {}", e),
            RegistryError::Unresolved(names) => write!(
                f,
                "signal registry: could not resolve {} after {} attempts",
                names.join(", "),
                MAX_RESOLVE_ATTEMPTS
            ),
        }
    }
}

impl std::error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegistryError::Store(e) => Some(e),
            RegistryError::Unresolved(_) => None,
        }
    }
}

impl From<StoreError> for RegistryError {
    fn from(value: StoreError) -> Self {
        RegistryError::Store(value)
    }
}

#[derive(Debug, Default)]
pub struct SignalRegistry {
    ids: BTreeMap<String, i32>,
    created: usize,
}

impl SignalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure every name in `names` has an id, creating the missing ones.
    pub fn resolve<S: TargetStore + ?Sized>(
        &mut self,
        store: &mut S,
        names: &BTreeSet<String>,
    ) -> Result<(), RegistryError> {
        if names.iter().all(|n| self.ids.contains_key(n)) {
            return Ok(());
        }

        for attempt in 1..=MAX_RESOLVE_ATTEMPTS {
            for signal in store.load_signals()? {
                self.ids.insert(signal.name, signal.id);
            }
            let missing = self.missing(names);
            if missing.is_empty() {
                return Ok(());
            }

            debug!("Registry: attempt {} creating {} signal(s)", attempt, missing.len());
            match store.insert_signals(&missing) {
                Ok(created) => {
                    self.created += created.len();
                    if !created.is_empty() {
                        info!(
                            "Registry: created {} signal(s): {}",
                            created.len(),
                            created.iter().map(|s| s.name.as_str()).collect::<Vec<_>>().join(", ")
                        );
                    }
                    for signal in created {
                        self.ids.insert(signal.name, signal.id);
                    }
                    // Anything skipped was registered concurrently; picked up on the next read.
                    if self.missing(names).is_empty() {
                        return Ok(());
                    }
                }
                Err(StoreError::Conflict(msg)) => {
                    warn!("Registry: concurrent registration on attempt {} ({}), re-reading", attempt, msg);
                }
                Err(e) => return Err(e.into()),
            }
        }

        // A final read picks up rows that landed during the last attempt.
        for signal in store.load_signals()? {
            self.ids.insert(signal.name, signal.id);
        }
        let missing = self.missing(names);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(RegistryError::Unresolved(missing))
        }
    }

    pub fn id(&self, name: &str) -> Option<i32> {
        self.ids.get(name).copied()
    }

    /// Signals this registry created over its lifetime.
    pub fn created(&self) -> usize {
        self.created
    }

    fn missing(&self, names: &BTreeSet<String>) -> Vec<String> {
        names.iter().filter(|n| !self.ids.contains_key(*n)).cloned().collect()
    }
}
