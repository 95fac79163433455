//! The world state interface consumed by the contract, and an in-memory
//! implementation backing the reference ledger runtime.
use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Key-value world state as exposed by the ledger runtime.
pub trait StateStore {
    /// Reads the value stored under `key`, if any.
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Writes `value` under `key`, replacing any previous value.
    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;
}

impl<S: StateStore + ?Sized> StateStore for &mut S {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get_state(key)
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        (**self).put_state(key, value)
    }
}

/// Errors raised by a state store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("State store unavailable: {0}")]
    Unavailable(String),
    #[error("Value under {key} is not valid UTF-8")]
    NonUtf8Value { key: String },
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] csv::Error),
}

/// One row of a CSV snapshot.
#[derive(Serialize, Deserialize)]
struct SnapshotRow {
    key: String,
    value: String,
}

/// Ordered in-memory world state.
#[derive(Default, Debug)]
pub struct MemoryStore {
    entries: BTreeMap<String, Vec<u8>>,
    /// When set, every read fails.
    fail_reads: bool,
    /// Number of writes accepted before every further write fails.
    writes_left: Option<usize>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Loads a store from a CSV snapshot of `key,value` rows.
    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let mut reader = csv::ReaderBuilder::new().from_path(path)?;
        let mut store = MemoryStore::new();
        for row in reader.deserialize() {
            let row: SnapshotRow = row?;
            store.entries.insert(row.key, row.value.into_bytes());
        }
        Ok(store)
    }

    /// Writes the store to a CSV snapshot of `key,value` rows.
    pub fn save_csv(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let mut writer = csv::Writer::from_path(path)?;
        for (key, value) in &self.entries {
            let value = String::from_utf8(value.clone())
                .map_err(|_| StoreError::NonUtf8Value { key: key.clone() })?;
            writer.serialize(SnapshotRow {
                key: key.clone(),
                value,
            })?;
        }
        writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    /// Applies a set of writes at once.
    pub(crate) fn apply(&mut self, writes: BTreeMap<String, Vec<u8>>) {
        self.entries.extend(writes);
    }

    /// Iterates over all entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Makes every subsequent read fail.
    #[cfg(test)]
    pub fn fail_reads(&mut self) {
        self.fail_reads = true;
    }

    /// Accepts `count` more writes, then fails every write after that.
    #[cfg(test)]
    pub fn fail_writes_after(&mut self, count: usize) {
        self.writes_left = Some(count);
    }

    /// Lifts a limit set by [`MemoryStore::fail_writes_after`].
    #[cfg(test)]
    pub fn allow_writes(&mut self) {
        self.writes_left = None;
    }
}

impl StateStore for MemoryStore {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        if self.fail_reads {
            return Err(StoreError::Unavailable(format!("read of {key} refused")));
        }
        Ok(self.entries.get(key).cloned())
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        match self.writes_left.as_mut() {
            Some(0) => {
                return Err(StoreError::Unavailable(format!("write of {key} refused")));
            }
            Some(left) => *left -= 1,
            None => {}
        }
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}
