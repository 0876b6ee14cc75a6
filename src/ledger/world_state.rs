use std::collections::BTreeMap;

use crate::ledger::error::{LedgerError, malformed_input};

/// Key-value store handle handed to the contract for one invocation.
pub trait WorldState {
    /// `None` and an empty value both mean the key is absent.
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError>;

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryWorldState {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryWorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: BTreeMap<String, Vec<u8>>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn apply(&mut self, write_set: WriteSet) {
        self.entries.extend(write_set.writes);
    }
}

impl WorldState for MemoryWorldState {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError> {
        ensure_key(key)?;
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSet {
    writes: BTreeMap<String, Vec<u8>>,
}

impl WriteSet {
    pub fn keys(&self) -> Vec<String> {
        self.writes.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<u8>)> {
        self.writes.iter()
    }
}

/// Buffers writes over a committed snapshot; nothing reaches the snapshot until the
/// caller applies the resulting [`WriteSet`].
pub struct StagedWorldState<'a> {
    committed: &'a MemoryWorldState,
    writes: WriteSet,
}

impl<'a> StagedWorldState<'a> {
    pub fn new(committed: &'a MemoryWorldState) -> Self {
        Self {
            committed,
            writes: WriteSet::default(),
        }
    }

    pub fn into_write_set(self) -> WriteSet {
        self.writes
    }
}

impl WorldState for StagedWorldState<'_> {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        if let Some(value) = self.writes.writes.get(key) {
            return Ok(Some(value.clone()));
        }
        self.committed.get_state(key)
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError> {
        ensure_key(key)?;
        self.writes.writes.insert(key.to_string(), value);
        Ok(())
    }
}

fn ensure_key(key: &str) -> Result<(), LedgerError> {
    if key.is_empty() {
        return Err(malformed_input("world state key cannot be empty"));
    }
    Ok(())
}
