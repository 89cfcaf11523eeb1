//! Persistent key-value storage backing the session.
//!
//! This module provides:
//! - `KeyValueStore`: string key/value storage with atomic batch writes
//! - `FileStore`: single JSON file, replaced atomically on every write
//! - `MemoryStore`: in-process map for tests and throwaway sessions
//!
//! Batches exist so a multi-key update (token + user + login flag) is never
//! observed half-applied by a concurrent reader.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::collections::BTreeMap;

use anyhow::Result;

/// A single mutation inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
enum WriteOp {
    Set(String, String),
    Remove(String),
}

/// Ordered list of mutations applied as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ops.push(WriteOp::Set(key.into(), value.into()));
        self
    }

    pub fn remove(mut self, key: impl Into<String>) -> Self {
        self.ops.push(WriteOp::Remove(key.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Apply the batch to an in-memory map, in order.
    pub(crate) fn apply_to(&self, map: &mut BTreeMap<String, String>) {
        for op in &self.ops {
            match op {
                WriteOp::Set(key, value) => {
                    map.insert(key.clone(), value.clone());
                }
                WriteOp::Remove(key) => {
                    map.remove(key);
                }
            }
        }
    }
}

/// Durable string storage shared between concurrent API calls.
pub trait KeyValueStore: Send + Sync {
    /// Read a single key.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Read several keys from one consistent snapshot.
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>>;

    /// Apply every op in `batch` atomically.
    fn apply(&self, batch: WriteBatch) -> Result<()>;

    /// Remove every key.
    fn clear_all(&self) -> Result<()>;
}
