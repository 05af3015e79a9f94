//! Ordered key-value store.
//!
//! Every module writes under its own namespace (the module name); within a
//! namespace keys are compared byte-lexicographically. Handlers never touch
//! a backend directly: they see a [`CacheStore`] overlay whose write set is
//! applied in one step when the transaction commits.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::CoreError;

/// Pending writes keyed by `(namespace, key)`; `None` marks a deletion.
pub type WriteSet = BTreeMap<(String, Vec<u8>), Option<Vec<u8>>>;

/// Read access to an ordered, namespaced key-value store.
pub trait KvStore {
    /// Get the value stored under `key`.
    fn get(&self, namespace: &str, key: &[u8]) -> Result<Option<Vec<u8>>, CoreError>;

    /// All entries whose key starts with `prefix`, in ascending key order.
    fn scan_prefix(
        &self,
        namespace: &str,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, CoreError>;

    /// Names of every namespace holding at least one key, ascending.
    fn namespaces(&self) -> Result<Vec<String>, CoreError>;
}

/// A store that can durably apply a committed write set.
pub trait KvStoreMut: KvStore {
    /// Apply all writes atomically.
    fn apply(&mut self, writes: WriteSet) -> Result<(), CoreError>;
}

/// In-memory backend: one ordered map per namespace.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    trees: BTreeMap<String, BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys across all namespaces.
    pub fn len(&self) -> usize {
        self.trees.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KvStore for MemoryStore {
    fn get(&self, namespace: &str, key: &[u8]) -> Result<Option<Vec<u8>>, CoreError> {
        Ok(self
            .trees
            .get(namespace)
            .and_then(|tree| tree.get(key))
            .cloned())
    }

    fn scan_prefix(
        &self,
        namespace: &str,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, CoreError> {
        let Some(tree) = self.trees.get(namespace) else {
            return Ok(Vec::new());
        };
        Ok(tree
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn namespaces(&self) -> Result<Vec<String>, CoreError> {
        Ok(self
            .trees
            .iter()
            .filter(|(_, tree)| !tree.is_empty())
            .map(|(name, _)| name.clone())
            .collect())
    }
}

impl KvStoreMut for MemoryStore {
    fn apply(&mut self, writes: WriteSet) -> Result<(), CoreError> {
        for ((namespace, key), value) in writes {
            let tree = self.trees.entry(namespace).or_default();
            match value {
                Some(v) => {
                    tree.insert(key, v);
                }
                None => {
                    tree.remove(&key);
                }
            }
        }
        Ok(())
    }
}

/// Write-back overlay over a parent store.
///
/// Reads see the parent snapshot plus this overlay's own writes. Nothing
/// reaches the parent until the owner takes the write set and applies it.
pub struct CacheStore<'a> {
    parent: &'a dyn KvStore,
    writes: WriteSet,
}

impl<'a> CacheStore<'a> {
    /// Create an empty overlay.
    pub fn new(parent: &'a dyn KvStore) -> Self {
        Self {
            parent,
            writes: WriteSet::new(),
        }
    }

    /// Stage a write.
    pub fn set(&mut self, namespace: &str, key: Vec<u8>, value: Vec<u8>) {
        self.writes
            .insert((namespace.to_string(), key), Some(value));
    }

    /// Stage a deletion.
    pub fn delete(&mut self, namespace: &str, key: Vec<u8>) {
        self.writes.insert((namespace.to_string(), key), None);
    }

    /// Number of staged writes.
    pub fn pending(&self) -> usize {
        self.writes.len()
    }

    /// Consume the overlay, returning the staged writes.
    pub fn into_writes(self) -> WriteSet {
        self.writes
    }
}

impl KvStore for CacheStore<'_> {
    fn get(&self, namespace: &str, key: &[u8]) -> Result<Option<Vec<u8>>, CoreError> {
        match self.writes.get(&(namespace.to_string(), key.to_vec())) {
            Some(staged) => Ok(staged.clone()),
            None => self.parent.get(namespace, key),
        }
    }

    fn scan_prefix(
        &self,
        namespace: &str,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, CoreError> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = self
            .parent
            .scan_prefix(namespace, prefix)?
            .into_iter()
            .collect();
        let start = (namespace.to_string(), prefix.to_vec());
        for ((ns, key), value) in self.writes.range(start..) {
            if ns != namespace || !key.starts_with(prefix) {
                break;
            }
            match value {
                Some(v) => {
                    merged.insert(key.clone(), v.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }

    fn namespaces(&self) -> Result<Vec<String>, CoreError> {
        let mut names: BTreeSet<String> = self.parent.namespaces()?.into_iter().collect();
        for (ns, _) in self.writes.keys() {
            names.insert(ns.clone());
        }
        let mut out = Vec::new();
        for name in names {
            if !self.scan_prefix(&name, &[])?.is_empty() {
                out.push(name);
            }
        }
        Ok(out)
    }
}
