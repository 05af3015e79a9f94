//! RocksDB storage backend: one column family per module namespace.

use std::collections::BTreeSet;
use std::path::Path;

use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use verana_core::{CoreError, KvStore, KvStoreMut, MemoryStore, WriteSet};

const DEFAULT_CF: &str = "default";

fn store_err(err: rocksdb::Error) -> CoreError {
    CoreError::Store(err.to_string())
}

/// RocksDB-backed ordered store.
pub struct RocksStore {
    db: DB,
    namespaces: BTreeSet<String>,
}

impl RocksStore {
    /// Open or create a database at `path`, reopening every namespace
    /// column family found on disk.
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        std::fs::create_dir_all(path)
            .map_err(|e| CoreError::Store(format!("create {}: {}", path.display(), e)))?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let existing = DB::list_cf(&Options::default(), path)
            .unwrap_or_else(|_| vec![DEFAULT_CF.to_string()]);
        let db = DB::open_cf(&opts, path, &existing).map_err(store_err)?;
        let namespaces = existing
            .into_iter()
            .filter(|name| name != DEFAULT_CF)
            .collect();
        tracing::debug!(path = %path.display(), "rocksdb opened");
        Ok(Self { db, namespaces })
    }

    fn cf(&self, namespace: &str) -> Option<&rocksdb::ColumnFamily> {
        if self.namespaces.contains(namespace) {
            self.db.cf_handle(namespace)
        } else {
            None
        }
    }
}

impl KvStore for RocksStore {
    fn get(&self, namespace: &str, key: &[u8]) -> Result<Option<Vec<u8>>, CoreError> {
        match self.cf(namespace) {
            Some(cf) => self.db.get_cf(cf, key).map_err(store_err),
            None => Ok(None),
        }
    }

    fn scan_prefix(
        &self,
        namespace: &str,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, CoreError> {
        let Some(cf) = self.cf(namespace) else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for item in self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward))
        {
            let (key, value) = item.map_err(store_err)?;
            if !key.starts_with(prefix) {
                break;
            }
            out.push((key.to_vec(), value.to_vec()));
        }
        Ok(out)
    }

    fn namespaces(&self) -> Result<Vec<String>, CoreError> {
        let mut out = Vec::new();
        for name in &self.namespaces {
            if let Some(cf) = self.db.cf_handle(name) {
                if self.db.iterator_cf(cf, IteratorMode::Start).next().is_some() {
                    out.push(name.clone());
                }
            }
        }
        Ok(out)
    }
}

impl KvStoreMut for RocksStore {
    fn apply(&mut self, writes: WriteSet) -> Result<(), CoreError> {
        let missing: BTreeSet<String> = writes
            .keys()
            .map(|(namespace, _)| namespace.clone())
            .filter(|namespace| !self.namespaces.contains(namespace))
            .collect();
        for namespace in missing {
            self.db
                .create_cf(&namespace, &Options::default())
                .map_err(store_err)?;
            tracing::debug!(namespace = %namespace, "column family created");
            self.namespaces.insert(namespace);
        }

        let mut batch = WriteBatch::default();
        for ((namespace, key), value) in &writes {
            let cf = self
                .db
                .cf_handle(namespace)
                .ok_or_else(|| CoreError::Store(format!("column family '{}' not found", namespace)))?;
            match value {
                Some(v) => batch.put_cf(cf, key, v),
                None => batch.delete_cf(cf, key),
            }
        }
        self.db.write(batch).map_err(store_err)
    }
}

/// The store selected by configuration.
pub enum Backend {
    Memory(MemoryStore),
    Rocks(RocksStore),
}

impl KvStore for Backend {
    fn get(&self, namespace: &str, key: &[u8]) -> Result<Option<Vec<u8>>, CoreError> {
        match self {
            Self::Memory(s) => s.get(namespace, key),
            Self::Rocks(s) => s.get(namespace, key),
        }
    }

    fn scan_prefix(
        &self,
        namespace: &str,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, CoreError> {
        match self {
            Self::Memory(s) => s.scan_prefix(namespace, prefix),
            Self::Rocks(s) => s.scan_prefix(namespace, prefix),
        }
    }

    fn namespaces(&self) -> Result<Vec<String>, CoreError> {
        match self {
            Self::Memory(s) => s.namespaces(),
            Self::Rocks(s) => s.namespaces(),
        }
    }
}

impl KvStoreMut for Backend {
    fn apply(&mut self, writes: WriteSet) -> Result<(), CoreError> {
        match self {
            Self::Memory(s) => s.apply(writes),
            Self::Rocks(s) => s.apply(writes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("verana-test-{}", rand::random::<u64>()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write(ns: &str, key: &[u8], value: Option<&[u8]>) -> WriteSet {
        let mut writes = WriteSet::new();
        writes.insert((ns.to_string(), key.to_vec()), value.map(<[u8]>::to_vec));
        writes
    }

    #[test]
    fn test_open_storage() {
        let dir = temp_dir();
        let storage = RocksStore::open(&dir);
        assert!(storage.is_ok());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_put_get_and_delete() {
        let dir = temp_dir();
        let mut storage = RocksStore::open(&dir).unwrap();

        storage
            .apply(write("trustregistry", b"\x01k", Some(&b"v"[..])))
            .unwrap();
        assert_eq!(
            storage.get("trustregistry", b"\x01k").unwrap(),
            Some(b"v".to_vec())
        );
        assert_eq!(storage.get("other", b"\x01k").unwrap(), None);

        storage.apply(write("trustregistry", b"\x01k", None)).unwrap();
        assert_eq!(storage.get("trustregistry", b"\x01k").unwrap(), None);
        assert!(storage.namespaces().unwrap().is_empty());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_scan_prefix_is_ordered_and_bounded() {
        let dir = temp_dir();
        let mut storage = RocksStore::open(&dir).unwrap();
        let mut writes = WriteSet::new();
        let keys: [&[u8]; 4] = [b"\x01b", b"\x01a", b"\x02a", b"\x00p"];
        for key in keys {
            writes.insert(("permission".into(), key.to_vec()), Some(b"x".to_vec()));
        }
        storage.apply(writes).unwrap();

        let keys: Vec<Vec<u8>> = storage
            .scan_prefix("permission", &[0x01])
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec![b"\x01a".to_vec(), b"\x01b".to_vec()]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_reopen_keeps_namespaces() {
        let dir = temp_dir();
        {
            let mut storage = RocksStore::open(&dir).unwrap();
            storage
                .apply(write("diddirectory", b"\x01did:example:1", Some(&b"entry"[..])))
                .unwrap();
        }
        let storage = RocksStore::open(&dir).unwrap();
        assert_eq!(storage.namespaces().unwrap(), vec!["diddirectory"]);
        assert_eq!(
            storage.get("diddirectory", b"\x01did:example:1").unwrap(),
            Some(b"entry".to_vec())
        );

        std::fs::remove_dir_all(&dir).ok();
    }
}
