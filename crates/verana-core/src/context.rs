use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::events::Event;
use crate::store::{CacheStore, KvStore, WriteSet};
use crate::types::Timestamp;

/// Block-level information every handler observes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub chain_id: String,
    pub height: u64,
    /// Block time; all `created`/`modified` stamps mirror this value.
    pub time: Timestamp,
}

impl BlockHeader {
    /// Header at `time` with height 1 on the default chain.
    pub fn at(time: Timestamp) -> Self {
        Self {
            chain_id: "vna-local-1".into(),
            height: 1,
            time,
        }
    }
}

/// Execution context of one transaction.
///
/// Holds the write-back overlay, the block header, and the events emitted
/// so far. Dropping a context without calling [`Context::into_parts`]
/// discards every write and event, which is how a failed transaction is
/// rolled back.
pub struct Context<'a> {
    store: CacheStore<'a>,
    header: BlockHeader,
    events: Vec<Event>,
}

impl<'a> Context<'a> {
    /// Open a context over a committed store snapshot.
    pub fn new(parent: &'a dyn KvStore, header: BlockHeader) -> Self {
        Self {
            store: CacheStore::new(parent),
            header,
            events: Vec::new(),
        }
    }

    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    /// Current block time.
    pub fn block_time(&self) -> Timestamp {
        self.header.time
    }

    pub fn block_height(&self) -> u64 {
        self.header.height
    }

    /// Move the context to a later block (used when a single context
    /// spans several simulated blocks).
    pub fn advance_to(&mut self, height: u64, time: Timestamp) {
        self.header.height = height;
        self.header.time = time;
    }

    /// Read a raw value.
    pub fn get(&self, namespace: &str, key: &[u8]) -> Result<Option<Vec<u8>>, CoreError> {
        self.store.get(namespace, key)
    }

    /// Stage a raw write.
    pub fn set(&mut self, namespace: &str, key: Vec<u8>, value: Vec<u8>) {
        self.store.set(namespace, key, value);
    }

    /// Stage a raw deletion.
    pub fn delete(&mut self, namespace: &str, key: Vec<u8>) {
        self.store.delete(namespace, key);
    }

    /// Ordered scan over a key prefix.
    pub fn scan_prefix(
        &self,
        namespace: &str,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, CoreError> {
        self.store.scan_prefix(namespace, prefix)
    }

    /// The overlay as a read-only store (for hashing and export).
    pub fn store(&self) -> &dyn KvStore {
        &self.store
    }

    /// Record an event.
    pub fn emit(&mut self, event: Event) {
        tracing::debug!(event = %event, "event emitted");
        self.events.push(event);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Finish the transaction, yielding its write set and events.
    pub fn into_parts(self) -> (WriteSet, Vec<Event>) {
        (self.store.into_writes(), self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KvStoreMut, MemoryStore};

    #[test]
    fn test_context_reads_own_writes() {
        let store = MemoryStore::new();
        let mut ctx = Context::new(&store, BlockHeader::at(Timestamp::from_unix(100)));
        ctx.set("td", b"k".to_vec(), b"v".to_vec());
        assert_eq!(ctx.get("td", b"k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(ctx.block_time(), Timestamp::from_unix(100));
    }

    #[test]
    fn test_into_parts_then_apply() {
        let mut store = MemoryStore::new();
        let (writes, events) = {
            let mut ctx = Context::new(&store, BlockHeader::at(Timestamp::from_unix(1)));
            ctx.set("dd", b"k".to_vec(), b"v".to_vec());
            ctx.emit(Event::new("touch_did"));
            ctx.into_parts()
        };
        assert_eq!(events.len(), 1);
        store.apply(writes).unwrap();
        assert_eq!(store.get("dd", b"k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn test_advance_to() {
        let store = MemoryStore::new();
        let mut ctx = Context::new(&store, BlockHeader::at(Timestamp::from_unix(1)));
        ctx.advance_to(5, Timestamp::from_unix(50));
        assert_eq!(ctx.block_height(), 5);
        assert_eq!(ctx.block_time().seconds, 50);
    }
}
