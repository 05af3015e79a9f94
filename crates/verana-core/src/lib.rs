//! Verana Core: shared primitives for the Verifiable Trust Registry
//! state machine: the ordered key-value store, the per-transaction
//! context, the bank capability, events, fixed-point decimals, and the
//! error taxonomy every module maps its failures onto.

pub mod bank;
pub mod collections;
pub mod context;
pub mod dec;
pub mod error;
pub mod events;
pub mod hashing;
pub mod query;
pub mod store;
pub mod types;

pub use bank::{Balance, Bank, StoreBank, BOND_DENOM};
pub use collections::{Collection, Item, Sequence, StoreKey};
pub use context::{BlockHeader, Context};
pub use dec::Dec;
pub use error::{CoreError, ErrorKind};
pub use events::{Event, EventAttribute};
pub use query::resolve_response_max_size;
pub use store::{CacheStore, KvStore, KvStoreMut, MemoryStore, WriteSet};
pub use types::{
    ensure_gov_authority, gov_authority, module_address, validate_address, validate_country,
    validate_did, validate_language, Timestamp, GOV_MODULE,
};
