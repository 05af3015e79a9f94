//! Verana application: composes the trust deposit, trust registry,
//! credential schema, permission, validation, and DID directory modules
//! into one deterministic state machine, executes blocks of transactions
//! with atomic rollback, and persists state in RocksDB.

pub mod app;
pub mod config;
pub mod error;
pub mod genesis;
pub mod node;
pub mod query;
pub mod storage;

pub use app::{Block, BlockInfo, BlockResult, Msg, MsgResponse, Tx, TxResult, VeranaApp};
pub use config::{StorageBackend, VeranaConfig};
pub use error::AppError;
pub use genesis::{export_genesis, init_chain, AppGenesis};
pub use node::VeranaNode;
pub use query::{AllParams, Query};
pub use storage::{Backend, RocksStore};
