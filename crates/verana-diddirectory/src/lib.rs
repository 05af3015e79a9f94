//! Verana DID Directory.
//!
//! Accounts lease DIDs for whole years against a trust deposit. Once a
//! lease has been expired for longer than the grace period anyone may
//! remove the entry.

pub mod directory;
pub mod error;
pub mod types;

pub use directory::{DidDirectoryManager, ListDidsRequest, MODULE_NAME};
pub use error::DidDirectoryError;
pub use types::{
    DidDirectory, GenesisState, MsgAddDid, MsgRemoveDid, MsgRenewDid, MsgTouchDid,
    MsgUpdateParams, Params,
};
