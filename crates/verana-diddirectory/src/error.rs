use verana_core::{CoreError, ErrorKind};
use verana_trustdeposit::TrustDepositError;
use verana_trustregistry::TrustRegistryError;

/// DID directory errors.
#[derive(Debug, thiserror::Error)]
pub enum DidDirectoryError {
    #[error("DID not found: {0}")]
    NotFound(String),

    #[error("DID already registered: {0}")]
    AlreadyExists(String),

    #[error("invalid signer: {0}")]
    InvalidSigner(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    TrustRegistry(#[from] TrustRegistryError),

    #[error(transparent)]
    TrustDeposit(#[from] TrustDepositError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl DidDirectoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::InvalidSigner(_) => ErrorKind::InvalidSigner,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::TrustRegistry(e) => e.kind(),
            Self::TrustDeposit(e) => e.kind(),
            Self::Core(e) => e.kind(),
        }
    }
}
