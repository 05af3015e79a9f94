use verana_core::{CoreError, ErrorKind};
use verana_credentialschema::SchemaError;
use verana_permission::PermissionError;
use verana_trustdeposit::TrustDepositError;
use verana_trustregistry::TrustRegistryError;

/// Validation workflow errors.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid signer: {0}")]
    InvalidSigner(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Permission(#[from] PermissionError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    TrustRegistry(#[from] TrustRegistryError),

    #[error(transparent)]
    TrustDeposit(#[from] TrustDepositError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidSigner(_) => ErrorKind::InvalidSigner,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::Permission(e) => e.kind(),
            Self::Schema(e) => e.kind(),
            Self::TrustRegistry(e) => e.kind(),
            Self::TrustDeposit(e) => e.kind(),
            Self::Core(e) => e.kind(),
        }
    }
}
