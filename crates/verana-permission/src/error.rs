use verana_core::{CoreError, ErrorKind};
use verana_credentialschema::SchemaError;
use verana_trustdeposit::TrustDepositError;
use verana_trustregistry::TrustRegistryError;

/// Permission errors.
#[derive(Debug, thiserror::Error)]
pub enum PermissionError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid signer: {0}")]
    InvalidSigner(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("insufficient deposit: {0}")]
    InsufficientDeposit(String),

    #[error("permission window overlaps permission {existing}")]
    Overlapping { existing: u64 },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    TrustRegistry(#[from] TrustRegistryError),

    #[error(transparent)]
    TrustDeposit(#[from] TrustDepositError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl PermissionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidSigner(_) => ErrorKind::InvalidSigner,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::InsufficientDeposit(_) => ErrorKind::InsufficientDeposit,
            Self::Overlapping { .. } => ErrorKind::OverlappingPermission,
            Self::Schema(e) => e.kind(),
            Self::TrustRegistry(e) => e.kind(),
            Self::TrustDeposit(e) => e.kind(),
            Self::Core(e) => e.kind(),
        }
    }
}
