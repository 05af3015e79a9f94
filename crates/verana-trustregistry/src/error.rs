use verana_core::{CoreError, ErrorKind};
use verana_trustdeposit::TrustDepositError;

/// Trust registry errors.
#[derive(Debug, thiserror::Error)]
pub enum TrustRegistryError {
    #[error("trust registry not found: {0}")]
    NotFound(String),

    #[error("trust registry already exists: {0}")]
    AlreadyExists(String),

    #[error("not the controller of trust registry {id}: {caller}")]
    Unauthorized { id: u64, caller: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    TrustDeposit(#[from] TrustDepositError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl TrustRegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::TrustDeposit(e) => e.kind(),
            Self::Core(e) => e.kind(),
        }
    }
}
