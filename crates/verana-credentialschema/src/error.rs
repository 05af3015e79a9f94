use verana_core::{CoreError, ErrorKind};
use verana_trustdeposit::TrustDepositError;
use verana_trustregistry::TrustRegistryError;

/// Credential schema errors.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("credential schema not found: {0}")]
    NotFound(String),

    #[error("not the controller of trust registry {tr_id}: {caller}")]
    Unauthorized { tr_id: u64, caller: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid JSON schema: {0}")]
    InvalidJsonSchema(String),

    #[error(transparent)]
    TrustRegistry(#[from] TrustRegistryError),

    #[error(transparent)]
    TrustDeposit(#[from] TrustDepositError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl SchemaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::InvalidJsonSchema(_) => ErrorKind::InvalidJsonSchema,
            Self::TrustRegistry(e) => e.kind(),
            Self::TrustDeposit(e) => e.kind(),
            Self::Core(e) => e.kind(),
        }
    }
}
