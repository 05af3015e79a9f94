use verana_core::{CoreError, ErrorKind};
use verana_credentialschema::SchemaError;
use verana_diddirectory::DidDirectoryError;
use verana_permission::PermissionError;
use verana_trustdeposit::TrustDepositError;
use verana_trustregistry::TrustRegistryError;
use verana_validation::ValidationError;

/// Errors surfaced by message routing, block execution, and genesis.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid block: {0}")]
    InvalidBlock(String),

    #[error("invalid genesis: {0}")]
    InvalidGenesis(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    TrustDeposit(#[from] TrustDepositError),

    #[error(transparent)]
    TrustRegistry(#[from] TrustRegistryError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Permission(#[from] PermissionError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    DidDirectory(#[from] DidDirectoryError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidBlock(_) | Self::InvalidGenesis(_) | Self::Json(_) => {
                ErrorKind::InvalidRequest
            }
            Self::TrustDeposit(e) => e.kind(),
            Self::TrustRegistry(e) => e.kind(),
            Self::Schema(e) => e.kind(),
            Self::Permission(e) => e.kind(),
            Self::Validation(e) => e.kind(),
            Self::DidDirectory(e) => e.kind(),
            Self::Core(e) => e.kind(),
        }
    }
}
