use verana_core::{CoreError, ErrorKind};

/// Trust deposit errors.
#[derive(Debug, thiserror::Error)]
pub enum TrustDepositError {
    #[error("trust deposit not found for account {0}")]
    NotFound(String),

    #[error("insufficient trust deposit: {0}")]
    InsufficientDeposit(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl TrustDepositError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InsufficientDeposit(_) => ErrorKind::InsufficientDeposit,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::Core(e) => e.kind(),
        }
    }
}
