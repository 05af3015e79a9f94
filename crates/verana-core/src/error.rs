use std::fmt;

/// Semantic error categories shared by every module.
///
/// Module errors keep their own variants but always report one of these
/// kinds, so callers can branch on the category regardless of which
/// module rejected the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The sender does not match the required controller, grantee, or authority.
    InvalidSigner,
    /// Inputs failed structural validation.
    InvalidRequest,
    /// A referenced entity is missing.
    NotFound,
    /// The entity exists but the caller lacks the capability.
    Unauthorized,
    /// A uniqueness constraint was violated.
    AlreadyExists,
    /// A state-machine guard was violated.
    InvalidState,
    /// A trust-deposit check failed.
    InsufficientDeposit,
    /// A bank balance check failed.
    InsufficientFunds,
    /// A credential schema failed meta-schema validation.
    InvalidJsonSchema,
    /// A permission's effective window overlaps an existing one.
    OverlappingPermission,
    /// Store, codec, or arithmetic failure.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvalidSigner => "InvalidSigner",
            Self::InvalidRequest => "InvalidRequest",
            Self::NotFound => "NotFound",
            Self::Unauthorized => "Unauthorized",
            Self::AlreadyExists => "AlreadyExists",
            Self::InvalidState => "InvalidState",
            Self::InsufficientDeposit => "InsufficientDeposit",
            Self::InsufficientFunds => "InsufficientFunds",
            Self::InvalidJsonSchema => "InvalidJsonSchema",
            Self::OverlappingPermission => "OverlappingPermission",
            Self::Internal => "Internal",
        };
        write!(f, "{}", name)
    }
}

/// Core errors raised by the store, codec, bank, and shared validators.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid signer: {0}")]
    InvalidSigner(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid DID: {0}")]
    InvalidDid(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("insufficient funds: account {account} has {available}, required {required}")]
    InsufficientFunds {
        account: String,
        available: u64,
        required: u64,
    },

    #[error("arithmetic overflow: {0}")]
    Overflow(String),

    #[error("invalid decimal: {0}")]
    InvalidDecimal(String),

    #[error("decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("store error: {0}")]
    Store(String),
}

impl CoreError {
    /// The semantic category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSigner(_) => ErrorKind::InvalidSigner,
            Self::InvalidRequest(_) | Self::InvalidDid(_) | Self::InvalidDecimal(_) => {
                ErrorKind::InvalidRequest
            }
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::Overflow(_) | Self::Decode(_) | Self::Store(_) => ErrorKind::Internal,
        }
    }
}
