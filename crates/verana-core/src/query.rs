use crate::error::CoreError;

/// Page size used when a query passes `response_max_size = 0`.
pub const DEFAULT_RESPONSE_MAX_SIZE: u32 = 64;
/// Largest page a query may request.
pub const MAX_RESPONSE_MAX_SIZE: u32 = 1024;

/// Resolve a requested page size: 0 means the default, anything above
/// 1024 is rejected.
pub fn resolve_response_max_size(requested: u32) -> Result<usize, CoreError> {
    match requested {
        0 => Ok(DEFAULT_RESPONSE_MAX_SIZE as usize),
        n if n <= MAX_RESPONSE_MAX_SIZE => Ok(n as usize),
        n => Err(CoreError::InvalidRequest(format!(
            "response_max_size must be between 1 and {}, got {}",
            MAX_RESPONSE_MAX_SIZE, n
        ))),
    }
}
