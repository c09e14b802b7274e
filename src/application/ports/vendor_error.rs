/// Failure of a vendor API call.
///
/// Transient transport failures and 5xx/429 responses are retryable; auth
/// problems, other 4xx responses and malformed payloads are not.
#[derive(Debug, thiserror::Error)]
pub enum VendorError {
    #[error("api request failed: {0}")]
    RequestFailed(String),
    #[error("vendor returned status {status}: {message}")]
    HttpStatus { status: u16, message: String },
    #[error("vendor returned an empty body")]
    EmptyBody,
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("credentials not configured: {0}")]
    MissingCredentials(String),
}

impl VendorError {
    pub fn is_retryable(&self) -> bool {
        match self {
            VendorError::RequestFailed(_) => true,
            VendorError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
