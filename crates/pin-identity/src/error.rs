//! Error types for pin-identity.
//!
//! All errors are strongly typed and propagated without panicking.
//! Challenge failures never carry transport detail: a domain that cannot
//! be reached and a domain that does not serve the token look the same.

/// Error taxonomy shared by every component.
#[derive(Debug, thiserror::Error)]
pub enum PinError {
    /// No record exists for the requested key (domain row, handle, token).
    #[error("Not found: {0}")]
    NotFound(String),

    /// The live challenge did not surface the expected token.
    #[error("token not found")]
    VerificationFailed,

    /// A persistence call failed.
    #[error("Storage error: {0}")]
    StoreFailure(String),

    /// Malformed input, e.g. a domain that normalizes to nothing.
    #[error("Invalid input: {0}")]
    ValidationFailure(String),

    /// The outbound HTTP client could not be set up.
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PinError {
    /// True for failures raised by a persistence collaborator.
    ///
    /// File-backed stores surface raw IO and serialization errors; callers
    /// that only care about the taxonomy treat them as store failures.
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            Self::StoreFailure(_) | Self::Io(_) | Self::Serialization(_)
        )
    }
}

impl From<serde_json::Error> for PinError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for PinError {
    fn from(e: reqwest::Error) -> Self {
        Self::HttpClient(e.to_string())
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, PinError>;
