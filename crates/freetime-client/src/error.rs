//! Client error types.

use freetime_core::AnalysisError;
use freetime_providers::{ProviderError, ProviderErrorCode};
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
///
/// Every variant ends the process with exit code 1.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// No usable credentials, or the server rejected them.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Calendar retrieval failed.
    #[error("failed to retrieve calendar events: {0}")]
    Retrieval(#[source] ProviderError),

    /// The analysis inputs were rejected.
    #[error("analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// The error shown when no credentials are stored at all.
    pub fn not_authenticated() -> Self {
        Self::Authentication("not authenticated, please run 'freetime auth' first".to_string())
    }

    /// True when retrying the same command later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retrieval(err) if err.is_retryable())
    }
}

impl From<ProviderError> for ClientError {
    fn from(err: ProviderError) -> Self {
        match err.code() {
            ProviderErrorCode::AuthenticationFailed => Self::Authentication(format!(
                "{}. Run 'freetime auth' to sign in again",
                err.message()
            )),
            ProviderErrorCode::ConfigurationError => Self::Config(err.message().to_string()),
            _ => Self::Retrieval(err),
        }
    }
}
