//! Error types for calendar provider operations.
//!
//! Every error carries a [`ProviderErrorCode`]. The client uses it to decide
//! whether the user has to sign in again (authentication), fix a setting
//! (configuration) or simply retry later (throttling, outages).

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// What went wrong, independent of the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// No credentials, or the server rejected them.
    AuthenticationFailed,
    /// Signed in, but the mailbox or calendar is off limits.
    AuthorizationFailed,
    /// The server could not be reached.
    NetworkError,
    /// Throttled: HTTP 429, a 503 with `Retry-After`, or `ErrorServerBusy`.
    RateLimited,
    /// Any other failure reported by the server.
    ServerError,
    /// A reply that could not be understood.
    InvalidResponse,
    /// Provider settings that cannot work, such as a malformed server URL.
    ConfigurationError,
    /// A local failure, such as writing the token file.
    InternalError,
}

impl ProviderErrorCode {
    /// Transient failures: retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::RateLimited | Self::ServerError
        )
    }

    /// The snake_case name used in messages and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::ConfigurationError => "configuration_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed provider operation.
///
/// Displayed as `[provider] code: message`, the provider part only when
/// known.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    provider: Option<&'static str>,
    retry_after: Option<Duration>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            retry_after: None,
            source: None,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthorizationFailed, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::RateLimited, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ServerError, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InternalError, message)
    }

    /// Tags the error with the backend that raised it ("graph", "ews").
    ///
    /// An existing tag is kept, so wrapping layers can tag unconditionally.
    pub fn with_provider(mut self, provider: &'static str) -> Self {
        self.provider.get_or_insert(provider);
        self
    }

    /// Records how long the server asked us to wait.
    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }

    /// Attaches the underlying error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider
    }

    /// The server's `Retry-After` hint, if it sent one.
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    pub fn is_authentication(&self) -> bool {
        self.code == ProviderErrorCode::AuthenticationFailed
    }

    /// True for both rejected credentials and denied access.
    pub fn is_credential_problem(&self) -> bool {
        matches!(
            self.code,
            ProviderErrorCode::AuthenticationFailed | ProviderErrorCode::AuthorizationFailed
        )
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.provider {
            Some(provider) => write!(f, "[{}] {}: {}", provider, self.code, self.message),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

/// Result of a provider operation.
pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    mod codes {
        use super::*;

        #[test]
        fn transient_failures_are_retryable() {
            for code in [
                ProviderErrorCode::NetworkError,
                ProviderErrorCode::RateLimited,
                ProviderErrorCode::ServerError,
            ] {
                assert!(code.is_retryable(), "{code} should be retryable");
            }
            for code in [
                ProviderErrorCode::AuthenticationFailed,
                ProviderErrorCode::AuthorizationFailed,
                ProviderErrorCode::InvalidResponse,
                ProviderErrorCode::ConfigurationError,
            ] {
                assert!(!code.is_retryable(), "{code} should not be retryable");
            }
        }

        #[test]
        fn snake_case_names() {
            assert_eq!(ProviderErrorCode::NetworkError.to_string(), "network_error");
            assert_eq!(
                ProviderErrorCode::ConfigurationError.as_str(),
                "configuration_error"
            );
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn display_with_and_without_provider() {
            let err = ProviderError::server("ErrorItemNotFound");
            assert_eq!(err.to_string(), "server_error: ErrorItemNotFound");

            let err = err.with_provider("ews");
            assert_eq!(err.to_string(), "[ews] server_error: ErrorItemNotFound");
        }

        #[test]
        fn first_provider_tag_wins() {
            let err = ProviderError::network("timeout")
                .with_provider("graph")
                .with_provider("ews");
            assert_eq!(err.provider(), Some("graph"));
        }

        #[test]
        fn credential_problems() {
            let err = ProviderError::authentication("token expired");
            assert!(err.is_authentication());
            assert!(err.is_credential_problem());
            assert!(!err.is_retryable());

            let err = ProviderError::authorization("ErrorAccessDenied");
            assert!(!err.is_authentication());
            assert!(err.is_credential_problem());
        }

        #[test]
        fn retry_hint() {
            let err = ProviderError::rate_limited("throttled")
                .with_retry_after(Duration::from_secs(30));
            assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
            assert!(err.is_retryable());
            assert_eq!(ProviderError::server("boom").retry_after(), None);
        }

        #[test]
        fn keeps_source() {
            use std::error::Error;
            let err = ProviderError::internal("failed to save token")
                .with_source(std::io::Error::other("disk full"));
            assert_eq!(err.source().map(|s| s.to_string()), Some("disk full".to_string()));
        }
    }
}
