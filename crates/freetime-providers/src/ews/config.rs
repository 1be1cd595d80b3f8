//! Exchange Web Services provider configuration.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

/// Path of the EWS endpoint on an Exchange server.
const EWS_PATH: &str = "/EWS/Exchange.asmx";

/// Configuration for the EWS provider.
#[derive(Debug, Clone)]
pub struct EwsConfig {
    /// Exchange server host name, or the full endpoint URL.
    pub server: String,

    /// Path of the stored username and password.
    pub credentials_path: PathBuf,

    /// Request timeout.
    pub timeout: Duration,

    /// User agent string.
    pub user_agent: String,
}

impl EwsConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Creates a new EWS configuration.
    pub fn new(server: impl Into<String>, credentials_path: impl Into<PathBuf>) -> Self {
        Self {
            server: server.into(),
            credentials_path: credentials_path.into(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("freetime/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Resolves the EWS endpoint.
    ///
    /// A bare host (`mail.example.com`) becomes
    /// `https://mail.example.com/EWS/Exchange.asmx`. A URL with a scheme is
    /// used as is, except that an empty path gets the EWS path appended.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the server is empty or not
    /// a valid host or URL.
    pub fn endpoint(&self) -> Result<Url, String> {
        let server = self.server.trim();
        if server.is_empty() {
            return Err("Exchange server address is not configured".to_string());
        }

        if server.contains("://") {
            let mut url =
                Url::parse(server).map_err(|e| format!("invalid server URL '{}': {}", server, e))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(format!("unsupported URL scheme '{}'", url.scheme()));
            }
            if url.path().is_empty() || url.path() == "/" {
                url.set_path(EWS_PATH);
            }
            return Ok(url);
        }

        let host = server.trim_end_matches('/');
        if host.contains('/') || host.chars().any(char::is_whitespace) {
            return Err(format!("invalid server address '{}'", server));
        }
        Url::parse(&format!("https://{}{}", host, EWS_PATH))
            .map_err(|e| format!("invalid server address '{}': {}", server, e))
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.endpoint().map(|_| ())
    }
}
