//! Microsoft Graph provider configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the Microsoft Graph provider.
///
/// The application is a public client: no client secret is involved, PKCE
/// protects the authorization code exchange.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Application (client) ID of the Azure app registration.
    pub client_id: String,

    /// Directory (tenant) ID, a verified domain, or `organizations`.
    pub tenant_id: String,

    /// Path of the persisted OAuth tokens.
    pub token_path: PathBuf,

    /// Request timeout.
    pub timeout: Duration,

    /// User agent string for API requests.
    pub user_agent: String,

    /// Port range for the loopback OAuth server.
    ///
    /// Defaults to (8400, 8410). The redirect URI registered in Azure must
    /// be `http://localhost` for any of these ports to be accepted.
    pub loopback_port_range: (u16, u16),

    /// OAuth scopes to request.
    pub scopes: Vec<String>,

    /// Identity platform host.
    pub authority_host: String,

    /// Graph API base URL including the version segment.
    pub api_base: String,
}

impl GraphConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Scopes needed to read the signed-in user's calendar.
    pub const DEFAULT_SCOPES: [&'static str; 3] = [
        "offline_access",
        "https://graph.microsoft.com/Calendars.Read",
        "https://graph.microsoft.com/User.Read",
    ];

    pub const DEFAULT_AUTHORITY_HOST: &'static str = "https://login.microsoftonline.com";
    pub const DEFAULT_API_BASE: &'static str = "https://graph.microsoft.com/v1.0";

    /// Creates a new Graph configuration.
    pub fn new(
        client_id: impl Into<String>,
        tenant_id: impl Into<String>,
        token_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            tenant_id: tenant_id.into(),
            token_path: token_path.into(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("freetime/{}", env!("CARGO_PKG_VERSION")),
            loopback_port_range: (8400, 8410),
            scopes: Self::DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            authority_host: Self::DEFAULT_AUTHORITY_HOST.to_string(),
            api_base: Self::DEFAULT_API_BASE.to_string(),
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

    /// Sets the loopback port range for OAuth.
    pub fn with_loopback_port_range(mut self, start: u16, end: u16) -> Self {
        self.loopback_port_range = (start, end);
        self
    }

    /// Sets the OAuth scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Sets the identity platform host, for national clouds.
    pub fn with_authority_host(mut self, host: impl Into<String>) -> Self {
        self.authority_host = host.into();
        self
    }

    /// Sets the Graph API base URL, for national clouds.
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// The authorization endpoint of the tenant.
    pub fn authorize_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/authorize",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id
        )
    }

    /// The token endpoint of the tenant.
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id
        )
    }

    /// The scopes as a space separated list.
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.client_id.trim().is_empty() {
            return Err("client_id is required".to_string());
        }
        if !is_guid(&self.client_id) {
            return Err("client_id should be a GUID (application ID)".to_string());
        }
        if self.tenant_id.trim().is_empty() {
            return Err("tenant_id is required".to_string());
        }
        if self
            .tenant_id
            .chars()
            .any(|c| c.is_whitespace() || c == '/' || c == '?')
        {
            return Err("tenant_id contains invalid characters".to_string());
        }
        if self.scopes.is_empty() {
            return Err("at least one OAuth scope is required".to_string());
        }
        if self.loopback_port_range.0 > self.loopback_port_range.1 {
            return Err("invalid loopback port range".to_string());
        }
        Ok(())
    }
}

/// Checks the `8-4-4-4-12` hexadecimal layout of a GUID.
fn is_guid(value: &str) -> bool {
    let groups: Vec<&str> = value.split('-').collect();
    let lengths = [8, 4, 4, 4, 12];
    groups.len() == lengths.len()
        && groups
            .iter()
            .zip(lengths)
            .all(|(g, len)| g.len() == len && g.chars().all(|c| c.is_ascii_hexdigit()))
}
