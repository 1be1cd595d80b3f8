//! OAuth 2.0 authorization code flow with PKCE against the Microsoft
//! identity platform.
//!
//! # Flow Overview
//!
//! 1. Generate a code verifier and its SHA-256 challenge
//! 2. Bind a loopback listener on `localhost`
//! 3. Open the browser on the tenant's authorization endpoint
//! 4. The user signs in; the identity platform redirects to the listener
//! 5. Check the state and extract the authorization code
//! 6. Exchange the code (with the verifier) for access and refresh tokens
//!
//! The application is registered as a public client, so no client secret
//! is ever sent.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::http::{build_client, read_body, send_error};

use super::config::GraphConfig;
use super::tokens::TokenInfo;

/// The PKCE code verifier length (in bytes, before base64 encoding).
const CODE_VERIFIER_LENGTH: usize = 32;

/// Timeout for waiting for the OAuth callback.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// OAuth client for the Microsoft identity platform.
#[derive(Debug)]
pub struct OAuthClient {
    client_id: String,
    authorize_url: String,
    token_url: String,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a new OAuth client for the configured tenant.
    pub fn new(config: &GraphConfig) -> ProviderResult<Self> {
        let http_client = build_client(config.timeout, &config.user_agent)?;

        Ok(Self {
            client_id: config.client_id.clone(),
            authorize_url: config.authorize_url(),
            token_url: config.token_url(),
            http_client,
        })
    }

    /// Runs the interactive PKCE flow and returns the obtained tokens.
    ///
    /// # Errors
    ///
    /// Fails if no loopback port is free, the user denies consent, the
    /// callback does not arrive within five minutes, or the token exchange
    /// is rejected.
    pub async fn authorize(
        &self,
        scopes: &[String],
        port_range: (u16, u16),
    ) -> ProviderResult<TokenInfo> {
        let pkce = PkceFlow::new();

        let (listener, port) = bind_loopback_server(port_range)?;
        let redirect_uri = format!("http://localhost:{}/", port);

        let auth_url =
            pkce.build_auth_url(&self.authorize_url, &self.client_id, &redirect_uri, scopes);

        eprintln!("Opening your default web browser for authentication...");
        eprintln!("Please log in with your corporate account and grant the requested permissions.");
        debug!("authorization URL: {}", auth_url);

        if let Err(e) = open::that(&auth_url) {
            warn!("failed to open browser: {}", e);
            eprintln!("\nPlease open this URL in your browser:\n\n{}\n", auth_url);
        }

        let callback = wait_for_callback(listener)?;
        if callback.state != pkce.state {
            return Err(ProviderError::authentication(
                "OAuth state mismatch, the callback did not come from this sign-in",
            ));
        }

        info!("received authorization code, exchanging for tokens");
        let scope = scopes.join(" ");
        let params = [
            ("client_id", self.client_id.as_str()),
            ("code", callback.code.as_str()),
            ("code_verifier", pkce.verifier.as_str()),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri.as_str()),
            ("scope", scope.as_str()),
        ];
        let response = self.token_request(&params, "token exchange").await?;

        info!("obtained OAuth tokens");
        let granted = response.granted_scopes().unwrap_or_else(|| scopes.to_vec());
        Ok(TokenInfo::new(
            response.access_token,
            response.refresh_token,
            response.expires_in,
            granted,
        ))
    }

    /// Redeems a refresh token.
    ///
    /// Returns the new access token, the rotated refresh token if one was
    /// issued, and the lifetime in seconds.
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
        scopes: &[String],
    ) -> ProviderResult<(String, Option<String>, Option<i64>)> {
        let scope = scopes.join(" ");
        let params = [
            ("client_id", self.client_id.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
            ("scope", scope.as_str()),
        ];
        let response = self.token_request(&params, "token refresh").await?;

        info!("refreshed access token");
        Ok((
            response.access_token,
            response.refresh_token,
            response.expires_in,
        ))
    }

    async fn token_request(
        &self,
        params: &[(&str, &str)],
        what: &str,
    ) -> ProviderResult<TokenResponse> {
        let response = self
            .http_client
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .map_err(send_error)?;

        let status = response.status();
        let body = read_body(response).await?;

        if !status.is_success() {
            let detail = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|e| e.describe())
                .unwrap_or(body);
            return Err(ProviderError::authentication(format!(
                "{} failed ({}): {}",
                what, status, detail
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid token response: {}", e))
        })
    }
}

/// Tries to bind a TCP listener on a free port in the given range.
fn bind_loopback_server(port_range: (u16, u16)) -> ProviderResult<(TcpListener, u16)> {
    for port in port_range.0..=port_range.1 {
        if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)) {
            debug!("bound loopback server on port {}", port);
            return Ok((listener, port));
        }
    }
    Err(ProviderError::configuration(format!(
        "no available port in range {}-{}",
        port_range.0, port_range.1
    )))
}

/// Code and state received on the redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Callback {
    code: String,
    state: String,
}

fn wait_for_callback(listener: TcpListener) -> ProviderResult<Callback> {
    let (tx, rx) = mpsc::channel();

    // The accept loop blocks, so it runs on its own thread to allow a timeout.
    thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    if let Some(result) = handle_callback(stream) {
                        let _ = tx.send(result);
                        return;
                    }
                }
                Err(e) => error!("failed to accept connection: {}", e),
            }
        }
    });

    match rx.recv_timeout(CALLBACK_TIMEOUT) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(ProviderError::authentication(
            "timed out waiting for the browser sign-in",
        )),
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(ProviderError::internal("callback channel disconnected"))
        }
    }
}

/// Answers one HTTP request on the loopback listener.
///
/// Returns `None` for requests that are not the redirect (e.g. favicon).
fn handle_callback(mut stream: TcpStream) -> Option<ProviderResult<Callback>> {
    let mut request_line = String::new();
    BufReader::new(&stream).read_line(&mut request_line).ok()?;

    let Some(result) = parse_callback_request(&request_line) else {
        let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n");
        return None;
    };

    let response = if result.is_ok() {
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n\
        <html><body><h1>Authentication Successful</h1>\
        <p>You can close this window and return to the terminal.</p></body></html>"
    } else {
        "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\n\r\n\
        <html><body><h1>Authentication Failed</h1>\
        <p>You can close this window.</p></body></html>"
    };
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();

    Some(result)
}

/// Parses `GET /?code=...&state=... HTTP/1.1`.
fn parse_callback_request(request_line: &str) -> Option<ProviderResult<Callback>> {
    let mut parts = request_line.split_whitespace();
    if parts.next()? != "GET" {
        return None;
    }
    let target = parts.next()?;
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    if path != "/" {
        return None;
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;
    let mut description = None;

    for param in query.split('&') {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let value = decode_query_value(value);
        match key {
            "code" => code = Some(value),
            "state" => state = Some(value),
            "error" => error = Some(value),
            "error_description" => description = Some(value),
            _ => {}
        }
    }

    if let Some(error) = error {
        let message = match description {
            Some(description) => format!("authorization denied: {} ({})", error, description),
            None => format!("authorization denied: {}", error),
        };
        return Some(Err(ProviderError::authentication(message)));
    }

    match code {
        Some(code) => Some(Ok(Callback {
            code,
            state: state.unwrap_or_default(),
        })),
        None => Some(Err(ProviderError::authentication(
            "missing authorization code in callback",
        ))),
    }
}

fn decode_query_value(value: &str) -> String {
    let value = value.replace('+', " ");
    urlencoding::decode(&value)
        .map(|v| v.into_owned())
        .unwrap_or(value)
}

/// PKCE flow state (RFC 7636).
#[derive(Debug)]
pub struct PkceFlow {
    /// The code verifier (high-entropy random string).
    pub verifier: String,
    /// The code challenge (SHA-256 of the verifier, base64url encoded).
    pub challenge: String,
    /// Random state checked on the redirect.
    pub state: String,
}

impl PkceFlow {
    /// Creates a new PKCE flow with random verifier and state.
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_LENGTH);
        let challenge = Self::compute_challenge(&verifier);
        Self {
            verifier,
            challenge,
            state: random_token(16),
        }
    }

    fn compute_challenge(verifier: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
    }

    /// Builds the authorization URL.
    pub fn build_auth_url(
        &self,
        authorize_url: &str,
        client_id: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> String {
        format!(
            "{}?client_id={}&response_type=code&redirect_uri={}&response_mode=query&scope={}&\
            code_challenge={}&code_challenge_method=S256&state={}&prompt=select_account",
            authorize_url,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scopes.join(" ")),
            urlencoding::encode(&self.challenge),
            urlencoding::encode(&self.state),
        )
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

/// Successful token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
}

impl TokenResponse {
    fn granted_scopes(&self) -> Option<Vec<String>> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
    }
}

/// Error body of the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl TokenErrorResponse {
    fn describe(&self) -> String {
        match self.error_description.as_deref() {
            // Descriptions carry trace ids on following lines.
            Some(d) => format!("{}: {}", self.error, d.lines().next().unwrap_or_default()),
            None => self.error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod pkce {
        use super::*;

        #[test]
        fn verifier_length() {
            let flow = PkceFlow::new();
            // 32 bytes base64url without padding
            assert_eq!(flow.verifier.len(), 43);
        }

        #[test]
        fn challenge_matches_rfc_example() {
            // RFC 7636 appendix B
            let challenge =
                PkceFlow::compute_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
            assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
        }

        #[test]
        fn flows_are_random() {
            let flow1 = PkceFlow::new();
            let flow2 = PkceFlow::new();
            assert_ne!(flow1.challenge, flow2.challenge);
            assert_ne!(flow1.state, flow2.state);
        }

        #[test]
        fn auth_url_format() {
            let flow = PkceFlow::new();
            let url = flow.build_auth_url(
                "https://login.microsoftonline.com/contoso/oauth2/v2.0/authorize",
                "client-id",
                "http://localhost:8400/",
                &["offline_access".to_string(), "User.Read".to_string()],
            );

            assert!(url.starts_with(
                "https://login.microsoftonline.com/contoso/oauth2/v2.0/authorize?client_id=client-id&"
            ));
            assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8400%2F"));
            assert!(url.contains("scope=offline_access%20User.Read"));
            assert!(url.contains("code_challenge_method=S256"));
            assert!(url.contains(&format!("state={}", flow.state)));
            assert!(!url.contains("client_secret"));
        }
    }

    mod callback {
        use super::*;

        #[test]
        fn code_and_state() {
            let result = parse_callback_request("GET /?code=abc%2F123&state=xyz HTTP/1.1\r\n")
                .unwrap()
                .unwrap();
            assert_eq!(
                result,
                Callback {
                    code: "abc/123".to_string(),
                    state: "xyz".to_string()
                }
            );
        }

        #[test]
        fn error_with_description() {
            let err = parse_callback_request(
                "GET /?error=access_denied&error_description=The+user+cancelled HTTP/1.1",
            )
            .unwrap()
            .unwrap_err();
            assert!(err.is_authentication());
            assert_eq!(
                err.message(),
                "authorization denied: access_denied (The user cancelled)"
            );
        }

        #[test]
        fn missing_code() {
            let err = parse_callback_request("GET /?state=xyz HTTP/1.1")
                .unwrap()
                .unwrap_err();
            assert!(err.message().contains("missing authorization code"));
        }

        #[test]
        fn unrelated_requests_are_ignored() {
            assert!(parse_callback_request("GET /favicon.ico HTTP/1.1").is_none());
            assert!(parse_callback_request("POST /?code=a HTTP/1.1").is_none());
            assert!(parse_callback_request("").is_none());
        }
    }

    mod responses {
        use super::*;

        #[test]
        fn token_response_scopes() {
            let response: TokenResponse = serde_json::from_str(
                r#"{"token_type":"Bearer","scope":"Calendars.Read User.Read","expires_in":3599,"access_token":"at","refresh_token":"rt"}"#,
            )
            .unwrap();
            assert_eq!(
                response.granted_scopes().unwrap(),
                vec!["Calendars.Read".to_string(), "User.Read".to_string()]
            );
            assert_eq!(response.expires_in, Some(3599));
        }

        #[test]
        fn error_description_first_line() {
            let response: TokenErrorResponse = serde_json::from_str(
                r#"{"error":"invalid_grant","error_description":"AADSTS70008: The refresh token has expired.\r\nTrace ID: 1"}"#,
            )
            .unwrap();
            assert_eq!(
                response.describe(),
                "invalid_grant: AADSTS70008: The refresh token has expired."
            );
        }

        #[test]
        fn bind_fails_on_empty_range() {
            let err = bind_loopback_server((10, 9)).unwrap_err();
            assert_eq!(
                err.code(),
                crate::error::ProviderErrorCode::ConfigurationError
            );
        }
    }
}
