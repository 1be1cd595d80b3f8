//! HTTP helpers shared by the providers.

use std::time::Duration;

use reqwest::{Response, StatusCode};

use crate::error::{ProviderError, ProviderResult};

/// Builds the HTTP client used for API calls.
pub(crate) fn build_client(timeout: Duration, user_agent: &str) -> ProviderResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .map_err(|e| {
            ProviderError::internal(format!("failed to create HTTP client: {}", e)).with_source(e)
        })
}

/// Maps a transport failure to a network error.
pub(crate) fn send_error(e: reqwest::Error) -> ProviderError {
    let message = if e.is_timeout() {
        "request timeout".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        format!("request failed: {}", e)
    };
    ProviderError::network(message).with_source(e)
}

/// Turns a non-success status into the matching provider error.
///
/// The body is only read for statuses that are not otherwise classified.
pub(crate) async fn check_status(response: Response) -> ProviderResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok());
            if status == StatusCode::SERVICE_UNAVAILABLE && retry_after.is_none() {
                let body = response.text().await.unwrap_or_default();
                return Err(ProviderError::server(format!(
                    "server unavailable ({}): {}",
                    status,
                    body.trim()
                )));
            }
            Err(rate_limited(retry_after))
        }
        StatusCode::UNAUTHORIZED => Err(ProviderError::authentication(
            "credentials were rejected or have expired",
        )),
        StatusCode::FORBIDDEN => Err(ProviderError::authorization(
            "access denied to the calendar",
        )),
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(ProviderError::server(format!(
                "API error ({}): {}",
                status,
                body.trim()
            )))
        }
    }
}

fn rate_limited(retry_after: Option<u64>) -> ProviderError {
    let err = ProviderError::rate_limited(rate_limit_message(retry_after));
    match retry_after {
        Some(secs) => err.with_retry_after(Duration::from_secs(secs)),
        None => err,
    }
}

fn rate_limit_message(retry_after: Option<u64>) -> String {
    format!(
        "rate limit exceeded{}",
        retry_after
            .map(|s| format!(", retry after {} seconds", s))
            .unwrap_or_default()
    )
}

/// Reads the response body as text.
pub(crate) async fn read_body(response: Response) -> ProviderResult<String> {
    response.text().await.map_err(|e| {
        ProviderError::network(format!("failed to read response: {}", e)).with_source(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_messages() {
        assert_eq!(rate_limit_message(None), "rate limit exceeded");
        assert_eq!(
            rate_limit_message(Some(30)),
            "rate limit exceeded, retry after 30 seconds"
        );
    }

    #[test]
    fn rate_limit_keeps_delay() {
        let err = rate_limited(Some(12));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(12)));
        assert!(rate_limited(None).retry_after().is_none());
    }

    #[test]
    fn client_builds() {
        assert!(build_client(Duration::from_secs(5), "freetime/test").is_ok());
    }
}
