//! HTTP client for Exchange Web Services.
//!
//! Every call is a SOAP POST to the single EWS endpoint with HTTP Basic
//! authentication.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use freetime_core::{CalendarEvent, FreeBusyStatus, ResponseStatus};
use reqwest::StatusCode;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{ProviderError, ProviderResult};
use crate::http::{build_client, check_status, read_body, send_error};

use super::config::EwsConfig;
use super::credentials::StoredCredentials;
use super::xml::{self, EwsItem};

/// EWS client bound to one endpoint and one account.
pub struct EwsClient {
    http_client: reqwest::Client,
    endpoint: Url,
    username: String,
    password: String,
}

impl EwsClient {
    /// Creates a client for the configured server.
    pub fn new(config: &EwsConfig, credentials: &StoredCredentials) -> ProviderResult<Self> {
        let endpoint = config.endpoint().map_err(ProviderError::configuration)?;
        if !credentials.is_complete() {
            return Err(ProviderError::authentication(
                "username and password are required for Exchange",
            ));
        }

        Ok(Self {
            http_client: build_client(config.timeout, &config.user_agent)?,
            endpoint,
            username: credentials.username.clone(),
            password: credentials.password.clone(),
        })
    }

    /// Returns the endpoint URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Lists calendar items between two instants, converted to local time.
    pub async fn find_calendar_items(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        max_entries: usize,
    ) -> ProviderResult<Vec<CalendarEvent>> {
        let body = xml::find_item_body(start, end, max_entries)?;
        let response = self.post(body).await?;

        let items = xml::parse_find_item_response(&response)?;
        debug!("FindItem returned {} calendar items", items.len());

        Ok(items
            .into_iter()
            .filter_map(|item| convert_item(item, &Local))
            .collect())
    }

    /// Reads the calendar folder, which fails when the credentials or the
    /// mailbox are wrong.
    pub async fn get_calendar_folder(&self) -> ProviderResult<()> {
        let body = xml::get_folder_body()?;
        let response = self.post(body).await?;
        xml::check_response(&response)
    }

    async fn post(&self, body: String) -> ProviderResult<String> {
        trace!(url = %self.endpoint, "sending SOAP request");

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .basic_auth(&self.username, Some(&self.password))
            .header(reqwest::header::CONTENT_TYPE, "text/xml; charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(send_error)?;

        match response.status() {
            // Faults come back as 500 with a SOAP body.
            StatusCode::INTERNAL_SERVER_ERROR => {
                let body = read_body(response).await?;
                Err(match xml::parse_fault(&body) {
                    Some(fault) => ProviderError::server(format!("SOAP fault: {}", fault)),
                    None => ProviderError::server(format!(
                        "Exchange server error (500): {}",
                        body.trim()
                    )),
                })
            }
            StatusCode::SERVICE_UNAVAILABLE => Err(ProviderError::rate_limited(
                "Exchange server is throttling requests",
            )),
            _ => {
                let response = check_status(response).await?;
                read_body(response).await
            }
        }
    }
}

/// Converts an EWS calendar item to a local-time calendar event.
///
/// Items without a readable start or end are skipped.
fn convert_item<Tz: TimeZone>(item: EwsItem, tz: &Tz) -> Option<CalendarEvent> {
    let start = parse_time(item.start.as_deref()?, tz)?;
    let end = parse_time(item.end.as_deref()?, tz)?;

    let response_status = match item.my_response_type.as_deref() {
        Some("Organizer") => ResponseStatus::Organizer,
        Some("Accept") => ResponseStatus::Accepted,
        Some(_) => ResponseStatus::Other,
        None => ResponseStatus::Unknown,
    };
    let free_busy_status = match item.legacy_free_busy_status.as_deref() {
        Some("Free") => FreeBusyStatus::Free,
        Some(_) => FreeBusyStatus::Busy,
        None => FreeBusyStatus::Unknown,
    };

    Some(
        CalendarEvent::new(item.subject.unwrap_or_default(), start, end)
            .with_response_status(response_status)
            .with_free_busy_status(free_busy_status)
            .with_organizer(item.is_from_me.unwrap_or(false)),
    )
}

fn parse_time<Tz: TimeZone>(value: &str, tz: &Tz) -> Option<NaiveDateTime> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => Some(dt.with_timezone(tz).naive_local()),
        Err(e) => {
            warn!("failed to parse item time {:?}: {}", value, e);
            None
        }
    }
}
