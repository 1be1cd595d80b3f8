//! Microsoft Graph calendar API client.
//!
//! Events are requested through `/me/calendarView`, which expands recurring
//! series server-side. Times come back in UTC (`Prefer: outlook.timezone`)
//! and are converted to local time here.

use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use freetime_core::{CalendarEvent, FreeBusyStatus, ResponseStatus};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::http::{build_client, check_status, read_body, send_error};

/// Largest page requested from calendarView.
const PAGE_SIZE: usize = 100;

/// Fields requested for each event.
const EVENT_FIELDS: &str = "subject,start,end,isAllDay,isCancelled,isOrganizer,responseStatus,showAs";

/// Microsoft Graph API client bound to one access token.
#[derive(Debug)]
pub struct GraphClient {
    http_client: reqwest::Client,
    api_base: String,
    access_token: String,
}

impl GraphClient {
    /// Creates a new client with the given access token.
    pub fn new(
        api_base: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> ProviderResult<Self> {
        Ok(Self {
            http_client: build_client(timeout, user_agent)?,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    /// Lists the signed-in user's events between two instants.
    ///
    /// Follows `@odata.nextLink` until `max_results` events are collected.
    pub async fn calendar_view(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        max_results: usize,
    ) -> ProviderResult<Vec<CalendarEvent>> {
        let mut events = Vec::new();
        let mut request = self
            .http_client
            .get(format!("{}/me/calendarView", self.api_base))
            .query(&[
                ("startDateTime", start.to_rfc3339()),
                ("endDateTime", end.to_rfc3339()),
                ("$select", EVENT_FIELDS.to_string()),
                ("$orderby", "start/dateTime".to_string()),
                ("$top", PAGE_SIZE.min(max_results.max(1)).to_string()),
            ]);

        loop {
            let page: CalendarViewResponse = self.get_json(request).await?;
            debug!("calendarView page with {} events", page.value.len());

            events.extend(
                page.value
                    .into_iter()
                    .filter_map(|event| convert_event(event, &Local)),
            );

            if events.len() >= max_results {
                events.truncate(max_results);
                break;
            }
            match page.next_link {
                Some(link) => request = self.http_client.get(link),
                None => break,
            }
        }

        debug!("fetched {} events from Microsoft Graph", events.len());
        Ok(events)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> ProviderResult<T> {
        let response = request
            .bearer_auth(&self.access_token)
            .header("Prefer", "outlook.timezone=\"UTC\"")
            .send()
            .await
            .map_err(send_error)?;
        let response = check_status(response).await?;
        let body = read_body(response).await?;

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse response: {}", e))
        })
    }
}

/// Converts a Graph event into a local-time calendar event.
///
/// Cancelled events and events with unreadable times are skipped. All-day
/// events are floating: their midnight bounds are taken as local time.
fn convert_event<Tz: TimeZone>(event: ApiEvent, tz: &Tz) -> Option<CalendarEvent> {
    if event.is_cancelled.unwrap_or(false) {
        return None;
    }

    let is_all_day = event.is_all_day.unwrap_or(false);
    let start = parse_time(&event.start, is_all_day, tz)?;
    let end = parse_time(&event.end, is_all_day, tz)?;

    let response_status = match event.response_status.and_then(|r| r.response) {
        Some(r) if r.eq_ignore_ascii_case("organizer") => ResponseStatus::Organizer,
        Some(r) if r.eq_ignore_ascii_case("accepted") => ResponseStatus::Accepted,
        // Graph's way of saying there is no response information.
        Some(r) if r.eq_ignore_ascii_case("none") => ResponseStatus::Unknown,
        Some(_) => ResponseStatus::Other,
        None => ResponseStatus::Unknown,
    };
    let free_busy_status = match event.show_as.as_deref() {
        Some(s) if s.eq_ignore_ascii_case("free") => FreeBusyStatus::Free,
        Some(s) if s.eq_ignore_ascii_case("unknown") => FreeBusyStatus::Unknown,
        Some(_) => FreeBusyStatus::Busy,
        None => FreeBusyStatus::Unknown,
    };

    Some(
        CalendarEvent::new(event.subject.unwrap_or_default(), start, end)
            .with_response_status(response_status)
            .with_free_busy_status(free_busy_status)
            .with_organizer(event.is_organizer.unwrap_or(false)),
    )
}

fn parse_time<Tz: TimeZone>(time: &ApiDateTime, is_all_day: bool, tz: &Tz) -> Option<NaiveDateTime> {
    let naive = NaiveDateTime::parse_from_str(&time.date_time, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| warn!("failed to parse event time {:?}: {}", time.date_time, e))
        .ok()?;

    if is_all_day {
        return Some(naive);
    }
    if let Some(zone) = time.time_zone.as_deref()
        && !zone.eq_ignore_ascii_case("UTC")
    {
        warn!("unexpected event time zone {}, assuming UTC", zone);
    }
    Some(naive.and_utc().with_timezone(tz).naive_local())
}

/// Response from the calendarView endpoint.
#[derive(Debug, Deserialize)]
struct CalendarViewResponse {
    #[serde(default)]
    value: Vec<ApiEvent>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

/// A single event from the Graph API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    subject: Option<String>,
    start: ApiDateTime,
    end: ApiDateTime,
    is_all_day: Option<bool>,
    is_cancelled: Option<bool>,
    is_organizer: Option<bool>,
    response_status: Option<ApiResponseStatus>,
    show_as: Option<String>,
}

/// `dateTimeTimeZone` resource.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiDateTime {
    date_time: String,
    time_zone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponseStatus {
    response: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate};

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn parse_event(json: &str) -> ApiEvent {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn parse_calendar_view_page() {
        let json = r#"{
            "@odata.context": "https://graph.microsoft.com/v1.0/$metadata#users('me')/calendarView",
            "@odata.nextLink": "https://graph.microsoft.com/v1.0/me/calendarView?$skip=100",
            "value": [
                {
                    "@odata.etag": "W/\"abc\"",
                    "id": "AAMk1",
                    "subject": "Standup",
                    "isAllDay": false,
                    "isCancelled": false,
                    "isOrganizer": false,
                    "showAs": "busy",
                    "responseStatus": { "response": "accepted", "time": "2025-03-01T10:00:00Z" },
                    "start": { "dateTime": "2025-03-10T09:00:00.0000000", "timeZone": "UTC" },
                    "end": { "dateTime": "2025-03-10T09:30:00.0000000", "timeZone": "UTC" }
                }
            ]
        }"#;

        let page: CalendarViewResponse = serde_json::from_str(json).unwrap();
        assert_eq!(page.value.len(), 1);
        assert!(page.next_link.unwrap().ends_with("$skip=100"));
    }

    #[test]
    fn convert_accepted_event() {
        let event = parse_event(
            r#"{
                "subject": "Standup",
                "isOrganizer": false,
                "showAs": "busy",
                "responseStatus": { "response": "accepted" },
                "start": { "dateTime": "2025-03-10T09:00:00.0000000", "timeZone": "UTC" },
                "end": { "dateTime": "2025-03-10T09:30:00.0000000", "timeZone": "UTC" }
            }"#,
        );

        let converted = convert_event(event, &Utc).unwrap();
        assert_eq!(converted.subject, "Standup");
        assert_eq!(converted.start, at(10, 9, 0));
        assert_eq!(converted.end, at(10, 9, 30));
        assert_eq!(converted.response_status, ResponseStatus::Accepted);
        assert_eq!(converted.free_busy_status, FreeBusyStatus::Busy);
        assert!(!converted.is_organizer);
        assert!(converted.should_block_time());
    }

    #[test]
    fn times_are_converted_to_local() {
        let event = parse_event(
            r#"{
                "subject": "Sync",
                "start": { "dateTime": "2025-03-10T08:00:00.0000000", "timeZone": "UTC" },
                "end": { "dateTime": "2025-03-10T09:00:00.0000000", "timeZone": "UTC" }
            }"#,
        );

        let tz = FixedOffset::east_opt(3600).unwrap();
        let converted = convert_event(event, &tz).unwrap();
        assert_eq!(converted.start, at(10, 9, 0));
        assert_eq!(converted.end, at(10, 10, 0));
    }

    #[test]
    fn all_day_events_stay_floating() {
        let event = parse_event(
            r#"{
                "subject": "Conference",
                "isAllDay": true,
                "start": { "dateTime": "2025-03-10T00:00:00.0000000", "timeZone": "UTC" },
                "end": { "dateTime": "2025-03-11T00:00:00.0000000", "timeZone": "UTC" }
            }"#,
        );

        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let converted = convert_event(event, &tz).unwrap();
        assert_eq!(converted.start, at(10, 0, 0));
        assert_eq!(converted.end, at(11, 0, 0));
    }

    #[test]
    fn response_and_show_as_mapping() {
        let cases = [
            (r#""responseStatus": { "response": "organizer" },"#, ResponseStatus::Organizer),
            (r#""responseStatus": { "response": "accepted" },"#, ResponseStatus::Accepted),
            (r#""responseStatus": { "response": "declined" },"#, ResponseStatus::Other),
            (r#""responseStatus": { "response": "tentativelyAccepted" },"#, ResponseStatus::Other),
            (r#""responseStatus": { "response": "none" },"#, ResponseStatus::Unknown),
            (r#""responseStatus": { "response": "notResponded" },"#, ResponseStatus::Other),
            (r#""responseStatus": {},"#, ResponseStatus::Unknown),
            ("", ResponseStatus::Unknown),
        ];

        for (fragment, expected) in cases {
            let json = format!(
                r#"{{ {fragment} "showAs": "free",
                    "start": {{ "dateTime": "2025-03-10T09:00:00" }},
                    "end": {{ "dateTime": "2025-03-10T10:00:00" }} }}"#
            );
            let converted = convert_event(parse_event(&json), &Utc).unwrap();
            assert_eq!(converted.response_status, expected, "{fragment}");
            assert_eq!(converted.free_busy_status, FreeBusyStatus::Free);
        }
    }

    #[test]
    fn no_response_information_blocks_time() {
        let event = parse_event(
            r#"{
                "subject": "Imported meeting",
                "showAs": "busy",
                "responseStatus": { "response": "none", "time": "0001-01-01T00:00:00Z" },
                "start": { "dateTime": "2025-03-10T14:00:00.0000000" },
                "end": { "dateTime": "2025-03-10T15:00:00.0000000" }
            }"#,
        );
        let converted = convert_event(event, &Utc).unwrap();
        assert_eq!(converted.response_status, ResponseStatus::Unknown);
        assert!(converted.should_block_time());
    }

    #[test]
    fn show_as_values() {
        for (show_as, expected) in [
            ("busy", FreeBusyStatus::Busy),
            ("tentative", FreeBusyStatus::Busy),
            ("oof", FreeBusyStatus::Busy),
            ("workingElsewhere", FreeBusyStatus::Busy),
            ("unknown", FreeBusyStatus::Unknown),
        ] {
            let json = format!(
                r#"{{ "showAs": "{show_as}",
                    "start": {{ "dateTime": "2025-03-10T09:00:00" }},
                    "end": {{ "dateTime": "2025-03-10T10:00:00" }} }}"#
            );
            let converted = convert_event(parse_event(&json), &Utc).unwrap();
            assert_eq!(converted.free_busy_status, expected, "{show_as}");
        }
    }

    #[test]
    fn missing_subject_and_organizer_flag() {
        let event = parse_event(
            r#"{
                "isOrganizer": true,
                "start": { "dateTime": "2025-03-10T09:00:00" },
                "end": { "dateTime": "2025-03-10T10:00:00" }
            }"#,
        );
        let converted = convert_event(event, &Utc).unwrap();
        assert_eq!(converted.subject, freetime_core::PLACEHOLDER_SUBJECT);
        assert!(converted.is_organizer);
    }

    #[test]
    fn cancelled_and_malformed_events_are_skipped() {
        let cancelled = parse_event(
            r#"{
                "isCancelled": true,
                "start": { "dateTime": "2025-03-10T09:00:00" },
                "end": { "dateTime": "2025-03-10T10:00:00" }
            }"#,
        );
        assert!(convert_event(cancelled, &Utc).is_none());

        let malformed = parse_event(
            r#"{
                "start": { "dateTime": "yesterday" },
                "end": { "dateTime": "2025-03-10T10:00:00" }
            }"#,
        );
        assert!(convert_event(malformed, &Utc).is_none());
    }

    #[test]
    fn client_trims_api_base() {
        let client = GraphClient::new(
            "https://graph.microsoft.com/v1.0/",
            "token",
            Duration::from_secs(5),
            "freetime/test",
        )
        .unwrap();
        assert_eq!(client.api_base, "https://graph.microsoft.com/v1.0");
    }
}
