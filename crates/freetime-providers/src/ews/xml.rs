//! SOAP messages for Exchange Web Services.
//!
//! This module builds the `FindItem` and `GetFolder` requests and parses
//! their responses. Element names are matched on their local part, so the
//! namespace prefixes chosen by the server do not matter.

use std::io::Cursor;

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::{ProviderError, ProviderResult};

/// SOAP envelope namespace.
pub const SOAP_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
/// EWS types namespace.
pub const TYPES_NS: &str = "http://schemas.microsoft.com/exchange/services/2006/types";
/// EWS messages namespace.
pub const MESSAGES_NS: &str = "http://schemas.microsoft.com/exchange/services/2006/messages";

/// Oldest schema version that has every requested property.
const SERVER_VERSION: &str = "Exchange2010_SP2";

/// Calendar item properties requested from `FindItem`.
const ITEM_FIELDS: [&str; 6] = [
    "item:Subject",
    "calendar:Start",
    "calendar:End",
    "calendar:MyResponseType",
    "calendar:LegacyFreeBusyStatus",
    "item:IsFromMe",
];

type XmlWriter = Writer<Cursor<Vec<u8>>>;

/// A calendar item as returned by `FindItem`, fields left as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EwsItem {
    pub subject: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub my_response_type: Option<String>,
    pub legacy_free_busy_status: Option<String>,
    pub is_from_me: Option<bool>,
}

/// Builds a `FindItem` request listing the calendar between two instants.
///
/// `CalendarView` makes the server expand recurring series.
pub fn find_item_body(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    max_entries: usize,
) -> ProviderResult<String> {
    envelope(|w| {
        let mut find = BytesStart::new("m:FindItem");
        find.push_attribute(("Traversal", "Shallow"));
        w.write_event(Event::Start(find))?;

        w.write_event(Event::Start(BytesStart::new("m:ItemShape")))?;
        write_text_element(w, "t:BaseShape", "IdOnly")?;
        w.write_event(Event::Start(BytesStart::new("t:AdditionalProperties")))?;
        for field in ITEM_FIELDS {
            let mut uri = BytesStart::new("t:FieldURI");
            uri.push_attribute(("FieldURI", field));
            w.write_event(Event::Empty(uri))?;
        }
        w.write_event(Event::End(BytesEnd::new("t:AdditionalProperties")))?;
        w.write_event(Event::End(BytesEnd::new("m:ItemShape")))?;

        let mut view = BytesStart::new("m:CalendarView");
        view.push_attribute(("MaxEntriesReturned", max_entries.to_string().as_str()));
        view.push_attribute(("StartDate", format_ews_datetime(start).as_str()));
        view.push_attribute(("EndDate", format_ews_datetime(end).as_str()));
        w.write_event(Event::Empty(view))?;

        write_calendar_folder_ids(w)?;
        w.write_event(Event::End(BytesEnd::new("m:FindItem")))?;
        Ok(())
    })
}

/// Builds a `GetFolder` request for the calendar folder.
///
/// Used to check credentials without listing any item.
pub fn get_folder_body() -> ProviderResult<String> {
    envelope(|w| {
        w.write_event(Event::Start(BytesStart::new("m:GetFolder")))?;
        w.write_event(Event::Start(BytesStart::new("m:FolderShape")))?;
        write_text_element(w, "t:BaseShape", "IdOnly")?;
        w.write_event(Event::End(BytesEnd::new("m:FolderShape")))?;
        write_calendar_folder_ids(w)?;
        w.write_event(Event::End(BytesEnd::new("m:GetFolder")))?;
        Ok(())
    })
}

/// Wraps the body written by `body` in a SOAP envelope.
fn envelope(body: impl FnOnce(&mut XmlWriter) -> std::io::Result<()>) -> ProviderResult<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    let write = |w: &mut XmlWriter| -> std::io::Result<()> {
        w.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

        let mut env = BytesStart::new("soap:Envelope");
        env.push_attribute(("xmlns:soap", SOAP_NS));
        env.push_attribute(("xmlns:t", TYPES_NS));
        env.push_attribute(("xmlns:m", MESSAGES_NS));
        w.write_event(Event::Start(env))?;

        w.write_event(Event::Start(BytesStart::new("soap:Header")))?;
        let mut version = BytesStart::new("t:RequestServerVersion");
        version.push_attribute(("Version", SERVER_VERSION));
        w.write_event(Event::Empty(version))?;
        w.write_event(Event::End(BytesEnd::new("soap:Header")))?;

        w.write_event(Event::Start(BytesStart::new("soap:Body")))?;
        body(w)?;
        w.write_event(Event::End(BytesEnd::new("soap:Body")))?;
        w.write_event(Event::End(BytesEnd::new("soap:Envelope")))
    };

    write(&mut writer)
        .map_err(|e| ProviderError::internal(format!("failed to build SOAP request: {}", e)))?;

    String::from_utf8(writer.into_inner().into_inner())
        .map_err(|e| ProviderError::internal(format!("SOAP request is not UTF-8: {}", e)))
}

fn write_calendar_folder_ids(w: &mut XmlWriter) -> std::io::Result<()> {
    w.write_event(Event::Start(BytesStart::new("m:ParentFolderIds")))?;
    let mut folder = BytesStart::new("t:DistinguishedFolderId");
    folder.push_attribute(("Id", "calendar"));
    w.write_event(Event::Empty(folder))?;
    w.write_event(Event::End(BytesEnd::new("m:ParentFolderIds")))
}

fn write_text_element(w: &mut XmlWriter, name: &str, text: &str) -> std::io::Result<()> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    w.write_event(Event::End(BytesEnd::new(name)))
}

/// Parses a `FindItem` response into its calendar items.
///
/// # Errors
///
/// Returns an error when a response message has `ResponseClass="Error"`,
/// when the body is a SOAP fault, or when the XML is malformed.
pub fn parse_find_item_response(xml: &str) -> ProviderResult<Vec<EwsItem>> {
    let mut items = Vec::new();
    let mut current: Option<EwsItem> = None;

    parse_response(xml, |node| match node {
        Node::Open("CalendarItem") => current = Some(EwsItem::default()),
        Node::Close("CalendarItem") => items.extend(current.take()),
        Node::Text(element, text) => {
            let Some(item) = current.as_mut() else {
                return;
            };
            match element {
                "Subject" => item.subject = Some(text.to_string()),
                "Start" => item.start = Some(text.to_string()),
                "End" => item.end = Some(text.to_string()),
                "MyResponseType" => item.my_response_type = Some(text.to_string()),
                "LegacyFreeBusyStatus" => item.legacy_free_busy_status = Some(text.to_string()),
                "IsFromMe" => item.is_from_me = Some(text.eq_ignore_ascii_case("true")),
                _ => {}
            }
        }
        _ => {}
    })?;

    Ok(items)
}

/// Checks a response that carries no data, such as `GetFolder`.
pub fn check_response(xml: &str) -> ProviderResult<()> {
    parse_response(xml, |_| {})
}

/// Returns the `faultstring` of a SOAP fault, if the body is one.
pub fn parse_fault(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut in_fault_string = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => in_fault_string = local_name(e.name().as_ref()) == "faultstring",
            Ok(Event::Text(e)) if in_fault_string => {
                return e.unescape().ok().map(|t| t.into_owned());
            }
            Ok(Event::End(_)) => in_fault_string = false,
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// Error details of the first failed response message.
#[derive(Debug, Default)]
struct ResponseError {
    code: Option<String>,
    message: Option<String>,
}

/// What [`parse_response`] reports while walking a document.
///
/// Names are local names. Empty elements open and close immediately.
#[derive(Debug)]
enum Node<'a> {
    Open(&'a str),
    Close(&'a str),
    Text(&'a str, &'a str),
}

/// Walks a SOAP response and fails on faults and error response messages.
fn parse_response(xml: &str, mut on_node: impl FnMut(Node<'_>)) -> ProviderResult<()> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut current_element: Option<String> = None;
    let mut error: Option<ResponseError> = None;
    let mut in_error_message = false;
    let mut fault: Option<String> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            ProviderError::invalid_response(format!(
                "malformed XML at position {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(e) => {
                let name = local_name(e.name().as_ref()).to_string();
                if name.ends_with("ResponseMessage") {
                    let class = e
                        .try_get_attribute("ResponseClass")
                        .ok()
                        .flatten()
                        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()));
                    in_error_message = class.as_deref() == Some("Error");
                    if in_error_message && error.is_none() {
                        error = Some(ResponseError::default());
                    }
                }
                on_node(Node::Open(&name));
                current_element = Some(name);
            }
            Event::Empty(e) => {
                let name = local_name(e.name().as_ref()).to_string();
                on_node(Node::Open(&name));
                on_node(Node::Close(&name));
            }
            Event::End(e) => {
                let name = local_name(e.name().as_ref()).to_string();
                if name.ends_with("ResponseMessage") {
                    in_error_message = false;
                }
                on_node(Node::Close(&name));
                current_element = None;
            }
            Event::Text(e) => {
                let Some(element) = current_element.as_deref() else {
                    continue;
                };
                let text = e.unescape().map_err(|e| {
                    ProviderError::invalid_response(format!("invalid XML text: {}", e))
                })?;

                match element {
                    "faultstring" => fault = Some(text.to_string()),
                    "ResponseCode" | "MessageText" if in_error_message => {
                        if let Some(err) = error.as_mut() {
                            if element == "ResponseCode" {
                                err.code.get_or_insert_with(|| text.to_string());
                            } else {
                                err.message.get_or_insert_with(|| text.to_string());
                            }
                        }
                    }
                    _ => on_node(Node::Text(element, &text)),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(fault) = fault {
        return Err(ProviderError::server(format!("SOAP fault: {}", fault)));
    }
    match error {
        Some(err) => Err(response_error(err)),
        None => Ok(()),
    }
}

/// Maps an EWS response code to a provider error.
fn response_error(err: ResponseError) -> ProviderError {
    let code = err.code.unwrap_or_else(|| "UnknownError".to_string());
    let message = match err.message {
        Some(text) => format!("{}: {}", code, text),
        None => code.clone(),
    };

    match code.as_str() {
        "ErrorServerBusy" => ProviderError::rate_limited(message),
        "ErrorAccessDenied" | "ErrorFolderNotFound" | "ErrorNonExistentMailbox" => {
            ProviderError::authorization(message)
        }
        "ErrorInvalidCredentials" | "ErrorNoCredentials" => ProviderError::authentication(message),
        _ => ProviderError::server(message),
    }
}

/// Extracts the local name from a potentially prefixed element name.
fn local_name(name: &[u8]) -> &str {
    let name = std::str::from_utf8(name).unwrap_or_default();
    name.rsplit(':').next().unwrap_or(name)
}

/// Formats an instant as EWS expects it (`xs:dateTime` in UTC).
fn format_ews_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}
