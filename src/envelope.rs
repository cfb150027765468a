//! Envelope decoding: SNS record → SES notification → MIME email.
//!
//! The inbound event looks like:
//!
//! ```json
//! {"Records": [{"Sns": {"Message": "<SES notification JSON string>"}}]}
//! ```
//!
//! and the SES notification carries `mail.source` and the raw MIME `content`.

use std::path::Path;

use anyhow::Context;
use mail_parser::{MessageParser, PartType};
use serde_json::Value;

use crate::error::EnvelopeError;

/// One step in a nested JSON lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSegment<'a> {
    /// Object member.
    Key(&'a str),
    /// Array element.
    Index(usize),
}

impl<'a> From<&'a str> for PathSegment<'a> {
    fn from(key: &'a str) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathSegment<'_> {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// Walk `path` through `value`.
///
/// Returns `None` as soon as a segment cannot be resolved, including when an
/// intermediate value is a scalar or the wrong container kind.
pub fn deep_get<'v>(value: &'v Value, path: &[PathSegment<'_>]) -> Option<&'v Value> {
    path.iter().try_fold(value, |current, segment| match segment {
        PathSegment::Key(key) => current.as_object()?.get(*key),
        PathSegment::Index(index) => current.as_array()?.get(*index),
    })
}

/// A received email, reduced to the fields the relay cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    /// Envelope sender (`mail.source`).
    pub sender: String,
    /// Subject header, empty if absent.
    pub subject: String,
    /// Plain-text body, trimmed.
    pub body: String,
}

const SNS_MESSAGE_PATH: [PathSegment<'static>; 4] = [
    PathSegment::Key("Records"),
    PathSegment::Index(0),
    PathSegment::Key("Sns"),
    PathSegment::Key("Message"),
];

const SOURCE_PATH: [PathSegment<'static>; 2] =
    [PathSegment::Key("mail"), PathSegment::Key("source")];

const CONTENT_PATH: [PathSegment<'static>; 1] = [PathSegment::Key("content")];

/// Decode an inbound event into an [`Email`].
pub fn decode_event(event: &Value) -> Result<Email, EnvelopeError> {
    let sns_message = deep_get(event, &SNS_MESSAGE_PATH)
        .and_then(Value::as_str)
        .ok_or(EnvelopeError::MissingSnsMessage)?;

    let notification: Value = serde_json::from_str(sns_message)?;

    let sender = deep_get(&notification, &SOURCE_PATH)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or(EnvelopeError::MissingNotificationField("mail.source"))?;

    let content = deep_get(&notification, &CONTENT_PATH)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or(EnvelopeError::MissingNotificationField("content"))?;

    let (subject, body) = parse_mime(content)?;

    Ok(Email {
        sender: sender.to_string(),
        subject,
        body,
    })
}

/// Parse raw MIME text into `(subject, trimmed plain body)`.
///
/// Line endings in the body are normalised to `\n`. A message with no
/// `text/plain` part is rejected rather than converted from HTML.
pub fn parse_mime(raw: &str) -> Result<(String, String), EnvelopeError> {
    let parsed = MessageParser::default()
        .parse(raw.as_bytes())
        .ok_or(EnvelopeError::UnparseableMime)?;

    let subject = parsed.subject().unwrap_or_default().to_string();

    // An HTML-only message lists its HTML part as the first text body.
    let body = match parsed.text_part(0).map(|part| &part.body) {
        Some(PartType::Text(text)) => text.replace("\r\n", "\n").trim().to_string(),
        _ => return Err(EnvelopeError::MissingPlainBody),
    };

    Ok((subject, body))
}

/// Read an event from a local JSON fixture file.
pub async fn load_event_file(path: &Path) -> anyhow::Result<Value> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading event file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing event file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::PathSegment::{Index, Key};
    use super::*;

    fn ses_event(source: &str, content: &str) -> Value {
        let notification = json!({
            "mail": { "source": source },
            "content": content,
        });
        json!({
            "Records": [{ "Sns": { "Message": notification.to_string() } }]
        })
    }

    const RAW_EMAIL: &str = "From: Transit Alerts <alerts@transit.org>\r\n\
        To: relay@example.com\r\n\
        Subject: Reminder: Line 1 delays\r\n\
        Content-Type: text/plain; charset=utf-8\r\n\
        \r\n\
        \r\n  Line 1 trains are delayed.\r\nSee something suspicious? Call us.\r\n\r\n";

    // ── deep_get ────────────────────────────────────────────────────

    #[test]
    fn deep_get_mixes_keys_and_indices() {
        let v = json!({"a": [{"b": 1}, {"b": 2}]});
        let path = [Key("a"), Index(1), Key("b")];
        assert_eq!(deep_get(&v, &path), Some(&json!(2)));
    }

    #[test]
    fn deep_get_missing_key_is_none() {
        let v = json!({"a": {}});
        assert_eq!(deep_get(&v, &[Key("a"), Key("b")]), None);
    }

    #[test]
    fn deep_get_index_out_of_range_is_none() {
        let v = json!({"a": []});
        assert_eq!(deep_get(&v, &[Key("a"), Index(0)]), None);
    }

    #[test]
    fn deep_get_through_scalar_is_none() {
        let v = json!({"a": "text"});
        assert_eq!(deep_get(&v, &[Key("a"), Key("b")]), None);
        assert_eq!(deep_get(&v, &[Key("a"), Index(0)]), None);
    }

    #[test]
    fn deep_get_index_on_object_is_none() {
        let v = json!({"0": "zero"});
        assert_eq!(deep_get(&v, &[Index(0)]), None);
    }

    #[test]
    fn deep_get_empty_path_returns_root() {
        let v = json!([1, 2]);
        assert_eq!(deep_get(&v, &[]), Some(&v));
    }

    // ── decode_event ────────────────────────────────────────────────

    #[test]
    fn decodes_sender_subject_and_trimmed_body() {
        let email = decode_event(&ses_event("alerts@transit.org", RAW_EMAIL)).unwrap();
        assert_eq!(email.sender, "alerts@transit.org");
        assert_eq!(email.subject, "Reminder: Line 1 delays");
        assert_eq!(
            email.body,
            "Line 1 trains are delayed.\nSee something suspicious? Call us."
        );
    }

    #[test]
    fn missing_records_is_envelope_error() {
        let err = decode_event(&json!({"detail": {}})).unwrap_err();
        assert!(matches!(err, EnvelopeError::MissingSnsMessage));
    }

    #[test]
    fn empty_records_is_envelope_error() {
        let err = decode_event(&json!({"Records": []})).unwrap_err();
        assert!(matches!(err, EnvelopeError::MissingSnsMessage));
    }

    #[test]
    fn non_json_message_is_invalid_notification() {
        let event = json!({"Records": [{"Sns": {"Message": "not json"}}]});
        let err = decode_event(&event).unwrap_err();
        assert!(matches!(err, EnvelopeError::InvalidNotification(_)));
    }

    #[test]
    fn missing_source_is_reported() {
        let notification = json!({"content": RAW_EMAIL});
        let event = json!({"Records": [{"Sns": {"Message": notification.to_string()}}]});
        let err = decode_event(&event).unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::MissingNotificationField("mail.source")
        ));
    }

    #[test]
    fn missing_content_is_reported() {
        let notification = json!({"mail": {"source": "alerts@transit.org"}});
        let event = json!({"Records": [{"Sns": {"Message": notification.to_string()}}]});
        let err = decode_event(&event).unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::MissingNotificationField("content")
        ));
    }

    #[test]
    fn subject_defaults_to_empty() {
        let raw = "From: a@b.com\r\nContent-Type: text/plain\r\n\r\nHello\r\n";
        let (subject, body) = parse_mime(raw).unwrap();
        assert_eq!(subject, "");
        assert_eq!(body, "Hello");
    }

    #[test]
    fn html_only_message_has_no_plain_body() {
        let raw = "From: alerts@transit.org\r\n\
            Subject: S\r\n\
            Content-Type: text/html\r\n\
            \r\n\
            <p>Line 1 delayed</p><p>See something suspicious? Call</p>\r\n";
        let err = parse_mime(raw).unwrap_err();
        assert!(matches!(err, EnvelopeError::MissingPlainBody));
    }

    #[test]
    fn multipart_alternative_uses_plain_part() {
        let raw = "From: alerts@transit.org\r\n\
            Subject: S\r\n\
            MIME-Version: 1.0\r\n\
            Content-Type: multipart/alternative; boundary=\"b1\"\r\n\
            \r\n\
            --b1\r\n\
            Content-Type: text/plain\r\n\
            \r\n\
            Line 1 delayed\r\n\
            --b1\r\n\
            Content-Type: text/html\r\n\
            \r\n\
            <p>Line 1 delayed</p>\r\n\
            --b1--\r\n";
        let (_, body) = parse_mime(raw).unwrap();
        assert_eq!(body, "Line 1 delayed");
    }
}
