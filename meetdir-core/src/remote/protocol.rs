//! Defines the JSON protocol used for communication between meetdir
//! and provider binaries over stdin/stdout.

use base64::Engine;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::{MeetDirError, MeetDirResult};
use crate::source::{CalendarEvent, TranscriptDocument};

pub trait ProviderCommand: Serialize {
    type Response: DeserializeOwned;
    fn command() -> Command;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    ListEvents,
    ListDocuments,
    FetchDocument,
}

/// Request sent from meetdir to provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    pub command: Command,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Response sent from provider to meetdir.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response<T> {
    Success { data: T },
    Error { error: String },
}

/// List calendar events starting within a time range.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListEvents {
    /// Provider-specific config (e.g., google_account, calendar_id)
    #[serde(flatten)]
    pub remote_config: serde_json::Map<String, serde_json::Value>,
    pub from: String,
    pub to: String,
}

impl ProviderCommand for ListEvents {
    type Response = Vec<CalendarEvent>;
    fn command() -> Command {
        Command::ListEvents
    }
}

/// List transcript and summary documents generated within a time range.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListDocuments {
    #[serde(flatten)]
    pub remote_config: serde_json::Map<String, serde_json::Value>,
    pub from: String,
    pub to: String,
}

impl ProviderCommand for ListDocuments {
    type Response = Vec<TranscriptDocument>;
    fn command() -> Command {
        Command::ListDocuments
    }
}

/// Download one document or attachment.
#[derive(Debug, Serialize, Deserialize)]
pub struct FetchDocument {
    #[serde(flatten)]
    pub remote_config: serde_json::Map<String, serde_json::Value>,
    pub id: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl ProviderCommand for FetchDocument {
    type Response = FetchedContent;
    fn command() -> Command {
        Command::FetchDocument
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentEncoding {
    /// Text documents (markdown exports).
    #[default]
    Utf8,
    /// Binary attachments.
    Base64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedContent {
    pub content: String,
    #[serde(default)]
    pub encoding: ContentEncoding,
}

impl FetchedContent {
    pub fn into_bytes(self) -> MeetDirResult<Vec<u8>> {
        match self.encoding {
            ContentEncoding::Utf8 => Ok(self.content.into_bytes()),
            ContentEncoding::Base64 => base64::engine::general_purpose::STANDARD
                .decode(self.content.trim())
                .map_err(|e| MeetDirError::Provider(format!("Invalid base64 content: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_flattens_remote_config() {
        let mut remote_config = serde_json::Map::new();
        remote_config.insert("google_account".into(), "me@example.com".into());

        let params = serde_json::to_value(ListEvents {
            remote_config,
            from: "2026-03-01T00:00:00+00:00".into(),
            to: "2026-03-08T00:00:00+00:00".into(),
        })
        .unwrap();
        let request = Request {
            command: ListEvents::command(),
            params,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["command"], "list_events");
        assert_eq!(json["params"]["google_account"], "me@example.com");
        assert_eq!(json["params"]["from"], "2026-03-01T00:00:00+00:00");
    }

    #[test]
    fn test_response_variants() {
        let ok: Response<Vec<TranscriptDocument>> = serde_json::from_str(
            r#"{"status":"success","data":[{"id":"d1","kind":"summary","url":"u","title":"Standup","timestamp":"2026-03-02T15:30:00Z"}]}"#,
        )
        .unwrap();
        match ok {
            Response::Success { data } => {
                assert_eq!(data[0].kind, crate::source::TranscriptKind::Summary);
                assert!(data[0].linked_event_id.is_none());
            }
            Response::Error { .. } => panic!("expected success"),
        }

        let err: Response<()> =
            serde_json::from_str(r#"{"status":"error","error":"token expired"}"#).unwrap();
        assert!(matches!(err, Response::Error { error } if error == "token expired"));
    }

    #[test]
    fn test_fetched_content_decoding() {
        let text = FetchedContent {
            content: "# Notes".into(),
            encoding: ContentEncoding::Utf8,
        };
        assert_eq!(text.into_bytes().unwrap(), b"# Notes");

        let binary: FetchedContent =
            serde_json::from_str(r#"{"content":"AAEC","encoding":"base64"}"#).unwrap();
        assert_eq!(binary.into_bytes().unwrap(), vec![0, 1, 2]);

        let bad = FetchedContent {
            content: "***".into(),
            encoding: ContentEncoding::Base64,
        };
        assert!(bad.into_bytes().is_err());
    }
}
