//! What the core needs from the calendar and transcript providers.
//!
//! Provider binaries implement these through the subprocess protocol in
//! [`crate::remote`]; tests implement them in memory.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::date_range::DateRange;
use crate::error::MeetDirResult;
use crate::record::{Attendee, DocumentRef};

/// A file attached to a calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Provider file id.
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// One occurrence of a calendar event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Occurrence id; unique per instance of a recurring series.
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub all_day: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptKind {
    Transcript,
    Summary,
}

/// A transcript or summary generated for a meeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptDocument {
    pub id: String,
    pub kind: TranscriptKind,
    /// Set when the provider knows which calendar event produced the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_event_id: Option<String>,
    pub url: String,
    pub title: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
}

pub trait CalendarSource: Sync {
    fn list_events(
        &self,
        range: &DateRange,
    ) -> impl Future<Output = MeetDirResult<Vec<CalendarEvent>>> + Send;

    /// An unconfigured source yields nothing and never advances its checkpoint.
    fn is_configured(&self) -> bool {
        true
    }
}

pub trait TranscriptSource: Sync {
    fn list_documents(
        &self,
        range: &DateRange,
    ) -> impl Future<Output = MeetDirResult<Vec<TranscriptDocument>>> + Send;

    fn is_configured(&self) -> bool {
        true
    }
}

pub trait DocumentFetcher: Sync {
    fn fetch(&self, doc: &DocumentRef) -> impl Future<Output = MeetDirResult<Vec<u8>>> + Send;
}

impl<C: CalendarSource> CalendarSource for Option<C> {
    async fn list_events(&self, range: &DateRange) -> MeetDirResult<Vec<CalendarEvent>> {
        match self {
            Some(source) => source.list_events(range).await,
            None => Ok(Vec::new()),
        }
    }

    fn is_configured(&self) -> bool {
        self.as_ref().is_some_and(|s| s.is_configured())
    }
}

impl<T: TranscriptSource> TranscriptSource for Option<T> {
    async fn list_documents(&self, range: &DateRange) -> MeetDirResult<Vec<TranscriptDocument>> {
        match self {
            Some(source) => source.list_documents(range).await,
            None => Ok(Vec::new()),
        }
    }

    fn is_configured(&self) -> bool {
        self.as_ref().is_some_and(|s| s.is_configured())
    }
}

impl<C: CalendarSource> CalendarSource for &C {
    async fn list_events(&self, range: &DateRange) -> MeetDirResult<Vec<CalendarEvent>> {
        (**self).list_events(range).await
    }

    fn is_configured(&self) -> bool {
        (**self).is_configured()
    }
}

impl<T: TranscriptSource> TranscriptSource for &T {
    async fn list_documents(&self, range: &DateRange) -> MeetDirResult<Vec<TranscriptDocument>> {
        (**self).list_documents(range).await
    }

    fn is_configured(&self) -> bool {
        (**self).is_configured()
    }
}
