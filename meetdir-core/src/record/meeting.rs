//! The meeting record: the central entity of the store.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{MeetDirError, MeetDirResult};
use crate::record::pattern::series_signature;
use crate::record::status::MeetingStatus;

/// A meeting participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Transcript,
    Summary,
    Attachment,
    /// Found inside another fetched document (one hop only).
    Linked,
}

/// A reference to a provider-hosted asset belonging to a meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    /// Provider identifier of the document or attachment.
    pub id: String,
    pub kind: DocumentKind,
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// File name inside the meeting directory.
    pub file_name: String,
    #[serde(default)]
    pub fetched: bool,
}

/// Where a classification came from, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Explicit,
    Pattern,
    Heuristic,
    Fallback,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub recurring: Option<bool>,
    #[serde(default)]
    pub source: Option<ClassificationSource>,
}

impl Classification {
    pub fn new(tag: &str, recurring: bool, source: ClassificationSource) -> Self {
        Classification {
            tag: Some(tag.to_string()),
            recurring: Some(recurring),
            source: Some(source),
        }
    }

    /// Both decisions are present.
    pub fn is_complete(&self) -> bool {
        self.tag.is_some() && self.recurring.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingFlags {
    #[serde(default)]
    pub orphaned: bool,
    #[serde(default)]
    pub one_on_one: bool,
    #[serde(default)]
    pub manual_capture_needed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingRecord {
    /// Derived from immutable source identifiers only.
    pub stable_id: String,
    pub title: String,
    pub slug: String,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
    /// Calendar event id; `None` for orphaned documents.
    pub source_event_ref: Option<String>,
    /// Provider series id when the event is an instance of a recurring series.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_event_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub document_refs: Vec<DocumentRef>,
    #[serde(default)]
    pub classification: Classification,
    pub status: MeetingStatus,
    #[serde(default)]
    pub flags: MeetingFlags,
    /// Relative to the meetings directory.
    #[serde(default)]
    pub materialized_path: Option<PathBuf>,
}

impl MeetingRecord {
    pub fn series_signature(&self) -> String {
        series_signature(&self.title, &self.attendees)
    }

    pub fn date(&self, tz: &Tz) -> NaiveDate {
        self.start_time.with_timezone(tz).date_naive()
    }

    pub fn attendee_emails(&self) -> Vec<String> {
        self.attendees.iter().map(|a| a.email.to_lowercase()).collect()
    }

    pub fn document(&self, id: &str) -> Option<&DocumentRef> {
        self.document_refs.iter().find(|d| d.id == id)
    }

    pub fn has_document(&self, id: &str) -> bool {
        self.document(id).is_some()
    }

    pub fn unfetched(&self) -> impl Iterator<Item = &DocumentRef> {
        self.document_refs.iter().filter(|d| !d.fetched)
    }

    pub fn all_fetched(&self) -> bool {
        self.document_refs.iter().all(|d| d.fetched)
    }

    /// Move to `to`, enforcing the transition table.
    pub fn transition(&mut self, to: MeetingStatus) -> MeetDirResult<()> {
        if !self.status.can_transition_to(to) {
            return Err(MeetDirError::InvalidTransition {
                stable_id: self.stable_id.clone(),
                from: self.status,
                to,
            });
        }
        if to == MeetingStatus::Classified && !self.classification.is_complete() {
            return Err(MeetDirError::Invariant(format!(
                "{} cannot be classified without both a tag and a recurrence decision",
                self.stable_id
            )));
        }
        self.status = to;
        Ok(())
    }

    /// The only way a record becomes synced.
    pub fn mark_synced(&mut self, path: PathBuf) -> MeetDirResult<()> {
        if !self.all_fetched() {
            let missing: Vec<_> = self.unfetched().map(|d| d.id.as_str()).collect();
            return Err(MeetDirError::Invariant(format!(
                "{} cannot be synced with unfetched documents: {}",
                self.stable_id,
                missing.join(", ")
            )));
        }
        self.transition(MeetingStatus::Synced)?;
        self.materialized_path = Some(path);
        Ok(())
    }

    /// A synced record must have every document fetched and a path.
    pub fn check_invariants(&self) -> MeetDirResult<()> {
        if self.status == MeetingStatus::Synced {
            if !self.all_fetched() {
                return Err(MeetDirError::Invariant(format!(
                    "{} is synced but has unfetched documents",
                    self.stable_id
                )));
            }
            if self.materialized_path.is_none() {
                return Err(MeetDirError::Invariant(format!(
                    "{} is synced but has no materialized path",
                    self.stable_id
                )));
            }
        }
        Ok(())
    }
}
