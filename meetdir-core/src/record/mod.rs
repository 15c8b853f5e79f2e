//! Typed records persisted in the append-only log.
//!
//! Every line of the log is a [`LogEntry`]: a sequence number, a timestamp
//! and one [`Record`] variant. Replay keys each record by
//! `(RecordKind, key)` and keeps the entry with the highest sequence number.

mod checkpoint;
mod meeting;
mod pattern;
mod status;
mod tag;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use checkpoint::{CheckpointSource, Checkpoints, SyncCheckpoint};
pub use meeting::{
    Attendee, Classification, ClassificationSource, DocumentKind, DocumentRef, MeetingFlags,
    MeetingRecord,
};
pub use pattern::{IgnoredSeries, RecurrencePattern, series_signature};
pub use status::MeetingStatus;
pub use tag::TagDefinition;

#[cfg(test)]
pub(crate) use meeting::tests::make_record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Meeting,
    Sync,
    Pattern,
    Tag,
    Ignored,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecordKind::Meeting => "meeting",
            RecordKind::Sync => "sync",
            RecordKind::Pattern => "pattern",
            RecordKind::Tag => "tag",
            RecordKind::Ignored => "ignored",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub kind: RecordKind,
    pub id: String,
}

impl RecordKey {
    pub fn new(kind: RecordKind, id: impl Into<String>) -> Self {
        RecordKey {
            kind,
            id: id.into(),
        }
    }
}

/// Tombstone that removes a key from the index on replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Removal {
    pub kind: RecordKind,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    Meeting(MeetingRecord),
    Sync(SyncCheckpoint),
    Pattern(RecurrencePattern),
    Tag(TagDefinition),
    Ignored(IgnoredSeries),
    Removed(Removal),
}

impl Record {
    pub fn key(&self) -> RecordKey {
        match self {
            Record::Meeting(m) => RecordKey::new(RecordKind::Meeting, &m.stable_id),
            Record::Sync(s) => RecordKey::new(RecordKind::Sync, s.source.as_str()),
            Record::Pattern(p) => RecordKey::new(RecordKind::Pattern, &p.signature),
            Record::Tag(t) => RecordKey::new(RecordKind::Tag, &t.name),
            Record::Ignored(i) => RecordKey::new(RecordKind::Ignored, &i.signature),
            Record::Removed(r) => RecordKey::new(r.kind, &r.key),
        }
    }
}

/// One line of the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub seq: u64,
    pub at: DateTime<Utc>,
    pub record: Record,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_entry_roundtrip_uses_type_discriminator() {
        let entry = LogEntry {
            seq: 7,
            at: Utc::now(),
            record: Record::Removed(Removal {
                kind: RecordKind::Tag,
                key: "team".to_string(),
            }),
        };

        let line = serde_json::to_string(&entry).unwrap();
        assert!(line.contains(r#""type":"removed""#));

        let parsed: LogEntry = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, entry);
        assert_eq!(parsed.record.key(), RecordKey::new(RecordKind::Tag, "team"));
    }

    #[test]
    fn test_unknown_record_type_is_rejected() {
        let line = r#"{"seq":1,"at":"2026-01-01T00:00:00Z","record":{"type":"calendar"}}"#;
        assert!(serde_json::from_str::<LogEntry>(line).is_err());
    }
}
