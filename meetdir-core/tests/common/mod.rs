//! In-memory providers for scenario tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};
use meetdir_core::date_range::DateRange;
use meetdir_core::discovery::{Discovery, DiscoveryPolicy, DiscoveryReport};
use meetdir_core::record::{Attendee, DocumentRef};
use meetdir_core::source::{
    CalendarEvent, CalendarSource, DocumentFetcher, TranscriptDocument, TranscriptKind,
    TranscriptSource,
};
use meetdir_core::{MeetDirError, MeetDirResult, Store};

#[derive(Default)]
pub struct FakeCalendar {
    pub events: Vec<CalendarEvent>,
}

impl CalendarSource for FakeCalendar {
    async fn list_events(&self, range: &DateRange) -> MeetDirResult<Vec<CalendarEvent>> {
        Ok(self
            .events
            .iter()
            .filter(|e| range.contains(e.start))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct FakeTranscripts {
    pub documents: Vec<TranscriptDocument>,
}

impl TranscriptSource for FakeTranscripts {
    async fn list_documents(&self, range: &DateRange) -> MeetDirResult<Vec<TranscriptDocument>> {
        Ok(self
            .documents
            .iter()
            .filter(|d| range.contains(d.timestamp))
            .cloned()
            .collect())
    }
}

/// Serves fixed bodies by document id; anything else fails like a
/// transient provider error. Records every request.
#[derive(Default)]
pub struct FakeFetcher {
    bodies: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn serve(mut self, id: &str, body: &str) -> Self {
        self.bodies.insert(id.to_string(), body.as_bytes().to_vec());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl DocumentFetcher for FakeFetcher {
    async fn fetch(&self, doc: &DocumentRef) -> MeetDirResult<Vec<u8>> {
        self.requests.lock().unwrap().push(doc.id.clone());
        self.bodies
            .get(&doc.id)
            .cloned()
            .ok_or_else(|| MeetDirError::Provider(format!("{} timed out", doc.id)))
    }
}

pub fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, minute, 0).unwrap()
}

pub fn team() -> Vec<Attendee> {
    ["me@example.com", "alice@example.com", "bob@example.com"]
        .iter()
        .map(|email| Attendee {
            email: email.to_string(),
            name: None,
        })
        .collect()
}

pub fn event(id: &str, title: &str, start: DateTime<Utc>) -> CalendarEvent {
    CalendarEvent {
        id: id.to_string(),
        title: title.to_string(),
        start,
        end: Some(start + Duration::minutes(30)),
        attendees: team(),
        attachments: vec![],
        recurring_event_id: Some("series-standup".to_string()),
        description: None,
        all_day: false,
    }
}

pub fn transcript(id: &str, title: &str, timestamp: DateTime<Utc>, linked: Option<&str>) -> TranscriptDocument {
    TranscriptDocument {
        id: id.to_string(),
        kind: TranscriptKind::Transcript,
        linked_event_id: linked.map(str::to_string),
        url: format!("https://docs.example.com/{id}"),
        title: title.to_string(),
        timestamp,
        attendees: vec![],
    }
}

pub fn open_store(root: &Path) -> Store {
    let mut store = Store::open(&root.join(".meetdir")).unwrap();
    store.ensure_default_tags().unwrap();
    store
}

/// Plan and commit one discovery pass up to `until`.
pub async fn discover(
    store: &mut Store,
    calendar: &FakeCalendar,
    transcripts: &FakeTranscripts,
    until: DateTime<Utc>,
) -> DiscoveryReport {
    let policy = DiscoveryPolicy::default();
    let since = store.checkpoints();
    let report = Discovery::new(store, &policy)
        .run(calendar, transcripts, &since, until)
        .await
        .unwrap();
    store.commit_discovery(&report).unwrap();
    report
}
