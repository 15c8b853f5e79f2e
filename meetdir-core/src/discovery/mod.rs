//! Discovery: turn calendar events and transcript documents into meeting
//! records.
//!
//! [`Discovery::run`] only reads the store. It returns a
//! [`DiscoveryReport`] with the records that are new or changed and the
//! advanced checkpoints; [`Store::commit_discovery`] persists both. A pass
//! that fails part way therefore commits nothing and leaves the
//! checkpoints where they were.

mod filter;
pub mod matcher;
pub mod naming;

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::date_range::DateRange;
use crate::error::MeetDirResult;
use crate::materialize::layout::{
    SUMMARY_FILE, TRANSCRIPT_FILE, attachment_file_name, unique_file_name,
};
use crate::record::{
    CheckpointSource, Checkpoints, Classification, ClassificationSource, DocumentKind,
    DocumentRef, MeetingFlags, MeetingRecord, MeetingStatus, Record, SyncCheckpoint,
    series_signature,
};
use crate::source::{
    CalendarEvent, CalendarSource, TranscriptDocument, TranscriptKind, TranscriptSource,
};
use crate::store::Store;

pub use filter::SkipReason;
pub use matcher::{MatchPolicy, MatchResult};

use filter::{check_event, is_excluded_attachment};
use matcher::{Candidate, best_match};
use naming::generate_slug;

/// Prefix of stable ids derived from an orphaned document id.
pub const ORPHAN_PREFIX: &str = "doc_";

#[derive(Debug, Clone)]
pub struct DiscoveryPolicy {
    /// Window start when a source has no checkpoint yet.
    pub initial_lookback: Duration,
    pub min_attendees: usize,
    pub include_all_day_without_description: bool,
    pub excluded_mime_prefixes: Vec<String>,
    /// Excluded when naming one-on-ones.
    pub user_email: Option<String>,
    pub matching: MatchPolicy,
}

impl Default for DiscoveryPolicy {
    fn default() -> Self {
        DiscoveryPolicy {
            initial_lookback: Duration::days(7),
            min_attendees: 2,
            include_all_day_without_description: false,
            excluded_mime_prefixes: vec!["video/".to_string()],
            user_email: None,
            matching: MatchPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedItem {
    pub source: CheckpointSource,
    pub id: String,
    pub title: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default)]
pub struct DiscoveryReport {
    /// New or changed records, ordered by start time.
    pub records: Vec<MeetingRecord>,
    /// Checkpoints after this pass.
    pub checkpoints: Checkpoints,
    pub skipped: Vec<SkippedItem>,
    pub created: usize,
    pub updated: usize,
    pub orphaned: usize,
    pub events_seen: usize,
    pub documents_seen: usize,
}

impl DiscoveryReport {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub struct Discovery<'a> {
    store: &'a Store,
    policy: &'a DiscoveryPolicy,
}

impl<'a> Discovery<'a> {
    pub fn new(store: &'a Store, policy: &'a DiscoveryPolicy) -> Self {
        Discovery { store, policy }
    }

    /// Window for one source: from its checkpoint (or the initial lookback)
    /// up to `until`.
    pub fn window(&self, checkpoint: Option<&SyncCheckpoint>, until: DateTime<Utc>) -> DateRange {
        let from = checkpoint
            .map(|c| c.boundary)
            .unwrap_or(until - self.policy.initial_lookback)
            .min(until);
        DateRange::new(from, until)
    }

    pub async fn run<C, T>(
        &self,
        calendar: &C,
        transcripts: &T,
        since: &Checkpoints,
        until: DateTime<Utc>,
    ) -> MeetDirResult<DiscoveryReport>
    where
        C: CalendarSource,
        T: TranscriptSource,
    {
        let calendar_window = self.window(since.calendar.as_ref(), until);
        let transcript_window = self.window(since.transcripts.as_ref(), until);

        let events: Vec<CalendarEvent> = calendar
            .list_events(&calendar_window)
            .await?
            .into_iter()
            .filter(|e| calendar_window.contains(e.start))
            .collect();
        let documents: Vec<TranscriptDocument> = transcripts
            .list_documents(&transcript_window)
            .await?
            .into_iter()
            .filter(|d| transcript_window.contains(d.timestamp))
            .collect();

        debug!(
            events = events.len(),
            documents = documents.len(),
            from = %calendar_window.from_rfc3339(),
            "Fetched discovery inputs"
        );

        let mut plan = Plan::new(self.store, self.policy);
        for event in &events {
            plan.add_event(event);
        }
        for doc in &documents {
            plan.add_document(doc);
        }

        let mut checkpoints = since.clone();
        if calendar.is_configured() {
            checkpoints.calendar =
                Some(since.advance(CheckpointSource::Calendar, until, events.len()));
        }
        if transcripts.is_configured() {
            checkpoints.transcripts =
                Some(since.advance(CheckpointSource::Transcripts, until, documents.len()));
        }

        let mut report = plan.finish();
        report.checkpoints = checkpoints;
        report.events_seen = events.len();
        report.documents_seen = documents.len();

        info!(
            created = report.created,
            updated = report.updated,
            orphaned = report.orphaned,
            skipped = report.skipped.len(),
            "Discovery planned"
        );
        Ok(report)
    }
}

/// Working state of one pass: records touched so far, layered over the
/// store.
struct Plan<'a> {
    store: &'a Store,
    policy: &'a DiscoveryPolicy,
    working: BTreeMap<String, MeetingRecord>,
    /// Document id -> stable id of the record referencing it.
    claimed: HashMap<String, String>,
    skipped_events: HashMap<String, SkipReason>,
    skipped: Vec<SkippedItem>,
}

impl<'a> Plan<'a> {
    fn new(store: &'a Store, policy: &'a DiscoveryPolicy) -> Self {
        let claimed = store
            .meetings()
            .flat_map(|m| {
                m.document_refs
                    .iter()
                    .map(move |d| (d.id.clone(), m.stable_id.clone()))
            })
            .collect();

        Plan {
            store,
            policy,
            working: BTreeMap::new(),
            claimed,
            skipped_events: HashMap::new(),
            skipped: Vec::new(),
        }
    }

    fn record(&self, stable_id: &str) -> Option<&MeetingRecord> {
        self.working
            .get(stable_id)
            .or_else(|| self.store.meeting(stable_id))
    }

    /// Copy-on-write access to a stored record.
    fn record_mut(&mut self, stable_id: &str) -> Option<&mut MeetingRecord> {
        if !self.working.contains_key(stable_id) {
            let stored = self.store.meeting(stable_id)?.clone();
            self.working.insert(stable_id.to_string(), stored);
        }
        self.working.get_mut(stable_id)
    }

    fn skip(&mut self, source: CheckpointSource, id: &str, title: &str, reason: SkipReason) {
        debug!(%source, id, title, %reason, "Skipping");
        self.skipped.push(SkippedItem {
            source,
            id: id.to_string(),
            title: title.to_string(),
            reason,
        });
    }

    fn suggestion(&self, signature: &str) -> Classification {
        self.store
            .pattern(signature)
            .map(|p| Classification::new(&p.tag, p.recurring, ClassificationSource::Pattern))
            .unwrap_or_default()
    }

    fn add_event(&mut self, event: &CalendarEvent) {
        if let Some(reason) = check_event(event, self.policy, self.store) {
            self.skipped_events.insert(event.id.clone(), reason.clone());
            self.skip(CheckpointSource::Calendar, &event.id, &event.title, reason);
            return;
        }

        if self.record(&event.id).is_none() {
            let record = self.record_from_event(event);
            self.working.insert(record.stable_id.clone(), record);
            return;
        }

        let policy = self.policy;
        let Some(record) = self.record_mut(&event.id) else {
            return;
        };

        // Reschedules are picked up until the meeting is classified; title,
        // slug and flags belong to the user once the record exists.
        if record.status == MeetingStatus::Discovered {
            record.start_time = event.start;
            record.end_time = event.end;
            record.attendees = event.attendees.clone();
            record.description = event.description.clone();
            record.series_event_ref = event.recurring_event_id.clone();
        }

        let new_attachments: Vec<_> = event
            .attachments
            .iter()
            .filter(|a| !is_excluded_attachment(a, policy) && !record.has_document(&a.id))
            .collect();

        if new_attachments.is_empty() {
            return;
        }
        if record.status == MeetingStatus::Synced {
            let stable_id = record.stable_id.clone();
            for attachment in new_attachments {
                self.skip(
                    CheckpointSource::Calendar,
                    &attachment.id,
                    &attachment.title,
                    SkipReason::AlreadySynced {
                        stable_id: stable_id.clone(),
                    },
                );
            }
            return;
        }
        for attachment in new_attachments {
            push_attachment(record, attachment);
        }
    }

    fn record_from_event(&self, event: &CalendarEvent) -> MeetingRecord {
        let (slug, one_on_one) =
            generate_slug(&event.title, &event.attendees, self.policy.user_email.as_deref());

        let mut record = MeetingRecord {
            stable_id: event.id.clone(),
            title: event.title.clone(),
            slug,
            start_time: event.start,
            end_time: event.end,
            attendees: event.attendees.clone(),
            source_event_ref: Some(event.id.clone()),
            series_event_ref: event.recurring_event_id.clone(),
            description: event.description.clone(),
            document_refs: Vec::new(),
            classification: self.suggestion(&series_signature(&event.title, &event.attendees)),
            status: MeetingStatus::Discovered,
            flags: MeetingFlags {
                one_on_one,
                ..MeetingFlags::default()
            },
            materialized_path: None,
        };

        for attachment in &event.attachments {
            if is_excluded_attachment(attachment, self.policy) {
                debug!(
                    title = %attachment.title,
                    mime = ?attachment.mime_type,
                    "Excluding attachment"
                );
                continue;
            }
            push_attachment(&mut record, attachment);
        }
        record
    }

    fn add_document(&mut self, doc: &TranscriptDocument) {
        if let Some(owner) = self.claimed.get(&doc.id) {
            debug!(doc = %doc.id, %owner, "Document already associated");
            return;
        }

        if let Some(event_id) = doc.linked_event_id.as_deref() {
            if self.skipped_events.contains_key(event_id) {
                self.skip(
                    CheckpointSource::Transcripts,
                    &doc.id,
                    &doc.title,
                    SkipReason::LinkedEventSkipped,
                );
                return;
            }
            if self.record(event_id).is_some() {
                debug!(doc = %doc.id, event = event_id, "Associated by provider link");
                self.attach(event_id.to_string(), doc);
                return;
            }
        }

        if let Some(m) = self.best_candidate(doc) {
            debug!(doc = %doc.id, stable_id = %m.stable_id, score = m.score, "Associated by score");
            self.attach(m.stable_id, doc);
            return;
        }

        let signature = series_signature(&doc.title, &doc.attendees);
        if self.store.is_ignored(&signature) {
            self.skip(
                CheckpointSource::Transcripts,
                &doc.id,
                &doc.title,
                SkipReason::IgnoredSeries,
            );
            return;
        }

        let record = self.orphan_from_document(doc, &signature);
        debug!(doc = %doc.id, stable_id = %record.stable_id, "Created orphan");
        self.claimed.insert(doc.id.clone(), record.stable_id.clone());
        self.working.insert(record.stable_id.clone(), record);
    }

    /// Scores this pass's records, then stored event-backed records.
    fn best_candidate(&self, doc: &TranscriptDocument) -> Option<MatchResult> {
        let current = self.working.values();
        let stored = self
            .store
            .meetings()
            .filter(|m| m.source_event_ref.is_some() && !self.working.contains_key(&m.stable_id));

        best_match(
            &self.policy.matching,
            doc,
            current.chain(stored).map(Candidate::from),
        )
    }

    fn attach(&mut self, stable_id: String, doc: &TranscriptDocument) {
        let Some(record) = self.record_mut(&stable_id) else {
            return;
        };

        if record.status == MeetingStatus::Synced {
            self.skip(
                CheckpointSource::Transcripts,
                &doc.id,
                &doc.title,
                SkipReason::AlreadySynced { stable_id },
            );
            return;
        }

        push_document(record, doc);
        self.claimed.insert(doc.id.clone(), stable_id);
    }

    fn orphan_from_document(&self, doc: &TranscriptDocument, signature: &str) -> MeetingRecord {
        let (slug, one_on_one) =
            generate_slug(&doc.title, &doc.attendees, self.policy.user_email.as_deref());

        let mut record = MeetingRecord {
            stable_id: orphan_stable_id(&doc.id),
            title: doc.title.clone(),
            slug,
            start_time: doc.timestamp,
            end_time: None,
            attendees: doc.attendees.clone(),
            source_event_ref: None,
            series_event_ref: None,
            description: None,
            document_refs: Vec::new(),
            classification: self.suggestion(signature),
            status: MeetingStatus::Discovered,
            flags: MeetingFlags {
                orphaned: true,
                one_on_one,
                manual_capture_needed: false,
            },
            materialized_path: None,
        };
        push_document(&mut record, doc);
        record
    }

    fn finish(self) -> DiscoveryReport {
        let mut report = DiscoveryReport {
            skipped: self.skipped,
            ..DiscoveryReport::default()
        };

        for (stable_id, record) in self.working {
            match self.store.meeting(&stable_id) {
                None => {
                    report.created += 1;
                    if record.flags.orphaned {
                        report.orphaned += 1;
                    }
                    report.records.push(record);
                }
                Some(stored) if *stored != record => {
                    report.updated += 1;
                    report.records.push(record);
                }
                Some(_) => {}
            }
        }

        report
            .records
            .sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.stable_id.cmp(&b.stable_id)));
        report
    }
}

fn push_attachment(record: &mut MeetingRecord, attachment: &crate::source::Attachment) {
    let base = attachment_file_name(&attachment.title, attachment.mime_type.as_deref());
    let file_name = unique_file_name(record.document_refs.iter().map(|d| d.file_name.as_str()), &base);

    record.document_refs.push(DocumentRef {
        id: attachment.id.clone(),
        kind: DocumentKind::Attachment,
        title: attachment.title.clone(),
        url: attachment.url.clone(),
        mime_type: attachment.mime_type.clone(),
        file_name,
        fetched: false,
    });
}

fn push_document(record: &mut MeetingRecord, doc: &TranscriptDocument) {
    let (kind, base) = match doc.kind {
        TranscriptKind::Transcript => (DocumentKind::Transcript, TRANSCRIPT_FILE),
        TranscriptKind::Summary => (DocumentKind::Summary, SUMMARY_FILE),
    };
    let file_name = unique_file_name(record.document_refs.iter().map(|d| d.file_name.as_str()), base);

    record.document_refs.push(DocumentRef {
        id: doc.id.clone(),
        kind,
        title: doc.title.clone(),
        url: doc.url.clone(),
        mime_type: Some("text/markdown".to_string()),
        file_name,
        fetched: false,
    });
}

impl Store {
    /// Persist a planned discovery pass: changed records first, then the
    /// checkpoints that moved. Returns the number of records written.
    pub fn commit_discovery(&mut self, report: &DiscoveryReport) -> MeetDirResult<usize> {
        let current = self.checkpoints();

        let checkpoints = [
            (report.checkpoints.calendar.as_ref(), current.calendar.as_ref()),
            (report.checkpoints.transcripts.as_ref(), current.transcripts.as_ref()),
        ]
        .into_iter()
        .filter_map(|(new, old)| match new {
            Some(new) if Some(new) != old => Some(Record::Sync(new.clone())),
            _ => None,
        })
        .collect::<Vec<_>>();

        let records = report.records.iter().cloned().map(Record::Meeting);
        self.append_all(records.chain(checkpoints))?;

        Ok(report.records.len())
    }
}

/// Stable id of the orphan record created for a document.
pub fn orphan_stable_id(doc_id: &str) -> String {
    format!("{ORPHAN_PREFIX}{doc_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MeetDirError;
    use crate::record::{Attendee, IgnoredSeries, RecurrencePattern};
    use crate::source::Attachment;
    use chrono::TimeZone;

    struct Calendar(Vec<CalendarEvent>);
    struct Transcripts(Vec<TranscriptDocument>);

    impl CalendarSource for Calendar {
        async fn list_events(&self, _range: &DateRange) -> MeetDirResult<Vec<CalendarEvent>> {
            Ok(self.0.clone())
        }
    }

    impl TranscriptSource for Transcripts {
        async fn list_documents(&self, _range: &DateRange) -> MeetDirResult<Vec<TranscriptDocument>> {
            Ok(self.0.clone())
        }
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    fn until() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 3, 0, 0, 0).unwrap()
    }

    fn people(emails: &[&str]) -> Vec<Attendee> {
        emails
            .iter()
            .map(|e| Attendee {
                email: e.to_string(),
                name: None,
            })
            .collect()
    }

    fn event(id: &str, title: &str, start: DateTime<Utc>) -> CalendarEvent {
        CalendarEvent {
            id: id.into(),
            title: title.into(),
            start,
            end: Some(start + Duration::minutes(30)),
            attendees: people(&["me@example.com", "alice@example.com", "bob@example.com"]),
            attachments: vec![],
            recurring_event_id: None,
            description: None,
            all_day: false,
        }
    }

    fn document(id: &str, kind: TranscriptKind, title: &str, timestamp: DateTime<Utc>) -> TranscriptDocument {
        TranscriptDocument {
            id: id.into(),
            kind,
            linked_event_id: None,
            url: format!("https://docs.example.com/{id}"),
            title: title.into(),
            timestamp,
            attendees: vec![],
        }
    }

    /// Every listing fails the way an expired token does.
    struct Unavailable;

    impl CalendarSource for Unavailable {
        async fn list_events(&self, _range: &DateRange) -> MeetDirResult<Vec<CalendarEvent>> {
            Err(MeetDirError::Provider("calendar: token expired".into()))
        }
    }

    impl TranscriptSource for Unavailable {
        async fn list_documents(&self, _range: &DateRange) -> MeetDirResult<Vec<TranscriptDocument>> {
            Err(MeetDirError::Provider("transcripts: token expired".into()))
        }
    }

    async fn plan(store: &Store, events: Vec<CalendarEvent>, docs: Vec<TranscriptDocument>) -> DiscoveryReport {
        let policy = DiscoveryPolicy::default();
        Discovery::new(store, &policy)
            .run(&Calendar(events), &Transcripts(docs), &store.checkpoints(), until())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_inclusion_policy() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = Store::open(dir.path()).unwrap();

        let mut solo = event("e1", "Focus time", at(9, 0));
        solo.attendees = people(&["me@example.com"]);

        let mut holiday = event("e2", "Holiday", at(0, 0));
        holiday.all_day = true;

        let mut offsite = event("e3", "Offsite", at(0, 0));
        offsite.all_day = true;
        offsite.description = Some("Agenda in doc".into());

        let ignored = event("e4", "Vendor pitch", at(11, 0));
        store
            .append(Record::Ignored(IgnoredSeries {
                signature: series_signature(&ignored.title, &ignored.attendees),
                title: ignored.title.clone(),
                reason: String::new(),
                ignored_at: Utc::now(),
            }))
            .unwrap();

        let report = plan(&store, vec![solo, holiday, offsite, ignored], vec![]).await;

        let ids: Vec<_> = report.records.iter().map(|r| r.stable_id.as_str()).collect();
        assert_eq!(ids, vec!["e3"]);

        let reasons: HashMap<_, _> = report
            .skipped
            .iter()
            .map(|s| (s.id.as_str(), s.reason.clone()))
            .collect();
        assert_eq!(reasons["e1"], SkipReason::TooFewAttendees { count: 1 });
        assert_eq!(reasons["e2"], SkipReason::AllDayWithoutDescription);
        assert_eq!(reasons["e4"], SkipReason::IgnoredSeries);
    }

    #[tokio::test]
    async fn test_video_attachments_are_excluded() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();

        let mut e = event("e1", "Design review", at(10, 0));
        e.attachments = vec![
            Attachment {
                id: "f1".into(),
                title: "Recording".into(),
                url: "https://drive.example.com/f1".into(),
                mime_type: Some("video/mp4".into()),
            },
            Attachment {
                id: "f2".into(),
                title: "Roadmap".into(),
                url: "https://drive.example.com/f2".into(),
                mime_type: Some("application/pdf".into()),
            },
        ];

        let report = plan(&store, vec![e], vec![]).await;
        let refs = &report.records[0].document_refs;
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].file_name, "Roadmap.pdf");
        assert_eq!(refs[0].kind, DocumentKind::Attachment);
    }

    #[tokio::test]
    async fn test_linked_then_scored_association() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();

        let standup = event("e1", "Team Standup", at(15, 0));
        let review = event("e2", "Design Review", at(16, 0));

        let mut linked = document("d1", TranscriptKind::Transcript, "Notes", at(18, 0));
        linked.linked_event_id = Some("e2".into());
        let scored = document("d2", TranscriptKind::Summary, "Team Standup - Notes", at(15, 35));

        let report = plan(&store, vec![standup, review], vec![linked, scored]).await;

        let by_id: HashMap<_, _> = report.records.iter().map(|r| (r.stable_id.as_str(), r)).collect();
        assert_eq!(by_id["e2"].document_refs[0].id, "d1");
        assert_eq!(by_id["e2"].document_refs[0].file_name, TRANSCRIPT_FILE);
        assert_eq!(by_id["e1"].document_refs[0].id, "d2");
        assert_eq!(by_id["e1"].document_refs[0].file_name, SUMMARY_FILE);
        assert_eq!(report.orphaned, 0);
    }

    #[tokio::test]
    async fn test_unmatched_transcript_and_summary_share_one_orphan() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();

        let transcript = document("d1", TranscriptKind::Transcript, "Hallway chat", at(13, 0));
        let summary = document("d2", TranscriptKind::Summary, "Hallway chat", at(13, 1));

        let report = plan(&store, vec![], vec![transcript, summary]).await;

        assert_eq!(report.records.len(), 1);
        let orphan = &report.records[0];
        assert_eq!(orphan.stable_id, "doc_d1");
        assert!(orphan.flags.orphaned);
        assert!(orphan.source_event_ref.is_none());
        assert_eq!(orphan.document_refs.len(), 2);
    }

    #[tokio::test]
    async fn test_pattern_prepopulates_classification() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = Store::open(dir.path()).unwrap();

        let e = event("e1", "Team Standup", at(15, 0));
        store
            .append(Record::Pattern(RecurrencePattern {
                signature: series_signature(&e.title, &e.attendees),
                title: e.title.clone(),
                slug: "team-standup".into(),
                tag: "team".into(),
                recurring: true,
                count: 1,
                first_seen: Utc::now(),
                last_seen: Utc::now(),
            }))
            .unwrap();

        let report = plan(&store, vec![e], vec![]).await;
        let record = &report.records[0];
        assert_eq!(record.status, MeetingStatus::Discovered);
        assert_eq!(
            record.classification,
            Classification::new("team", true, ClassificationSource::Pattern)
        );
    }

    #[tokio::test]
    async fn test_rerun_after_commit_is_empty_and_checkpoints_advance() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = Store::open(dir.path()).unwrap();

        let events = vec![event("e1", "Team Standup", at(15, 0))];
        let docs = vec![document("d1", TranscriptKind::Transcript, "Team Standup", at(15, 5))];

        let first = plan(&store, events.clone(), docs.clone()).await;
        assert_eq!(first.created, 1);
        store.commit_discovery(&first).unwrap();

        let checkpoints = store.checkpoints();
        assert_eq!(checkpoints.calendar.as_ref().unwrap().boundary, until());
        assert_eq!(checkpoints.transcripts.as_ref().unwrap().last_count, 1);

        // same window again, from scratch
        let policy = DiscoveryPolicy::default();
        let second = Discovery::new(&store, &policy)
            .run(&Calendar(events), &Transcripts(docs), &Checkpoints::default(), until())
            .await
            .unwrap();
        assert!(second.is_empty());
        assert_eq!(second.events_seen, 1);
        assert_eq!(store.meetings().count(), 1);
    }

    #[test]
    fn test_window_starts_at_checkpoint_or_lookback() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let policy = DiscoveryPolicy::default();
        let discovery = Discovery::new(&store, &policy);

        let window = discovery.window(None, until());
        assert_eq!(window.from, Some(until() - Duration::days(7)));

        let checkpoint = Checkpoints::default().advance(CheckpointSource::Calendar, at(12, 0), 0);
        let window = discovery.window(Some(&checkpoint), until());
        assert_eq!(window.from, Some(at(12, 0)));
    }

    #[tokio::test]
    async fn test_provider_error_leaves_store_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = Store::open(dir.path()).unwrap();
        let report = plan(&store, vec![event("e1", "Team Standup", at(9, 0))], vec![]).await;
        store.commit_discovery(&report).unwrap();

        let checkpoints = store.checkpoints();
        let log_len = std::fs::metadata(store.log_path()).unwrap().len();
        let policy = DiscoveryPolicy::default();
        let later = until() + Duration::days(1);
        let events = vec![event("e2", "Planning", at(13, 0))];

        let err = Discovery::new(&store, &policy)
            .run(&Unavailable, &Transcripts(vec![]), &checkpoints, later)
            .await
            .unwrap_err();
        assert!(matches!(err, MeetDirError::Provider(_)));

        let err = Discovery::new(&store, &policy)
            .run(&Calendar(events), &Unavailable, &checkpoints, later)
            .await
            .unwrap_err();
        assert!(matches!(err, MeetDirError::Provider(_)));

        assert_eq!(store.checkpoints(), checkpoints);
        assert_eq!(store.meetings().count(), 1);
        assert!(store.meeting("e2").is_none());
        assert_eq!(std::fs::metadata(store.log_path()).unwrap().len(), log_len);
    }
}
