//! Materialization: fetch the documents of classified meetings and write
//! them into the meetings directory.
//!
//! A record only becomes synced once every one of its documents has been
//! fetched into its expected directory. Failed fetches leave the record
//! classified with exactly the failed references unfetched, so the next run
//! retries only those.
//!
//! Each record gets its own directory. When two meetings would land in the
//! same place, the later one falls back to a directory suffixed with its
//! start time; see [`layout::candidate_paths`].

pub mod layout;
mod links;
mod manifest;

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use futures_util::future::join_all;
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{ItemFailure, MeetDirResult};
use crate::record::{DocumentKind, DocumentRef, MeetingRecord, MeetingStatus, Record};
use crate::source::DocumentFetcher;
use crate::store::Store;

use layout::{README_FILE, expected_path, linked_file_name, resolve_target, unique_file_name};
use links::extract_links;

pub use manifest::{FileProblem, Manifest, ManifestFile, sha256_file};

#[derive(Debug, Clone)]
pub struct MaterializePolicy {
    pub timezone: Tz,
    /// Records fetched at the same time.
    pub fetch_concurrency: usize,
    pub follow_links: bool,
    pub max_linked_documents: usize,
    pub link_prefixes: Vec<String>,
}

impl Default for MaterializePolicy {
    fn default() -> Self {
        MaterializePolicy {
            timezone: Tz::UTC,
            fetch_concurrency: 4,
            follow_links: true,
            max_linked_documents: 10,
            link_prefixes: vec!["https://docs.google.com/".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MaterializeReport {
    pub synced: Vec<String>,
    pub failed: Vec<ItemFailure>,
    /// Records that were not `classified`.
    pub skipped: Vec<String>,
    /// Records whose state changed and must be persisted, including failed
    /// records that fetched part of their documents.
    #[serde(skip)]
    pub records: Vec<MeetingRecord>,
}

/// Records to materialize plus the directories other meetings already own,
/// keyed by relative path.
#[derive(Debug, Clone, Default)]
pub struct MaterializeQueue {
    pub records: Vec<MeetingRecord>,
    pub claimed: HashMap<PathBuf, String>,
}

impl MaterializeQueue {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl From<Vec<MeetingRecord>> for MaterializeQueue {
    fn from(records: Vec<MeetingRecord>) -> Self {
        MaterializeQueue {
            records,
            claimed: HashMap::new(),
        }
    }
}

struct Outcome {
    original: MeetingRecord,
    record: MeetingRecord,
    result: Result<PathBuf, String>,
}

pub struct Materializer<'a, F> {
    root: &'a Path,
    policy: &'a MaterializePolicy,
    fetcher: &'a F,
}

impl<'a, F: DocumentFetcher> Materializer<'a, F> {
    pub fn new(root: &'a Path, policy: &'a MaterializePolicy, fetcher: &'a F) -> Self {
        Materializer {
            root,
            policy,
            fetcher,
        }
    }

    /// Materialize every `classified` record in `records`.
    ///
    /// Fails with [`crate::MeetDirError::Invariant`] before doing any work if a
    /// synced record has unfetched documents.
    pub async fn run(&self, queue: impl Into<MaterializeQueue>) -> MeetDirResult<MaterializeReport> {
        let MaterializeQueue { records, mut claimed } = queue.into();
        for record in &records {
            record.check_invariants()?;
        }

        let mut report = MaterializeReport::default();
        let (eligible, others): (Vec<_>, Vec<_>) = records
            .into_iter()
            .partition(|r| r.status == MeetingStatus::Classified);
        report.skipped = others.into_iter().map(|r| r.stable_id).collect();

        // Directories are assigned up front, in queue order, so concurrent
        // fetches never share one.
        let assigned: Vec<(MeetingRecord, Option<PathBuf>)> = eligible
            .into_iter()
            .map(|record| {
                let target = resolve_target(&record, &self.policy.timezone, self.root, &claimed);
                if let Some(target) = &target {
                    claimed.insert(target.clone(), record.stable_id.clone());
                }
                (record, target)
            })
            .collect();

        let outcomes: Vec<Outcome> = stream::iter(assigned)
            .map(|(record, target)| self.materialize_one(record, target))
            .buffer_unordered(self.policy.fetch_concurrency.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            match outcome.result {
                Ok(path) => {
                    info!(stable_id = %outcome.record.stable_id, path = %path.display(), "Synced meeting");
                    report.synced.push(outcome.record.stable_id.clone());
                }
                Err(reason) => {
                    warn!(stable_id = %outcome.record.stable_id, %reason, "Materialization failed");
                    report
                        .failed
                        .push(ItemFailure::new(&outcome.record.stable_id, reason));
                }
            }
            if outcome.record != outcome.original {
                report.records.push(outcome.record);
            }
        }

        report.synced.sort();
        report.failed.sort_by(|a, b| a.id.cmp(&b.id));
        report.records.sort_by(|a, b| a.stable_id.cmp(&b.stable_id));
        Ok(report)
    }

    async fn materialize_one(&self, record: MeetingRecord, target: Option<PathBuf>) -> Outcome {
        let original = record.clone();
        let mut record = record;
        let result = self.try_materialize(&mut record, target).await;
        Outcome {
            original,
            record,
            result,
        }
    }

    async fn try_materialize(
        &self,
        record: &mut MeetingRecord,
        target: Option<PathBuf>,
    ) -> Result<PathBuf, String> {
        let target = target.ok_or_else(|| match expected_path(record, &self.policy.timezone) {
            Some(path) => format!("every directory for {} belongs to another meeting", path.display()),
            None => "classification is incomplete".to_string(),
        })?;
        let dir = self.root.join(&target);
        fs::create_dir_all(&dir).map_err(|e| format!("could not create {}: {}", dir.display(), e))?;

        // Files fetched into a directory the record no longer maps to.
        for doc in record.document_refs.iter_mut() {
            if doc.fetched && !dir.join(&doc.file_name).exists() {
                debug!(stable_id = %record.stable_id, doc = %doc.id, "Fetched file missing, refetching");
                doc.fetched = false;
            }
        }

        let pending: Vec<usize> = record
            .document_refs
            .iter()
            .enumerate()
            .filter(|(_, d)| !d.fetched)
            .map(|(i, _)| i)
            .collect();

        let docs = &record.document_refs;
        let results = join_all(pending.iter().map(|&i| {
            let doc = &docs[i];
            async move { (i, self.fetcher.fetch(doc).await) }
        }))
        .await;

        let mut failures = Vec::new();
        let mut texts = Vec::new();
        for (i, result) in results {
            let doc = &mut record.document_refs[i];
            let written = result.and_then(|bytes| {
                write_atomic(&dir, &doc.file_name, &bytes)?;
                Ok(bytes)
            });
            match written {
                Ok(bytes) => {
                    doc.fetched = true;
                    if matches!(doc.kind, DocumentKind::Transcript | DocumentKind::Summary) {
                        texts.push(String::from_utf8_lossy(&bytes).into_owned());
                    }
                }
                Err(e) => failures.push(format!("{}: {}", doc.id, e)),
            }
        }

        if self.policy.follow_links && !texts.is_empty() {
            self.follow_links(record, &dir, &texts.join("\n")).await;
        }

        if !failures.is_empty() {
            // Mark the directory as taken so the retry finds it again.
            if let Err(e) = Manifest::build(record, &dir).and_then(|manifest| manifest.write(&dir)) {
                warn!(stable_id = %record.stable_id, error = %e, "Could not write partial manifest");
            }
            return Err(format!(
                "{} of {} document(s) failed: {}",
                failures.len(),
                pending.len(),
                failures.join("; ")
            ));
        }

        write_readme(record, &dir, &self.policy.timezone).map_err(|e| e.to_string())?;
        Manifest::build(record, &dir)
            .and_then(|manifest| manifest.write(&dir))
            .map_err(|e| e.to_string())?;
        record.mark_synced(target.clone()).map_err(|e| e.to_string())?;

        Ok(target)
    }

    /// Fetch documents linked from `text`, one hop only. Failures are
    /// dropped so they never hold back the sync.
    async fn follow_links(&self, record: &mut MeetingRecord, dir: &Path, text: &str) {
        let already = record
            .document_refs
            .iter()
            .filter(|d| d.kind == DocumentKind::Linked)
            .count();
        let budget = self.policy.max_linked_documents.saturating_sub(already);
        if budget == 0 {
            return;
        }

        let known: HashSet<&str> = record.document_refs.iter().map(|d| d.url.as_str()).collect();
        let urls = extract_links(text, &self.policy.link_prefixes, &known, budget);
        if urls.is_empty() {
            return;
        }

        let mut taken: Vec<String> = record.document_refs.iter().map(|d| d.file_name.clone()).collect();
        let linked: Vec<DocumentRef> = urls
            .into_iter()
            .map(|url| {
                let file_name = unique_file_name(taken.iter().map(String::as_str), &linked_file_name(&url));
                taken.push(file_name.clone());
                DocumentRef {
                    id: url.clone(),
                    kind: DocumentKind::Linked,
                    title: file_name.clone(),
                    url,
                    mime_type: None,
                    file_name,
                    fetched: false,
                }
            })
            .collect();

        let results = join_all(linked.iter().map(|doc| self.fetcher.fetch(doc))).await;

        for (mut doc, result) in linked.into_iter().zip(results) {
            match result.and_then(|bytes| write_atomic(dir, &doc.file_name, &bytes)) {
                Ok(()) => {
                    debug!(stable_id = %record.stable_id, url = %doc.url, "Fetched linked document");
                    doc.fetched = true;
                    record.document_refs.push(doc);
                }
                Err(e) => {
                    warn!(stable_id = %record.stable_id, url = %doc.url, error = %e, "Dropping linked document");
                }
            }
        }
    }
}

/// Write through a temporary file so a crash never leaves a truncated file
/// under the final name.
pub(crate) fn write_atomic(dir: &Path, name: &str, bytes: &[u8]) -> MeetDirResult<()> {
    let tmp = dir.join(format!(".{name}.tmp"));
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, dir.join(name))?;
    Ok(())
}

fn write_readme(record: &MeetingRecord, dir: &Path, tz: &Tz) -> MeetDirResult<()> {
    write_atomic(dir, README_FILE, render_readme(record, tz).as_bytes())
}

fn render_readme(record: &MeetingRecord, tz: &Tz) -> String {
    let mut out = format!("# {}\n\n", record.title);

    let start = record.start_time.with_timezone(tz);
    out.push_str(&format!("- **Date:** {} ({})\n", start.format("%Y-%m-%d %H:%M"), tz.name()));
    if let Some(tag) = &record.classification.tag {
        let kind = match record.classification.recurring {
            Some(true) => "recurring",
            _ => "one-off",
        };
        out.push_str(&format!("- **Tag:** {} ({})\n", tag, kind));
    }
    if !record.attendees.is_empty() {
        let attendees: Vec<&str> = record
            .attendees
            .iter()
            .map(|a| a.name.as_deref().unwrap_or(&a.email))
            .collect();
        out.push_str(&format!("- **Attendees:** {}\n", attendees.join(", ")));
    }
    match &record.source_event_ref {
        Some(event) => out.push_str(&format!("- **Calendar event:** {}\n", event)),
        None => out.push_str("- **Calendar event:** none (orphaned document)\n"),
    }
    if record.flags.manual_capture_needed {
        out.push_str("- **Manual capture needed**\n");
    }

    if let Some(description) = record.description.as_deref().filter(|d| !d.trim().is_empty()) {
        out.push_str(&format!("\n## Description\n\n{}\n", description.trim()));
    }

    if !record.document_refs.is_empty() {
        out.push_str("\n## Files\n\n");
        for doc in &record.document_refs {
            out.push_str(&format!("- [{}]({}): {}\n", doc.file_name, doc.file_name, doc.title));
        }
    }

    out
}

impl Store {
    /// Records the materializer should see: every classified record, plus
    /// any synced record that breaks the synced invariants so the run
    /// refuses to start. Directories of synced records are claimed.
    pub fn materialize_queue(&self) -> MaterializeQueue {
        let mut records: Vec<MeetingRecord> = self
            .meetings()
            .filter(|m| {
                m.status == MeetingStatus::Classified
                    || (m.status == MeetingStatus::Synced && m.check_invariants().is_err())
            })
            .cloned()
            .collect();
        records.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.stable_id.cmp(&b.stable_id)));

        let claimed = self
            .meetings()
            .filter(|m| m.status == MeetingStatus::Synced)
            .filter_map(|m| Some((m.materialized_path.clone()?, m.stable_id.clone())))
            .collect();
        MaterializeQueue { records, claimed }
    }

    /// Persist the records a materialization pass changed.
    pub fn commit_materialize(&mut self, report: &MaterializeReport) -> MeetDirResult<usize> {
        for record in &report.records {
            record.check_invariants()?;
        }
        self.append_all(report.records.iter().cloned().map(Record::Meeting))
    }
}
