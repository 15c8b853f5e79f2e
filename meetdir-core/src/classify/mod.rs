//! Classification: tag and recurrence decisions for discovered meetings.
//!
//! Explicit decisions always win. Suggestions come, in order, from the
//! record's own pre-populated classification, the recurrence pattern cache
//! and the keyword heuristics in [`suggest`].

pub mod decision;
mod edit;
pub mod suggest;

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{ItemFailure, MeetDirError, MeetDirResult};
use crate::record::{
    Classification, ClassificationSource, IgnoredSeries, MeetingRecord, MeetingStatus, Record,
    RecordKind, RecurrencePattern,
};
use crate::store::Store;
use crate::utils::slugify;

pub use decision::{ParsedDecisions, parse_decisions};
pub use edit::{EditOutcome, MeetingEdit};
pub use suggest::Suggestion;

/// Whether `record` already contributed to its series' pattern count.
fn counted_in_pattern(record: &MeetingRecord) -> bool {
    record.classification.recurring == Some(true)
        && (record.status != MeetingStatus::Discovered
            || record.classification.source == Some(ClassificationSource::Explicit))
}

/// One explicit decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifyUpdate {
    pub stable_id: String,
    pub tag: String,
    pub recurring: bool,
    /// Replaces the generated slug.
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ClassifyReport {
    pub applied: Vec<String>,
    pub failed: Vec<ItemFailure>,
    /// Pending meetings whose suggestion the policy did not accept.
    pub left_pending: Vec<String>,
}

/// Which suggestions `auto_classify` accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoPolicy {
    /// Only cached recurrence patterns.
    #[default]
    Patterns,
    /// Patterns and keyword heuristics.
    Heuristics,
    /// Everything, including the uncategorized fallback.
    All,
}

impl AutoPolicy {
    pub const ALL: [AutoPolicy; 3] = [AutoPolicy::Patterns, AutoPolicy::Heuristics, AutoPolicy::All];

    pub fn as_str(self) -> &'static str {
        match self {
            AutoPolicy::Patterns => "patterns",
            AutoPolicy::Heuristics => "heuristics",
            AutoPolicy::All => "all",
        }
    }

    pub fn accepts(self, source: ClassificationSource) -> bool {
        match source {
            ClassificationSource::Explicit | ClassificationSource::Pattern => true,
            ClassificationSource::Heuristic => self != AutoPolicy::Patterns,
            ClassificationSource::Fallback => self == AutoPolicy::All,
        }
    }
}

impl fmt::Display for AutoPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AutoPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AutoPolicy::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown policy '{}' (expected patterns, heuristics or all)", s))
    }
}

/// A discovered meeting awaiting a decision.
#[derive(Debug, Clone, Serialize)]
pub struct PendingItem {
    /// 1-based position used by the inline decision syntax.
    pub number: usize,
    pub record: MeetingRecord,
    pub suggestion: Suggestion,
}

impl Store {
    /// Current best suggestion for `record`.
    pub fn suggest(&self, record: &MeetingRecord) -> Suggestion {
        let c = &record.classification;
        if let (Some(tag), Some(recurring)) = (c.tag.as_deref(), c.recurring) {
            return Suggestion::new(tag, recurring, c.source.unwrap_or(ClassificationSource::Explicit));
        }

        if let Some(pattern) = self.pattern(&record.series_signature()) {
            return Suggestion::new(&pattern.tag, pattern.recurring, ClassificationSource::Pattern);
        }

        suggest::heuristic(record)
    }

    /// Discovered meetings ordered by start time, numbered from 1.
    pub fn pending(&self) -> Vec<PendingItem> {
        let mut records: Vec<&MeetingRecord> = self
            .meetings()
            .filter(|m| m.status == MeetingStatus::Discovered)
            .collect();
        records.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.stable_id.cmp(&b.stable_id)));

        records
            .into_iter()
            .enumerate()
            .map(|(i, record)| PendingItem {
                number: i + 1,
                suggestion: self.suggest(record),
                record: record.clone(),
            })
            .collect()
    }

    /// Apply explicit decisions. Each update succeeds or fails on its own;
    /// only a write failure aborts the batch.
    pub fn classify(&mut self, updates: &[ClassifyUpdate]) -> MeetDirResult<ClassifyReport> {
        let mut report = ClassifyReport::default();

        for update in updates {
            let classification =
                Classification::new(&update.tag, update.recurring, ClassificationSource::Explicit);

            match self.prepare_classification(&update.stable_id, classification, update.slug.as_deref()) {
                Ok(record) => {
                    self.persist_classification(record)?;
                    report.applied.push(update.stable_id.clone());
                }
                Err(e) => {
                    debug!(stable_id = %update.stable_id, error = %e, "Classification rejected");
                    report.failed.push(ItemFailure::new(&update.stable_id, e));
                }
            }
        }

        info!(
            applied = report.applied.len(),
            failed = report.failed.len(),
            "Applied explicit classifications"
        );
        Ok(report)
    }

    /// Accept the current suggestion of every pending meeting the policy allows.
    pub fn auto_classify(&mut self, policy: AutoPolicy) -> MeetDirResult<ClassifyReport> {
        let mut report = ClassifyReport::default();

        for item in self.pending() {
            let stable_id = item.record.stable_id;
            let suggestion = item.suggestion;

            if !policy.accepts(suggestion.source) {
                report.left_pending.push(stable_id);
                continue;
            }

            let classification =
                Classification::new(&suggestion.tag, suggestion.recurring, suggestion.source);
            match self.prepare_classification(&stable_id, classification, None) {
                Ok(record) => {
                    self.persist_classification(record)?;
                    report.applied.push(stable_id);
                }
                Err(e) => report.failed.push(ItemFailure::new(stable_id, e)),
            }
        }

        info!(
            %policy,
            applied = report.applied.len(),
            failed = report.failed.len(),
            pending = report.left_pending.len(),
            "Auto-classified"
        );
        Ok(report)
    }

    /// Validate a decision against the current record without writing.
    fn prepare_classification(
        &self,
        stable_id: &str,
        classification: Classification,
        slug: Option<&str>,
    ) -> MeetDirResult<MeetingRecord> {
        let mut record = self
            .meeting(stable_id)
            .cloned()
            .ok_or_else(|| MeetDirError::MeetingNotFound(stable_id.to_string()))?;

        if let Some(tag) = classification.tag.as_deref() {
            if !self.has_tag(tag) {
                return Err(MeetDirError::UnknownTag(tag.to_string()));
            }
        }
        if let Some(slug) = slug {
            record.slug = valid_slug(slug)?;
        }

        record.classification = classification;
        record.transition(MeetingStatus::Classified)?;
        Ok(record)
    }

    fn persist_classification(&mut self, record: MeetingRecord) -> MeetDirResult<()> {
        let previous = self.meeting(&record.stable_id).cloned();
        self.remember_pattern(previous.as_ref(), &record)?;
        self.put_meeting(record)?;
        Ok(())
    }

    /// Keep the pattern cache in line with a series' latest classification:
    /// recurring upserts the pattern, one-off drops it.
    /// `previous` is the stored state of the same record; a meeting is
    /// counted once however often it is reclassified.
    pub(crate) fn remember_pattern(
        &mut self,
        previous: Option<&MeetingRecord>,
        record: &MeetingRecord,
    ) -> MeetDirResult<()> {
        let (Some(tag), Some(recurring)) = (
            record.classification.tag.as_deref(),
            record.classification.recurring,
        ) else {
            return Ok(());
        };
        let signature = record.series_signature();

        if !recurring {
            if self.pattern(&signature).is_some() {
                debug!(%signature, "Dropping pattern for one-off classification");
                self.remove(RecordKind::Pattern, &signature)?;
            }
            return Ok(());
        }

        let counted = previous.is_some_and(|p| counted_in_pattern(p) && p.series_signature() == signature);
        let pattern = match self.pattern(&signature) {
            Some(existing) => RecurrencePattern {
                tag: tag.to_string(),
                recurring,
                title: record.title.clone(),
                slug: record.slug.clone(),
                count: if counted { existing.count } else { existing.count + 1 },
                first_seen: existing.first_seen.min(record.start_time),
                last_seen: existing.last_seen.max(record.start_time),
                signature,
            },
            None => RecurrencePattern {
                tag: tag.to_string(),
                recurring,
                title: record.title.clone(),
                slug: record.slug.clone(),
                count: 1,
                first_seen: record.start_time,
                last_seen: record.start_time,
                signature,
            },
        };
        self.append(Record::Pattern(pattern))?;
        Ok(())
    }

    /// Skip this meeting's series in future discovery passes. Existing
    /// records are kept.
    pub fn ignore(&mut self, stable_id: &str, reason: &str) -> MeetDirResult<IgnoredSeries> {
        let record = self
            .meeting(stable_id)
            .ok_or_else(|| MeetDirError::MeetingNotFound(stable_id.to_string()))?;

        let ignored = IgnoredSeries {
            signature: record.series_signature(),
            title: record.title.clone(),
            reason: reason.to_string(),
            ignored_at: Utc::now(),
        };
        self.append(Record::Ignored(ignored.clone()))?;
        info!(signature = %ignored.signature, "Ignoring series");
        Ok(ignored)
    }

    /// Returns false if the signature was not ignored.
    pub fn unignore(&mut self, signature: &str) -> MeetDirResult<bool> {
        if !self.is_ignored(signature) {
            return Ok(false);
        }
        self.remove(RecordKind::Ignored, signature)?;
        Ok(true)
    }
}

pub(crate) fn valid_slug(input: &str) -> MeetDirResult<String> {
    let slug = slugify(input);
    if slug.is_empty() {
        return Err(MeetDirError::InvalidSlug(input.to_string()));
    }
    Ok(slug)
}
