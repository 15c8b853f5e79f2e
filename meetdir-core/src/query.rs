//! Read-only queries over meeting records for downstream tools.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::date_range::DateRange;
use crate::record::{Checkpoints, MeetingRecord, MeetingStatus};
use crate::store::Store;

/// Filters combine with AND; `None` matches everything.
#[derive(Debug, Clone, Default)]
pub struct MeetingQuery {
    pub tag: Option<String>,
    pub recurring: Option<bool>,
    pub status: Option<MeetingStatus>,
    pub orphaned: Option<bool>,
    pub one_on_one: Option<bool>,
    pub range: Option<DateRange>,
}

impl MeetingQuery {
    pub fn matches(&self, record: &MeetingRecord) -> bool {
        if let Some(tag) = &self.tag {
            if record.classification.tag.as_ref() != Some(tag) {
                return false;
            }
        }
        if self.recurring.is_some() && record.classification.recurring != self.recurring {
            return false;
        }
        if self.status.is_some_and(|s| s != record.status) {
            return false;
        }
        if self.orphaned.is_some_and(|o| o != record.flags.orphaned) {
            return false;
        }
        if self.one_on_one.is_some_and(|o| o != record.flags.one_on_one) {
            return false;
        }
        if let Some(range) = &self.range {
            if !range.contains(record.start_time) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub meetings: usize,
    pub by_status: BTreeMap<MeetingStatus, usize>,
    pub orphaned: usize,
    /// Discovered records waiting for a classification decision.
    pub pending: usize,
    pub patterns: usize,
    pub ignored: usize,
    pub tags: usize,
    pub checkpoints: Checkpoints,
}

impl Store {
    /// Matching records ordered by start time.
    pub fn query(&self, query: &MeetingQuery) -> Vec<&MeetingRecord> {
        let mut records: Vec<_> = self.meetings().filter(|m| query.matches(m)).collect();
        records.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.stable_id.cmp(&b.stable_id)));
        records
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            by_status: MeetingStatus::ALL.iter().map(|s| (*s, 0)).collect(),
            patterns: self.patterns().count(),
            ignored: self.ignored().count(),
            tags: self.tags().count(),
            checkpoints: self.checkpoints(),
            ..Summary::default()
        };

        for meeting in self.meetings() {
            summary.meetings += 1;
            *summary.by_status.entry(meeting.status).or_default() += 1;
            if meeting.flags.orphaned {
                summary.orphaned += 1;
            }
        }
        summary.pending = summary.by_status[&MeetingStatus::Discovered];
        summary
    }
}
