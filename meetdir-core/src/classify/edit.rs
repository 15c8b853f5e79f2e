//! Manual edits at any status.

use std::path::PathBuf;

use chrono_tz::Tz;
use serde::Serialize;
use tracing::info;

use crate::classify::valid_slug;
use crate::error::{MeetDirError, MeetDirResult};
use crate::materialize::layout::{candidate_paths, expected_path};
use crate::record::{ClassificationSource, MeetingRecord};
use crate::store::Store;

/// Fields to change; `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeetingEdit {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub tag: Option<String>,
    pub recurring: Option<bool>,
    pub one_on_one: Option<bool>,
    pub manual_capture_needed: Option<bool>,
}

impl MeetingEdit {
    pub fn is_empty(&self) -> bool {
        *self == MeetingEdit::default()
    }

    fn touches_classification(&self) -> bool {
        self.tag.is_some() || self.recurring.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EditOutcome {
    pub record: MeetingRecord,
    pub expected_path: Option<PathBuf>,
    /// The record has been materialized somewhere other than where it now
    /// belongs; `doctor --fix` moves it.
    pub needs_reconcile: bool,
}

impl Store {
    /// Apply `edit` without touching status or `materialized_path`.
    pub fn edit(&mut self, stable_id: &str, edit: &MeetingEdit, tz: &Tz) -> MeetDirResult<EditOutcome> {
        let previous = self
            .meeting(stable_id)
            .cloned()
            .ok_or_else(|| MeetDirError::MeetingNotFound(stable_id.to_string()))?;
        let mut record = previous.clone();

        if let Some(tag) = &edit.tag {
            if !self.has_tag(tag) {
                return Err(MeetDirError::UnknownTag(tag.clone()));
            }
            record.classification.tag = Some(tag.clone());
        }
        if let Some(recurring) = edit.recurring {
            record.classification.recurring = Some(recurring);
        }
        if edit.touches_classification() {
            record.classification.source = Some(ClassificationSource::Explicit);
        }
        if let Some(title) = &edit.title {
            record.title = title.clone();
        }
        if let Some(slug) = &edit.slug {
            record.slug = valid_slug(slug)?;
        }
        if let Some(one_on_one) = edit.one_on_one {
            record.flags.one_on_one = one_on_one;
        }
        if let Some(manual) = edit.manual_capture_needed {
            record.flags.manual_capture_needed = manual;
        }

        if edit.touches_classification() {
            self.remember_pattern(Some(&previous), &record)?;
        }
        self.put_meeting(record.clone())?;

        let expected = expected_path(&record, tz);
        let needs_reconcile = match &record.materialized_path {
            Some(actual) => !candidate_paths(&record, tz).contains(actual),
            None => false,
        };
        info!(stable_id, needs_reconcile, "Edited meeting");

        Ok(EditOutcome {
            record,
            expected_path: expected,
            needs_reconcile,
        })
    }
}
