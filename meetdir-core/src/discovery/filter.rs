//! Which calendar events and attachments discovery keeps.

use std::fmt;

use serde::Serialize;

use crate::discovery::DiscoveryPolicy;
use crate::record::series_signature;
use crate::source::{Attachment, CalendarEvent};
use crate::store::Store;

/// Why an event or document was left out of a discovery pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    TooFewAttendees { count: usize },
    AllDayWithoutDescription,
    IgnoredSeries,
    /// The provider linked the document to an event that was skipped.
    LinkedEventSkipped,
    /// The document belongs to a meeting that is already synced.
    AlreadySynced { stable_id: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::TooFewAttendees { count } => write!(f, "only {} attendee(s)", count),
            SkipReason::AllDayWithoutDescription => write!(f, "all-day event without description"),
            SkipReason::IgnoredSeries => write!(f, "series is ignored"),
            SkipReason::LinkedEventSkipped => write!(f, "linked event was skipped"),
            SkipReason::AlreadySynced { stable_id } => {
                write!(f, "meeting {} is already synced", stable_id)
            }
        }
    }
}

/// `None` when the event should be tracked.
pub fn check_event(event: &CalendarEvent, policy: &DiscoveryPolicy, store: &Store) -> Option<SkipReason> {
    if store.is_ignored(&series_signature(&event.title, &event.attendees)) {
        return Some(SkipReason::IgnoredSeries);
    }

    let has_description = event
        .description
        .as_deref()
        .is_some_and(|d| !d.trim().is_empty());
    if event.all_day && !has_description && !policy.include_all_day_without_description {
        return Some(SkipReason::AllDayWithoutDescription);
    }

    if event.attendees.len() < policy.min_attendees {
        return Some(SkipReason::TooFewAttendees {
            count: event.attendees.len(),
        });
    }

    None
}

pub fn is_excluded_attachment(attachment: &Attachment, policy: &DiscoveryPolicy) -> bool {
    let mime = attachment.mime_type.as_deref().unwrap_or_default();
    policy
        .excluded_mime_prefixes
        .iter()
        .any(|prefix| !prefix.is_empty() && mime.starts_with(prefix.as_str()))
}
