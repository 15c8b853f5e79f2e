//! Recurring-series cache and ignore list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::meeting::Attendee;
use crate::utils::slugify;

/// Normalized key identifying a recurring meeting independent of its date:
/// slugified title plus the sorted, lowercased attendee emails.
pub fn series_signature(title: &str, attendees: &[Attendee]) -> String {
    let mut emails: Vec<String> = attendees.iter().map(|a| a.email.to_lowercase()).collect();
    emails.sort();
    emails.dedup();
    format!("{}|{}", slugify(title), emails.join(","))
}

/// Last-used classification of a recurring series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrencePattern {
    pub signature: String,
    pub title: String,
    pub slug: String,
    pub tag: String,
    pub recurring: bool,
    #[serde(default)]
    pub count: u32,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// A series that discovery should skip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IgnoredSeries {
    pub signature: String,
    pub title: String,
    #[serde(default)]
    pub reason: String,
    pub ignored_at: DateTime<Utc>,
}
