//! Document correlation: match transcript documents to meetings.
//!
//! Uses a multi-signal score combining title similarity, time proximity
//! and attendee overlap. Candidates further away than the policy window
//! are never considered.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use crate::record::MeetingRecord;
use crate::source::TranscriptDocument;
use crate::utils::normalize_title;

/// Maximum attendee overlap score.
const MAX_ATTENDEE_SCORE: u32 = 60;

/// Score per shared attendee email.
const ATTENDEE_MATCH_SCORE: u32 = 20;

/// Tunable scoring policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchPolicy {
    /// Minimum score for an automatic association.
    pub threshold: u32,
    /// Largest distance between a document timestamp and a meeting.
    pub window: Duration,
}

impl MatchPolicy {
    pub const DEFAULT_THRESHOLD: u32 = 100;
}

impl Default for MatchPolicy {
    fn default() -> Self {
        MatchPolicy {
            threshold: Self::DEFAULT_THRESHOLD,
            window: Duration::hours(2),
        }
    }
}

/// A meeting a document may belong to.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub stable_id: &'a str,
    pub title: &'a str,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub emails: Vec<String>,
}

impl<'a> From<&'a MeetingRecord> for Candidate<'a> {
    fn from(record: &'a MeetingRecord) -> Self {
        Candidate {
            stable_id: &record.stable_id,
            title: &record.title,
            start: record.start_time,
            end: record.end_time,
            emails: record.attendee_emails(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub stable_id: String,
    pub score: u32,
    pub distance: Duration,
}

/// Best candidate scoring at or above the threshold. Ties go to the closest
/// meeting, then to the smallest id.
pub fn best_match<'a>(
    policy: &MatchPolicy,
    doc: &TranscriptDocument,
    candidates: impl IntoIterator<Item = Candidate<'a>>,
) -> Option<MatchResult> {
    let doc_emails: Vec<String> = doc.attendees.iter().map(|a| a.email.to_lowercase()).collect();
    let mut best: Option<MatchResult> = None;

    for candidate in candidates {
        let distance = distance(doc.timestamp, candidate.start, candidate.end);
        if distance > policy.window {
            continue;
        }

        let score = title_score(&doc.title, candidate.title)
            + time_proximity_score(distance)
            + attendee_overlap_score(&doc_emails, &candidate.emails);

        if score < policy.threshold {
            continue;
        }

        let better = match &best {
            None => true,
            Some(b) => {
                (score, std::cmp::Reverse(distance), std::cmp::Reverse(candidate.stable_id))
                    > (b.score, std::cmp::Reverse(b.distance), std::cmp::Reverse(b.stable_id.as_str()))
            }
        };
        if better {
            best = Some(MatchResult {
                stable_id: candidate.stable_id.to_string(),
                score,
                distance,
            });
        }
    }

    best
}

/// Distance from `at` to the meeting interval; zero inside it.
fn distance(at: DateTime<Utc>, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Duration {
    let end = end.filter(|e| *e >= start).unwrap_or(start);
    if at < start {
        start - at
    } else if at > end {
        at - end
    } else {
        Duration::zero()
    }
}

/// Score title similarity between two meeting titles.
fn title_score(a: &str, b: &str) -> u32 {
    let a = normalize_title(a);
    let b = normalize_title(b);

    if a.is_empty() || b.is_empty() {
        return 0;
    }
    if a == b {
        return 100;
    }
    if a.contains(&b) || b.contains(&a) {
        return 70;
    }
    if title_token_overlap(&a, &b) > 0.5 {
        return 50;
    }
    0
}

/// Jaccard similarity on word tokens.
fn title_token_overlap(a: &str, b: &str) -> f64 {
    let tokens_a: HashSet<&str> = a.split_whitespace().collect();
    let tokens_b: HashSet<&str> = b.split_whitespace().collect();

    let union = tokens_a.union(&tokens_b).count();
    if union == 0 {
        return 0.0;
    }

    let intersection = tokens_a.intersection(&tokens_b).count();
    intersection as f64 / union as f64
}

fn time_proximity_score(distance: Duration) -> u32 {
    let minutes = distance.num_minutes();

    if minutes <= 5 {
        80
    } else if minutes <= 15 {
        60
    } else if minutes <= 30 {
        30
    } else {
        10
    }
}

fn attendee_overlap_score(a: &[String], b: &[String]) -> u32 {
    let set_a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let set_b: HashSet<&str> = b.iter().map(String::as_str).collect();

    let matches = set_a.intersection(&set_b).count() as u32;
    (matches * ATTENDEE_MATCH_SCORE).min(MAX_ATTENDEE_SCORE)
}
