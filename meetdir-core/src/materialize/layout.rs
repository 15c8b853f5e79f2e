//! On-disk layout of materialized meetings.
//!
//! ```text
//! meetings/
//!   team/
//!     team-standup/          # recurring series
//!       2026-03-02/
//!         README.md
//!         metadata.json
//!         transcript.md
//!   customers/
//!     2026-03-04-acme-kickoff/   # one-off
//!     2026-03-04-acme-kickoff-1400/   # second one that day
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use sha2::{Digest, Sha256};

use crate::materialize::Manifest;
use crate::record::MeetingRecord;
use crate::utils::safe_filename;

pub const TRANSCRIPT_FILE: &str = "transcript.md";
pub const SUMMARY_FILE: &str = "summary.md";
pub const README_FILE: &str = "README.md";
pub const MANIFEST_FILE: &str = "metadata.json";

const RESERVED: [&str; 2] = [README_FILE, MANIFEST_FILE];

/// Trailing URL segments that name a view rather than a document.
const VIEW_SEGMENTS: [&str; 4] = ["edit", "view", "preview", "pub"];

/// Directory for `record` relative to the meetings root, or `None` while the
/// classification is incomplete.
pub fn expected_path(record: &MeetingRecord, tz: &Tz) -> Option<PathBuf> {
    let tag = record.classification.tag.as_deref()?;
    let recurring = record.classification.recurring?;
    let date = record.date(tz).format("%Y-%m-%d").to_string();

    let path = if recurring {
        PathBuf::from(tag).join(&record.slug).join(date)
    } else {
        PathBuf::from(tag).join(format!("{}-{}", date, record.slug))
    };
    Some(path)
}

/// Directories `record` may occupy, preferred first: the expected path,
/// then with the local start time appended, then with a short hash of the
/// stable id on top. Empty while the classification is incomplete.
pub fn candidate_paths(record: &MeetingRecord, tz: &Tz) -> Vec<PathBuf> {
    let Some(base) = expected_path(record, tz) else {
        return Vec::new();
    };
    let leaf = base
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let time = record.start_time.with_timezone(tz).format("%H%M").to_string();
    let id_hash = hex::encode(Sha256::digest(record.stable_id.as_bytes()));

    let by_time = base.with_file_name(format!("{leaf}-{time}"));
    let by_id = base.with_file_name(format!("{leaf}-{time}-{}", &id_hash[..8]));
    vec![base, by_time, by_id]
}

/// First candidate directory of `record` that no other meeting owns, either
/// through `claimed` (relative path to stable id) or through a manifest
/// already under `root`. An unreadable manifest counts as owned.
pub fn resolve_target(
    record: &MeetingRecord,
    tz: &Tz,
    root: &Path,
    claimed: &HashMap<PathBuf, String>,
) -> Option<PathBuf> {
    candidate_paths(record, tz).into_iter().find(|candidate| {
        let unclaimed = claimed
            .get(candidate)
            .is_none_or(|owner| owner == &record.stable_id);
        unclaimed
            && match Manifest::read(&root.join(candidate)) {
                Ok(Some(manifest)) => manifest.stable_id == record.stable_id,
                Ok(None) => true,
                Err(_) => false,
            }
    })
}

pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let ext = match mime {
        "application/vnd.google-apps.document" => ".md",
        "application/vnd.google-apps.spreadsheet" => ".md",
        "application/vnd.google-apps.presentation" => ".pdf",
        "text/plain" => ".txt",
        "text/markdown" => ".md",
        "text/html" => ".html",
        "application/pdf" => ".pdf",
        "image/png" => ".png",
        "image/jpeg" => ".jpg",
        "application/json" => ".json",
        _ => return None,
    };
    Some(ext)
}

/// Sanitized title plus an extension inferred from the MIME type.
pub fn attachment_file_name(title: &str, mime_type: Option<&str>) -> String {
    let name = safe_filename(title);
    match mime_type.and_then(extension_for_mime) {
        Some(ext) if !name.to_lowercase().ends_with(ext) => format!("{name}{ext}"),
        _ => name,
    }
}

/// Named after the last meaningful path segment of `url`.
pub fn linked_file_name(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or_default();
    let path = without_query
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(without_query);

    let segments: Vec<&str> = path.split('/').skip(1).filter(|s| !s.is_empty()).collect();
    let segment = segments
        .iter()
        .rev()
        .find(|s| !VIEW_SEGMENTS.contains(s))
        .copied()
        .unwrap_or("linked");

    let name = safe_filename(segment);
    if name.contains('.') { name } else { format!("{name}.md") }
}

/// `base`, or `base` with a numeric suffix when it collides with a taken or
/// reserved name.
pub fn unique_file_name<'a>(taken: impl IntoIterator<Item = &'a str>, base: &str) -> String {
    let taken: Vec<&str> = taken.into_iter().collect();
    let is_free = |name: &str| !taken.contains(&name) && !RESERVED.contains(&name);

    if is_free(base) {
        return base.to_string();
    }

    let (stem, ext) = match base.rfind('.') {
        Some(i) if i > 0 => (&base[..i], &base[i..]),
        _ => (base, ""),
    };
    (2..)
        .map(|n| format!("{stem}-{n}{ext}"))
        .find(|candidate| is_free(candidate))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Classification, ClassificationSource, make_record};
    use chrono::TimeZone;

    #[test]
    fn test_recurring_and_one_off_paths() {
        let mut record = make_record("evt1", "Team Standup");
        assert_eq!(expected_path(&record, &Tz::UTC), None);

        record.classification = Classification::new("team", true, ClassificationSource::Explicit);
        assert_eq!(
            expected_path(&record, &Tz::UTC),
            Some(PathBuf::from("team/team-standup/2026-03-02"))
        );

        record.classification.recurring = Some(false);
        assert_eq!(
            expected_path(&record, &Tz::UTC),
            Some(PathBuf::from("team/2026-03-02-team-standup"))
        );
    }

    #[test]
    fn test_date_uses_configured_timezone() {
        let mut record = make_record("evt1", "Late Call");
        record.start_time = chrono::Utc.with_ymd_and_hms(2026, 3, 2, 23, 30, 0).unwrap();
        record.classification = Classification::new("team", false, ClassificationSource::Explicit);

        assert_eq!(
            expected_path(&record, &chrono_tz::Europe::Stockholm),
            Some(PathBuf::from("team/2026-03-03-late-call"))
        );
    }

    #[test]
    fn test_attachment_names() {
        assert_eq!(
            attachment_file_name("Q1 Plan: draft", Some("application/vnd.google-apps.document")),
            "Q1 Plan- draft.md"
        );
        assert_eq!(attachment_file_name("deck.pdf", Some("application/pdf")), "deck.pdf");
        assert_eq!(attachment_file_name("notes", Some("application/zip")), "notes");
    }

    #[test]
    fn test_linked_names() {
        assert_eq!(
            linked_file_name("https://docs.google.com/document/d/abc123/edit?usp=sharing"),
            "abc123.md"
        );
        assert_eq!(linked_file_name("https://example.com/files/report.pdf"), "report.pdf");
        assert_eq!(linked_file_name("https://example.com/"), "linked.md");
    }

    #[test]
    fn test_linked_names_skip_trailing_view_segments() {
        assert_eq!(
            linked_file_name("https://docs.google.com/presentation/d/deck42/pub/edit#slide=2"),
            "deck42.md"
        );
        assert_eq!(linked_file_name("https://example.com/view/"), "linked.md");
        assert_eq!(linked_file_name("docs.example.com/a//notes.txt/"), "notes.txt");
    }

    fn one_off(id: &str, hour: u32) -> MeetingRecord {
        let mut record = make_record(id, "Interview");
        record.start_time = chrono::Utc.with_ymd_and_hms(2026, 3, 2, hour, 0, 0).unwrap();
        record.classification = Classification::new("team", false, ClassificationSource::Explicit);
        record
    }

    #[test]
    fn test_candidate_paths_fall_back_to_time_then_id() {
        let record = one_off("evtA", 10);
        let candidates = candidate_paths(&record, &Tz::UTC);
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0], PathBuf::from("team/2026-03-02-interview"));
        assert_eq!(candidates[1], PathBuf::from("team/2026-03-02-interview-1000"));
        let last = candidates[2].to_string_lossy().into_owned();
        assert!(last.starts_with("team/2026-03-02-interview-1000-"));
        assert_eq!(last.len(), "team/2026-03-02-interview-1000-".len() + 8);

        assert!(candidate_paths(&make_record("evt2", "Unsorted"), &Tz::UTC).is_empty());
    }

    #[test]
    fn test_resolve_target_skips_directories_owned_by_others() {
        let root = tempfile::tempdir().unwrap();
        let first = one_off("evtA", 10);
        let second = one_off("evtB", 14);

        let mut claimed = HashMap::new();
        let taken = resolve_target(&first, &Tz::UTC, root.path(), &claimed).unwrap();
        assert_eq!(taken, PathBuf::from("team/2026-03-02-interview"));
        claimed.insert(taken.clone(), "evtA".to_string());

        // the owner keeps its own directory
        assert_eq!(resolve_target(&first, &Tz::UTC, root.path(), &claimed), Some(taken));
        assert_eq!(
            resolve_target(&second, &Tz::UTC, root.path(), &claimed),
            Some(PathBuf::from("team/2026-03-02-interview-1400"))
        );

        // a manifest on disk claims the directory even without a log entry
        let dir = root.path().join("team/2026-03-02-interview");
        std::fs::create_dir_all(&dir).unwrap();
        Manifest::build(&first, &dir).unwrap().write(&dir).unwrap();
        assert_eq!(
            resolve_target(&second, &Tz::UTC, root.path(), &HashMap::new()),
            Some(PathBuf::from("team/2026-03-02-interview-1400"))
        );
    }

    #[test]
    fn test_unique_names_avoid_collisions_and_reserved_files() {
        assert_eq!(unique_file_name(["transcript.md"], "transcript.md"), "transcript-2.md");
        assert_eq!(
            unique_file_name(["transcript.md", "transcript-2.md"], "transcript.md"),
            "transcript-3.md"
        );
        assert_eq!(unique_file_name([], "README.md"), "README-2.md");
        assert_eq!(unique_file_name([], "notes"), "notes");
    }
}
