//! Consistency checks between the record log and the meetings directory.
//!
//! The directory tree is a view of the log. [`Doctor::check`] compares the
//! two without touching either; [`Doctor::fix`] repairs what can be repaired
//! automatically (moving directories whose record now expects another
//! path) and leaves everything else for a human.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{ItemFailure, MeetDirError, MeetDirResult};
use crate::materialize::layout::{MANIFEST_FILE, candidate_paths, resolve_target};
use crate::materialize::{FileProblem, Manifest};
use crate::record::{MeetingRecord, MeetingStatus};
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discrepancy {
    /// A synced record's directory is not where its classification says.
    PathMismatch {
        stable_id: String,
        recorded: PathBuf,
        expected: PathBuf,
    },
    /// A directory no record claims.
    OrphanDirectory { path: PathBuf },
    /// A synced record's directory is gone.
    MissingDirectory { stable_id: String, path: PathBuf },
    /// Files changed or removed outside the materializer.
    ManifestMismatch {
        stable_id: String,
        path: PathBuf,
        problems: Vec<FileProblem>,
    },
    /// Several synced records point at one directory.
    SharedDirectory { path: PathBuf, stable_ids: Vec<String> },
    /// The directory's manifest was written for another meeting.
    ForeignManifest {
        stable_id: String,
        path: PathBuf,
        owner: String,
    },
}

impl Discrepancy {
    pub fn is_fixable(&self) -> bool {
        matches!(self, Discrepancy::PathMismatch { .. })
    }
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discrepancy::PathMismatch {
                stable_id,
                recorded,
                expected,
            } => write!(
                f,
                "{}: {} should be {}",
                stable_id,
                recorded.display(),
                expected.display()
            ),
            Discrepancy::OrphanDirectory { path } => {
                write!(f, "{}: not claimed by any meeting", path.display())
            }
            Discrepancy::MissingDirectory { stable_id, path } => {
                write!(f, "{}: {} is missing", stable_id, path.display())
            }
            Discrepancy::ManifestMismatch {
                stable_id,
                path,
                problems,
            } => {
                let names: Vec<String> = problems
                    .iter()
                    .map(|p| match p {
                        FileProblem::Missing { name } => format!("{name} missing"),
                        FileProblem::Modified { name } => format!("{name} modified"),
                    })
                    .collect();
                write!(f, "{}: {} ({})", stable_id, path.display(), names.join(", "))
            }
            Discrepancy::SharedDirectory { path, stable_ids } => {
                write!(f, "{}: shared by {}", path.display(), stable_ids.join(", "))
            }
            Discrepancy::ForeignManifest {
                stable_id,
                path,
                owner,
            } => write!(f, "{}: {} holds files of {}", stable_id, path.display(), owner),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FixReport {
    pub applied: Vec<Discrepancy>,
    pub failed: Vec<ItemFailure>,
    /// Report-only discrepancies left for manual disposition.
    pub manual: Vec<Discrepancy>,
}

pub struct Doctor<'a> {
    root: &'a Path,
    tz: &'a Tz,
}

impl<'a> Doctor<'a> {
    pub fn new(root: &'a Path, tz: &'a Tz) -> Self {
        Doctor { root, tz }
    }

    pub fn check(&self, store: &Store) -> MeetDirResult<Vec<Discrepancy>> {
        let mut records: Vec<&MeetingRecord> = store.meetings().collect();
        records.sort_by(|a, b| a.stable_id.cmp(&b.stable_id));

        let mut owners: BTreeMap<&Path, Vec<&str>> = BTreeMap::new();
        for record in &records {
            if record.status == MeetingStatus::Synced
                && let Some(path) = &record.materialized_path
            {
                owners.entry(path.as_path()).or_default().push(&record.stable_id);
            }
        }

        let mut report = Vec::new();
        for record in &records {
            if record.status != MeetingStatus::Synced {
                continue;
            }
            let Some(recorded) = &record.materialized_path else {
                continue;
            };

            let dir = self.root.join(recorded);
            if !dir.is_dir() {
                report.push(Discrepancy::MissingDirectory {
                    stable_id: record.stable_id.clone(),
                    path: recorded.clone(),
                });
                continue;
            }

            let candidates = candidate_paths(record, self.tz);
            if !candidates.is_empty() && !candidates.contains(recorded) {
                let others = claims_of_others(&owners, &record.stable_id);
                let expected = resolve_target(record, self.tz, self.root, &others)
                    .unwrap_or_else(|| candidates[0].clone());
                report.push(Discrepancy::PathMismatch {
                    stable_id: record.stable_id.clone(),
                    recorded: recorded.clone(),
                    expected,
                });
            }

            let problems = match Manifest::read(&dir) {
                Ok(Some(manifest)) if manifest.stable_id != record.stable_id => {
                    report.push(Discrepancy::ForeignManifest {
                        stable_id: record.stable_id.clone(),
                        path: recorded.clone(),
                        owner: manifest.stable_id,
                    });
                    continue;
                }
                Ok(Some(manifest)) => manifest.verify(&dir),
                Ok(None) => vec![FileProblem::Missing {
                    name: MANIFEST_FILE.to_string(),
                }],
                Err(e) => {
                    debug!(stable_id = %record.stable_id, error = %e, "Unreadable manifest");
                    vec![FileProblem::Modified {
                        name: MANIFEST_FILE.to_string(),
                    }]
                }
            };
            if !problems.is_empty() {
                report.push(Discrepancy::ManifestMismatch {
                    stable_id: record.stable_id.clone(),
                    path: recorded.clone(),
                    problems,
                });
            }
        }

        report.extend(
            owners
                .into_iter()
                .filter(|(_, ids)| ids.len() > 1)
                .map(|(path, ids)| Discrepancy::SharedDirectory {
                    path: path.to_path_buf(),
                    stable_ids: ids.into_iter().map(str::to_string).collect(),
                }),
        );

        let claimed = self.claimed(&records);
        let mut orphans = Vec::new();
        self.scan(Path::new(""), &claimed, store.data_dir(), &mut orphans)?;
        orphans.sort();
        report.extend(
            orphans
                .into_iter()
                .map(|path| Discrepancy::OrphanDirectory { path }),
        );

        Ok(report)
    }

    /// Apply the fixable entries of `report`. Each entry is re-validated
    /// against the store first, so a stale report cannot move the wrong
    /// directory.
    pub fn fix(&self, store: &mut Store, report: &[Discrepancy]) -> MeetDirResult<FixReport> {
        let mut outcome = FixReport::default();

        for discrepancy in report {
            let Discrepancy::PathMismatch {
                stable_id,
                recorded,
                expected,
            } = discrepancy
            else {
                outcome.manual.push(discrepancy.clone());
                continue;
            };

            match self.relocate(store, stable_id, recorded, expected) {
                Ok(()) => outcome.applied.push(discrepancy.clone()),
                Err(e) => {
                    warn!(stable_id, error = %e, "Could not fix path mismatch");
                    outcome.failed.push(ItemFailure::new(stable_id, e));
                }
            }
        }

        info!(
            applied = outcome.applied.len(),
            failed = outcome.failed.len(),
            manual = outcome.manual.len(),
            "Doctor fix finished"
        );
        Ok(outcome)
    }

    fn relocate(
        &self,
        store: &mut Store,
        stable_id: &str,
        recorded: &Path,
        expected: &Path,
    ) -> MeetDirResult<()> {
        let mut record = store
            .meeting(stable_id)
            .cloned()
            .ok_or_else(|| MeetDirError::MeetingNotFound(stable_id.to_string()))?;

        if record.materialized_path.as_deref() != Some(recorded)
            || !candidate_paths(&record, self.tz).iter().any(|c| c == expected)
        {
            return Err(MeetDirError::Invariant(format!(
                "{} changed since the check; run doctor again",
                stable_id
            )));
        }

        let taken_by = store
            .meetings()
            .find(|m| m.stable_id != stable_id && m.materialized_path.as_deref() == Some(expected))
            .map(|m| m.stable_id.clone());
        let to = self.root.join(expected);
        let manifest_owner = Manifest::read(&to)?
            .map(|m| m.stable_id)
            .filter(|owner| owner != stable_id);
        if let Some(owner) = taken_by.or(manifest_owner) {
            return Err(MeetDirError::Invariant(format!(
                "{} belongs to {}",
                expected.display(),
                owner
            )));
        }

        let from = self.root.join(recorded);
        move_dir(&from, &to)?;
        prune_empty_parents(self.root, &from);

        record.materialized_path = Some(expected.to_path_buf());
        record.check_invariants()?;
        store.put_meeting(record.clone())?;

        Manifest::build(&record, &to)?.write(&to)?;
        info!(stable_id, from = %recorded.display(), to = %expected.display(), "Moved meeting directory");
        Ok(())
    }

    /// Relative paths claimed by records: recorded paths of any record and
    /// every candidate path of classified records about to be materialized.
    fn claimed(&self, records: &[&MeetingRecord]) -> HashSet<PathBuf> {
        records
            .iter()
            .flat_map(|record| {
                let in_flight = match record.status {
                    MeetingStatus::Classified => candidate_paths(record, self.tz),
                    _ => Vec::new(),
                };
                record.materialized_path.clone().into_iter().chain(in_flight)
            })
            .collect()
    }

    fn scan(
        &self,
        relative: &Path,
        claimed: &HashSet<PathBuf>,
        data_dir: &Path,
        orphans: &mut Vec<PathBuf>,
    ) -> MeetDirResult<()> {
        let dir = self.root.join(relative);
        let Ok(entries) = fs::read_dir(&dir) else {
            return Ok(());
        };

        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            if name.to_string_lossy().starts_with('.') || entry.path() == data_dir {
                continue;
            }

            let path = relative.join(&name);
            if claimed.contains(&path) {
                continue;
            }
            if claimed.iter().any(|c| c.starts_with(&path)) {
                self.scan(&path, claimed, data_dir, orphans)?;
            } else {
                orphans.push(path);
            }
        }
        Ok(())
    }
}

/// Synced directories keyed by path, minus those owned by `stable_id`.
fn claims_of_others(owners: &BTreeMap<&Path, Vec<&str>>, stable_id: &str) -> HashMap<PathBuf, String> {
    owners
        .iter()
        .filter_map(|(path, ids)| {
            let other = ids.iter().find(|id| **id != stable_id)?;
            Some((path.to_path_buf(), other.to_string()))
        })
        .collect()
}

/// Rename `from` to `to`, or merge entry by entry when `to` exists. Refuses
/// before moving anything if an entry would be overwritten.
fn move_dir(from: &Path, to: &Path) -> MeetDirResult<()> {
    if !to.exists() {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(from, to)?;
        return Ok(());
    }

    let entries = fs::read_dir(from)?.collect::<Result<Vec<_>, _>>()?;
    let conflicts: Vec<String> = entries
        .iter()
        .filter(|e| e.file_name() != MANIFEST_FILE && to.join(e.file_name()).exists())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    if !conflicts.is_empty() {
        return Err(MeetDirError::Invariant(format!(
            "{} already contains {}",
            to.display(),
            conflicts.join(", ")
        )));
    }

    for entry in entries {
        let name = entry.file_name();
        if name == MANIFEST_FILE {
            fs::remove_file(entry.path())?;
            continue;
        }
        fs::rename(entry.path(), to.join(name))?;
    }
    fs::remove_dir(from)?;
    Ok(())
}

/// Remove `dir`'s now-empty ancestors below `root`.
fn prune_empty_parents(root: &Path, dir: &Path) {
    let mut current = dir.parent();
    while let Some(parent) = current {
        if parent == root || !parent.starts_with(root) {
            break;
        }
        if fs::remove_dir(parent).is_err() {
            break;
        }
        debug!(path = %parent.display(), "Pruned empty directory");
        current = parent.parent();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::MeetingEdit;
    use crate::materialize::layout::expected_path;
    use crate::record::{
        Classification, ClassificationSource, DocumentKind, DocumentRef, make_record,
    };

    struct Fixture {
        root: tempfile::TempDir,
        store: Store,
    }

    fn fixture() -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let mut store = Store::open(&root.path().join(".meetdir")).unwrap();
        store.ensure_default_tags().unwrap();
        Fixture { root, store }
    }

    /// Write a synced record and its directory the way the materializer would.
    fn synced(fx: &mut Fixture, id: &str, title: &str, tag: &str) -> PathBuf {
        let mut record = make_record(id, title);
        record.classification = Classification::new(tag, true, ClassificationSource::Explicit);
        record.document_refs.push(DocumentRef {
            id: format!("{id}-t"),
            kind: DocumentKind::Transcript,
            title: "Transcript".into(),
            url: format!("https://docs.example.com/{id}"),
            mime_type: None,
            file_name: "transcript.md".into(),
            fetched: true,
        });

        let path = expected_path(&record, &Tz::UTC).unwrap();
        let dir = fx.root.path().join(&path);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("transcript.md"), format!("# {title}")).unwrap();
        Manifest::build(&record, &dir).unwrap().write(&dir).unwrap();

        record.status = MeetingStatus::Synced;
        record.materialized_path = Some(path.clone());
        fx.store.put_meeting(record).unwrap();
        path
    }

    #[test]
    fn test_consistent_tree_has_no_discrepancies() {
        let mut fx = fixture();
        synced(&mut fx, "evt1", "Team Standup", "team");

        let doctor = Doctor::new(fx.root.path(), &Tz::UTC);
        assert_eq!(doctor.check(&fx.store).unwrap(), vec![]);
    }

    #[test]
    fn test_edit_then_fix_round_trip() {
        let mut fx = fixture();
        let old = synced(&mut fx, "evt1", "Team Standup", "team");

        let edit = MeetingEdit {
            tag: Some("planning".into()),
            ..MeetingEdit::default()
        };
        fx.store.edit("evt1", &edit, &Tz::UTC).unwrap();

        let doctor = Doctor::new(fx.root.path(), &Tz::UTC);
        let report = doctor.check(&fx.store).unwrap();
        let new = PathBuf::from("planning/team-standup/2026-03-02");
        assert_eq!(
            report,
            vec![Discrepancy::PathMismatch {
                stable_id: "evt1".into(),
                recorded: old.clone(),
                expected: new.clone(),
            }]
        );

        let fixed = doctor.fix(&mut fx.store, &report).unwrap();
        assert_eq!(fixed.applied.len(), 1);
        assert!(fixed.failed.is_empty());

        assert_eq!(doctor.check(&fx.store).unwrap(), vec![]);
        assert_eq!(fx.store.meeting("evt1").unwrap().materialized_path, Some(new.clone()));
        assert!(fx.root.path().join(&new).join("transcript.md").exists());
        assert!(!fx.root.path().join("team").exists());
    }

    #[test]
    fn test_orphan_directory_is_reported_but_never_removed() {
        let mut fx = fixture();
        synced(&mut fx, "evt1", "Team Standup", "team");
        let stray = fx.root.path().join("team/old-notes");
        fs::create_dir_all(&stray).unwrap();

        let doctor = Doctor::new(fx.root.path(), &Tz::UTC);
        let report = doctor.check(&fx.store).unwrap();
        assert_eq!(
            report,
            vec![Discrepancy::OrphanDirectory {
                path: PathBuf::from("team/old-notes")
            }]
        );

        let fixed = doctor.fix(&mut fx.store, &report).unwrap();
        assert!(fixed.applied.is_empty());
        assert_eq!(fixed.manual, report);
        assert!(stray.exists());
    }

    #[test]
    fn test_classified_expected_path_is_claimed() {
        let mut fx = fixture();
        let mut record = make_record("evt2", "Sprint Planning");
        record.classification = Classification::new("planning", false, ClassificationSource::Explicit);
        record.status = MeetingStatus::Classified;
        let path = expected_path(&record, &Tz::UTC).unwrap();
        fx.store.put_meeting(record).unwrap();
        fs::create_dir_all(fx.root.path().join(path)).unwrap();

        let doctor = Doctor::new(fx.root.path(), &Tz::UTC);
        assert_eq!(doctor.check(&fx.store).unwrap(), vec![]);
    }

    #[test]
    fn test_missing_directory_and_modified_file() {
        let mut fx = fixture();
        let gone = synced(&mut fx, "evt1", "Team Standup", "team");
        let edited = synced(&mut fx, "evt2", "Acme Review", "planning");

        fs::remove_dir_all(fx.root.path().join(&gone)).unwrap();
        fs::write(fx.root.path().join(&edited).join("transcript.md"), "changed").unwrap();

        let doctor = Doctor::new(fx.root.path(), &Tz::UTC);
        let report = doctor.check(&fx.store).unwrap();
        assert_eq!(
            report,
            vec![
                Discrepancy::MissingDirectory {
                    stable_id: "evt1".into(),
                    path: gone,
                },
                Discrepancy::ManifestMismatch {
                    stable_id: "evt2".into(),
                    path: edited,
                    problems: vec![FileProblem::Modified {
                        name: "transcript.md".into()
                    }],
                },
            ]
        );
        assert!(report.iter().all(|d| !d.is_fixable()));
    }

    #[test]
    fn test_fix_merges_into_existing_directory_without_overwriting() {
        let mut fx = fixture();
        let old = synced(&mut fx, "evt1", "Team Standup", "team");
        let target = fx.root.path().join("planning/team-standup/2026-03-02");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("transcript.md"), "someone else's").unwrap();

        fx.store
            .edit(
                "evt1",
                &MeetingEdit {
                    tag: Some("planning".into()),
                    ..MeetingEdit::default()
                },
                &Tz::UTC,
            )
            .unwrap();

        let doctor = Doctor::new(fx.root.path(), &Tz::UTC);
        let report = doctor.check(&fx.store).unwrap();
        let fixed = doctor.fix(&mut fx.store, &report).unwrap();

        assert!(fixed.applied.is_empty());
        assert_eq!(fixed.failed.len(), 1);
        assert!(fx.root.path().join(&old).join("transcript.md").exists());
        assert_eq!(fs::read_to_string(target.join("transcript.md")).unwrap(), "someone else's");
        assert_eq!(fx.store.meeting("evt1").unwrap().materialized_path, Some(old));
    }

    #[test]
    fn test_shared_directory_and_foreign_manifest_are_reported() {
        let mut fx = fixture();
        let path = synced(&mut fx, "evt1", "Interview", "team");

        // a later meeting that overwrote the same directory
        let mut later = fx.store.meeting("evt1").unwrap().clone();
        later.stable_id = "evt2".into();
        later.start_time = later.start_time + chrono::Duration::hours(4);
        let dir = fx.root.path().join(&path);
        Manifest::build(&later, &dir).unwrap().write(&dir).unwrap();
        fx.store.put_meeting(later).unwrap();

        let doctor = Doctor::new(fx.root.path(), &Tz::UTC);
        let report = doctor.check(&fx.store).unwrap();
        assert_eq!(
            report,
            vec![
                Discrepancy::ForeignManifest {
                    stable_id: "evt1".into(),
                    path: path.clone(),
                    owner: "evt2".into(),
                },
                Discrepancy::SharedDirectory {
                    path,
                    stable_ids: vec!["evt1".into(), "evt2".into()],
                },
            ]
        );
        assert!(report.iter().all(|d| !d.is_fixable()));
    }

    #[test]
    fn test_suffixed_directory_is_consistent() {
        let mut fx = fixture();
        synced(&mut fx, "evt1", "Interview", "team");

        let mut record = make_record("evt2", "Interview");
        record.start_time = record.start_time + chrono::Duration::hours(4);
        record.classification = Classification::new("team", true, ClassificationSource::Explicit);
        let path = candidate_paths(&record, &Tz::UTC)[1].clone();
        let dir = fx.root.path().join(&path);
        fs::create_dir_all(&dir).unwrap();
        Manifest::build(&record, &dir).unwrap().write(&dir).unwrap();
        record.status = MeetingStatus::Synced;
        record.materialized_path = Some(path);
        fx.store.put_meeting(record).unwrap();

        let doctor = Doctor::new(fx.root.path(), &Tz::UTC);
        assert_eq!(doctor.check(&fx.store).unwrap(), vec![]);
    }

    #[test]
    fn test_fix_never_moves_into_another_meetings_directory() {
        let mut fx = fixture();
        let taken = synced(&mut fx, "evt1", "Team Standup", "planning");
        let stale = vec![Discrepancy::PathMismatch {
            stable_id: "evt2".into(),
            recorded: PathBuf::from("team/team-standup/2026-03-02"),
            expected: taken.clone(),
        }];

        let mut record = make_record("evt2", "Team Standup");
        record.classification = Classification::new("planning", true, ClassificationSource::Explicit);
        record.status = MeetingStatus::Synced;
        record.materialized_path = Some(PathBuf::from("team/team-standup/2026-03-02"));
        fs::create_dir_all(fx.root.path().join("team/team-standup/2026-03-02")).unwrap();
        fx.store.put_meeting(record).unwrap();

        let doctor = Doctor::new(fx.root.path(), &Tz::UTC);
        let fixed = doctor.fix(&mut fx.store, &stale).unwrap();
        assert!(fixed.applied.is_empty());
        assert!(fixed.failed[0].reason.contains("belongs to evt1"));
        assert_eq!(
            fx.store.meeting("evt2").unwrap().materialized_path,
            Some(PathBuf::from("team/team-standup/2026-03-02"))
        );
    }

    #[test]
    fn test_stale_report_is_not_applied() {
        let mut fx = fixture();
        let old = synced(&mut fx, "evt1", "Team Standup", "team");
        let stale = vec![Discrepancy::PathMismatch {
            stable_id: "evt1".into(),
            recorded: old.clone(),
            expected: PathBuf::from("planning/team-standup/2026-03-02"),
        }];

        let doctor = Doctor::new(fx.root.path(), &Tz::UTC);
        let fixed = doctor.fix(&mut fx.store, &stale).unwrap();
        assert_eq!(fixed.failed.len(), 1);
        assert!(fx.root.path().join(old).exists());
    }
}
