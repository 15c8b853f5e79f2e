//! `metadata.json`: what the materializer wrote into a meeting directory.
//!
//! The checksums let the consistency checker notice files edited or removed
//! behind the materializer's back.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{MeetDirError, MeetDirResult};
use crate::materialize::layout::MANIFEST_FILE;
use crate::materialize::write_atomic;
use crate::record::{DocumentKind, MeetingRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFile {
    pub name: String,
    pub kind: DocumentKind,
    pub source_id: String,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub stable_id: String,
    pub title: String,
    pub slug: String,
    pub tag: Option<String>,
    pub recurring: Option<bool>,
    pub start_time: DateTime<Utc>,
    pub source_event_ref: Option<String>,
    pub orphaned: bool,
    pub files: Vec<ManifestFile>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "problem", rename_all = "snake_case")]
pub enum FileProblem {
    Missing { name: String },
    Modified { name: String },
}

impl Manifest {
    /// Checksum every fetched document file of `record` inside `dir`.
    pub fn build(record: &MeetingRecord, dir: &Path) -> MeetDirResult<Self> {
        let files = record
            .document_refs
            .iter()
            .filter(|doc| doc.fetched)
            .map(|doc| {
                Ok(ManifestFile {
                    name: doc.file_name.clone(),
                    kind: doc.kind,
                    source_id: doc.id.clone(),
                    sha256: sha256_file(&dir.join(&doc.file_name))?,
                })
            })
            .collect::<MeetDirResult<Vec<_>>>()?;

        Ok(Manifest {
            stable_id: record.stable_id.clone(),
            title: record.title.clone(),
            slug: record.slug.clone(),
            tag: record.classification.tag.clone(),
            recurring: record.classification.recurring,
            start_time: record.start_time,
            source_event_ref: record.source_event_ref.clone(),
            orphaned: record.flags.orphaned,
            files,
            generated_at: Utc::now(),
        })
    }

    pub fn write(&self, dir: &Path) -> MeetDirResult<()> {
        let json = serde_json::to_string_pretty(self)? + "\n";
        write_atomic(dir, MANIFEST_FILE, json.as_bytes())
    }

    /// `None` when the directory has no manifest.
    pub fn read(dir: &Path) -> MeetDirResult<Option<Self>> {
        let path = dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let manifest = serde_json::from_str(&content).map_err(|e| {
            MeetDirError::Serialization(format!("{}: {}", path.display(), e))
        })?;
        Ok(Some(manifest))
    }

    pub fn verify(&self, dir: &Path) -> Vec<FileProblem> {
        self.files
            .iter()
            .filter_map(|file| match sha256_file(&dir.join(&file.name)) {
                Err(_) => Some(FileProblem::Missing {
                    name: file.name.clone(),
                }),
                Ok(sum) if sum != file.sha256 => Some(FileProblem::Modified {
                    name: file.name.clone(),
                }),
                Ok(_) => None,
            })
            .collect()
    }
}

pub fn sha256_file(path: &Path) -> MeetDirResult<String> {
    let bytes = fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{DocumentRef, make_record};

    fn record_with_transcript() -> MeetingRecord {
        let mut record = make_record("evt1", "Team Standup");
        record.document_refs.push(DocumentRef {
            id: "doc1".into(),
            kind: DocumentKind::Transcript,
            title: "Transcript".into(),
            url: "https://docs.example.com/doc1".into(),
            mime_type: Some("text/markdown".into()),
            file_name: "transcript.md".into(),
            fetched: true,
        });
        record
    }

    #[test]
    fn test_checksum_of_known_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "hello").unwrap();

        assert_eq!(
            sha256_file(&path).unwrap(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_verify_detects_missing_and_modified_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("transcript.md"), "# Standup").unwrap();

        let record = record_with_transcript();
        let manifest = Manifest::build(&record, dir.path()).unwrap();
        manifest.write(dir.path()).unwrap();

        let read = Manifest::read(dir.path()).unwrap().unwrap();
        assert_eq!(read.files, manifest.files);
        assert!(read.verify(dir.path()).is_empty());

        fs::write(dir.path().join("transcript.md"), "# Edited").unwrap();
        assert_eq!(
            read.verify(dir.path()),
            vec![FileProblem::Modified {
                name: "transcript.md".into()
            }]
        );

        fs::remove_file(dir.path().join("transcript.md")).unwrap();
        assert_eq!(
            read.verify(dir.path()),
            vec![FileProblem::Missing {
                name: "transcript.md".into()
            }]
        );
    }

    #[test]
    fn test_rewrite_replaces_manifest_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("transcript.md"), "# Standup").unwrap();
        let mut record = record_with_transcript();
        Manifest::build(&record, dir.path()).unwrap().write(dir.path()).unwrap();

        record.title = "Renamed Standup".into();
        Manifest::build(&record, dir.path()).unwrap().write(dir.path()).unwrap();

        let read = Manifest::read(dir.path()).unwrap().unwrap();
        assert_eq!(read.title, "Renamed Standup");
        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2, "unexpected files: {names:?}");
        assert!(!dir.path().join(format!(".{MANIFEST_FILE}.tmp")).exists());
    }

    #[test]
    fn test_unfetched_documents_are_left_out() {
        let dir = tempfile::tempdir().unwrap();
        let mut record = record_with_transcript();
        record.document_refs[0].fetched = false;

        let manifest = Manifest::build(&record, dir.path()).unwrap();
        assert!(manifest.files.is_empty());
        assert_eq!(manifest.stable_id, "evt1");
    }

    #[test]
    fn test_read_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Manifest::read(dir.path()).unwrap().is_none());
    }
}
