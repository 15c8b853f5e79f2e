//! Tag definitions.
//!
//! Tags name the top-level directories under the meetings root, so names are
//! restricted to lowercase letters, digits and dashes.

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::classify::suggest::DEFAULT_TAGS;
use crate::error::{MeetDirError, MeetDirResult};
use crate::record::{Record, RecordKind, TagDefinition};
use crate::store::Store;
use crate::utils::slugify;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenameReport {
    pub meetings: usize,
    pub patterns: usize,
}

pub fn is_valid_tag_name(name: &str) -> bool {
    !name.is_empty() && slugify(name) == name
}

impl Store {
    /// All tags, sorted by name.
    pub fn list_tags(&self) -> Vec<&TagDefinition> {
        let mut tags: Vec<_> = self.tags().collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        tags
    }

    /// Meetings whose classification uses `name`.
    pub fn tag_usage(&self, name: &str) -> usize {
        self.meetings()
            .filter(|m| m.classification.tag.as_deref() == Some(name))
            .count()
    }

    pub fn create_tag(
        &mut self,
        name: &str,
        description: &str,
        color: Option<String>,
    ) -> MeetDirResult<TagDefinition> {
        if !is_valid_tag_name(name) {
            return Err(MeetDirError::InvalidTag(name.to_string()));
        }
        if self.has_tag(name) {
            return Err(MeetDirError::TagExists(name.to_string()));
        }

        let tag = TagDefinition::new(name, description, color, Utc::now());
        self.append(Record::Tag(tag.clone()))?;
        Ok(tag)
    }

    /// Change description and/or color.
    pub fn update_tag(
        &mut self,
        name: &str,
        description: Option<&str>,
        color: Option<String>,
    ) -> MeetDirResult<TagDefinition> {
        let mut tag = self
            .tag(name)
            .cloned()
            .ok_or_else(|| MeetDirError::UnknownTag(name.to_string()))?;

        if let Some(description) = description {
            tag.description = description.to_string();
        }
        if color.is_some() {
            tag.color = color;
        }
        tag.updated_at = Utc::now();

        self.append(Record::Tag(tag.clone()))?;
        Ok(tag)
    }

    /// Rename a tag and rewrite every meeting and pattern that uses it.
    /// Materialized directories move on the next `doctor --fix`.
    pub fn rename_tag(&mut self, from: &str, to: &str) -> MeetDirResult<RenameReport> {
        let old = self
            .tag(from)
            .cloned()
            .ok_or_else(|| MeetDirError::UnknownTag(from.to_string()))?;
        if !is_valid_tag_name(to) {
            return Err(MeetDirError::InvalidTag(to.to_string()));
        }
        if self.has_tag(to) {
            return Err(MeetDirError::TagExists(to.to_string()));
        }

        let meetings: Vec<_> = self
            .meetings()
            .filter(|m| m.classification.tag.as_deref() == Some(from))
            .cloned()
            .map(|mut m| {
                m.classification.tag = Some(to.to_string());
                Record::Meeting(m)
            })
            .collect();
        let patterns: Vec<_> = self
            .patterns()
            .filter(|p| p.tag == from)
            .cloned()
            .map(|mut p| {
                p.tag = to.to_string();
                Record::Pattern(p)
            })
            .collect();

        let report = RenameReport {
            meetings: meetings.len(),
            patterns: patterns.len(),
        };

        let renamed = TagDefinition {
            name: to.to_string(),
            updated_at: Utc::now(),
            ..old
        };
        self.append(Record::Tag(renamed))?;
        self.append_all(meetings.into_iter().chain(patterns))?;
        self.remove(RecordKind::Tag, from)?;

        info!(from, to, meetings = report.meetings, patterns = report.patterns, "Renamed tag");
        Ok(report)
    }

    /// Refuses while meetings use the tag unless `force` is set; forced
    /// deletion leaves those meetings pointing at a tag that no longer exists.
    pub fn delete_tag(&mut self, name: &str, force: bool) -> MeetDirResult<()> {
        if !self.has_tag(name) {
            return Err(MeetDirError::UnknownTag(name.to_string()));
        }

        let count = self.tag_usage(name);
        if count > 0 && !force {
            return Err(MeetDirError::TagInUse {
                name: name.to_string(),
                count,
            });
        }

        self.remove(RecordKind::Tag, name)?;
        info!(name, count, force, "Deleted tag");
        Ok(())
    }

    /// Create the tags suggestions can produce. Returns how many were missing.
    pub fn ensure_default_tags(&mut self) -> MeetDirResult<usize> {
        let mut created = 0;
        for (name, description) in DEFAULT_TAGS {
            if !self.has_tag(name) {
                self.create_tag(name, description, None)?;
                created += 1;
            }
        }
        Ok(created)
    }
}
