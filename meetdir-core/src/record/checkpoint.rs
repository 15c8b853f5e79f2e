//! Incremental discovery checkpoints.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointSource {
    Calendar,
    Transcripts,
}

impl CheckpointSource {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckpointSource::Calendar => "calendar",
            CheckpointSource::Transcripts => "transcripts",
        }
    }
}

impl fmt::Display for CheckpointSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last successfully processed time boundary for one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncCheckpoint {
    pub source: CheckpointSource,
    pub boundary: DateTime<Utc>,
    /// Items seen in the pass that produced this checkpoint.
    #[serde(default)]
    pub last_count: usize,
    /// Running total across passes.
    #[serde(default)]
    pub total_processed: usize,
}

/// Both checkpoints, passed explicitly into and out of discovery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checkpoints {
    pub calendar: Option<SyncCheckpoint>,
    pub transcripts: Option<SyncCheckpoint>,
}

impl Checkpoints {
    pub fn get(&self, source: CheckpointSource) -> Option<&SyncCheckpoint> {
        match source {
            CheckpointSource::Calendar => self.calendar.as_ref(),
            CheckpointSource::Transcripts => self.transcripts.as_ref(),
        }
    }

    /// Advance one source to `boundary`, accumulating counts.
    pub fn advance(&self, source: CheckpointSource, boundary: DateTime<Utc>, count: usize) -> SyncCheckpoint {
        let total = self.get(source).map(|c| c.total_processed).unwrap_or(0);
        SyncCheckpoint {
            source,
            boundary,
            last_count: count,
            total_processed: total + count,
        }
    }

    /// Both sources rewound (or forwarded) to `boundary`, keeping totals.
    pub fn restart_from(&self, boundary: DateTime<Utc>) -> Checkpoints {
        Checkpoints {
            calendar: Some(self.advance(CheckpointSource::Calendar, boundary, 0)),
            transcripts: Some(self.advance(CheckpointSource::Transcripts, boundary, 0)),
        }
    }
}
