//! Meeting lifecycle state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a meeting record: `discovered -> classified -> synced`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    Discovered,
    Classified,
    Synced,
}

impl MeetingStatus {
    pub const ALL: [MeetingStatus; 3] = [
        MeetingStatus::Discovered,
        MeetingStatus::Classified,
        MeetingStatus::Synced,
    ];

    /// The transition table. Re-classifying a classified record is allowed;
    /// nothing moves backwards and nothing skips a stage.
    pub fn can_transition_to(self, to: MeetingStatus) -> bool {
        matches!(
            (self, to),
            (MeetingStatus::Discovered, MeetingStatus::Classified)
                | (MeetingStatus::Classified, MeetingStatus::Classified)
                | (MeetingStatus::Classified, MeetingStatus::Synced)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MeetingStatus::Discovered => "discovered",
            MeetingStatus::Classified => "classified",
            MeetingStatus::Synced => "synced",
        }
    }
}

impl fmt::Display for MeetingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MeetingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discovered" => Ok(MeetingStatus::Discovered),
            "classified" => Ok(MeetingStatus::Classified),
            "synced" => Ok(MeetingStatus::Synced),
            other => Err(format!(
                "Unknown status '{}'. Expected discovered, classified or synced",
                other
            )),
        }
    }
}
