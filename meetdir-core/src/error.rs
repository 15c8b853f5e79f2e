//! Error types for the meetdir ecosystem.

use thiserror::Error;

use crate::record::MeetingStatus;

/// Errors that can occur in meetdir operations.
#[derive(Error, Debug)]
pub enum MeetDirError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Provider '{0}' not found in PATH")]
    ProviderNotInstalled(String),

    #[error("Provider request timed out after {0}s")]
    ProviderTimeout(u64),

    #[error("No {0} provider configured")]
    NoProviderConfigured(&'static str),

    #[error("Meeting not found: {0}")]
    MeetingNotFound(String),

    #[error("Unknown tag: {0}")]
    UnknownTag(String),

    #[error("Invalid tag name '{0}': use lowercase letters, digits and dashes")]
    InvalidTag(String),

    #[error("Invalid slug '{0}'")]
    InvalidSlug(String),

    #[error("Tag '{0}' already exists")]
    TagExists(String),

    #[error("Tag '{name}' is used by {count} meeting(s); pass force to delete it anyway")]
    TagInUse { name: String, count: usize },

    #[error("Invalid status transition for {stable_id}: {from} -> {to}")]
    InvalidTransition {
        stable_id: String,
        from: MeetingStatus,
        to: MeetingStatus,
    },

    #[error("Invariant violated: {0}")]
    Invariant(String),

    #[error("Record log is locked by another meetdir process: {0}")]
    StoreLocked(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for MeetDirError {
    fn from(e: serde_json::Error) -> Self {
        MeetDirError::Serialization(e.to_string())
    }
}

/// One item of a batch that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ItemFailure {
    pub id: String,
    pub reason: String,
}

impl ItemFailure {
    pub fn new(id: impl Into<String>, reason: impl ToString) -> Self {
        ItemFailure {
            id: id.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for meetdir operations.
pub type MeetDirResult<T> = Result<T, MeetDirError>;
