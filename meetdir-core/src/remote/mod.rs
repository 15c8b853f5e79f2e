//! Calendar and transcript providers reached through provider binaries.

pub mod protocol;
pub mod provider;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::date_range::DateRange;
use crate::error::{MeetDirError, MeetDirResult};
use crate::record::{DocumentKind, DocumentRef};
use crate::remote::protocol::{FetchDocument, ListDocuments, ListEvents};
use crate::remote::provider::Provider;
use crate::source::{
    CalendarEvent, CalendarSource, DocumentFetcher, TranscriptDocument, TranscriptSource,
};

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RemoteConfig(pub HashMap<String, toml::Value>);

impl From<&RemoteConfig> for serde_json::Map<String, serde_json::Value> {
    fn from(config: &RemoteConfig) -> Self {
        config
            .0
            .iter()
            .filter_map(|(k, v)| serde_json::to_value(v).ok().map(|v| (k.clone(), v)))
            .collect()
    }
}

/// A configured provider: `provider = "<name>"` plus provider-specific keys.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Remote {
    pub provider: Provider,
    #[serde(flatten)]
    pub config: RemoteConfig,
}

impl Remote {
    fn remote_config(&self) -> serde_json::Map<String, serde_json::Value> {
        serde_json::Map::from(&self.config)
    }

    pub fn new(provider: Provider, config: RemoteConfig) -> Self {
        Remote { provider, config }
    }

    /// Returns the `{provider}_account` key, if present.
    pub fn account_identifier(&self) -> Option<&str> {
        let key = format!("{}_account", self.provider.name());
        self.config.0.get(&key).and_then(|v| v.as_str())
    }

    pub async fn events(&self, range: &DateRange) -> MeetDirResult<Vec<CalendarEvent>> {
        self.provider
            .call(ListEvents {
                remote_config: self.remote_config(),
                from: range.from_rfc3339(),
                to: range.to_rfc3339(),
            })
            .await
    }

    pub async fn documents(&self, range: &DateRange) -> MeetDirResult<Vec<TranscriptDocument>> {
        self.provider
            .call(ListDocuments {
                remote_config: self.remote_config(),
                from: range.from_rfc3339(),
                to: range.to_rfc3339(),
            })
            .await
    }

    pub async fn fetch_document(&self, doc: &DocumentRef) -> MeetDirResult<Vec<u8>> {
        self.provider
            .call(FetchDocument {
                remote_config: self.remote_config(),
                id: doc.id.clone(),
                url: doc.url.clone(),
                mime_type: doc.mime_type.clone(),
            })
            .await?
            .into_bytes()
    }
}

impl CalendarSource for Remote {
    async fn list_events(&self, range: &DateRange) -> MeetDirResult<Vec<CalendarEvent>> {
        self.events(range).await
    }
}

impl TranscriptSource for Remote {
    async fn list_documents(&self, range: &DateRange) -> MeetDirResult<Vec<TranscriptDocument>> {
        self.documents(range).await
    }
}

impl DocumentFetcher for Remote {
    async fn fetch(&self, doc: &DocumentRef) -> MeetDirResult<Vec<u8>> {
        self.fetch_document(doc).await
    }
}

/// Routes downloads: attachments to the calendar provider, everything else
/// to the transcript provider, each falling back to the other.
#[derive(Debug, Clone, Copy)]
pub struct ProviderFetcher<'a> {
    pub calendar: Option<&'a Remote>,
    pub transcripts: Option<&'a Remote>,
}

impl ProviderFetcher<'_> {
    fn route(&self, kind: DocumentKind) -> Option<&Remote> {
        match kind {
            DocumentKind::Attachment => self.calendar.or(self.transcripts),
            DocumentKind::Transcript | DocumentKind::Summary | DocumentKind::Linked => {
                self.transcripts.or(self.calendar)
            }
        }
    }
}

impl DocumentFetcher for ProviderFetcher<'_> {
    async fn fetch(&self, doc: &DocumentRef) -> MeetDirResult<Vec<u8>> {
        let remote = self
            .route(doc.kind)
            .ok_or(MeetDirError::NoProviderConfigured("document"))?;
        remote.fetch_document(doc).await
    }
}
