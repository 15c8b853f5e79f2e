//! Meetdir root: configuration plus the paths and providers derived from it.

use std::path::{Path, PathBuf};

use chrono_tz::Tz;

use crate::config::MeetDirConfig;
use crate::error::MeetDirResult;
use crate::remote::{ProviderFetcher, Remote};
use crate::store::Store;

#[derive(Debug, Clone)]
pub struct MeetDir {
    config: MeetDirConfig,
}

impl MeetDir {
    /// Load the global config, writing a commented default on first run.
    pub fn load() -> MeetDirResult<Self> {
        let config_path = MeetDirConfig::config_path()?;

        if !config_path.exists() {
            MeetDirConfig::create_default_config(&config_path)?;
        }

        Ok(MeetDir {
            config: MeetDirConfig::load_from(&config_path)?,
        })
    }

    pub fn from_config(config: MeetDirConfig) -> Self {
        MeetDir { config }
    }

    pub fn config(&self) -> &MeetDirConfig {
        &self.config
    }

    /// Root of the materialized tree, with `~` expanded.
    pub fn meetings_dir(&self) -> PathBuf {
        expand(&self.config.meetings_dir)
    }

    /// The meetings directory as configured, keeping `~` for display.
    pub fn display_path(&self) -> &Path {
        &self.config.meetings_dir
    }

    pub fn data_dir(&self) -> PathBuf {
        expand(&self.config.data_dir)
    }

    /// Open the record log, taking the single-writer lock.
    pub fn open_store(&self) -> MeetDirResult<Store> {
        Store::open(&self.data_dir())
    }

    pub fn tz(&self) -> MeetDirResult<Tz> {
        self.config.tz()
    }

    pub fn calendar(&self) -> Option<&Remote> {
        self.config.calendar.as_ref()
    }

    pub fn transcripts(&self) -> Option<&Remote> {
        self.config.transcripts.as_ref()
    }

    pub fn fetcher(&self) -> ProviderFetcher<'_> {
        ProviderFetcher {
            calendar: self.calendar(),
            transcripts: self.transcripts(),
        }
    }
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}
