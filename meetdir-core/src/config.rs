//! Global meetdir configuration.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::discovery::{DiscoveryPolicy, MatchPolicy};
use crate::error::{MeetDirError, MeetDirResult};
use crate::materialize::MaterializePolicy;
use crate::remote::Remote;

static DEFAULT_MEETINGS_DIR: &str = "~/meetings";
static DEFAULT_DATA_DIR: &str = "~/meetings/.meetdir";

fn default_meetings_dir() -> PathBuf {
    PathBuf::from(DEFAULT_MEETINGS_DIR)
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// Global configuration at ~/.config/meetdir/config.toml
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MeetDirConfig {
    #[serde(default = "default_meetings_dir")]
    pub meetings_dir: PathBuf,

    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Your own address, excluded when naming one-on-ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,

    /// IANA zone used for the dates in directory names.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar: Option<Remote>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcripts: Option<Remote>,

    #[serde(default)]
    pub discovery: DiscoverySection,

    #[serde(default)]
    pub matching: MatchingSection,

    #[serde(default)]
    pub materialize: MaterializeSection,
}

impl Default for MeetDirConfig {
    fn default() -> Self {
        MeetDirConfig {
            meetings_dir: default_meetings_dir(),
            data_dir: default_data_dir(),
            user_email: None,
            timezone: default_timezone(),
            log_level: None,
            calendar: None,
            transcripts: None,
            discovery: DiscoverySection::default(),
            matching: MatchingSection::default(),
            materialize: MaterializeSection::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DiscoverySection {
    /// How far back the first discovery pass looks, e.g. "7d".
    pub initial_lookback: String,
    pub min_attendees: usize,
    pub include_all_day_without_description: bool,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        DiscoverySection {
            initial_lookback: "7d".to_string(),
            min_attendees: 2,
            include_all_day_without_description: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct MatchingSection {
    pub threshold: u32,
    /// Largest distance between a document and an event, e.g. "2h".
    pub window: String,
}

impl Default for MatchingSection {
    fn default() -> Self {
        MatchingSection {
            threshold: MatchPolicy::DEFAULT_THRESHOLD,
            window: "2h".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct MaterializeSection {
    pub fetch_concurrency: usize,
    pub excluded_mime_prefixes: Vec<String>,
    pub follow_links: bool,
    pub max_linked_documents: usize,
    pub link_prefixes: Vec<String>,
}

impl Default for MaterializeSection {
    fn default() -> Self {
        MaterializeSection {
            fetch_concurrency: 4,
            excluded_mime_prefixes: vec!["video/".to_string()],
            follow_links: true,
            max_linked_documents: 10,
            link_prefixes: vec!["https://docs.google.com/".to_string()],
        }
    }
}

impl MeetDirConfig {
    pub fn config_path() -> MeetDirResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| MeetDirError::Config("Could not determine config directory".into()))?
            .join("meetdir");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from `path` with `MEETDIR_*` environment overrides.
    pub fn load_from(path: &Path) -> MeetDirResult<Self> {
        config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("MEETDIR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| MeetDirError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| MeetDirError::Config(e.to_string()))
    }

    pub fn tz(&self) -> MeetDirResult<Tz> {
        Tz::from_str(&self.timezone)
            .map_err(|_| MeetDirError::Config(format!("Unknown timezone '{}'", self.timezone)))
    }

    pub fn discovery_policy(&self) -> MeetDirResult<DiscoveryPolicy> {
        Ok(DiscoveryPolicy {
            initial_lookback: parse_duration("discovery.initial_lookback", &self.discovery.initial_lookback)?,
            min_attendees: self.discovery.min_attendees,
            include_all_day_without_description: self
                .discovery
                .include_all_day_without_description,
            excluded_mime_prefixes: self.materialize.excluded_mime_prefixes.clone(),
            user_email: self.user_email.clone(),
            matching: MatchPolicy {
                threshold: self.matching.threshold,
                window: parse_duration("matching.window", &self.matching.window)?,
            },
        })
    }

    pub fn materialize_policy(&self) -> MeetDirResult<MaterializePolicy> {
        Ok(MaterializePolicy {
            timezone: self.tz()?,
            fetch_concurrency: self.materialize.fetch_concurrency.max(1),
            follow_links: self.materialize.follow_links,
            max_linked_documents: self.materialize.max_linked_documents,
            link_prefixes: self.materialize.link_prefixes.clone(),
        })
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> MeetDirResult<()> {
        let contents = format!(
            "\
# meetdir configuration

# Where meeting directories are written:
# meetings_dir = \"{}\"

# Where the record log lives:
# data_dir = \"{}\"

# Your own address (used to name one-on-ones after the other person):
# user_email = \"you@example.com\"

# Timezone for the dates in directory names:
# timezone = \"Europe/Stockholm\"

# Default log level (overridden by MEETDIR_LOG):
# log_level = \"warn\"

# [calendar]
# provider = \"google\"
# google_account = \"you@example.com\"

# [transcripts]
# provider = \"gemini\"

# [discovery]
# initial_lookback = \"7d\"
# min_attendees = 2
# include_all_day_without_description = false

# [matching]
# threshold = 100
# window = \"2h\"

# [materialize]
# fetch_concurrency = 4
# excluded_mime_prefixes = [\"video/\"]
# follow_links = true
# max_linked_documents = 10
# link_prefixes = [\"https://docs.google.com/\"]
",
            DEFAULT_MEETINGS_DIR, DEFAULT_DATA_DIR
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                MeetDirError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| MeetDirError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}

fn parse_duration(key: &str, value: &str) -> MeetDirResult<chrono::Duration> {
    let std = humantime::parse_duration(value)
        .map_err(|e| MeetDirError::Config(format!("Invalid duration for {key} '{value}': {e}")))?;
    chrono::Duration::from_std(std)
        .map_err(|e| MeetDirError::Config(format!("Duration for {key} out of range: {e}")))
}
