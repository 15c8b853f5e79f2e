//! Tag definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Hex color, e.g. `#e63946`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TagDefinition {
    pub fn new(name: &str, description: &str, color: Option<String>, now: DateTime<Utc>) -> Self {
        TagDefinition {
            name: name.to_string(),
            description: description.to_string(),
            color,
            created_at: now,
            updated_at: now,
        }
    }
}
