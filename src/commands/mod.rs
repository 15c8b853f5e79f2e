pub mod auto;
pub mod classify;
pub mod compact;
pub mod discover;
pub mod doctor;
pub mod edit;
pub mod ignore;
pub mod list;
pub mod materialize;
pub mod pending;
pub mod status;
pub mod sync;
pub mod tag;

use anyhow::Result;
use meetdir_core::{MeetDir, Store};

pub use crate::utils::tui::create_spinner;

/// Open the record log, seeding the default tags on first use.
pub fn open_store(meetdir: &MeetDir) -> Result<Store> {
    let mut store = meetdir.open_store()?;
    let seeded = store.ensure_default_tags()?;
    if seeded > 0 {
        tracing::debug!(count = seeded, "Created default tags");
    }
    Ok(store)
}

/// Shared error message for a config without providers
pub fn require_providers(meetdir: &MeetDir) -> Result<()> {
    if meetdir.calendar().is_none() && meetdir.transcripts().is_none() {
        anyhow::bail!(
            "No providers configured.\n\
            Add a [calendar] or [transcripts] section with a provider to config.toml"
        );
    }
    Ok(())
}
