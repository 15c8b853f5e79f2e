use anyhow::Result;
use meetdir_core::MeetDir;
use owo_colors::OwoColorize;

use crate::render::pluralize;

pub fn run(meetdir: &MeetDir) -> Result<()> {
    let mut store = meetdir.open_store()?;
    let dropped = store.compact()?;
    println!(
        "{}",
        format!(
            "Compacted {}, dropped {}",
            store.log_path().display(),
            pluralize(dropped, "superseded line")
        )
        .green()
    );
    Ok(())
}
