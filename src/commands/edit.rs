use anyhow::Result;
use meetdir_core::MeetDir;
use meetdir_core::classify::MeetingEdit;
use owo_colors::OwoColorize;

use super::open_store;
use crate::render::Render;

pub fn run(meetdir: &MeetDir, stable_id: &str, edit: MeetingEdit) -> Result<()> {
    if edit.is_empty() {
        anyhow::bail!("Nothing to change. Pass at least one of --title, --slug, --tag, --recurring, --one-off");
    }

    let mut store = open_store(meetdir)?;
    let outcome = store.edit(stable_id, &edit, &meetdir.tz()?)?;

    println!("{}", outcome.record.render());
    if outcome.needs_reconcile {
        if let Some(expected) = &outcome.expected_path {
            println!(
                "{}",
                format!(
                    "Now belongs in {}, run `meetdir doctor --fix` to move it",
                    expected.display()
                )
                .yellow()
            );
        }
    }
    Ok(())
}
