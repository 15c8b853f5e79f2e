use anyhow::Result;
use meetdir_core::MeetDir;
use owo_colors::OwoColorize;

use super::open_store;
use crate::render::Render;

pub fn run(meetdir: &MeetDir, json: bool) -> Result<()> {
    let store = open_store(meetdir)?;
    let pending = store.pending();

    if json {
        println!("{}", serde_json::to_string_pretty(&pending)?);
        return Ok(());
    }

    if pending.is_empty() {
        println!("{}", "Nothing pending".dimmed());
        return Ok(());
    }

    for item in &pending {
        println!("{}", item.render());
    }
    println!();
    println!(
        "{}",
        "Accept with `meetdir classify 1=TAG,r 2=TAG,o` (r = recurring, o = one-off)".dimmed()
    );
    Ok(())
}
