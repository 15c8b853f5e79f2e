use anyhow::Result;
use meetdir_core::MeetDir;
use owo_colors::OwoColorize;

use super::open_store;

pub fn run(meetdir: &MeetDir, stable_id: &str, reason: &str) -> Result<()> {
    let mut store = open_store(meetdir)?;
    let ignored = store.ignore(stable_id, reason)?;

    println!("{}", format!("Ignoring \"{}\"", ignored.title).green());
    println!(
        "{}",
        format!("Undo with `meetdir unignore {}`", ignored.signature).dimmed()
    );
    Ok(())
}

pub fn run_unignore(meetdir: &MeetDir, signature: &str) -> Result<()> {
    let mut store = open_store(meetdir)?;

    if store.unignore(signature)? {
        println!("{}", "Series will be discovered again".green());
    } else {
        println!("{}", format!("{} is not ignored", signature).yellow());
    }
    Ok(())
}
