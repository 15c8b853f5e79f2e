use anyhow::Result;
use meetdir_core::MeetDir;
use owo_colors::OwoColorize;

use super::open_store;
use crate::render::{Render, pluralize};

pub fn list(meetdir: &MeetDir) -> Result<()> {
    let store = open_store(meetdir)?;

    for tag in store.list_tags() {
        let usage = store.tag_usage(&tag.name);
        println!("{}  {}", tag.render(), pluralize(usage, "meeting").dimmed());
    }
    Ok(())
}

pub fn add(meetdir: &MeetDir, name: &str, description: &str, color: Option<String>) -> Result<()> {
    let mut store = open_store(meetdir)?;
    let tag = store.create_tag(name, description, color)?;
    println!("{}", format!("Created tag {}", tag.name).green());
    Ok(())
}

pub fn update(
    meetdir: &MeetDir,
    name: &str,
    description: Option<&str>,
    color: Option<String>,
) -> Result<()> {
    let mut store = open_store(meetdir)?;
    let tag = store.update_tag(name, description, color)?;
    println!("{}", tag.render());
    Ok(())
}

pub fn rename(meetdir: &MeetDir, from: &str, to: &str) -> Result<()> {
    let mut store = open_store(meetdir)?;
    let report = store.rename_tag(from, to)?;

    println!(
        "{}",
        format!(
            "Renamed {} to {} ({}, {})",
            from,
            to,
            pluralize(report.meetings, "meeting"),
            pluralize(report.patterns, "pattern")
        )
        .green()
    );
    if report.meetings > 0 {
        println!(
            "{}",
            "Run `meetdir doctor --fix` to move materialized directories".dimmed()
        );
    }
    Ok(())
}

pub fn delete(meetdir: &MeetDir, name: &str, force: bool) -> Result<()> {
    let mut store = open_store(meetdir)?;
    store.delete_tag(name, force)?;
    println!("{}", format!("Deleted tag {}", name).green());
    Ok(())
}
