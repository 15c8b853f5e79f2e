use anyhow::Result;
use meetdir_core::MeetDir;
use meetdir_core::query::MeetingQuery;
use owo_colors::OwoColorize;

use super::open_store;
use crate::render::Render;

pub fn run(meetdir: &MeetDir, query: &MeetingQuery, json: bool) -> Result<()> {
    let store = open_store(meetdir)?;
    let records = store.query(query);

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("{}", "No meetings".dimmed());
    }
    for record in records {
        println!("{}", record.render());
    }
    Ok(())
}
