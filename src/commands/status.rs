use anyhow::Result;
use meetdir_core::MeetDir;
use meetdir_core::remote::Remote;
use owo_colors::OwoColorize;

use super::open_store;
use crate::render::Render;

pub fn run(meetdir: &MeetDir, json: bool) -> Result<()> {
    let store = open_store(meetdir)?;
    let summary = store.summary();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{}", summary.render());
    println!();
    println!("{}", provider_line("calendar", meetdir.calendar()));
    println!("{}", provider_line("transcripts", meetdir.transcripts()));
    Ok(())
}

fn provider_line(label: &str, remote: Option<&Remote>) -> String {
    match remote {
        Some(remote) => {
            let account = remote
                .account_identifier()
                .map(|a| format!(" ({a})"))
                .unwrap_or_default();
            format!("{:<12} {}{}", label, remote.provider.name().cyan(), account.dimmed())
        }
        None => format!("{:<12} {}", label, "not configured".dimmed()),
    }
}
