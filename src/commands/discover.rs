use anyhow::Result;
use chrono::{DateTime, Utc};
use meetdir_core::date_range::{parse_date_end, parse_date_start};
use meetdir_core::discovery::{Discovery, DiscoveryReport};
use meetdir_core::{MeetDir, Store};
use owo_colors::OwoColorize;

use super::{create_spinner, open_store, require_providers};
use crate::render::Render;

pub async fn run(meetdir: &MeetDir, since: Option<&str>, until: Option<&str>) -> Result<()> {
    require_providers(meetdir)?;
    let mut store = open_store(meetdir)?;

    let since = since.map(parse_date_start).transpose().map_err(anyhow::Error::msg)?;
    let until = until.map(parse_date_end).transpose().map_err(anyhow::Error::msg)?;

    let report = discover(meetdir, &mut store, since, until).await?;
    println!("{}", report.render());

    let pending = store.pending().len();
    if pending > 0 {
        println!();
        println!(
            "{}",
            format!("{pending} pending, run `meetdir pending` to review").yellow()
        );
    }
    Ok(())
}

/// Plan and commit one discovery pass from the stored checkpoints (or
/// `since`) up to `until`, defaulting to now.
pub async fn discover(
    meetdir: &MeetDir,
    store: &mut Store,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
) -> Result<DiscoveryReport> {
    let policy = meetdir.config().discovery_policy()?;
    let checkpoints = match since {
        Some(since) => store.checkpoints().restart_from(since),
        None => store.checkpoints(),
    };
    let until = until.unwrap_or_else(Utc::now);

    let spinner = create_spinner("Discovering meetings".to_string());
    let result = Discovery::new(store, &policy)
        .run(&meetdir.calendar(), &meetdir.transcripts(), &checkpoints, until)
        .await;
    spinner.finish_and_clear();

    let report = result?;
    store.commit_discovery(&report)?;
    Ok(report)
}
