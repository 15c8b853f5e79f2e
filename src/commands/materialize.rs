use anyhow::Result;
use meetdir_core::materialize::{MaterializeReport, Materializer};
use meetdir_core::{MeetDir, Store};
use owo_colors::OwoColorize;

use super::{create_spinner, open_store};
use crate::render::{Render, pluralize};

pub async fn run(meetdir: &MeetDir) -> Result<()> {
    let mut store = open_store(meetdir)?;
    let report = materialize(meetdir, &mut store).await?;
    println!("{}", report.render());
    Ok(())
}

/// Fetch every classified record into the meetings directory and persist
/// the outcome, including partial progress of failed records.
pub async fn materialize(meetdir: &MeetDir, store: &mut Store) -> Result<MaterializeReport> {
    let queue = store.materialize_queue();
    if queue.is_empty() {
        return Ok(MaterializeReport::default());
    }

    let root = meetdir.meetings_dir();
    let policy = meetdir.config().materialize_policy()?;
    let fetcher = meetdir.fetcher();

    let spinner = create_spinner(format!(
        "Materializing {} into {}",
        pluralize(queue.len(), "meeting"),
        meetdir.display_path().display().dimmed()
    ));
    let result = Materializer::new(&root, &policy, &fetcher).run(queue).await;
    spinner.finish_and_clear();

    let report = result?;
    store.commit_materialize(&report)?;
    Ok(report)
}
