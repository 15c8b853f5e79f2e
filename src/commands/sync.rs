use anyhow::Result;
use meetdir_core::MeetDir;
use meetdir_core::classify::AutoPolicy;
use owo_colors::OwoColorize;

use super::discover::discover;
use super::materialize::materialize;
use super::{open_store, require_providers};
use crate::render::{Render, pluralize};

pub async fn run(meetdir: &MeetDir, policy: AutoPolicy) -> Result<()> {
    require_providers(meetdir)?;
    let mut store = open_store(meetdir)?;

    let discovered = discover(meetdir, &mut store, None, None).await?;
    println!("{}", discovered.render());
    println!();

    let classified = store.auto_classify(policy)?;
    println!("{}", classified.render());
    println!();

    let materialized = materialize(meetdir, &mut store).await?;
    println!("{}", materialized.render());

    let pending = store.pending().len();
    if pending > 0 {
        println!();
        println!(
            "{}",
            format!(
                "{} waiting for a decision, run `meetdir classify`",
                pluralize(pending, "meeting")
            )
            .yellow()
        );
    }
    Ok(())
}
