use anyhow::Result;
use meetdir_core::MeetDir;
use meetdir_core::classify::AutoPolicy;

use super::open_store;
use crate::render::Render;

pub fn run(meetdir: &MeetDir, policy: AutoPolicy) -> Result<()> {
    let mut store = open_store(meetdir)?;
    let report = store.auto_classify(policy)?;
    println!("{}", report.render());
    Ok(())
}
