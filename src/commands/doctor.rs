use anyhow::Result;
use meetdir_core::MeetDir;
use meetdir_core::doctor::Doctor;
use owo_colors::OwoColorize;

use super::open_store;
use crate::render::{Render, pluralize, render_failures};

pub fn run(meetdir: &MeetDir, fix: bool) -> Result<()> {
    let mut store = open_store(meetdir)?;
    let root = meetdir.meetings_dir();
    let tz = meetdir.tz()?;
    let doctor = Doctor::new(&root, &tz);

    let report = doctor.check(&store)?;
    if report.is_empty() {
        println!("{}", format!("{} is consistent", meetdir.display_path().display()).green());
        return Ok(());
    }

    println!("Found {}", pluralize(report.len(), "discrepancy"));
    for discrepancy in &report {
        println!("{}", discrepancy.render());
    }

    if !fix {
        if report.iter().any(|d| d.is_fixable()) {
            println!();
            println!("{}", "Run `meetdir doctor --fix` to move misplaced directories".dimmed());
        }
        return Ok(());
    }

    let fixed = doctor.fix(&mut store, &report)?;
    println!();
    if !fixed.applied.is_empty() {
        println!("{}", format!("Moved {}", pluralize(fixed.applied.len(), "directory")).green());
    }
    for line in render_failures(&fixed.failed) {
        println!("{}", line);
    }
    if !fixed.manual.is_empty() {
        println!(
            "{}",
            format!("{} left for you to resolve", pluralize(fixed.manual.len(), "discrepancy")).yellow()
        );
    }
    Ok(())
}
