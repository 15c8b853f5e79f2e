use anyhow::Result;
use dialoguer::{Input, Select};
use meetdir_core::MeetDir;
use meetdir_core::classify::{ClassifyUpdate, PendingItem, parse_decisions};
use owo_colors::OwoColorize;

use super::open_store;
use crate::render::Render;

pub fn run(meetdir: &MeetDir, decisions: &[String]) -> Result<()> {
    let mut store = open_store(meetdir)?;
    let pending = store.pending();

    if pending.is_empty() {
        println!("{}", "Nothing pending".dimmed());
        return Ok(());
    }

    let updates = if decisions.is_empty() {
        let tags: Vec<String> = store.list_tags().iter().map(|t| t.name.clone()).collect();
        prompt_decisions(&pending, &tags)?
    } else {
        let parsed = parse_decisions(decisions, &pending);
        for (arg, reason) in &parsed.invalid {
            eprintln!("   {} {}: {}", "!".red(), arg, reason.red());
        }
        parsed.updates
    };

    if updates.is_empty() {
        return Ok(());
    }

    let report = store.classify(&updates)?;
    println!("{}", report.render());
    Ok(())
}

/// Walk the pending list, offering the suggestion first.
fn prompt_decisions(pending: &[PendingItem], tags: &[String]) -> Result<Vec<ClassifyUpdate>> {
    let mut updates = Vec::new();

    for item in pending {
        println!("{}", item.render());
        let suggestion = &item.suggestion;
        let kind = if suggestion.recurring { "recurring" } else { "one-off" };

        let choices = [
            format!("Accept {} ({})", suggestion.tag, kind),
            "Choose another tag".to_string(),
            "Skip".to_string(),
            "Stop".to_string(),
        ];
        let choice = Select::new()
            .with_prompt("  Classify")
            .items(&choices)
            .default(0)
            .interact()?;

        let (tag, recurring) = match choice {
            0 => (suggestion.tag.clone(), suggestion.recurring),
            1 => {
                let index = Select::new()
                    .with_prompt("  Tag")
                    .items(tags)
                    .default(0)
                    .interact()?;
                let recurring = Select::new()
                    .with_prompt("  Recurring?")
                    .items(["recurring", "one-off"])
                    .default(if suggestion.recurring { 0 } else { 1 })
                    .interact()?
                    == 0;
                (tags[index].clone(), recurring)
            }
            2 => continue,
            _ => break,
        };

        let slug: String = Input::new()
            .with_prompt(format!("  Slug ({})", item.record.slug))
            .default(String::new())
            .show_default(false)
            .interact_text()?;

        updates.push(ClassifyUpdate {
            stable_id: item.record.stable_id.clone(),
            tag,
            recurring,
            slug: if slug.is_empty() { None } else { Some(slug) },
        });
        println!();
    }

    Ok(updates)
}
