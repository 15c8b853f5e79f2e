//! TUI rendering traits for meetdir types.
//!
//! Extension traits that add colored terminal rendering to meetdir-core
//! types using owo_colors.

use meetdir_core::ItemFailure;
use meetdir_core::classify::{ClassifyReport, PendingItem};
use meetdir_core::discovery::DiscoveryReport;
use meetdir_core::doctor::Discrepancy;
use meetdir_core::materialize::MaterializeReport;
use meetdir_core::query::Summary;
use meetdir_core::record::{ClassificationSource, MeetingRecord, MeetingStatus, TagDefinition};
use owo_colors::OwoColorize;

/// Extension trait for TUI rendering with colors.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for MeetingStatus {
    fn render(&self) -> String {
        match self {
            MeetingStatus::Discovered => "discovered".yellow().to_string(),
            MeetingStatus::Classified => "classified".cyan().to_string(),
            MeetingStatus::Synced => "synced".green().to_string(),
        }
    }
}

impl Render for MeetingRecord {
    fn render(&self) -> String {
        let date = self.start_time.format("%Y-%m-%d %H:%M").to_string();
        let tag = match (&self.classification.tag, self.classification.recurring) {
            (Some(tag), Some(true)) => format!("{tag} (recurring)"),
            (Some(tag), _) => tag.clone(),
            (None, _) => "-".to_string(),
        };

        let mut line = format!(
            "{} {} {} {}",
            date.dimmed(),
            self.title.bold(),
            tag.blue(),
            self.status.render()
        );
        if self.flags.orphaned {
            line.push_str(&format!(" {}", "orphan".magenta()));
        }
        if let Some(path) = &self.materialized_path {
            line.push_str(&format!(" {}", path.display().dimmed()));
        }
        line.push_str(&format!("  {}", self.stable_id.dimmed()));
        line
    }
}

impl Render for PendingItem {
    fn render(&self) -> String {
        let s = &self.suggestion;
        let kind = if s.recurring { "r" } else { "o" };
        let source = match s.source {
            ClassificationSource::Explicit => "explicit",
            ClassificationSource::Pattern => "pattern",
            ClassificationSource::Heuristic => "keyword",
            ClassificationSource::Fallback => "fallback",
        };
        let docs = self.record.document_refs.len();

        format!(
            "{:>3}. {} {}  {} {}  {}",
            self.number,
            self.record.start_time.format("%Y-%m-%d %H:%M").dimmed(),
            self.record.title.bold(),
            format!("{}={},{}", self.number, s.tag, kind).green(),
            format!("({source})").dimmed(),
            pluralize(docs, "document").dimmed()
        )
    }
}

impl Render for TagDefinition {
    fn render(&self) -> String {
        let color = self.color.as_deref().unwrap_or("");
        format!("{} {} {}", self.name.bold(), self.description, color.dimmed())
    }
}

impl Render for DiscoveryReport {
    fn render(&self) -> String {
        let mut lines = vec![format!(
            "Saw {} and {}",
            pluralize(self.events_seen, "event"),
            pluralize(self.documents_seen, "document")
        )];

        if self.is_empty() {
            lines.push("   No changes".dimmed().to_string());
        } else {
            lines.push(format!(
                "   {} {}",
                "+".green(),
                format!("{} new, {} updated, {} orphaned", self.created, self.updated, self.orphaned)
                    .green()
            ));
        }
        for item in &self.skipped {
            lines.push(format!(
                "   {} {} {}",
                "-".dimmed(),
                item.title,
                format!("({})", item.reason).dimmed()
            ));
        }
        lines.join("\n")
    }
}

impl Render for ClassifyReport {
    fn render(&self) -> String {
        let mut lines = Vec::new();
        if !self.applied.is_empty() {
            lines.push(format!("Classified {}", pluralize(self.applied.len(), "meeting")).green().to_string());
        }
        if !self.left_pending.is_empty() {
            lines.push(
                format!("{} still pending", pluralize(self.left_pending.len(), "meeting"))
                    .yellow()
                    .to_string(),
            );
        }
        lines.extend(render_failures(&self.failed));
        if lines.is_empty() {
            lines.push("Nothing to classify".dimmed().to_string());
        }
        lines.join("\n")
    }
}

impl Render for MaterializeReport {
    fn render(&self) -> String {
        let mut lines = Vec::new();
        if !self.synced.is_empty() {
            lines.push(format!("Synced {}", pluralize(self.synced.len(), "meeting")).green().to_string());
        }
        lines.extend(render_failures(&self.failed));
        if lines.is_empty() {
            lines.push("Nothing to materialize".dimmed().to_string());
        }
        lines.join("\n")
    }
}

impl Render for Discrepancy {
    fn render(&self) -> String {
        let label = match self {
            Discrepancy::PathMismatch { .. } => "moved".yellow().to_string(),
            Discrepancy::OrphanDirectory { .. } => "orphan".magenta().to_string(),
            Discrepancy::MissingDirectory { .. } => "missing".red().to_string(),
            Discrepancy::ManifestMismatch { .. } => "modified".red().to_string(),
            Discrepancy::SharedDirectory { .. } => "shared".red().to_string(),
            Discrepancy::ForeignManifest { .. } => "foreign".red().to_string(),
        };
        format!("   {:<8} {}", label, self)
    }
}

impl Render for Summary {
    fn render(&self) -> String {
        let mut lines = vec![format!("{}", pluralize(self.meetings, "meeting").bold())];
        for (status, count) in &self.by_status {
            lines.push(format!("   {:<12} {}", status.render(), count));
        }
        lines.push(format!("   {:<12} {}", "orphaned", self.orphaned));
        lines.push(String::new());
        lines.push(format!(
            "{} pending, {}, {}, {} ignored",
            self.pending,
            pluralize(self.tags, "tag"),
            pluralize(self.patterns, "pattern"),
            self.ignored
        ));

        for checkpoint in [&self.checkpoints.calendar, &self.checkpoints.transcripts]
            .into_iter()
            .flatten()
        {
            lines.push(
                format!(
                    "{} synced up to {} ({} total)",
                    checkpoint.source,
                    checkpoint.boundary.format("%Y-%m-%d %H:%M"),
                    checkpoint.total_processed
                )
                .dimmed()
                .to_string(),
            );
        }
        lines.join("\n")
    }
}

pub fn render_failures(failures: &[ItemFailure]) -> Vec<String> {
    failures
        .iter()
        .map(|f| format!("   {} {}: {}", "!".red(), f.id, f.reason.red()))
        .collect()
}

pub fn pluralize(count: usize, word: &str) -> String {
    if count == 1 {
        return format!("{count} {word}");
    }
    match word.strip_suffix('y') {
        Some(stem) if !stem.ends_with(['a', 'e', 'o', 'u']) => format!("{count} {stem}ies"),
        _ => format!("{count} {word}s"),
    }
}
