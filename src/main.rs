mod commands;
mod render;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use meetdir_core::MeetDir;
use meetdir_core::classify::AutoPolicy;
use meetdir_core::record::MeetingStatus;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "meetdir")]
#[command(about = "Discover, classify and file your meetings into a directory tree")]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull new calendar events and transcripts into the record log
    Discover {
        /// Start from this date instead of the last checkpoint (YYYY-MM-DD)
        #[arg(long)]
        since: Option<String>,

        /// Stop at the end of this date (YYYY-MM-DD, default: now)
        #[arg(long)]
        until: Option<String>,
    },
    /// List meetings waiting for a classification
    Pending {
        #[arg(long)]
        json: bool,
    },
    /// Classify pending meetings, e.g. `meetdir classify 1=team,r 2=customers,o`
    Classify {
        /// Decisions as N=TAG,r|o[,SLUG]; prompts interactively when omitted
        decisions: Vec<String>,
    },
    /// Accept suggestions for pending meetings
    Auto {
        /// Which suggestions to accept: patterns, heuristics or all
        #[arg(long, default_value_t = AutoPolicy::Patterns)]
        policy: AutoPolicy,
    },
    /// Fetch documents of classified meetings into the meetings directory
    Materialize,
    /// Discover, auto-classify and materialize in one go
    Sync {
        #[arg(long, default_value_t = AutoPolicy::Patterns)]
        policy: AutoPolicy,
    },
    /// Change a meeting's title, slug, tag, recurrence or flags
    Edit {
        stable_id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        slug: Option<String>,

        #[arg(long)]
        tag: Option<String>,

        /// Mark the meeting recurring
        #[arg(long, conflicts_with = "one_off")]
        recurring: bool,

        /// Mark the meeting one-off
        #[arg(long)]
        one_off: bool,

        #[arg(long)]
        one_on_one: Option<bool>,

        #[arg(long)]
        manual_capture: Option<bool>,
    },
    /// Stop discovering the series a meeting belongs to
    Ignore {
        stable_id: String,

        #[arg(long, default_value = "")]
        reason: String,
    },
    /// Resume discovering an ignored series
    Unignore { signature: String },
    /// List meetings
    List {
        #[arg(long)]
        tag: Option<String>,

        #[arg(long)]
        recurring: Option<bool>,

        #[arg(long)]
        status: Option<MeetingStatus>,

        #[arg(long)]
        orphaned: Option<bool>,

        #[arg(long)]
        one_on_one: Option<bool>,

        /// Meetings from this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Meetings until this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        #[arg(long)]
        json: bool,
    },
    /// Show counts, checkpoints and pending decisions
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Compare the meetings directory with the record log
    Doctor {
        /// Move directories whose meeting now belongs elsewhere
        #[arg(long)]
        fix: bool,
    },
    /// Manage tags
    Tag {
        #[command(subcommand)]
        command: TagCommands,
    },
    /// Rewrite the record log keeping only current records
    Compact,
}

#[derive(Subcommand)]
enum TagCommands {
    List,
    Add {
        name: String,

        #[arg(short, long, default_value = "")]
        description: String,

        /// Hex color, e.g. #e63946
        #[arg(short, long)]
        color: Option<String>,
    },
    Update {
        name: String,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long)]
        color: Option<String>,
    },
    Rename {
        from: String,
        to: String,
    },
    Delete {
        name: String,

        /// Delete even if meetings still use the tag
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let meetdir = MeetDir::load()?;
    init_tracing(&meetdir, cli.verbose);

    match cli.command {
        Commands::Discover { since, until } => {
            commands::discover::run(&meetdir, since.as_deref(), until.as_deref()).await
        }
        Commands::Pending { json } => commands::pending::run(&meetdir, json),
        Commands::Classify { decisions } => commands::classify::run(&meetdir, &decisions),
        Commands::Auto { policy } => commands::auto::run(&meetdir, policy),
        Commands::Materialize => commands::materialize::run(&meetdir).await,
        Commands::Sync { policy } => commands::sync::run(&meetdir, policy).await,
        Commands::Edit {
            stable_id,
            title,
            slug,
            tag,
            recurring,
            one_off,
            one_on_one,
            manual_capture,
        } => {
            let recurring = match (recurring, one_off) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            let edit = meetdir_core::classify::MeetingEdit {
                title,
                slug,
                tag,
                recurring,
                one_on_one,
                manual_capture_needed: manual_capture,
            };
            commands::edit::run(&meetdir, &stable_id, edit)
        }
        Commands::Ignore { stable_id, reason } => {
            commands::ignore::run(&meetdir, &stable_id, &reason)
        }
        Commands::Unignore { signature } => commands::ignore::run_unignore(&meetdir, &signature),
        Commands::List {
            tag,
            recurring,
            status,
            orphaned,
            one_on_one,
            from,
            to,
            json,
        } => {
            let range = match (from.as_deref(), to.as_deref()) {
                (None, None) => None,
                (from, to) => Some(
                    meetdir_core::date_range::DateRange::from_args(from, to)
                        .map_err(|e| anyhow::anyhow!(e))?,
                ),
            };
            let query = meetdir_core::query::MeetingQuery {
                tag,
                recurring,
                status,
                orphaned,
                one_on_one,
                range,
            };
            commands::list::run(&meetdir, &query, json)
        }
        Commands::Status { json } => commands::status::run(&meetdir, json),
        Commands::Doctor { fix } => commands::doctor::run(&meetdir, fix),
        Commands::Tag { command } => match command {
            TagCommands::List => commands::tag::list(&meetdir),
            TagCommands::Add {
                name,
                description,
                color,
            } => commands::tag::add(&meetdir, &name, &description, color),
            TagCommands::Update {
                name,
                description,
                color,
            } => commands::tag::update(&meetdir, &name, description.as_deref(), color),
            TagCommands::Rename { from, to } => commands::tag::rename(&meetdir, &from, &to),
            TagCommands::Delete { name, force } => commands::tag::delete(&meetdir, &name, force),
        },
        Commands::Compact => commands::compact::run(&meetdir),
    }
}

/// `MEETDIR_LOG` wins, then `--verbose`, then the configured level.
fn init_tracing(meetdir: &MeetDir, verbose: bool) {
    let fallback = if verbose {
        "debug"
    } else {
        meetdir.config().log_level.as_deref().unwrap_or("warn")
    };

    let filter = EnvFilter::try_from_env("MEETDIR_LOG")
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_classify_decisions() {
        let cli = Cli::try_parse_from(["meetdir", "classify", "1=team,r", "2=customers,o,acme"]).unwrap();
        match cli.command {
            Commands::Classify { decisions } => assert_eq!(decisions, vec!["1=team,r", "2=customers,o,acme"]),
            _ => panic!("expected classify"),
        }
    }

    #[test]
    fn test_parse_auto_policy() {
        let cli = Cli::try_parse_from(["meetdir", "sync", "--policy", "heuristics"]).unwrap();
        assert!(matches!(cli.command, Commands::Sync { policy: AutoPolicy::Heuristics }));

        assert!(Cli::try_parse_from(["meetdir", "auto", "--policy", "everything"]).is_err());
    }

    #[test]
    fn test_edit_recurring_conflicts_with_one_off() {
        let result = Cli::try_parse_from(["meetdir", "edit", "evt1", "--recurring", "--one-off"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_list_status_filter() {
        let cli = Cli::try_parse_from(["meetdir", "list", "--status", "synced", "--json"]).unwrap();
        match cli.command {
            Commands::List { status, json, .. } => {
                assert_eq!(status, Some(MeetingStatus::Synced));
                assert!(json);
            }
            _ => panic!("expected list"),
        }
    }
}
