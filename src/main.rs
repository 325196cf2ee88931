use std::{io::Write, path::PathBuf};

use clap::{Parser, Subcommand};
use colored::*;
use jiff::{Zoned, tz::TimeZone};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    models::activity::{Activity, ActivityDraft, ActivityInputError, parse_activity_date},
    services::{
        activities::{ActivityStore, ResolveActivityError, StoreError, find_activity},
        report::{generate_report, organization_breakdown, report_file_name},
    },
    storage::{Storage, json::JsonFileStorage},
    ui::Highlight,
};

mod models;
mod notifications;
mod services;
mod storage;
mod ui;

#[derive(Parser)]
#[command(
    name = "vtrack",
    about = "Log and total your volunteer hours from the terminal"
)]
struct Cli {
    /// Directory where activities are stored
    #[arg(long, global = true, env = "VTRACK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all activities
    List,

    /// Log a new activity
    Add {
        /// Activity name
        name: String,

        /// Organization the time was given to
        #[arg(short, long)]
        organization: String,

        /// What was done
        #[arg(short = 'D', long)]
        description: String,

        /// When it happened (e.g., "2025-03-01"), defaults to now
        #[arg(short, long)]
        date: Option<String>,

        /// Hours spent
        #[arg(short = 'H', long, default_value_t = 0)]
        hours: u32,

        /// Minutes spent (0-59)
        #[arg(short, long, default_value_t = 0)]
        minutes: u32,
    },

    /// Edit an activity
    Edit {
        /// Position in the list or part of the name/organization
        activity: String,

        /// New activity name
        #[arg(short, long)]
        name: Option<String>,

        /// New organization
        #[arg(short, long)]
        organization: Option<String>,

        /// New description
        #[arg(short = 'D', long)]
        description: Option<String>,

        /// New date (e.g., "2025-03-01")
        #[arg(short, long)]
        date: Option<String>,

        /// New hours
        #[arg(short = 'H', long)]
        hours: Option<u32>,

        /// New minutes (0-59)
        #[arg(short, long)]
        minutes: Option<u32>,
    },

    /// Delete an activity (can be undone with `vtrack undo`)
    Delete {
        /// Position in the list or part of the name/organization
        activity: String,
    },

    /// Restore the most recently deleted activity
    Undo,

    /// Move an activity to another position
    Move {
        /// Current position
        from: usize,
        /// New position
        to: usize,
    },

    /// Delete all activities
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Show total time and activity count
    Summary,

    /// Show hours by organization
    Chart,

    /// Write a Markdown summary report
    Export {
        /// Output file, defaults to ./volunteer-summary-<date>.md
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("VTRACK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn exit_with_resolve_error(error: ResolveActivityError) -> ! {
    match error {
        ResolveActivityError::ActivityNotFound(reference) => {
            eprintln!("Error: Activity '{}' not found", reference);
            eprintln!("\nUse a position from `vtrack list` or part of the name.");
        }
        ResolveActivityError::AmbiguousActivity(labels) => {
            eprintln!("Error: Activity reference is ambiguous. Multiple activities found:");
            for label in labels {
                eprintln!("  - {}", label);
            }
            eprintln!("\nPlease be more specific or use the position.");
        }
    }
    std::process::exit(1);
}

fn exit_with_input_error(error: ActivityInputError) -> ! {
    eprintln!("Error: {}", error);
    match error {
        ActivityInputError::InvalidDate(_) => {
            eprintln!("\nExample: vtrack add 'Trail Cleanup' -o 'Parks Dept' -D 'Litter pickup' --date 2025-03-01 -H 2");
        }
        ActivityInputError::ZeroDuration | ActivityInputError::MinutesOutOfRange(_) => {
            eprintln!("\nUse --hours and --minutes (0-59) to set how long it took.");
        }
        _ => {}
    }
    std::process::exit(1);
}

fn exit_with_store_error(error: StoreError) -> ! {
    eprintln!("Error: {}", error);
    std::process::exit(1);
}

/// Persistence failures do not undo the command, so only warn about them
fn warn_on_persistence_error<S: Storage>(store: &mut ActivityStore<S>) {
    if let Some(error) = store.take_persistence_error() {
        eprintln!("{} {}", "Warning:".yellow().bold(), error);
    }
}

fn confirm(prompt: &str) -> bool {
    print!("{} [y/N] ", prompt);
    if std::io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn main() {
    let cli = Cli::parse();

    init_tracing();

    let data_dir = cli.data_dir.unwrap_or_else(|| {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vtrack")
    });

    // Create data directory if it doesn't exist
    std::fs::create_dir_all(&data_dir).unwrap_or_else(|e| {
        eprintln!("Error: Failed to create data directory: {}", e);
        std::process::exit(1);
    });

    let storage = JsonFileStorage::new(data_dir);
    let mut store = ActivityStore::initialize(storage);

    let highlight = Highlight::new();
    highlight.attach(&mut store);

    match cli.command {
        None => {
            ui::render_activity_list(store.activities(), &highlight);
            ui::render_summary(&store);
        }
        Some(Commands::List) => {
            ui::render_activity_list(store.activities(), &highlight);
        }
        Some(Commands::Add {
            name,
            organization,
            description,
            date,
            hours,
            minutes,
        }) => {
            let draft = ActivityDraft::from_command_args(
                name,
                organization,
                description,
                date,
                hours,
                minutes,
            )
            .unwrap_or_else(|e| exit_with_input_error(e));

            let activity = store.add(draft);
            warn_on_persistence_error(&mut store);

            println!(
                "{} Logged \"{}\" ({})",
                "✓".green(),
                activity.label(),
                ui::activity_duration(&activity)
            );
            ui::render_activity_list(store.activities(), &highlight);
        }
        Some(Commands::Edit {
            activity,
            name,
            organization,
            description,
            date,
            hours,
            minutes,
        }) => {
            let existing = find_activity(store.activities(), &activity)
                .unwrap_or_else(|e| exit_with_resolve_error(e))
                .clone();

            let mut draft = ActivityDraft::from(existing.clone());
            if let Some(name) = name {
                draft.name = name;
            }
            if let Some(organization) = organization {
                draft.organization = organization;
            }
            if let Some(description) = description {
                draft.description = description;
            }
            if let Some(date) = date {
                draft.date = parse_activity_date(&date).unwrap_or_else(|e| exit_with_input_error(e));
            }
            if let Some(hours) = hours {
                draft.hours = hours;
            }
            if let Some(minutes) = minutes {
                draft.minutes = minutes;
            }
            draft.validate().unwrap_or_else(|e| exit_with_input_error(e));

            let updated = Activity::from_draft(existing.id, draft);
            if let Err(e) = store.edit(updated.clone()) {
                exit_with_store_error(e);
            }
            warn_on_persistence_error(&mut store);

            println!("{} Updated \"{}\"", "✓".green(), updated.label());
        }
        Some(Commands::Delete { activity }) => {
            let id = find_activity(store.activities(), &activity)
                .unwrap_or_else(|e| exit_with_resolve_error(e))
                .id;

            let deleted = store.delete(id).unwrap_or_else(|e| exit_with_store_error(e));
            warn_on_persistence_error(&mut store);

            println!(
                "{} Deleted \"{}\". Run {} to restore it.",
                "✓".green(),
                deleted.label(),
                "vtrack undo".bold()
            );
        }
        Some(Commands::Undo) => match store.restore() {
            Some(activity) => {
                warn_on_persistence_error(&mut store);
                let position = store.position_of(activity.id).map_or(0, |index| index + 1);
                println!(
                    "{} Restored \"{}\" at position {}",
                    "✓".green(),
                    activity.label(),
                    position
                );
                ui::render_activity_list(store.activities(), &highlight);
            }
            None => {
                println!("Nothing to restore");
            }
        },
        Some(Commands::Move { from, to }) => {
            // Positions are shown 1-based
            let from_index = from.checked_sub(1).unwrap_or(usize::MAX);
            let to_index = to.checked_sub(1).unwrap_or(usize::MAX);

            match store.reorder(from_index, to_index) {
                Ok(()) => {
                    warn_on_persistence_error(&mut store);
                    ui::render_activity_list(store.activities(), &highlight);
                }
                Err(StoreError::IndexOutOfRange { len, .. }) => {
                    eprintln!("Error: {}", ui::move_out_of_range_message(len, from, to));
                    std::process::exit(1);
                }
                Err(e) => exit_with_store_error(e),
            }
        }
        Some(Commands::Clear { yes }) => {
            if store.is_empty() && store.pending_deletion().is_none() {
                println!("No activities to clear");
                return;
            }

            let prompt = ui::clear_confirmation_prompt(store.len(), store.pending_deletion());
            if !yes && !confirm(&prompt) {
                println!("Cancelled");
                return;
            }

            store.clear_all();
            warn_on_persistence_error(&mut store);
            println!("{} All volunteer activities have been deleted.", "✓".green());
        }
        Some(Commands::Summary) => {
            ui::render_summary(&store);
        }
        Some(Commands::Chart) => {
            ui::render_distribution_chart(&organization_breakdown(store.activities()));
        }
        Some(Commands::Export { output }) => {
            if store.is_empty() {
                eprintln!("Error: There are no activities to export");
                std::process::exit(1);
            }

            let today = Zoned::now().date();
            let report = generate_report(
                store.activities(),
                store.total_duration(),
                today,
                &TimeZone::system(),
            );
            let path = output.unwrap_or_else(|| PathBuf::from(report_file_name(today)));

            std::fs::write(&path, report).unwrap_or_else(|e| {
                eprintln!("Error: Failed to write report to '{}': {}", path.display(), e);
                std::process::exit(1);
            });
            println!("{} Summary written to {}", "✓".green(), path.display());
        }
    }
}
