//! shelfscan - reporting and admin CLI for the detection store
//!
//! Reads and updates the SQLite store written by the detection pipeline.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/shelfscan/detections.db (~/.local/share/shelfscan/detections.db)
//! - Config: $XDG_CONFIG_HOME/shelfscan/config.toml (~/.config/shelfscan/config.toml)
//! - Logs: $XDG_STATE_HOME/shelfscan/shelfscan.log

mod render;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use shelfscan_core::{Config, DetectionFilter, DetectionStore, DEFAULT_MIN_SAMPLES};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "shelfscan")]
#[command(about = "Query and manage the shelfscan detection store")]
#[command(version)]
struct Args {
    /// Database file (overrides the configured path)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database and its tables if missing
    Init,

    /// Show detection and video counts
    Stats,

    /// List detections, most recent first
    Detections {
        /// Earliest detection date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Latest detection date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Product category
        #[arg(long)]
        category: Option<String>,

        /// Branch location
        #[arg(long)]
        branch: Option<String>,

        /// Maximum rows to return
        #[arg(short, long, default_value_t = shelfscan_core::db::DEFAULT_DETECTION_LIMIT)]
        limit: usize,
    },

    /// Aggregate detections into training rows
    TrainingData {
        /// First date of the window (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last date of the window (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// Drop groups with fewer detections than this
        #[arg(long, default_value_t = DEFAULT_MIN_SAMPLES)]
        min_samples: u32,
    },

    /// Show one video's processing status
    Video {
        /// Video ID
        id: String,
    },

    /// List registered videos
    Videos {
        /// Only videos not yet processed
        #[arg(long, conflicts_with = "processed")]
        pending: bool,

        /// Only processed videos
        #[arg(long)]
        processed: bool,
    },

    /// Mark a video as processed
    MarkProcessed {
        /// Video ID
        id: String,
    },

    /// List recorded model metrics, newest first
    Metrics {
        /// Only this model version
        #[arg(long)]
        model_version: Option<String>,

        /// Maximum rows to return
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard =
        shelfscan_core::logging::init(&config.logging).context("failed to initialize logging")?;

    // Open database
    let db_path = args.db.clone().unwrap_or_else(|| config.database_path());
    tracing::info!(path = %db_path.display(), "Opening detection store");
    let store = DetectionStore::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;

    run(&store, args.command, args.format)
}

fn run(store: &DetectionStore, command: Command, format: OutputFormat) -> Result<()> {
    match command {
        Command::Init => {
            println!("Initialized detection store at {}", store.path().display());
            println!(
                "Logging to {}",
                shelfscan_core::logging::log_file_path().display()
            );
        }

        Command::Stats => {
            let stats = store.get_stats().context("failed to read stats")?;
            match format {
                OutputFormat::Json => render::print_json(&stats)?,
                OutputFormat::Text => render::print_stats(&stats),
            }
        }

        Command::Detections {
            start,
            end,
            category,
            branch,
            limit,
        } => {
            let filter = DetectionFilter {
                start_date: start,
                end_date: end,
                category,
                branch,
                limit,
            };
            let detections = store
                .get_detections(&filter)
                .context("failed to query detections")?;
            match format {
                OutputFormat::Json => render::print_json(&detections)?,
                OutputFormat::Text => render::print_detections(&detections),
            }
        }

        Command::TrainingData {
            start,
            end,
            min_samples,
        } => {
            let rows = store
                .get_training_data(start, end, min_samples)
                .context("failed to aggregate training data")?;
            match format {
                OutputFormat::Json => render::print_json(&rows)?,
                OutputFormat::Text => render::print_training_rows(&rows),
            }
        }

        Command::Video { id } => {
            let video = store
                .get_video_status(&id)
                .context("failed to read video")?
                .with_context(|| format!("No video found with id '{}'", id))?;
            match format {
                OutputFormat::Json => render::print_json(&video)?,
                OutputFormat::Text => render::print_videos(std::slice::from_ref(&video)),
            }
        }

        Command::Videos { pending, processed } => {
            let state = match (pending, processed) {
                (true, _) => Some(false),
                (_, true) => Some(true),
                _ => None,
            };
            let videos = store.list_videos(state).context("failed to list videos")?;
            match format {
                OutputFormat::Json => render::print_json(&videos)?,
                OutputFormat::Text => render::print_videos(&videos),
            }
        }

        Command::MarkProcessed { id } => {
            let updated = store
                .mark_video_processed(&id)
                .context("failed to mark video processed")?;
            if updated {
                println!("Marked video {} as processed", id);
            } else {
                println!("No video with id '{}'; nothing changed", id);
            }
        }

        Command::Metrics {
            model_version,
            limit,
        } => {
            let metrics = store
                .list_model_metrics(model_version.as_deref(), limit)
                .context("failed to list model metrics")?;
            match format {
                OutputFormat::Json => render::print_json(&metrics)?,
                OutputFormat::Text => render::print_model_metrics(&metrics),
            }
        }
    }

    Ok(())
}
