//! # CLI Module
//!
//! Command-line interface for the photo ingestion pipeline.
//!
//! ## Usage
//! ```bash
//! # Push photos from an inbox into the library
//! photo-push push ~/Photos/inbox ~/Photos/library
//!
//! # Simulate first
//! photo-push push ~/Photos/inbox ~/Photos/library --dry-run
//!
//! # Without duplicate detection, JSON result for scripting
//! photo-push push ~/Photos/inbox ~/Photos/library --no-dedupe --output json
//! ```
//!
//! The CLI never injects a processor: pushed files remain staged under
//! temporary names until a conversion step runs. That is the documented
//! terminal state for CLI-only use.

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use photo_porter::config::{DedupeSelection, IngestConfig};
use photo_porter::core::dedup::DedupeMode;
use photo_porter::core::pipeline::Pipeline;
use photo_porter::error::Result;
use photo_porter::events::{DirectoryVerifier, Event, EventBridge, EventBus};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Photo Porter - push photos without losing a single one
#[derive(Parser, Debug)]
#[command(name = "photo-push")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stage photos from a source directory into a destination
    Push {
        /// Source directory (falls back to config)
        source: Option<PathBuf>,

        /// Destination directory (falls back to config)
        destination: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Simulate without touching any file
        #[arg(long)]
        dry_run: bool,

        /// Disable content deduplication
        #[arg(long)]
        no_dedupe: bool,

        /// Leave sidecar files behind
        #[arg(long)]
        skip_sidecars: bool,

        /// Cross-check the run with the directory verifier
        #[arg(long)]
        verify: bool,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Push {
            source,
            destination,
            config,
            dry_run,
            no_dedupe,
            skip_sidecars,
            verify,
            output,
        } => run_push(
            source,
            destination,
            config,
            dry_run,
            no_dedupe,
            skip_sidecars,
            verify,
            output,
        ),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_push(
    source: Option<PathBuf>,
    destination: Option<PathBuf>,
    config_path: Option<PathBuf>,
    dry_run: bool,
    no_dedupe: bool,
    skip_sidecars: bool,
    verify: bool,
    output: OutputFormat,
) -> Result<()> {
    let term = Term::stderr();

    if matches!(output, OutputFormat::Pretty) {
        term.write_line(&format!(
            "{} {}",
            style("Photo Porter").bold().cyan(),
            style(env!("CARGO_PKG_VERSION")).dim()
        ))
        .ok();
    }

    let config = IngestConfig::load(config_path.as_deref())?;
    let (source, destination) = config.resolved_paths(source, destination)?;

    let dedupe = if no_dedupe || config.dedupe == DedupeSelection::Disabled {
        DedupeMode::Disabled
    } else {
        DedupeMode::Default
    };

    let bus = Arc::new(EventBus::new());
    let verifier = if verify && !(dry_run || config.dry_run) {
        Some(
            DirectoryVerifier::new(&[source.as_path(), destination.as_path()], bus.clone())
                .map_err(|e| {
                    photo_porter::error::StageError::ReadDirectory {
                        path: destination.clone(),
                        source: e,
                    }
                })?,
        )
    } else {
        None
    };

    // Spinner fed from the event bridge on its own thread
    let (bridge, receiver) = EventBridge::attach(bus.clone());
    let spinner = matches!(output, OutputFormat::Pretty).then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .expect("spinner template is valid"),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        bar
    });
    let progress = spinner.clone();
    let drain = thread::spawn(move || {
        for event in receiver.iter() {
            let message = match &event {
                Event::Copied(e) => format!("staged {}", e.destination_name()),
                Event::Renamed(e) => format!("finalized {}", e.new_path.display()),
                Event::Deleted(e) => format!("removed {}", e.file_path.display()),
            };
            if let Some(bar) = &progress {
                bar.set_message(message);
            }
        }
    });

    let pipeline = Pipeline::builder(&source, &destination)
        .dry_run(dry_run || config.dry_run)
        .dedupe(dedupe)
        .migrate_sidecars(!skip_sidecars && config.migrate_sidecars)
        .ensure_unique_timestamps(config.ensure_unique_timestamps)
        .bus(bus)
        .build();

    let result = pipeline.run();

    drop(bridge);
    drain.join().ok();
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    let result = result?;

    match output {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&result).unwrap_or_default()
            );
        }
        OutputFormat::Pretty => {
            term.write_line(&format!("{}", style(&result).green())).ok();
            if result.processed == 0 && result.staged > 0 && !(dry_run || config.dry_run) {
                term.write_line(
                    &style("files remain staged under temp names until a processor runs")
                        .dim()
                        .to_string(),
                )
                .ok();
            }
        }
    }

    if let Some(verifier) = verifier {
        let passed = verifier.report();
        if matches!(output, OutputFormat::Pretty) {
            let line = if passed {
                style("verification passed").green().to_string()
            } else {
                style("verification FAILED - see log for discrepancies")
                    .red()
                    .to_string()
            };
            term.write_line(&line).ok();
        }
    }

    Ok(())
}
