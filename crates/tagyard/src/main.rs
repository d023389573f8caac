//! Tagyard CLI - Batch tagging and captioning for image training datasets.
//!
//! Tagyard runs every image in a dataset folder through a tagging
//! classifier, caches the raw predictions by content hash, and writes the
//! transformed captions into `.txt` sidecar files.
//!
//! # Usage
//!
//! ```bash
//! # Tag a dataset folder
//! tagyard run ./dataset/
//!
//! # Tag with adaptive thresholds
//! tagyard run ./dataset/ --general-mcut
//!
//! # Inspect one image
//! tagyard predict ./dataset/image.png
//!
//! # Record a manual caption edit
//! tagyard edit set ./dataset/image.png "1girl, red dress, solo"
//!
//! # Manage models
//! tagyard models download
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Tagyard - Batch tagging and captioning for image training datasets.
#[derive(Parser, Debug)]
#[command(name = "tagyard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Tag every image in a dataset folder and write caption sidecars
    Run(cli::run::RunArgs),

    /// Predict tags for a single image and print them
    Predict(cli::predict::PredictArgs),

    /// Record, show, or reset manual caption edits
    Edit(cli::edit::EditArgs),

    /// List recently used dataset folders
    Recent(cli::recent::RecentArgs),

    /// View and change per-dataset settings
    Settings(cli::settings::SettingsArgs),

    /// Manage tagging models (download, list, etc.)
    Models(cli::models::ModelsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging from config, with CLI verbose override.
    // Note: logging isn't initialized yet, so use eprintln for config warnings.
    let config = match tagyard_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `tagyard config path`."
            );
            tagyard_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Tagyard v{}", tagyard_core::VERSION);

    // Dispatch to the appropriate command handler
    match cli.command {
        Commands::Run(args) => cli::run::execute(args, config),
        Commands::Predict(args) => cli::predict::execute(args, config),
        Commands::Edit(args) => cli::edit::execute(args, config),
        Commands::Recent(args) => cli::recent::execute(args, config),
        Commands::Settings(args) => cli::settings::execute(args, config),
        Commands::Models(args) => cli::models::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args),
    }
}
