//! Clipweave CLI: compile markup documents into videos.
//!
//! Usage:
//!   clipweave render <PATH>     Render a document to a video file
//!   clipweave preview <PATH>    Render one frame to an image
//!   clipweave inspect <PATH>    Print the resolved content tree
//!   clipweave check             Check for ffmpeg and ffprobe

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "clipweave",
    about = "Compile markup timelines into ffmpeg renders",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to the user config location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a document to a video file
    Render {
        /// Path to the markup document
        path: PathBuf,

        /// Output file path (defaults to the document name with the format's extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: mp4-h264|mp4-h265|webm|gif
        #[arg(long)]
        format: Option<String>,

        /// Replace an existing output file
        #[arg(short = 'y', long)]
        overwrite: bool,

        /// Print the ffmpeg command instead of running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Render a single frame to an image
    Preview {
        /// Path to the markup document
        path: PathBuf,

        /// Zero-based frame index
        #[arg(short, long, default_value = "0")]
        frame: u64,

        /// Output image path
        #[arg(short, long, default_value = "preview.png")]
        output: PathBuf,
    },

    /// Print the resolved content tree
    Inspect {
        /// Path to the markup document
        path: PathBuf,

        /// Emit the full tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that ffmpeg and ffprobe are available
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => clipweave_common::config::AppConfig::load_from(path),
        None => clipweave_common::config::AppConfig::load(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    clipweave_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Render {
            path,
            output,
            format,
            overwrite,
            dry_run,
        } => commands::render::run(&config, path, output, format, overwrite, dry_run).await,
        Commands::Preview {
            path,
            frame,
            output,
        } => commands::preview::run(&config, path, frame, output).await,
        Commands::Inspect { path, json } => commands::inspect::run(&config, path, json),
        Commands::Check => commands::check::run(&config),
    }
}
