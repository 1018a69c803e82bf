//! Zoomcast CLI — inspect click logs, render single frames, export videos.
//!
//! Usage:
//!   zoomcast sequences <EVENTS>              Show grouped click sequences
//!   zoomcast resolve <EVENTS> --at <SECS>    Show the zoom decision at a time
//!   zoomcast frame <VIDEO> <EVENTS> ...      Compose one frame to a PNG
//!   zoomcast export <VIDEO> <EVENTS> ...     Export a zoom-composed MP4
//!   zoomcast check                           Check encoder availability

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "zoomcast",
    about = "Zoom-to-cursor video compositing from recorded click logs",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show how a click log groups into zoom sequences
    Sequences {
        /// Path to the click event log (JSON array)
        events: PathBuf,
    },

    /// Show the resolved zoom decision at a media time
    Resolve {
        /// Path to the click event log (JSON array)
        events: PathBuf,

        /// Media time to resolve (seconds)
        #[arg(long)]
        at: f64,

        /// Print the decision as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compose a single frame and write it as a PNG
    Frame {
        /// Path to the source video
        video: PathBuf,

        /// Path to the click event log (JSON array)
        events: PathBuf,

        /// Media time of the frame (seconds)
        #[arg(long, default_value = "0.0")]
        at: f64,

        /// Output PNG path
        #[arg(short, long, default_value = "frame.png")]
        output: PathBuf,

        /// Use a generated test pattern instead of decoding the video
        #[arg(long)]
        synthetic: bool,
    },

    /// Export the video with zoom composition applied
    Export {
        /// Path to the source video
        video: PathBuf,

        /// Path to the click event log (JSON array)
        events: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Export frame rate
        #[arg(long)]
        fps: Option<u32>,

        /// Video bitrate in kbit/s
        #[arg(long)]
        bitrate_kbps: Option<u32>,
    },

    /// Check encoder and muxer availability
    Check,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    zoomcast_common::logging::init_logging(&zoomcast_common::config::LoggingConfig {
        level: log_level.to_string(),
        json: false,
        file: None,
    });

    match cli.command {
        Commands::Sequences { events } => commands::sequences::run(events),
        Commands::Resolve { events, at, json } => commands::resolve::run(events, at, json),
        Commands::Frame {
            video,
            events,
            at,
            output,
            synthetic,
        } => commands::frame::run(video, events, at, output, synthetic),
        Commands::Export {
            video,
            events,
            output,
            fps,
            bitrate_kbps,
        } => commands::export::run(video, events, output, fps, bitrate_kbps),
        Commands::Check => commands::check::run(),
    }
}
