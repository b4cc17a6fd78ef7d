//! CLI module for Tekst.

pub mod commands;
mod output;
pub mod preflight;

pub use output::{content_preview, format_duration, Output};

use clap::{Parser, Subcommand};

/// Tekst - timestamped transcripts for language learning
///
/// Fetches captions or speaker-diarized transcripts for videos, refines them
/// into full sentences and follows along with playback.
#[derive(Parser, Debug)]
#[command(name = "tekst")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check system requirements and configuration
    Doctor,

    /// Acquire a transcript and print or export it
    Fetch {
        /// YouTube URL or video ID
        media: String,

        /// Preferred transcript language (defaults to captions.default_language)
        #[arg(short, long)]
        language: Option<String>,

        /// Transcript source (captions, diarized)
        #[arg(short, long, default_value = "captions")]
        source: String,

        /// Skip LLM refinement of captions
        #[arg(long)]
        no_refine: bool,

        /// Ignore the cache and acquire again
        #[arg(short, long)]
        force: bool,

        /// Fail instead of showing the demo transcript when no captions exist
        #[arg(long)]
        no_demo: bool,

        /// Write the transcript to a file instead of printing it
        #[arg(short, long)]
        output: Option<String>,

        /// Output format when using --output (json, srt, vtt)
        #[arg(long, default_value = "json")]
        format: String,
    },

    /// Follow a transcript along with simulated playback
    Play {
        /// YouTube URL or video ID
        media: String,

        /// Preferred transcript language
        #[arg(short, long)]
        language: Option<String>,

        /// Transcript source (captions, diarized)
        #[arg(short, long, default_value = "captions")]
        source: String,

        /// Loop the first segment reached
        #[arg(long = "loop")]
        looping: bool,

        /// Start position in seconds
        #[arg(long, default_value = "0")]
        from: f64,

        /// Playback speed multiplier
        #[arg(long, default_value = "1.0")]
        speed: f64,
    },

    /// Inspect and manage cached transcripts
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Start HTTP API server for the transcript front end
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3001")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List cached transcripts
    List,

    /// Print a cached transcript
    Show {
        /// Video ID or URL
        media: String,

        /// Cache language slot
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Remove a cached transcript (all languages unless --language is given)
    Remove {
        /// Video ID or URL
        media: String,

        #[arg(short, long)]
        language: Option<String>,
    },

    /// Remove every cached transcript
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
