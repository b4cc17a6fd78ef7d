//! Tekst - Transcript Acquisition and Playback Sync
//!
//! A local-first tool that turns videos into timestamped, speaker-attributed
//! transcripts for language learners and keeps them in step with playback.
//!
//! The name "Tekst" is the Norwegian/Scandinavian word for "text."
//!
//! # Overview
//!
//! Tekst allows you to:
//! - Scrape native caption tracks for YouTube videos
//! - Transcribe audio with speaker diarization
//! - Refine noisy captions into full sentences with speaker labels, one
//!   refined line per original segment
//! - Follow a transcript along with playback, with word highlighting and
//!   segment looping
//!
//! # Architecture
//!
//! - `config` - Configuration management and prompt templates
//! - `transcript` - Segment and transcript model, lookup and export
//! - `captions` - Caption track scraping and parsing
//! - `audio` - Audio extraction with yt-dlp
//! - `diarization` - Speaker-diarized transcription service client
//! - `refine` - Chunked LLM refinement
//! - `cache` - Transcript cache
//! - `sync` - Playback synchronization loop
//! - `orchestrator` - Acquisition pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use tekst::config::Settings;
//! use tekst::orchestrator::{AcquireOptions, Orchestrator};
//! use tekst::sync::SyncEngine;
//! use tekst::transcript::SegmentIndex;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let options = AcquireOptions::from_settings(&settings);
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let acquisition = orchestrator.acquire("dQw4w9WgXcQ", Some("de"), options).await?;
//!     println!("{} segments", acquisition.transcript.len());
//!
//!     let mut engine = SyncEngine::new(SegmentIndex::from(acquisition.transcript), 0.1);
//!     let outcome = engine.tick(12.5);
//!     println!("active segment: {:?}", outcome.state.active_segment);
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod cache;
pub mod captions;
pub mod cli;
pub mod config;
pub mod diarization;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod refine;
pub mod sync;
pub mod transcript;

pub use error::{Result, TekstError};
