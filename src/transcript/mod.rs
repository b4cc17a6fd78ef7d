//! Transcript model shared by acquisition, refinement, caching and sync.
//!
//! - `models` - segments, words and transcripts
//! - `index` - the read-only segment/word index the sync loop resolves against
//! - `format` - JSON, SRT and WebVTT export

mod format;
mod index;
mod models;

pub use format::{format_transcript, OutputFormat, TranscriptExport};
pub use index::SegmentIndex;
pub use models::{format_timestamp, Segment, Transcript, Word, DEFAULT_SPEAKER};
