//! Audio extraction for the diarized transcription path.

mod extractor;

pub use extractor::{extract_audio, ExtractedAudio};
