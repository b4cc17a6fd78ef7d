//! Caption extraction.
//!
//! Retrieves a native caption track for a media item, picks the track that best
//! matches the requested language and parses it into timestamped segments.

mod parser;
mod youtube;

pub use parser::{
    caption_tracks, extract_player_response, parse_caption_xml, select_track, unescape_xml,
    CaptionTrack,
};
pub use youtube::{extract_video_id, YoutubeCaptionExtractor};

use crate::error::Result;
use crate::transcript::{Segment, Transcript};
use async_trait::async_trait;

/// A source of raw caption transcripts.
#[async_trait]
pub trait CaptionSource: Send + Sync {
    /// Extract the caption transcript for `media_id`, preferring `preferred_language`.
    ///
    /// Fails with `NoCaptionsAvailable` when there is no caption metadata, no
    /// track, or the selected track yields no segments.
    async fn extract(&self, media_id: &str, preferred_language: &str) -> Result<Transcript>;
}

const DEMO_LANGUAGE: &str = "de";
const DEMO_DURATION_SECONDS: f64 = 60.0;
const DEMO_TEXT: &str = "Hallo und herzlich willkommen zu unserem Video über die deutsche Sprache. \
Heute werden wir über die Grundlagen der Grammatik sprechen. Die deutsche Sprache hat vier Fälle \
der Nominativ der Akkusativ der Dativ und der Genitiv. Jeder Fall hat seine eigene Funktion im Satz. \
Der Nominativ wird für das Subjekt verwendet. Der Akkusativ zeigt das direkte Objekt. Der Dativ wird \
für das indirekte Objekt benutzt. Und der Genitiv zeigt Besitz oder Zugehörigkeit an. Dies sind die \
wichtigsten Konzepte die man am Anfang lernen sollte. Vielen Dank fürs Zuschauen und bis zum nächsten Mal";

/// The fixed single-segment transcript shown when no captions could be acquired.
pub fn demo_transcript(media_id: &str) -> Transcript {
    let mut transcript = Transcript::new(
        media_id,
        DEMO_LANGUAGE,
        vec![Segment::new(DEMO_TEXT, 0.0, DEMO_DURATION_SECONDS)],
    );
    transcript.is_demo = true;
    transcript
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_transcript_shape() {
        let demo = demo_transcript("abc");
        assert!(demo.is_demo);
        assert_eq!(demo.len(), 1);
        assert_eq!(demo.language, "de");
        assert_eq!(demo.segments[0].duration, 60.0);
        assert!(demo.raw_text().starts_with("Hallo und herzlich willkommen"));
    }
}
