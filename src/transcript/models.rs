//! Data models for timestamped transcripts.

use serde::{Deserialize, Serialize};

/// Speaker assumed when a segment carries no label.
pub const DEFAULT_SPEAKER: &str = "Speaker 1";

/// A single word with its own timing, as returned by diarized transcription.
///
/// Word timing is only softly contained in the parent segment; consumers must
/// not assume `start >= segment.start` or `end <= segment.end()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    /// The word text.
    #[serde(default)]
    pub text: String,
    /// Start time in seconds.
    #[serde(default)]
    pub start: f64,
    /// End time in seconds.
    #[serde(default)]
    pub end: f64,
}

impl Word {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }

    /// Whether the word is being spoken at `time` (half-open interval).
    pub fn is_active_at(&self, time: f64) -> bool {
        time >= self.start && time < self.end
    }
}

/// A contiguous span of speech.
///
/// Field names serialize in camelCase so cached entries and API bodies keep the
/// `fullSentence` shape used by front-end consumers. Missing fields deserialize
/// as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    /// Raw or lightly-cleaned text for this span.
    #[serde(default)]
    pub text: String,
    /// Start time in seconds.
    #[serde(default)]
    pub start: f64,
    /// Duration in seconds.
    #[serde(default)]
    pub duration: f64,
    /// Reconstructed sentence after refinement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_sentence: Option<String>,
    /// Speaker label such as "Speaker 1".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    /// Word-level timing (diarized transcripts only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<Word>>,
}

impl Segment {
    /// Create a bare segment. Negative timings are clamped to zero.
    pub fn new(text: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            text: text.into(),
            start: start.max(0.0),
            duration: duration.max(0.0),
            full_sentence: None,
            speaker: None,
            words: None,
        }
    }

    pub fn with_speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = Some(speaker.into());
        self
    }

    pub fn with_full_sentence(mut self, sentence: impl Into<String>) -> Self {
        self.full_sentence = Some(sentence.into());
        self
    }

    pub fn with_words(mut self, words: Vec<Word>) -> Self {
        self.words = Some(words);
        self
    }

    /// End time in seconds.
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Whether `time` falls inside `[start, end)`.
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time < self.end()
    }

    /// Text to show a reader: the refined sentence when present, else the raw text.
    pub fn display_text(&self) -> &str {
        self.full_sentence.as_deref().unwrap_or(&self.text)
    }

    /// Speaker label, or the single default speaker.
    pub fn speaker_or_default(&self) -> &str {
        self.speaker.as_deref().unwrap_or(DEFAULT_SPEAKER)
    }

    /// Words of this segment, empty when the source had no word timing.
    pub fn words(&self) -> &[Word] {
        self.words.as_deref().unwrap_or(&[])
    }

    /// Index of the word being spoken at `time`.
    pub fn active_word(&self, time: f64) -> Option<usize> {
        self.words().iter().position(|w| w.is_active_at(time))
    }
}

/// An ordered sequence of segments for one media item in one language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// Media identifier this transcript belongs to.
    pub media_id: String,
    /// Language code of the transcript text.
    pub language: String,
    /// Segments ordered by non-decreasing start time.
    pub segments: Vec<Segment>,
    /// Set when this is the fixed demo transcript substituted after a failure.
    #[serde(default)]
    pub is_demo: bool,
}

impl Transcript {
    /// Create a transcript from segments.
    pub fn new(media_id: impl Into<String>, language: impl Into<String>, segments: Vec<Segment>) -> Self {
        Self {
            media_id: media_id.into(),
            language: language.into(),
            segments,
            is_demo: false,
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// All segment texts joined with single spaces.
    pub fn raw_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Number of whitespace-separated tokens in the raw text.
    pub fn word_count(&self) -> usize {
        self.segments
            .iter()
            .map(|s| s.text.split_whitespace().count())
            .sum()
    }

    /// Latest segment end in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.segments
            .iter()
            .map(Segment::end)
            .fold(0.0_f64, f64::max)
    }

    /// Whether segment starts are non-decreasing.
    pub fn is_sorted(&self) -> bool {
        self.segments.windows(2).all(|w| w[0].start <= w[1].start)
    }

    /// Distinct speaker labels in order of first appearance.
    pub fn speakers(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Some(speaker) = segment.speaker.as_deref() {
                if !seen.contains(&speaker) {
                    seen.push(speaker);
                }
            }
        }
        seen
    }

    /// Format the transcript with timestamps and speakers for display.
    pub fn format_with_timestamps(&self) -> String {
        self.segments
            .iter()
            .map(|s| match &s.speaker {
                Some(speaker) => format!(
                    "[{}] {}: {}",
                    format_timestamp(s.start),
                    speaker,
                    s.display_text()
                ),
                None => format!("[{}] {}", format_timestamp(s.start), s.display_text()),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Format seconds as MM:SS or HH:MM:SS.
pub fn format_timestamp(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}
