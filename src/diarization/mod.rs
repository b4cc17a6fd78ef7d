//! Speaker-diarized transcription.
//!
//! Extracts the audio track of a media item, hands it to a speech service with
//! speaker labelling enabled and converts the returned utterances into
//! speaker-attributed segments with word timings.

mod assemblyai;

pub use assemblyai::AssemblyAiClient;

use crate::audio::extract_audio;
use crate::captions::extract_video_id;
use crate::config::DiarizationSettings;
use crate::error::{Result, TekstError};
use crate::transcript::{Segment, Transcript, Word};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Speaker label used when the service returns words but no utterances.
pub const FALLBACK_SPEAKER: &str = "Speaker A";

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// Produces speaker-diarized transcripts.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe `media_id`. A `None` language lets the service detect it.
    async fn transcribe(&self, media_id: &str, language: Option<&str>) -> Result<Transcript>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptStatus {
    Queued,
    Processing,
    Completed,
    Error,
}

/// A transcript job as reported by the speech service. Times are milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceTranscript {
    pub id: String,
    pub status: TranscriptStatus,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default)]
    pub audio_duration: Option<f64>,
    #[serde(default)]
    pub utterances: Option<Vec<ServiceUtterance>>,
    #[serde(default)]
    pub words: Option<Vec<ServiceWord>>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceUtterance {
    pub speaker: String,
    pub text: String,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceWord {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

fn ms_to_seconds(ms: f64) -> f64 {
    ms / 1000.0
}

fn to_word(word: &ServiceWord) -> Word {
    Word::new(word.text.clone(), ms_to_seconds(word.start), ms_to_seconds(word.end))
}

/// Convert a completed service transcript into segments.
///
/// One segment per utterance, carrying the words whose interval lies inside
/// the utterance. Without utterances the whole text becomes a single segment
/// attributed to [`FALLBACK_SPEAKER`].
pub fn utterances_to_segments(transcript: &ServiceTranscript) -> Vec<Segment> {
    let words = transcript.words.as_deref().unwrap_or_default();

    match transcript.utterances.as_deref() {
        Some(utterances) if !utterances.is_empty() => utterances
            .iter()
            .map(|utterance| {
                let utterance_words: Vec<Word> = words
                    .iter()
                    .filter(|w| w.start >= utterance.start && w.end <= utterance.end)
                    .map(to_word)
                    .collect();

                Segment::new(
                    utterance.text.clone(),
                    ms_to_seconds(utterance.start),
                    ms_to_seconds(utterance.end - utterance.start),
                )
                .with_full_sentence(utterance.text.clone())
                .with_speaker(format!("Speaker {}", utterance.speaker))
                .with_words(utterance_words)
            })
            .collect(),
        _ => {
            let text = transcript.text.clone().unwrap_or_else(|| {
                words
                    .iter()
                    .map(|w| w.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            });

            // audio_duration is reported in seconds, word times in milliseconds
            let duration = transcript
                .audio_duration
                .or_else(|| words.last().map(|w| ms_to_seconds(w.end)))
                .unwrap_or(0.0);

            vec![Segment::new(text.clone(), 0.0, duration)
                .with_full_sentence(text)
                .with_speaker(FALLBACK_SPEAKER)
                .with_words(words.iter().map(to_word).collect())]
        }
    }
}

/// Diarized transcription through yt-dlp audio extraction and AssemblyAI.
pub struct DiarizedTranscriber {
    client: AssemblyAiClient,
    temp_dir: PathBuf,
    extraction_timeout: Duration,
    transcription_timeout: Duration,
}

impl DiarizedTranscriber {
    /// Build a transcriber from settings. Fails when no API key is configured.
    pub fn new(settings: &DiarizationSettings, temp_dir: PathBuf) -> Result<Self> {
        let api_key = settings.api_key().ok_or_else(|| {
            TekstError::Config(format!(
                "{} not set; required for diarized transcription",
                settings.api_key_env
            ))
        })?;

        Ok(Self {
            client: AssemblyAiClient::new(settings, api_key)?,
            temp_dir,
            extraction_timeout: Duration::from_secs(settings.extraction_timeout_seconds),
            transcription_timeout: Duration::from_secs(settings.transcription_timeout_seconds),
        })
    }

    /// Upload a local audio file and wait for its diarized transcript.
    ///
    /// Upload, submission and polling together are bounded by the
    /// transcription timeout.
    pub async fn transcribe_audio(
        &self,
        audio_path: &Path,
        language: Option<&str>,
    ) -> Result<ServiceTranscript> {
        let job = async {
            let upload_url = self.client.upload(audio_path).await?;
            let id = self.client.submit(&upload_url, language).await?;
            info!("Waiting for diarized transcript {}", id);
            self.client.wait_for_completion(&id).await
        };

        tokio::time::timeout(self.transcription_timeout, job)
            .await
            .map_err(|_| {
                TekstError::Timeout(format!(
                    "diarized transcription of {} exceeded {}s",
                    audio_path.display(),
                    self.transcription_timeout.as_secs()
                ))
            })?
    }
}

#[async_trait]
impl Transcriber for DiarizedTranscriber {
    #[instrument(skip(self))]
    async fn transcribe(&self, media_id: &str, language: Option<&str>) -> Result<Transcript> {
        let video_id = extract_video_id(media_id).ok_or_else(|| {
            TekstError::InvalidInput(format!("'{}' is not a recognizable video ID", media_id))
        })?;

        let audio = extract_audio(
            &format!("{}{}", WATCH_URL, video_id),
            &video_id,
            &self.temp_dir,
            self.extraction_timeout,
        )
        .await?;
        debug!("Audio for {} staged in {}", video_id, audio.dir().display());

        let completed = self.transcribe_audio(audio.path(), language).await?;

        // The artifact is no longer needed once the service has the audio
        drop(audio);

        let segments = utterances_to_segments(&completed);
        if completed.utterances.as_ref().map_or(true, |u| u.is_empty()) {
            warn!("No utterances returned for {}; using a single segment", video_id);
        }

        let language = language
            .map(str::to_string)
            .or(completed.language_code)
            .unwrap_or_else(|| "en".to_string());

        info!("Diarized transcript has {} segments", segments.len());
        Ok(Transcript::new(video_id, language, segments))
    }
}
