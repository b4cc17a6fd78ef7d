//! Acquisition pipeline for Tekst.
//!
//! Coordinates cache lookup, caption extraction or diarized transcription,
//! refinement and the cache write, and substitutes the demo transcript when
//! no captions exist.

use crate::cache::{MemoryCache, SqliteCache, TranscriptCache};
use crate::captions::{demo_transcript, extract_video_id, CaptionSource, YoutubeCaptionExtractor};
use crate::config::{Prompts, Settings, TranscriptSource};
use crate::diarization::{DiarizedTranscriber, Transcriber};
use crate::error::{Result, TekstError};
use crate::openai::is_api_key_configured;
use crate::refine::{ChunkedRefiner, OpenAiCompletionClient};
use crate::transcript::Transcript;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Per-request acquisition choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquireOptions {
    pub source: TranscriptSource,
    /// Refine caption transcripts when a refiner is available.
    pub refine: bool,
    /// Substitute the demo transcript when no captions are available.
    pub demo_fallback: bool,
    /// Skip the cache lookup.
    pub force: bool,
}

impl AcquireOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            source: TranscriptSource::Captions,
            refine: settings.refinement.enabled,
            demo_fallback: settings.captions.demo_fallback,
            force: false,
        }
    }

    pub fn with_source(mut self, source: TranscriptSource) -> Self {
        self.source = source;
        self
    }
}

/// A transcript ready for the sync loop.
#[derive(Debug, Clone)]
pub struct Acquisition {
    pub transcript: Transcript,
    /// Served from the cache without touching any source.
    pub from_cache: bool,
    /// Refinement ran on this acquisition.
    pub refined: bool,
}

impl Acquisition {
    pub fn is_demo(&self) -> bool {
        self.transcript.is_demo
    }
}

/// The main orchestrator for the acquisition pipeline.
pub struct Orchestrator {
    settings: Settings,
    cache: Arc<dyn TranscriptCache>,
    captions: Arc<dyn CaptionSource>,
    transcriber: Option<Arc<dyn Transcriber>>,
    refiner: Option<ChunkedRefiner>,
}

impl Orchestrator {
    /// Create an orchestrator wired to the real services.
    ///
    /// Refinement is disabled when `OPENAI_API_KEY` is missing, and diarized
    /// acquisition when the AssemblyAI key is missing.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let cache: Arc<dyn TranscriptCache> =
            match SqliteCache::new(&settings.cache_path(), settings.cache.capacity) {
                Ok(cache) => Arc::new(cache),
                Err(e) => {
                    warn!("Transcript cache unavailable, using memory only: {}", e);
                    Arc::new(MemoryCache::new(settings.cache.capacity))
                }
            };

        let captions: Arc<dyn CaptionSource> =
            Arc::new(YoutubeCaptionExtractor::new(&settings.captions)?);

        let transcriber: Option<Arc<dyn Transcriber>> =
            match DiarizedTranscriber::new(&settings.diarization, settings.temp_dir()) {
                Ok(transcriber) => Some(Arc::new(transcriber)),
                Err(e) => {
                    debug!("Diarized transcription unavailable: {}", e);
                    None
                }
            };

        let refiner = if !settings.refinement.enabled {
            None
        } else if !is_api_key_configured() {
            warn!("OPENAI_API_KEY not set; caption refinement disabled");
            None
        } else {
            let client = Arc::new(OpenAiCompletionClient::new(&settings.refinement)?);
            info!("Refining captions with {}", settings.refinement.model);
            Some(ChunkedRefiner::new(client, prompts, &settings.refinement))
        };

        Ok(Self {
            settings,
            cache,
            captions,
            transcriber,
            refiner,
        })
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        cache: Arc<dyn TranscriptCache>,
        captions: Arc<dyn CaptionSource>,
        transcriber: Option<Arc<dyn Transcriber>>,
        refiner: Option<ChunkedRefiner>,
    ) -> Self {
        Self {
            settings,
            cache,
            captions,
            transcriber,
            refiner,
        }
    }

    /// Show refinement progress bars on stderr.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.refiner = self.refiner.map(|r| r.with_progress(show));
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cache(&self) -> Arc<dyn TranscriptCache> {
        self.cache.clone()
    }

    pub fn can_refine(&self) -> bool {
        self.refiner.is_some()
    }

    pub fn can_diarize(&self) -> bool {
        self.transcriber.is_some()
    }

    /// Acquire a transcript for `media`, a video ID or URL.
    ///
    /// `language` defaults to the configured caption language; for diarized
    /// acquisition `None` lets the service detect the language.
    #[instrument(skip(self))]
    pub async fn acquire(
        &self,
        media: &str,
        language: Option<&str>,
        options: AcquireOptions,
    ) -> Result<Acquisition> {
        let media_id = extract_video_id(media).unwrap_or_else(|| media.trim().to_string());
        if media_id.is_empty() {
            return Err(TekstError::InvalidInput("media ID is empty".to_string()));
        }

        let refine = options.source == TranscriptSource::Captions
            && options.refine
            && self.refiner.is_some();
        let slot = cache_slot(
            options.source,
            language,
            &self.settings.captions.default_language,
            refine,
        );

        if !options.force {
            match self.cache.get(&media_id, &slot).await {
                Ok(Some(transcript)) => {
                    info!("Using cached transcript for {} ({})", media_id, slot);
                    return Ok(Acquisition {
                        transcript,
                        from_cache: true,
                        refined: false,
                    });
                }
                Ok(None) => {}
                Err(e) => warn!("Cache lookup failed: {}", e),
            }
        }

        let acquired = match options.source {
            TranscriptSource::Captions => {
                let language = language.unwrap_or(self.settings.captions.default_language.as_str());
                self.acquire_captions(&media_id, language, refine).await
            }
            TranscriptSource::Diarized => self
                .acquire_diarized(&media_id, language)
                .await
                .map(|t| (t, false)),
        };

        let (transcript, refined) = match acquired {
            Ok(result) => result,
            Err(TekstError::NoCaptionsAvailable(reason)) if options.demo_fallback => {
                warn!("No captions for {} ({}); using demo transcript", media_id, reason);
                (demo_transcript(&media_id), false)
            }
            Err(e) => return Err(e),
        };

        if !transcript.is_demo {
            if let Err(e) = self.cache.put(&media_id, &slot, &transcript).await {
                warn!("Keeping transcript in memory only: {}", e);
            }
        }

        Ok(Acquisition {
            transcript,
            from_cache: false,
            refined,
        })
    }

    async fn acquire_captions(
        &self,
        media_id: &str,
        language: &str,
        refine: bool,
    ) -> Result<(Transcript, bool)> {
        let mut transcript = self.captions.extract(media_id, language).await?;

        let refiner = match (&self.refiner, refine) {
            (Some(refiner), true) => refiner,
            (None, true) => {
                debug!("Refinement requested but no refiner is configured");
                return Ok((transcript, false));
            }
            _ => return Ok((transcript, false)),
        };

        let segments = std::mem::take(&mut transcript.segments);
        transcript.segments = refiner.refine(segments, &transcript.language).await;
        Ok((transcript, true))
    }

    async fn acquire_diarized(&self, media_id: &str, language: Option<&str>) -> Result<Transcript> {
        let transcriber = self.transcriber.as_ref().ok_or_else(|| {
            TekstError::Config(format!(
                "{} not set; required for diarized transcription",
                self.settings.diarization.api_key_env
            ))
        })?;

        transcriber.transcribe(media_id, language).await
    }
}

/// Cache language slot for a source.
///
/// Raw and refined captions are kept apart so an unrefined request never
/// shadows a refined transcript. Diarized transcripts live beside both.
fn cache_slot(
    source: TranscriptSource,
    language: Option<&str>,
    default_language: &str,
    refined: bool,
) -> String {
    match source {
        TranscriptSource::Captions => {
            let language = language.unwrap_or(default_language).to_lowercase();
            if refined {
                language
            } else {
                format!("{}+raw", language)
            }
        }
        TranscriptSource::Diarized => {
            format!("{}+diarized", language.unwrap_or("auto").to_lowercase())
        }
    }
}
