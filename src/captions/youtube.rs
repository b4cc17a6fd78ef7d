//! YouTube caption extraction.

use super::parser::{caption_tracks, extract_player_response, parse_caption_xml, select_track};
use super::CaptionSource;
use crate::config::CaptionSettings;
use crate::error::{Result, TekstError};
use crate::transcript::Transcript;
use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

const WATCH_URL: &str = "https://www.youtube.com/watch";

fn video_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Matches various YouTube URL formats and bare video IDs
        Regex::new(
            r"(?x)
            (?:
                (?:https?://)?
                (?:www\.|m\.)?
                (?:youtube\.com/watch\?(?:.*&)?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/|youtube\.com/shorts/)
                ([a-zA-Z0-9_-]{11})
            )
            |
            ^([a-zA-Z0-9_-]{11})$
        ",
        )
        .expect("valid video id regex")
    })
}

/// Extract a video ID from a YouTube URL or bare ID.
pub fn extract_video_id(input: &str) -> Option<String> {
    let caps = video_id_regex().captures(input.trim())?;

    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Scrapes caption tracks from the YouTube watch page.
pub struct YoutubeCaptionExtractor {
    client: reqwest::Client,
    watch_url: Url,
}

impl YoutubeCaptionExtractor {
    pub fn new(settings: &CaptionSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.request_timeout_seconds))
            .build()?;

        let watch_url = Url::parse(WATCH_URL)
            .map_err(|e| TekstError::Config(format!("Invalid watch URL: {}", e)))?;

        Ok(Self { client, watch_url })
    }

    async fn fetch_text(&self, url: Url, language: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT_LANGUAGE, format!("{},en;q=0.8", language))
            .send()
            .await?
            .error_for_status()?;

        Ok(response.text().await?)
    }
}

#[async_trait]
impl CaptionSource for YoutubeCaptionExtractor {
    #[instrument(skip(self))]
    async fn extract(&self, media_id: &str, preferred_language: &str) -> Result<Transcript> {
        let video_id = extract_video_id(media_id).ok_or_else(|| {
            TekstError::NoCaptionsAvailable(format!("'{}' is not a recognizable video ID", media_id))
        })?;

        let mut page_url = self.watch_url.clone();
        page_url.query_pairs_mut().append_pair("v", &video_id);

        debug!("Fetching watch page {}", page_url);
        let html = self.fetch_text(page_url, preferred_language).await?;

        let player_response = extract_player_response(&html).ok_or_else(|| {
            TekstError::NoCaptionsAvailable(format!("no player metadata for {}", video_id))
        })?;

        let tracks = caption_tracks(&player_response).ok_or_else(|| {
            TekstError::NoCaptionsAvailable(format!(
                "no caption metadata for {}; the video might be restricted",
                video_id
            ))
        })?;

        let track = select_track(&tracks, preferred_language).ok_or_else(|| {
            TekstError::NoCaptionsAvailable(format!("no caption tracks for {}", video_id))
        })?;

        info!(
            "Found {} caption tracks, using {} (requested {})",
            tracks.len(),
            track.language_code,
            preferred_language
        );
        debug!(
            "Caption track '{}', auto-generated: {}",
            track.display_name().unwrap_or_default(),
            track.is_auto_generated()
        );

        let track_url = Url::parse(&track.base_url).map_err(|e| {
            TekstError::NoCaptionsAvailable(format!("unusable caption track URL: {}", e))
        })?;
        let xml = self.fetch_text(track_url, preferred_language).await?;

        let segments = parse_caption_xml(&xml);
        if segments.is_empty() {
            return Err(TekstError::NoCaptionsAvailable(format!(
                "caption track {} for {} contained no text",
                track.language_code, video_id
            )));
        }

        info!("Parsed {} caption segments", segments.len());
        Ok(Transcript::new(video_id, track.language_code.clone(), segments))
    }
}
