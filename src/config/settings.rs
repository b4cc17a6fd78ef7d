//! Configuration settings for Tekst.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub captions: CaptionSettings,
    pub diarization: DiarizationSettings,
    pub refinement: RefinementSettings,
    pub cache: CacheSettings,
    pub sync: SyncSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Directory for temporary files.
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.tekst".to_string(),
            temp_dir: "/tmp/tekst".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Where a transcript is acquired from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptSource {
    /// Native caption track scraped from the media page.
    #[default]
    Captions,
    /// Audio transcription with speaker diarization.
    Diarized,
}

impl std::str::FromStr for TranscriptSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "captions" | "caption" | "youtube" => Ok(TranscriptSource::Captions),
            "diarized" | "diarization" | "assemblyai" | "audio" => Ok(TranscriptSource::Diarized),
            _ => Err(format!("Unknown transcript source: {}", s)),
        }
    }
}

impl std::fmt::Display for TranscriptSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptSource::Captions => write!(f, "captions"),
            TranscriptSource::Diarized => write!(f, "diarized"),
        }
    }
}

/// Caption scraping settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionSettings {
    /// Language requested when none is given.
    pub default_language: String,
    /// User agent sent when fetching the watch page.
    pub user_agent: String,
    /// Timeout for each caption HTTP request.
    pub request_timeout_seconds: u64,
    /// Substitute the demo transcript when no captions are available.
    pub demo_fallback: bool,
}

impl Default for CaptionSettings {
    fn default() -> Self {
        Self {
            default_language: "en".to_string(),
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            request_timeout_seconds: 30,
            demo_fallback: true,
        }
    }
}

/// Diarization service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiarizationSettings {
    /// Base URL of the AssemblyAI-compatible API.
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Upper bound for audio extraction with yt-dlp.
    pub extraction_timeout_seconds: u64,
    /// Upper bound for upload plus transcription polling.
    pub transcription_timeout_seconds: u64,
    /// Delay between status polls.
    pub poll_interval_seconds: u64,
}

impl Default for DiarizationSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.assemblyai.com".to_string(),
            api_key_env: "ASSEMBLYAI_API_KEY".to_string(),
            extraction_timeout_seconds: 120,
            transcription_timeout_seconds: 1800,
            poll_interval_seconds: 3,
        }
    }
}

impl DiarizationSettings {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

/// LLM refinement settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinementSettings {
    /// Refine caption transcripts after extraction.
    pub enabled: bool,
    /// Chat model used for refinement.
    pub model: String,
    /// Segments per LLM call.
    pub batch_size: usize,
    /// Sampling temperature.
    pub temperature: f32,
    /// Speaker seeded into the first batch.
    pub default_speaker: String,
}

impl Default for RefinementSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "gpt-4o-mini".to_string(),
            batch_size: 50,
            temperature: 0.2,
            default_speaker: crate::transcript::DEFAULT_SPEAKER.to_string(),
        }
    }
}

/// Transcript cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Path to the SQLite cache database.
    pub sqlite_path: String,
    /// Maximum number of cached transcripts before least-recently-used eviction.
    pub capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            sqlite_path: "~/.tekst/transcripts.db".to_string(),
            capacity: 200,
        }
    }
}

/// Playback sync settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Polling interval of the sync loop.
    pub tick_interval_ms: u64,
    /// Distance before segment end at which looping seeks back.
    pub loop_epsilon_seconds: f64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 250,
            loop_epsilon_seconds: 0.1,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::TekstError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tekst")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the expanded SQLite cache path.
    pub fn cache_path(&self) -> PathBuf {
        Self::expand_path(&self.cache.sqlite_path)
    }
}
