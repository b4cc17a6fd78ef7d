//! Error types for Tekst.

use thiserror::Error;

/// Library-level error type for Tekst operations.
#[derive(Error, Debug)]
pub enum TekstError {
    #[error("No captions available: {0}")]
    NoCaptionsAvailable(String),

    #[error("Audio extraction failed: {0}")]
    AudioExtractionFailed(String),

    #[error("Audio upload failed: {0}")]
    UploadFailed(String),

    #[error("Transcription service error: {0}")]
    TranscriptionServiceError(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    /// Refinement output could not be used. Always recovered inside the refiner.
    #[error("Refinement response unusable: {0}")]
    RefinementParseFailure(String),

    /// Cache could not be written. Always recovered by the orchestrator.
    #[error("Cache write failed: {0}")]
    CacheWriteFailure(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl TekstError {
    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            TekstError::NoCaptionsAvailable(_) => "NoCaptionsAvailable",
            TekstError::AudioExtractionFailed(_) => "AudioExtractionFailed",
            TekstError::UploadFailed(_) => "UploadFailed",
            TekstError::TranscriptionServiceError(_) => "TranscriptionServiceError",
            TekstError::Timeout(_) => "Timeout",
            TekstError::RefinementParseFailure(_) => "RefinementParseFailure",
            TekstError::CacheWriteFailure(_) => "CacheWriteFailure",
            TekstError::Config(_) => "Config",
            TekstError::Io(_) => "Io",
            TekstError::Json(_) => "Json",
            TekstError::TomlParse(_) => "TomlParse",
            TekstError::Http(_) => "Http",
            TekstError::Database(_) => "Database",
            TekstError::OpenAI(_) => "OpenAI",
            TekstError::ToolNotFound(_) => "ToolNotFound",
            TekstError::InvalidInput(_) => "InvalidInput",
        }
    }

    /// Whether this error is one of the acquisition failures surfaced to callers.
    pub fn is_acquisition_failure(&self) -> bool {
        matches!(
            self,
            TekstError::NoCaptionsAvailable(_)
                | TekstError::AudioExtractionFailed(_)
                | TekstError::UploadFailed(_)
                | TekstError::TranscriptionServiceError(_)
                | TekstError::Timeout(_)
        )
    }
}

/// Result type alias for Tekst operations.
pub type Result<T> = std::result::Result<T, TekstError>;
