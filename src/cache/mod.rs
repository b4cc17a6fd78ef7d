//! Transcript cache.
//!
//! Stores acquired segment sequences keyed by media ID and language so a
//! transcript is fetched, transcribed and refined at most once. Entries never
//! expire by age; the least recently used entries are evicted once the cache
//! holds more than its capacity.

mod memory;
mod sqlite;

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;

use crate::error::Result;
use crate::transcript::Transcript;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Summary of one cached transcript.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub media_id: String,
    /// Language the entry is keyed under.
    pub language: String,
    /// Language of the stored transcript, which can differ from the key when
    /// a caption track in another language was selected.
    pub transcript_language: String,
    pub segment_count: usize,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

/// Cache key for a media item in a language.
pub fn cache_key(media_id: &str, language: &str) -> String {
    format!("{}:{}", media_id, language.to_lowercase())
}

/// Storage for acquired transcripts.
#[async_trait]
pub trait TranscriptCache: Send + Sync {
    /// Look up a transcript, marking it as recently used.
    async fn get(&self, media_id: &str, language: &str) -> Result<Option<Transcript>>;

    /// Store a transcript under `media_id` and `language`, replacing any
    /// previous entry. Demo transcripts are ignored.
    async fn put(&self, media_id: &str, language: &str, transcript: &Transcript) -> Result<()>;

    /// List cached transcripts, most recently used first.
    async fn list(&self) -> Result<Vec<CacheEntry>>;

    /// Remove a media item in one language, or in all languages when
    /// `language` is `None`. Returns the number of removed entries.
    async fn remove(&self, media_id: &str, language: Option<&str>) -> Result<usize>;

    /// Remove every entry.
    async fn clear(&self) -> Result<usize>;

    /// Number of cached transcripts.
    async fn len(&self) -> Result<usize>;
}
