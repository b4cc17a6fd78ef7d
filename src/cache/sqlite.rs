//! SQLite-backed transcript cache.

use super::{cache_key, CacheEntry, TranscriptCache};
use crate::error::{Result, TekstError};
use crate::transcript::{Segment, Transcript};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS transcripts (
    cache_key TEXT PRIMARY KEY,
    media_id TEXT NOT NULL,
    language TEXT NOT NULL,
    transcript_language TEXT NOT NULL,
    segments_json TEXT NOT NULL,
    segment_count INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    last_accessed TEXT NOT NULL,
    access_seq INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_transcripts_media_id ON transcripts(media_id);
CREATE INDEX IF NOT EXISTS idx_transcripts_access_seq ON transcripts(access_seq);
"#;

/// Transcript cache persisted in a SQLite database.
pub struct SqliteCache {
    conn: Mutex<Connection>,
    capacity: usize,
}

impl SqliteCache {
    /// Open or create the cache database. A capacity of zero disables eviction.
    #[instrument(skip_all)]
    pub fn new(path: &Path, capacity: usize) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Opened transcript cache at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
            capacity,
        })
    }

    /// Create an in-memory cache (useful for testing).
    pub fn in_memory(capacity: usize) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
            capacity,
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| TekstError::Config(format!("Failed to acquire cache lock: {}", e)))
    }

    fn next_seq(conn: &Connection) -> rusqlite::Result<i64> {
        conn.query_row(
            "SELECT COALESCE(MAX(access_seq), 0) + 1 FROM transcripts",
            [],
            |row| row.get(0),
        )
    }

    fn evict(&self, conn: &Connection) -> rusqlite::Result<usize> {
        if self.capacity == 0 {
            return Ok(0);
        }

        conn.execute(
            r#"
            DELETE FROM transcripts WHERE cache_key IN (
                SELECT cache_key FROM transcripts
                ORDER BY access_seq DESC
                LIMIT -1 OFFSET ?1
            )
            "#,
            params![self.capacity as i64],
        )
    }
}

fn parse_time(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl TranscriptCache for SqliteCache {
    #[instrument(skip(self))]
    async fn get(&self, media_id: &str, language: &str) -> Result<Option<Transcript>> {
        let conn = self.lock()?;
        let key = cache_key(media_id, language);

        let result = conn.query_row(
            "SELECT transcript_language, segments_json FROM transcripts WHERE cache_key = ?1",
            params![key],
            |row| {
                let language: String = row.get(0)?;
                let json: String = row.get(1)?;
                Ok((language, json))
            },
        );

        let (stored_language, json) = match result {
            Ok(row) => row,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let segments: Vec<Segment> = serde_json::from_str(&json)?;

        let seq = Self::next_seq(&conn)?;
        conn.execute(
            "UPDATE transcripts SET last_accessed = ?1, access_seq = ?2 WHERE cache_key = ?3",
            params![Utc::now().to_rfc3339(), seq, key],
        )?;

        debug!("Cache hit for {} ({} segments)", key, segments.len());
        Ok(Some(Transcript::new(media_id, stored_language, segments)))
    }

    #[instrument(skip(self, transcript))]
    async fn put(&self, media_id: &str, language: &str, transcript: &Transcript) -> Result<()> {
        if transcript.is_demo {
            debug!("Not caching demo transcript");
            return Ok(());
        }

        let json = serde_json::to_string(&transcript.segments)
            .map_err(|e| TekstError::CacheWriteFailure(format!("Failed to serialize segments: {}", e)))?;

        let conn = self.lock()?;
        let key = cache_key(media_id, language);
        let now = Utc::now().to_rfc3339();

        let write = || -> rusqlite::Result<usize> {
            let seq = Self::next_seq(&conn)?;
            conn.execute(
                r#"
                INSERT INTO transcripts
                    (cache_key, media_id, language, transcript_language, segments_json,
                     segment_count, created_at, last_accessed, access_seq)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?8)
                ON CONFLICT(cache_key) DO UPDATE SET
                    transcript_language = excluded.transcript_language,
                    segments_json = excluded.segments_json,
                    segment_count = excluded.segment_count,
                    last_accessed = excluded.last_accessed,
                    access_seq = excluded.access_seq
                "#,
                params![
                    key,
                    media_id,
                    language.to_lowercase(),
                    transcript.language,
                    json,
                    transcript.segments.len() as i64,
                    now,
                    seq,
                ],
            )?;
            self.evict(&conn)
        };

        let evicted = write().map_err(|e| TekstError::CacheWriteFailure(e.to_string()))?;
        if evicted > 0 {
            info!("Evicted {} least recently used transcripts", evicted);
        }

        debug!("Cached {} segments under {}", transcript.segments.len(), key);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<CacheEntry>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT media_id, language, transcript_language, segment_count, created_at, last_accessed
            FROM transcripts
            ORDER BY access_seq DESC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let segment_count: i64 = row.get(3)?;
            let created_at: String = row.get(4)?;
            let last_accessed: String = row.get(5)?;
            Ok(CacheEntry {
                media_id: row.get(0)?,
                language: row.get(1)?,
                transcript_language: row.get(2)?,
                segment_count: segment_count.max(0) as usize,
                created_at: parse_time(&created_at),
                last_accessed: parse_time(&last_accessed),
            })
        })?;

        let entries: Vec<CacheEntry> = rows.filter_map(|r| r.ok()).collect();
        Ok(entries)
    }

    async fn remove(&self, media_id: &str, language: Option<&str>) -> Result<usize> {
        let conn = self.lock()?;
        let removed = match language {
            Some(language) => conn.execute(
                "DELETE FROM transcripts WHERE cache_key = ?1",
                params![cache_key(media_id, language)],
            )?,
            None => conn.execute("DELETE FROM transcripts WHERE media_id = ?1", params![media_id])?,
        };
        info!("Removed {} cached transcripts for {}", removed, media_id);
        Ok(removed)
    }

    async fn clear(&self) -> Result<usize> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM transcripts", [])?;
        info!("Cleared {} cached transcripts", removed);
        Ok(removed)
    }

    async fn len(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM transcripts", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Segment;

    fn transcript(media_id: &str, language: &str, texts: &[&str]) -> Transcript {
        Transcript::new(
            media_id,
            language,
            texts
                .iter()
                .enumerate()
                .map(|(i, t)| Segment::new(*t, i as f64, 1.0).with_speaker("Speaker 1"))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let cache = SqliteCache::in_memory(10).unwrap();
        let t = transcript("vid", "de", &["Hallo", "Welt"]);

        cache.put("vid", "de", &t).await.unwrap();
        let loaded = cache.get("vid", "de").await.unwrap().unwrap();

        assert_eq!(loaded.segments, t.segments);
        assert!(cache.get("vid", "en").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_is_idempotent() {
        let cache = SqliteCache::in_memory(10).unwrap();
        let t = transcript("vid", "de", &["a", "b", "c"]);

        cache.put("vid", "de", &t).await.unwrap();
        cache.put("vid", "de", &t).await.unwrap();

        assert_eq!(cache.len().await.unwrap(), 1);
        assert_eq!(cache.get("vid", "de").await.unwrap().unwrap().segments, t.segments);
    }

    #[tokio::test]
    async fn test_put_replaces_content() {
        let cache = SqliteCache::in_memory(10).unwrap();
        cache.put("vid", "de", &transcript("vid", "de", &["old"])).await.unwrap();
        cache.put("vid", "de", &transcript("vid", "de", &["new", "er"])).await.unwrap();

        let loaded = cache.get("vid", "de").await.unwrap().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.segments[0].text, "new");
    }

    #[tokio::test]
    async fn test_demo_not_cached() {
        let cache = SqliteCache::in_memory(10).unwrap();
        let mut demo = transcript("vid", "de", &["demo"]);
        demo.is_demo = true;

        cache.put("vid", "de", &demo).await.unwrap();
        assert_eq!(cache.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let cache = SqliteCache::in_memory(2).unwrap();
        cache.put("a", "en", &transcript("a", "en", &["a"])).await.unwrap();
        cache.put("b", "en", &transcript("b", "en", &["b"])).await.unwrap();

        // Touch "a" so "b" becomes least recently used
        cache.get("a", "en").await.unwrap();
        cache.put("c", "en", &transcript("c", "en", &["c"])).await.unwrap();

        assert_eq!(cache.len().await.unwrap(), 2);
        assert!(cache.get("a", "en").await.unwrap().is_some());
        assert!(cache.get("b", "en").await.unwrap().is_none());
        assert!(cache.get("c", "en").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_list_remove_clear() {
        let cache = SqliteCache::in_memory(0).unwrap();
        cache.put("a", "en", &transcript("a", "en", &["a"])).await.unwrap();
        cache.put("a", "de", &transcript("a", "de", &["a"])).await.unwrap();
        cache.put("b", "en", &transcript("b", "en", &["b", "c"])).await.unwrap();

        let entries = cache.list().await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].media_id, "b");
        assert_eq!(entries[0].segment_count, 2);

        assert_eq!(cache.remove("a", Some("de")).await.unwrap(), 1);
        assert_eq!(cache.remove("a", None).await.unwrap(), 1);
        assert_eq!(cache.clear().await.unwrap(), 1);
        assert!(cache.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache").join("transcripts.db");

        {
            let cache = SqliteCache::new(&path, 10).unwrap();
            cache.put("vid", "en", &transcript("vid", "en", &["kept"])).await.unwrap();
        }

        let cache = SqliteCache::new(&path, 10).unwrap();
        let loaded = cache.get("vid", "en").await.unwrap().unwrap();
        assert_eq!(loaded.segments[0].text, "kept");
    }
}
