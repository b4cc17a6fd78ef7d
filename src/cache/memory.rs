//! In-memory transcript cache.
//!
//! Used when the SQLite cache cannot be opened, and in tests.

use super::{cache_key, CacheEntry, TranscriptCache};
use crate::error::Result;
use crate::transcript::Transcript;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

struct Slot {
    media_id: String,
    language: String,
    transcript: Transcript,
    created_at: DateTime<Utc>,
    last_accessed: DateTime<Utc>,
    seq: u64,
}

#[derive(Default)]
struct State {
    slots: HashMap<String, Slot>,
    seq: u64,
}

impl State {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }
}

/// Process-local transcript cache with the same eviction rules as [`super::SqliteCache`].
pub struct MemoryCache {
    state: RwLock<State>,
    capacity: usize,
}

impl MemoryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: RwLock::new(State::default()),
            capacity,
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(0)
    }
}

#[async_trait]
impl TranscriptCache for MemoryCache {
    async fn get(&self, media_id: &str, language: &str) -> Result<Option<Transcript>> {
        let mut state = self.state.write().unwrap();
        let seq = state.next_seq();

        Ok(state.slots.get_mut(&cache_key(media_id, language)).map(|slot| {
            slot.seq = seq;
            slot.last_accessed = Utc::now();
            let mut transcript = slot.transcript.clone();
            transcript.media_id = media_id.to_string();
            transcript
        }))
    }

    async fn put(&self, media_id: &str, language: &str, transcript: &Transcript) -> Result<()> {
        if transcript.is_demo {
            return Ok(());
        }

        let mut state = self.state.write().unwrap();
        let seq = state.next_seq();
        let now = Utc::now();
        let key = cache_key(media_id, language);

        let created_at = state.slots.get(&key).map(|s| s.created_at).unwrap_or(now);
        state.slots.insert(
            key,
            Slot {
                media_id: media_id.to_string(),
                language: language.to_lowercase(),
                transcript: transcript.clone(),
                created_at,
                last_accessed: now,
                seq,
            },
        );

        if self.capacity > 0 {
            while state.slots.len() > self.capacity {
                let oldest = state
                    .slots
                    .iter()
                    .min_by_key(|(_, slot)| slot.seq)
                    .map(|(key, _)| key.clone());
                match oldest {
                    Some(key) => {
                        state.slots.remove(&key);
                    }
                    None => break,
                }
            }
        }

        Ok(())
    }

    async fn list(&self) -> Result<Vec<CacheEntry>> {
        let state = self.state.read().unwrap();
        let mut slots: Vec<&Slot> = state.slots.values().collect();
        slots.sort_by(|a, b| b.seq.cmp(&a.seq));

        Ok(slots
            .into_iter()
            .map(|slot| CacheEntry {
                media_id: slot.media_id.clone(),
                language: slot.language.clone(),
                transcript_language: slot.transcript.language.clone(),
                segment_count: slot.transcript.len(),
                created_at: slot.created_at,
                last_accessed: slot.last_accessed,
            })
            .collect())
    }

    async fn remove(&self, media_id: &str, language: Option<&str>) -> Result<usize> {
        let mut state = self.state.write().unwrap();
        let before = state.slots.len();
        match language {
            Some(language) => {
                state.slots.remove(&cache_key(media_id, language));
            }
            None => state.slots.retain(|_, slot| slot.media_id != media_id),
        }
        Ok(before - state.slots.len())
    }

    async fn clear(&self) -> Result<usize> {
        let mut state = self.state.write().unwrap();
        let removed = state.slots.len();
        state.slots.clear();
        Ok(removed)
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.state.read().unwrap().slots.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Segment;

    fn transcript(media_id: &str) -> Transcript {
        Transcript::new(media_id, "en", vec![Segment::new(media_id, 0.0, 1.0)])
    }

    #[tokio::test]
    async fn test_memory_cache_lru() {
        let cache = MemoryCache::new(2);
        cache.put("a", "en", &transcript("a")).await.unwrap();
        cache.put("b", "en", &transcript("b")).await.unwrap();
        cache.get("a", "en").await.unwrap();
        cache.put("c", "en", &transcript("c")).await.unwrap();

        assert_eq!(cache.len().await.unwrap(), 2);
        assert!(cache.get("b", "en").await.unwrap().is_none());
        let order: Vec<String> = cache
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.media_id)
            .collect();
        assert_eq!(order, vec!["c", "a"]);
    }

    #[tokio::test]
    async fn test_memory_cache_idempotent_put() {
        let cache = MemoryCache::default();
        let t = transcript("a");
        cache.put("a", "en", &t).await.unwrap();
        cache.put("a", "en", &t).await.unwrap();
        assert_eq!(cache.len().await.unwrap(), 1);
        assert_eq!(cache.get("a", "en").await.unwrap(), Some(t));
    }

    #[test]
    fn test_memory_cache_remove_languages() {
        let cache = MemoryCache::default();
        tokio_test::block_on(async {
            cache.put("a", "en", &transcript("a")).await.unwrap();
            cache.put("a", "DE", &transcript("a")).await.unwrap();
            cache.put("b", "en", &transcript("b")).await.unwrap();

            assert_eq!(cache.remove("a", Some("de")).await.unwrap(), 1);
            assert_eq!(cache.remove("a", None).await.unwrap(), 1);
            assert_eq!(cache.remove("a", None).await.unwrap(), 0);
            assert_eq!(cache.clear().await.unwrap(), 1);
            assert_eq!(cache.len().await.unwrap(), 0);
        });
    }
}
