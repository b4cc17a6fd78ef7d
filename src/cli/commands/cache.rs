//! Cache command implementation.

use crate::cache::{SqliteCache, TranscriptCache};
use crate::captions::extract_video_id;
use crate::cli::preflight::{self, Operation};
use crate::cli::{CacheAction, Output};
use crate::config::Settings;
use anyhow::Result;

/// Run the cache command.
pub async fn run_cache(action: CacheAction, settings: Settings) -> Result<()> {
    preflight::check(Operation::Cache, &settings)?;
    let cache = SqliteCache::new(&settings.cache_path(), settings.cache.capacity)?;

    match action {
        CacheAction::List => {
            let entries = cache.list().await?;
            if entries.is_empty() {
                Output::info("No cached transcripts. Fetch one with 'tekst fetch <url>'.");
                return Ok(());
            }

            Output::header(&format!("Cached Transcripts ({})", entries.len()));
            for entry in &entries {
                Output::list_item(&format!(
                    "{} [{}] {} segments, language {}, last used {}",
                    entry.media_id,
                    entry.language,
                    entry.segment_count,
                    entry.transcript_language,
                    entry.last_accessed.format("%Y-%m-%d %H:%M")
                ));
            }
        }
        CacheAction::Show { media, language } => {
            let media_id = media_id(&media);
            let language = language.unwrap_or_else(|| settings.captions.default_language.clone());
            match cache.get(&media_id, &language).await? {
                Some(transcript) => {
                    Output::header(&format!("{} ({})", transcript.media_id, transcript.language));
                    print!("{}", transcript.format_with_timestamps());
                }
                None => Output::warning(&format!("No cached transcript for {} [{}]", media_id, language)),
            }
        }
        CacheAction::Remove { media, language } => {
            let media_id = media_id(&media);
            let removed = cache.remove(&media_id, language.as_deref()).await?;
            if removed == 0 {
                Output::warning(&format!("Nothing cached for {}", media_id));
            } else {
                Output::success(&format!("Removed {} cached transcript(s) for {}", removed, media_id));
            }
        }
        CacheAction::Clear => {
            let removed = cache.clear().await?;
            Output::success(&format!("Removed {} cached transcript(s)", removed));
        }
    }

    Ok(())
}

fn media_id(input: &str) -> String {
    extract_video_id(input).unwrap_or_else(|| input.trim().to_string())
}
