//! Audio extraction for diarized transcription.
//!
//! Downloads an audio-only stream with yt-dlp into a private temporary
//! directory. The directory, and the audio file in it, is removed when the
//! returned [`ExtractedAudio`] is dropped, on success and error paths alike.

use crate::error::{Result, TekstError};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Extensions yt-dlp commonly produces for audio-only formats.
const AUDIO_EXTENSIONS: &[&str] = &["m4a", "webm", "opus", "mp3", "ogg", "wav"];

/// A temporary audio artifact, deleted on drop.
#[derive(Debug)]
pub struct ExtractedAudio {
    path: PathBuf,
    dir: TempDir,
}

impl ExtractedAudio {
    /// Path to the audio file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the artifact.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

/// Extracts the best audio-only stream of `url` into a fresh directory under `temp_root`.
///
/// Fails with `Timeout` when yt-dlp runs longer than `timeout`; the child
/// process is killed in that case.
#[instrument(skip(temp_root), fields(media_id = %media_id))]
pub async fn extract_audio(
    url: &str,
    media_id: &str,
    temp_root: &Path,
    timeout: Duration,
) -> Result<ExtractedAudio> {
    std::fs::create_dir_all(temp_root)?;
    let dir = tempfile::Builder::new()
        .prefix(&format!("{}-", media_id))
        .tempdir_in(temp_root)?;

    info!("Extracting audio from {}", url);

    let template = dir.path().join(format!("{}.%(ext)s", media_id));

    let mut command = Command::new("yt-dlp");
    command
        .arg("--format").arg("bestaudio/best")
        .arg("--output").arg(&template)
        .arg("--no-playlist")
        .arg("--quiet")
        .arg("--no-warnings")
        .arg(url)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Err(_) => {
            return Err(TekstError::Timeout(format!(
                "audio extraction for {} exceeded {}s",
                media_id,
                timeout.as_secs()
            )));
        }
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(TekstError::AudioExtractionFailed(
                "yt-dlp not found in PATH".into(),
            ));
        }
        Ok(Err(e)) => {
            return Err(TekstError::AudioExtractionFailed(format!(
                "yt-dlp execution failed: {e}"
            )));
        }
        Ok(Ok(output)) => output,
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TekstError::AudioExtractionFailed(format!(
            "yt-dlp failed: {}",
            stderr.trim()
        )));
    }

    let path = find_audio_file(dir.path(), media_id)?;
    debug!("Audio extracted to {:?}", path);

    Ok(ExtractedAudio { path, dir })
}

/// Locates a downloaded audio file by media ID.
fn find_audio_file(dir: &Path, media_id: &str) -> Result<PathBuf> {
    for ext in AUDIO_EXTENSIONS {
        let candidate = dir.join(format!("{}.{}", media_id, ext));
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    // Fallback: scan directory for matching prefix
    let entries = std::fs::read_dir(dir).map_err(|e| {
        TekstError::AudioExtractionFailed(format!("Cannot read directory: {e}"))
    })?;

    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(media_id) && !name.ends_with(".part") {
            return Ok(entry.path());
        }
    }

    Err(TekstError::AudioExtractionFailed(
        "Audio file not found after download".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_audio_file_known_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("abc.m4a"), b"x").unwrap();
        let found = find_audio_file(dir.path(), "abc").unwrap();
        assert_eq!(found, dir.path().join("abc.m4a"));
    }

    #[test]
    fn test_find_audio_file_prefix_scan() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("abc.f251.weba"), b"x").unwrap();
        let found = find_audio_file(dir.path(), "abc").unwrap();
        assert_eq!(found, dir.path().join("abc.f251.weba"));
    }

    #[test]
    fn test_find_audio_file_ignores_partial() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("abc.webm.part"), b"x").unwrap();
        let err = find_audio_file(dir.path(), "abc").unwrap_err();
        assert!(matches!(err, TekstError::AudioExtractionFailed(_)));
    }

    #[test]
    fn test_artifact_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let dir = tempfile::Builder::new().prefix("vid-").tempdir_in(root.path()).unwrap();
        let path = dir.path().join("vid.m4a");
        std::fs::write(&path, b"audio").unwrap();

        let artifact = ExtractedAudio { path: path.clone(), dir };
        let artifact_dir = artifact.dir().to_path_buf();
        assert!(artifact.path().exists());

        drop(artifact);
        assert!(!path.exists());
        assert!(!artifact_dir.exists());
    }
}
