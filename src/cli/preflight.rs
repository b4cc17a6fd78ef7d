//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::config::{Settings, TranscriptSource};
use crate::error::{Result, TekstError};
use crate::openai::is_api_key_configured;
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Acquisition from the given source.
    Acquire(TranscriptSource),
    /// Reading the cache needs nothing external.
    Cache,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Acquire(TranscriptSource::Diarized) => {
            check_diarization_key(settings)?;
            check_tool("yt-dlp")?;
        }
        Operation::Acquire(TranscriptSource::Captions) | Operation::Cache => {}
    }
    Ok(())
}

/// Whether refinement can run. Prints nothing; callers decide how to warn.
pub fn refinement_available(settings: &Settings) -> bool {
    settings.refinement.enabled && is_api_key_configured()
}

/// Check if the diarization API key is configured.
fn check_diarization_key(settings: &Settings) -> Result<()> {
    match settings.diarization.api_key() {
        Some(_) => Ok(()),
        None => Err(TekstError::Config(format!(
            "{} not set. Set it with: export {}='...'",
            settings.diarization.api_key_env, settings.diarization.api_key_env
        ))),
    }
}

/// Check if an external tool is available.
pub fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(TekstError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(TekstError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(TekstError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
