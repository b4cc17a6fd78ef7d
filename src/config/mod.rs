//! Configuration module for Tekst.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, RefinementPrompts};
pub use settings::{
    CacheSettings, CaptionSettings, DiarizationSettings, GeneralSettings, PromptSettings,
    RefinementSettings, Settings, SyncSettings, TranscriptSource,
};
