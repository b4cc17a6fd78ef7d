//! Playback synchronization.
//!
//! A [`SyncEngine`] maps playback time onto the active segment and word of a
//! finished transcript and handles single-segment looping. [`SyncLoop`] runs
//! an engine against a [`Player`] on a fixed polling interval.

mod engine;
mod player;
mod runner;

pub use engine::{SyncEngine, SyncState, TickOutcome};
pub use player::{ClockPlayer, Player};
pub use runner::{SyncCommand, SyncLoop};

/// Default polling interval of the sync loop in milliseconds.
pub const DEFAULT_TICK_MS: u64 = 250;

/// Default distance before a segment's end at which looping wraps.
pub const DEFAULT_LOOP_EPSILON: f64 = 0.1;

/// Relative seek step used by the keyboard-style seek helpers.
pub const SEEK_STEP_SECONDS: f64 = 10.0;
