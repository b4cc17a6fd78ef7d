//! Play command implementation.
//!
//! Follows a transcript along a simulated player clock, printing each
//! segment as it becomes active.

use super::fetch::acquire;
use crate::cli::preflight::{self, Operation};
use crate::cli::{format_duration, Output};
use crate::config::{Settings, TranscriptSource};
use crate::orchestrator::{AcquireOptions, Orchestrator};
use crate::sync::{ClockPlayer, SyncEngine, SyncLoop, SyncState};
use crate::transcript::SegmentIndex;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Options for the play command.
#[derive(Debug, Clone)]
pub struct PlayArgs {
    pub media: String,
    pub language: Option<String>,
    pub source: String,
    pub looping: bool,
    pub from: f64,
    pub speed: f64,
}

/// Run the play command.
pub async fn run_play(args: PlayArgs, settings: Settings) -> Result<()> {
    let source: TranscriptSource = args.source.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    if let Err(e) = preflight::check(Operation::Acquire(source), &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'tekst doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let options = AcquireOptions::from_settings(&settings).with_source(source);
    let tick = Duration::from_millis(settings.sync.tick_interval_ms.max(10));
    let loop_epsilon = settings.sync.loop_epsilon_seconds;

    let orchestrator = Orchestrator::new(settings)?.with_progress(true);
    let acquisition = acquire(&orchestrator, &args.media, args.language.as_deref(), options).await?;
    if acquisition.is_demo() {
        Output::warning("No captions available for this video; playing the demo transcript.");
    }

    let transcript = acquisition.transcript;
    if transcript.is_empty() {
        Output::warning("Transcript has no segments.");
        return Ok(());
    }

    let duration = transcript.duration_seconds();
    Output::header(&format!("Playing {}", transcript.media_id));
    Output::kv("Language", &transcript.language);
    Output::kv("Duration", &format_duration(duration));
    Output::kv("Speed", &format!("{}x", args.speed));
    if args.looping {
        Output::kv("Looping", "on (repeats the active segment)");
    }
    println!();

    let index = SegmentIndex::from(transcript);
    let segments = index.clone();
    let mut engine = SyncEngine::new(index, loop_epsilon);
    engine.set_looping(args.looping);

    let player = Arc::new(ClockPlayer::new(args.from, args.speed).with_duration(duration));
    let sync = SyncLoop::spawn(engine, player.clone(), tick);
    let mut updates = sync.subscribe();

    let mut shown: Option<(usize, Option<usize>)> = None;
    let mut end_check = tokio::time::interval(tick);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                debug!("Interrupted");
                println!();
                break;
            }
            _ = end_check.tick() => {
                if !sync.state().looping && player.is_finished() {
                    break;
                }
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state: SyncState = updates.borrow_and_update().clone();
                let render = render_for(shown, &state);
                if render != Render::Unchanged {
                    if let Some((i, segment)) = state
                        .active_segment
                        .and_then(|i| segments.get(i).map(|s| (i, s)))
                    {
                        if render == Render::Redraw {
                            Output::clear_last_line();
                        }
                        Output::segment(i, segment, state.active_word);
                    }
                    shown = state.active_segment.map(|i| (i, state.active_word));
                }
            }
        }
    }

    sync.stop().await;
    Output::success("Playback finished");
    Ok(())
}

/// How a state update changes the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Render {
    Unchanged,
    /// A new segment became active, or playback entered one from a gap.
    NewLine,
    /// The highlighted word moved within the segment already on screen.
    Redraw,
}

fn render_for(shown: Option<(usize, Option<usize>)>, state: &SyncState) -> Render {
    match (shown, state.active_segment) {
        (_, None) => Render::Unchanged,
        (Some((segment, word)), Some(active)) if segment == active => {
            if word == state.active_word {
                Render::Unchanged
            } else {
                Render::Redraw
            }
        }
        _ => Render::NewLine,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(segment: Option<usize>, word: Option<usize>) -> SyncState {
        SyncState {
            active_segment: segment,
            active_word: word,
            ..Default::default()
        }
    }

    #[test]
    fn test_new_segment_starts_a_line() {
        assert_eq!(render_for(None, &state(Some(0), None)), Render::NewLine);
        assert_eq!(render_for(Some((0, Some(2))), &state(Some(1), Some(0))), Render::NewLine);
    }

    #[test]
    fn test_word_change_redraws_segment() {
        assert_eq!(render_for(Some((0, None)), &state(Some(0), Some(0))), Render::Redraw);
        assert_eq!(render_for(Some((0, Some(0))), &state(Some(0), Some(1))), Render::Redraw);
    }

    #[test]
    fn test_unchanged_or_gap_prints_nothing() {
        assert_eq!(render_for(Some((0, Some(1))), &state(Some(0), Some(1))), Render::Unchanged);
        assert_eq!(render_for(Some((0, Some(1))), &state(None, None)), Render::Unchanged);
    }
}
