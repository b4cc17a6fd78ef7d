//! Tick-driven playback synchronization state machine.

use crate::transcript::SegmentIndex;
use serde::Serialize;
use tracing::debug;

/// Observable state of a sync session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    /// Last observed playback time in seconds.
    pub time: f64,
    /// Index of the active segment.
    pub active_segment: Option<usize>,
    /// Index of the spoken word within the active segment.
    pub active_word: Option<usize>,
    pub looping: bool,
}

/// What a single tick decided.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub state: SyncState,
    /// True when the active segment index changed on this tick.
    pub changed: bool,
    /// Position the player must seek to, when looping wrapped around.
    pub seek_to: Option<f64>,
}

/// Resolves playback time to the active segment and word, and drives
/// single-segment looping.
///
/// The active segment is sticky: while playback is in a gap between segments
/// the previously active segment stays active. Explicit seeks through the
/// engine re-resolve it immediately.
#[derive(Debug, Clone)]
pub struct SyncEngine {
    index: SegmentIndex,
    active: Option<usize>,
    time: f64,
    looping: bool,
    loop_epsilon: f64,
}

impl SyncEngine {
    pub fn new(index: SegmentIndex, loop_epsilon: f64) -> Self {
        Self {
            index,
            active: None,
            time: 0.0,
            looping: false,
            loop_epsilon: loop_epsilon.max(0.0),
        }
    }

    pub fn index(&self) -> &SegmentIndex {
        &self.index
    }

    pub fn active_segment(&self) -> Option<usize> {
        self.active
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        debug!("Looping {}", if looping { "enabled" } else { "disabled" });
        self.looping = looping;
    }

    /// Word of the active segment spoken at the last observed time.
    pub fn active_word(&self) -> Option<usize> {
        self.index.active_word(self.active?, self.time)
    }

    pub fn state(&self) -> SyncState {
        SyncState {
            time: self.time,
            active_segment: self.active,
            active_word: self.active_word(),
            looping: self.looping,
        }
    }

    /// Start of the active segment when looping must wrap at `time`.
    fn loop_target(&self, time: f64) -> Option<f64> {
        if !self.looping {
            return None;
        }
        let segment = self.index.get(self.active?)?;
        (time >= segment.end() - self.loop_epsilon).then_some(segment.start)
    }

    /// Advance to playback time `time`.
    ///
    /// The loop check runs against the segment that was active before this
    /// tick, so overshooting into the next segment between ticks still wraps.
    pub fn tick(&mut self, time: f64) -> TickOutcome {
        if let Some(start) = self.loop_target(time) {
            self.time = start;
            return TickOutcome {
                state: self.state(),
                changed: false,
                seek_to: Some(start),
            };
        }

        self.time = time;
        let changed = self.update_active(time);

        let seek_to = self.loop_target(time);
        if let Some(start) = seek_to {
            self.time = start;
        }

        TickOutcome {
            state: self.state(),
            changed,
            seek_to,
        }
    }

    fn update_active(&mut self, time: f64) -> bool {
        match self.index.resolve(time) {
            Some(resolved) if self.active != Some(resolved) => {
                self.active = Some(resolved);
                true
            }
            _ => false,
        }
    }

    /// Jump to an absolute time, clamped at zero. Returns the target.
    pub fn seek(&mut self, time: f64) -> f64 {
        let target = time.max(0.0);
        self.time = target;
        // An explicit seek into a gap leaves no segment active
        self.active = self.index.resolve(target);
        target
    }

    /// Jump `delta` seconds from `current`. Returns the target.
    pub fn seek_relative(&mut self, current: f64, delta: f64) -> f64 {
        self.seek(current + delta)
    }

    /// Jump to the start of segment `index`, making it active.
    pub fn seek_to_segment(&mut self, index: usize) -> Option<f64> {
        let start = self.index.get(index)?.start;
        self.time = start;
        self.active = Some(index);
        Some(start)
    }
}
