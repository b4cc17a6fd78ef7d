//! Playback sources driven by the sync loop.

use std::sync::Mutex;
use std::time::Instant;

/// A media player the sync loop can poll and seek.
pub trait Player: Send + Sync {
    /// Current playback position in seconds.
    fn current_time(&self) -> f64;

    /// Move playback to `seconds`.
    fn seek_to(&self, seconds: f64);
}

struct Anchor {
    position: f64,
    at: Instant,
}

/// Simulated player whose position advances with the wall clock.
pub struct ClockPlayer {
    anchor: Mutex<Anchor>,
    speed: f64,
    duration: Option<f64>,
}

impl ClockPlayer {
    /// Start playing at `position` with the given speed multiplier.
    pub fn new(position: f64, speed: f64) -> Self {
        Self {
            anchor: Mutex::new(Anchor {
                position: position.max(0.0),
                at: Instant::now(),
            }),
            speed: if speed > 0.0 { speed } else { 1.0 },
            duration: None,
        }
    }

    /// Stop advancing once `duration` seconds are reached.
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration.max(0.0));
        self
    }

    /// Whether playback has reached the end of the media.
    pub fn is_finished(&self) -> bool {
        self.duration.is_some_and(|d| self.current_time() >= d)
    }
}

impl Player for ClockPlayer {
    fn current_time(&self) -> f64 {
        let anchor = self.anchor.lock().unwrap_or_else(|e| e.into_inner());
        let position = anchor.position + anchor.at.elapsed().as_secs_f64() * self.speed;
        match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    fn seek_to(&self, seconds: f64) {
        let mut anchor = self.anchor.lock().unwrap_or_else(|e| e.into_inner());
        anchor.position = seconds.max(0.0);
        anchor.at = Instant::now();
    }
}
