//! Background task polling a player on a fixed interval.

use super::{Player, SyncEngine, SyncState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Control messages accepted by a running sync loop.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncCommand {
    SetLooping(bool),
    Seek(f64),
    SeekRelative(f64),
    SeekToSegment(usize),
    Stop,
}

/// A running sync loop. Dropping the handle tears the loop down.
pub struct SyncLoop {
    commands: mpsc::UnboundedSender<SyncCommand>,
    state: watch::Receiver<SyncState>,
    handle: Option<JoinHandle<()>>,
}

impl SyncLoop {
    /// Spawn the loop on the current tokio runtime.
    pub fn spawn(engine: SyncEngine, player: Arc<dyn Player>, interval: Duration) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(engine.state());

        let handle = tokio::spawn(run(engine, player, interval, command_rx, state_tx));

        Self {
            commands,
            state,
            handle: Some(handle),
        }
    }

    /// Latest published state.
    pub fn state(&self) -> SyncState {
        self.state.borrow().clone()
    }

    /// Receiver notified whenever the state changes.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.clone()
    }

    /// Send a command. Returns false once the loop has stopped.
    pub fn send(&self, command: SyncCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn set_looping(&self, looping: bool) -> bool {
        self.send(SyncCommand::SetLooping(looping))
    }

    pub fn seek(&self, seconds: f64) -> bool {
        self.send(SyncCommand::Seek(seconds))
    }

    pub fn seek_relative(&self, delta: f64) -> bool {
        self.send(SyncCommand::SeekRelative(delta))
    }

    pub fn seek_to_segment(&self, index: usize) -> bool {
        self.send(SyncCommand::SeekToSegment(index))
    }

    /// Stop the loop and wait for the task to finish.
    pub async fn stop(mut self) {
        let _ = self.commands.send(SyncCommand::Stop);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for SyncLoop {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn run(
    mut engine: SyncEngine,
    player: Arc<dyn Player>,
    interval: Duration,
    mut commands: mpsc::UnboundedReceiver<SyncCommand>,
    state: watch::Sender<SyncState>,
) {
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Sync loop started ({} ms tick)", interval.as_millis());

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let outcome = engine.tick(player.current_time());
                if let Some(target) = outcome.seek_to {
                    debug!("Looping back to {:.2}s", target);
                    player.seek_to(target);
                }
                publish(&state, outcome.state);
            }
            command = commands.recv() => {
                let Some(command) = command else { break };
                match command {
                    SyncCommand::Stop => break,
                    SyncCommand::SetLooping(looping) => engine.set_looping(looping),
                    SyncCommand::Seek(seconds) => {
                        player.seek_to(engine.seek(seconds));
                    }
                    SyncCommand::SeekRelative(delta) => {
                        player.seek_to(engine.seek_relative(player.current_time(), delta));
                    }
                    SyncCommand::SeekToSegment(index) => {
                        if let Some(target) = engine.seek_to_segment(index) {
                            player.seek_to(target);
                        }
                    }
                }
                publish(&state, engine.state());
            }
        }
    }

    info!("Sync loop stopped");
}

fn publish(state: &watch::Sender<SyncState>, next: SyncState) {
    state.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    });
}
