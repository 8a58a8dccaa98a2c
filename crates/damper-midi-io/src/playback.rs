//! Threaded driver for [`Player`].
//!
//! One thread owns the player and the sink and ticks once per period. The
//! period wait doubles as the command receive, so a cancel interrupts it
//! immediately.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::PlaybackConfig;
use crate::error::{Error, Result};
use crate::player::{Player, TickOutcome};
use crate::sink::MidiOutputSink;

enum PlaybackCommand {
    Cancel,
    PortDisconnected,
}

/// How a playback ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEnd {
    Completed,
    Cancelled,
    PortDisconnected,
    /// The sink rejected a send.
    Failed,
}

/// Result of a finished playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackSummary {
    pub end: PlaybackEnd,
    /// Messages handed to the sink.
    pub dispatched: usize,
    pub total: usize,
}

/// Spawns playback threads.
pub struct Playback;

impl Playback {
    /// Start `player` against `sink` on a dedicated thread.
    pub fn spawn<S, C>(
        mut player: Player,
        mut sink: S,
        clock: C,
        config: PlaybackConfig,
    ) -> Result<PlaybackHandle>
    where
        S: MidiOutputSink + Send + 'static,
        C: Clock + 'static,
    {
        config.validate()?;
        player = player.with_lookahead(config.lookahead_ms);

        let (command_sender, command_receiver) = bounded(4);
        let finished = Arc::new(AtomicBool::new(false));
        let finished_clone = Arc::clone(&finished);

        let thread = thread::Builder::new()
            .name("damper-playback".to_string())
            .spawn(move || {
                let summary =
                    Self::playback_thread(&mut player, &mut sink, &clock, config, command_receiver);
                finished_clone.store(true, Ordering::SeqCst);
                summary
            })
            .map_err(|e| Error::MidiDevice(format!("failed to spawn playback thread: {}", e)))?;

        Ok(PlaybackHandle {
            command_sender,
            finished,
            thread: Some(thread),
        })
    }

    fn playback_thread<S: MidiOutputSink, C: Clock>(
        player: &mut Player,
        sink: &mut S,
        clock: &C,
        config: PlaybackConfig,
        command_receiver: Receiver<PlaybackCommand>,
    ) -> PlaybackSummary {
        player.start(clock.now_ms());
        debug!(messages = player.len(), sink = %sink.name(), "playback started");

        let end = loop {
            match player.tick(clock.now_ms(), sink) {
                Ok(TickOutcome::Finished) => break PlaybackEnd::Completed,
                Ok(TickOutcome::Continue) => {}
                Err(e) => {
                    warn!("playback send failed: {}", e);
                    break PlaybackEnd::Failed;
                }
            }

            match command_receiver.recv_timeout(config.tick_interval()) {
                Ok(PlaybackCommand::Cancel) => break PlaybackEnd::Cancelled,
                Ok(PlaybackCommand::PortDisconnected) => {
                    sink.clear();
                    break PlaybackEnd::PortDisconnected;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break PlaybackEnd::Cancelled,
            }
        };

        debug!(?end, dispatched = player.cursor(), "playback ended");
        PlaybackSummary {
            end,
            dispatched: player.cursor(),
            total: player.len(),
        }
    }
}

/// Control for a running playback. Dropping it cancels the playback.
pub struct PlaybackHandle {
    command_sender: Sender<PlaybackCommand>,
    finished: Arc<AtomicBool>,
    thread: Option<JoinHandle<PlaybackSummary>>,
}

impl PlaybackHandle {
    /// Stop ticking. Returns once the playback thread has exited, so no send
    /// happens after this call.
    pub fn cancel(&mut self) -> Result<PlaybackSummary> {
        self.stop_with(PlaybackCommand::Cancel)
    }

    /// Cancel because the destination went away. Pending sends are cleared.
    pub fn port_disconnected(&mut self) -> Result<PlaybackSummary> {
        self.stop_with(PlaybackCommand::PortDisconnected)
    }

    /// True once the thread has stopped ticking.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Wait for the playback to end on its own.
    pub fn join(mut self) -> Result<PlaybackSummary> {
        self.wait()
    }

    fn stop_with(&mut self, command: PlaybackCommand) -> Result<PlaybackSummary> {
        // Already finished threads have dropped the receiver.
        let _ = self.command_sender.send(command);
        self.wait()
    }

    fn wait(&mut self) -> Result<PlaybackSummary> {
        let thread = self
            .thread
            .take()
            .ok_or_else(|| Error::PortClosed("playback already stopped".to_string()))?;
        thread
            .join()
            .map_err(|_| Error::MidiDevice("playback thread panicked".to_string()))
    }
}

impl Drop for PlaybackHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            let _ = self.cancel();
        }
    }
}
