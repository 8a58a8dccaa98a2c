//! Replay scheduler.
//!
//! The player does no I/O and reads no clock of its own: the driver passes
//! the current time into [`Player::tick`] once per period. Each tick hands
//! the sink every message that falls inside the lookahead window, stamped
//! with its absolute send time, so the sink can do the precise timing.

use damper_midi::{MidiSession, TimestampedMessage};
use tracing::trace;

use crate::error::Result;
use crate::sink::MidiOutputSink;

/// Default lookahead window in milliseconds.
pub const DEFAULT_LOOKAHEAD_MS: f64 = 200.0;

/// Whether the driver should schedule another tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Finished,
}

/// Replays a captured sequence, preserving its relative timing.
#[derive(Debug, Clone)]
pub struct Player {
    messages: Vec<TimestampedMessage>,
    lookahead_ms: f64,
    start_time: Option<f64>,
    cursor: usize,
}

impl Player {
    pub fn new(messages: Vec<TimestampedMessage>) -> Self {
        Self {
            messages,
            lookahead_ms: DEFAULT_LOOKAHEAD_MS,
            start_time: None,
            cursor: 0,
        }
    }

    pub fn from_session(session: &MidiSession) -> Self {
        Self::new(session.messages().to_vec())
    }

    pub fn with_lookahead(mut self, lookahead_ms: f64) -> Self {
        self.lookahead_ms = lookahead_ms;
        self
    }

    /// Anchor the first message at `now` and rewind.
    pub fn start(&mut self, now: f64) {
        self.start_time = Some(now);
        self.cursor = 0;
    }

    /// Dispatch every message due before `now + lookahead`.
    ///
    /// An unstarted player starts at `now`. A failed send leaves the cursor on
    /// the message that failed.
    pub fn tick<S: MidiOutputSink + ?Sized>(&mut self, now: f64, sink: &mut S) -> Result<TickOutcome> {
        let start_time = *self.start_time.get_or_insert(now);
        let Some(first) = self.messages.first() else {
            return Ok(TickOutcome::Finished);
        };
        let first_time = first.when_ms();
        let delta = now - start_time;

        let mut sent = 0;
        while let Some(message) = self.messages.get(self.cursor) {
            let relative = message.when_ms() - first_time;
            if relative >= delta + self.lookahead_ms {
                break;
            }
            sink.send(&message.data, Some(now + (relative - delta)))?;
            self.cursor += 1;
            sent += 1;
        }

        trace!(delta, sent, cursor = self.cursor, "playback tick");
        Ok(if self.is_finished() {
            TickOutcome::Finished
        } else {
            TickOutcome::Continue
        })
    }

    /// Index of the next message to dispatch.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_started(&self) -> bool {
        self.start_time.is_some()
    }

    /// True once every message has been dispatched.
    pub fn is_finished(&self) -> bool {
        self.cursor >= self.messages.len()
    }

    pub fn lookahead_ms(&self) -> f64 {
        self.lookahead_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::RecordingSink;

    fn at(offsets: &[f64]) -> Player {
        Player::new(
            offsets
                .iter()
                .enumerate()
                .map(|(i, &ms)| TimestampedMessage::new(1000.0 + ms, vec![0x90, 60 + i as u8, 100]))
                .collect(),
        )
    }

    #[test]
    fn test_empty_finishes_immediately() {
        let mut player = Player::new(Vec::new());
        let mut sink = RecordingSink::new();
        assert_eq!(player.tick(0.0, &mut sink).unwrap(), TickOutcome::Finished);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_first_tick_honours_lookahead() {
        let mut player = at(&[0.0, 50.0, 300.0, 450.0]);
        let mut sink = RecordingSink::new();
        player.start(5000.0);
        assert_eq!(player.tick(5000.0, &mut sink).unwrap(), TickOutcome::Continue);

        let when: Vec<_> = sink.sent().iter().map(|m| m.when).collect();
        assert_eq!(when, vec![Some(5000.0), Some(5050.0)]);
        assert_eq!(player.cursor(), 2);
    }

    #[test]
    fn test_last_message_is_delivered() {
        let mut player = at(&[0.0, 50.0, 300.0, 450.0]);
        let mut sink = RecordingSink::new();
        player.start(0.0);

        let mut outcome = TickOutcome::Continue;
        let mut now = 0.0;
        while outcome == TickOutcome::Continue {
            outcome = player.tick(now, &mut sink).unwrap();
            now += 100.0;
        }

        let when: Vec<_> = sink.sent().iter().filter_map(|m| m.when).collect();
        assert_eq!(when, vec![0.0, 50.0, 300.0, 450.0]);
        assert!(player.is_finished());
    }

    #[test]
    fn test_late_tick_sends_in_the_past() {
        let mut player = at(&[0.0, 100.0]);
        let mut sink = RecordingSink::new();
        player.start(0.0);
        player.tick(250.0, &mut sink).unwrap();
        let when: Vec<_> = sink.sent().iter().filter_map(|m| m.when).collect();
        assert_eq!(when, vec![0.0, 100.0]);
    }

    #[test]
    fn test_unstarted_player_starts_on_tick() {
        let mut player = at(&[0.0, 500.0]);
        let mut sink = RecordingSink::new();
        assert!(!player.is_started());
        player.tick(42.0, &mut sink).unwrap();
        assert!(player.is_started());
        assert_eq!(sink.sent()[0].when, Some(42.0));
    }
}
