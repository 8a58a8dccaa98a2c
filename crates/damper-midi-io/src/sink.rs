//! Output sinks: where replayed or corrected MIDI goes.

use std::sync::Arc;

use damper_midi::MidiSession;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Connection state of an output port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortConnection {
    #[default]
    Closed,
    Pending,
    Open,
}

/// A destination for MIDI bytes.
///
/// `when` is an absolute time in the caller's clock milliseconds; `None` means
/// as soon as possible. Sending on a closed port opens it first.
pub trait MidiOutputSink {
    fn name(&self) -> String;

    fn connection(&self) -> PortConnection;

    fn open(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()>;

    fn send(&mut self, data: &[u8], when: Option<f64>) -> Result<()>;

    /// Drop anything scheduled but not yet emitted.
    fn clear(&mut self);
}

impl<S: MidiOutputSink + ?Sized> MidiOutputSink for Box<S> {
    fn name(&self) -> String {
        (**self).name()
    }

    fn connection(&self) -> PortConnection {
        (**self).connection()
    }

    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn send(&mut self, data: &[u8], when: Option<f64>) -> Result<()> {
        (**self).send(data, when)
    }

    fn clear(&mut self) {
        (**self).clear()
    }
}

/// Appends everything it is sent to a [`MidiSession`], correcting on the way.
///
/// Immediate sends are stamped with the previous send time.
#[derive(Debug, Default)]
pub struct SessionSink {
    session: MidiSession,
    last_when: f64,
    connection: PortConnection,
}

impl SessionSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> &MidiSession {
        &self.session
    }

    pub fn into_session(self) -> MidiSession {
        self.session
    }
}

impl MidiOutputSink for SessionSink {
    fn name(&self) -> String {
        "session".to_string()
    }

    fn connection(&self) -> PortConnection {
        self.connection
    }

    fn open(&mut self) -> Result<()> {
        self.connection = PortConnection::Open;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.connection = PortConnection::Closed;
        Ok(())
    }

    fn send(&mut self, data: &[u8], when: Option<f64>) -> Result<()> {
        if self.connection != PortConnection::Open {
            self.open()?;
        }
        let when = when.unwrap_or(self.last_when);
        self.last_when = when;
        self.session.add(when, data)?;
        Ok(())
    }

    fn clear(&mut self) {}
}

/// One message handed to a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub data: Vec<u8>,
    pub when: Option<f64>,
}

#[derive(Debug, Default)]
struct RecordingState {
    sent: Vec<SentMessage>,
    connection: PortConnection,
    clears: usize,
}

/// Sink that keeps every send for inspection.
///
/// Clones share the same log, so one copy can be handed to a playback thread
/// while another is read.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.state.lock().sent.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().sent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `clear` calls seen.
    pub fn clear_count(&self) -> usize {
        self.state.lock().clears
    }
}

impl MidiOutputSink for RecordingSink {
    fn name(&self) -> String {
        "recording".to_string()
    }

    fn connection(&self) -> PortConnection {
        self.state.lock().connection
    }

    fn open(&mut self) -> Result<()> {
        self.state.lock().connection = PortConnection::Open;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.state.lock().connection = PortConnection::Closed;
        Ok(())
    }

    fn send(&mut self, data: &[u8], when: Option<f64>) -> Result<()> {
        let mut state = self.state.lock();
        state.connection = PortConnection::Open;
        state.sent.push(SentMessage {
            data: data.to_vec(),
            when,
        });
        Ok(())
    }

    fn clear(&mut self) {
        self.state.lock().clears += 1;
    }
}
