//! MIDI input: device enumeration, connection, and capture forwarding.
//!
//! midir connections live on a dedicated thread; captured messages come back
//! over a channel. Nothing is filtered here, the corrector decides what to
//! keep.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use arc_swap::ArcSwap;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use midir::{MidiInput, MidiInputConnection};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Bytes received from an input port.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedMessage {
    /// Driver timestamp in milliseconds (origin is driver specific).
    pub timestamp_ms: f64,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct MidiInputDevice {
    pub index: usize,
    pub name: String,
}

enum MidiInputCommand {
    Connect(usize),
    Disconnect,
    Shutdown,
}

/// Input port manager with its own connection thread.
pub struct MidiInputManager {
    client_name: String,
    command_sender: Sender<MidiInputCommand>,
    messages: Receiver<CapturedMessage>,
    connected_device: Arc<ArcSwap<Option<String>>>,
    is_connected: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl MidiInputManager {
    /// Fails with `AccessDenied` if the host refuses a MIDI client.
    pub fn new(client_name: &str) -> Result<Self> {
        drop(MidiInput::new(client_name)?);

        let (command_sender, command_receiver) = bounded(16);
        let (message_sender, messages) = bounded(4096);
        let connected_device = Arc::new(ArcSwap::new(Arc::new(None)));
        let is_connected = Arc::new(AtomicBool::new(false));

        let thread = {
            let client_name = client_name.to_string();
            let connected_device = Arc::clone(&connected_device);
            let is_connected = Arc::clone(&is_connected);
            thread::Builder::new()
                .name("damper-midi-input".to_string())
                .spawn(move || {
                    Self::midi_input_thread(
                        &client_name,
                        command_receiver,
                        message_sender,
                        connected_device,
                        is_connected,
                    );
                })
                .map_err(|e| Error::MidiDevice(format!("failed to spawn input thread: {}", e)))?
        };

        Ok(Self {
            client_name: client_name.to_string(),
            command_sender,
            messages,
            connected_device,
            is_connected,
            thread: Some(thread),
        })
    }

    fn midi_input_thread(
        client_name: &str,
        command_receiver: Receiver<MidiInputCommand>,
        message_sender: Sender<CapturedMessage>,
        connected_device: Arc<ArcSwap<Option<String>>>,
        is_connected: Arc<AtomicBool>,
    ) {
        let mut connection: Option<MidiInputConnection<()>> = None;

        loop {
            match command_receiver.recv_timeout(Duration::from_millis(100)) {
                Ok(MidiInputCommand::Connect(device_index)) => {
                    connection = None;
                    is_connected.store(false, Ordering::SeqCst);
                    connected_device.store(Arc::new(None));

                    match Self::connect_to_device(client_name, device_index, message_sender.clone())
                    {
                        Ok((conn, name)) => {
                            info!("Listening on MIDI input {}", name);
                            connection = Some(conn);
                            is_connected.store(true, Ordering::SeqCst);
                            connected_device.store(Arc::new(Some(name)));
                        }
                        Err(e) => warn!("MIDI input connect failed: {}", e),
                    }
                }
                Ok(MidiInputCommand::Disconnect) => {
                    if connection.take().is_some() {
                        is_connected.store(false, Ordering::SeqCst);
                        connected_device.store(Arc::new(None));
                    }
                }
                Ok(MidiInputCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
    }

    fn connect_to_device(
        client_name: &str,
        device_index: usize,
        message_sender: Sender<CapturedMessage>,
    ) -> Result<(MidiInputConnection<()>, String)> {
        let midi_input = MidiInput::new(client_name)?;

        let ports = midi_input.ports();
        let port = ports.get(device_index).ok_or_else(|| {
            Error::MidiDevice(format!("MIDI input device {} not found", device_index))
        })?;

        let port_name = midi_input
            .port_name(port)
            .unwrap_or_else(|_| format!("Device {}", device_index));

        let connection = midi_input.connect(
            port,
            "damper-input",
            move |timestamp_us, bytes, _| {
                let message = CapturedMessage {
                    timestamp_ms: timestamp_us as f64 / 1000.0,
                    bytes: bytes.to_vec(),
                };
                if message_sender.try_send(message).is_err() {
                    debug!("MIDI input queue full, dropping message");
                }
            },
            (),
        )?;

        Ok((connection, port_name))
    }

    pub fn list_devices(client_name: &str) -> Vec<MidiInputDevice> {
        let mut devices = Vec::new();
        if let Ok(midi_input) = MidiInput::new(client_name) {
            for (index, port) in midi_input.ports().iter().enumerate() {
                let name = midi_input
                    .port_name(port)
                    .unwrap_or_else(|_| format!("Unknown Device {}", index));
                devices.push(MidiInputDevice { index, name });
            }
        }
        devices
    }

    pub fn connect(&self, device_index: usize) -> Result<()> {
        self.command_sender
            .send(MidiInputCommand::Connect(device_index))
            .map_err(|_| Error::MidiDevice("MIDI input thread not running".to_string()))
    }

    /// Connect to the first device whose name contains `name`, ignoring case.
    pub fn connect_by_name(&self, name: &str) -> Result<()> {
        let needle = name.to_lowercase();
        let device = Self::list_devices(&self.client_name)
            .into_iter()
            .find(|d| d.name.to_lowercase().contains(&needle))
            .ok_or_else(|| {
                Error::MidiDevice(format!("No MIDI input device found matching '{}'", name))
            })?;
        self.connect(device.index)
    }

    pub fn disconnect(&self) {
        let _ = self.command_sender.send(MidiInputCommand::Disconnect);
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected.load(Ordering::SeqCst)
    }

    pub fn connected_device_name(&self) -> Option<String> {
        self.connected_device.load().as_ref().clone()
    }

    /// Channel of captured messages.
    pub fn messages(&self) -> &Receiver<CapturedMessage> {
        &self.messages
    }

    pub fn try_recv(&self) -> Option<CapturedMessage> {
        match self.messages.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

impl Drop for MidiInputManager {
    fn drop(&mut self) {
        let _ = self.command_sender.send(MidiInputCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
