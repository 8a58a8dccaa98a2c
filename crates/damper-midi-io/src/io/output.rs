//! MIDI output: device enumeration, connection, and timed sending via a
//! dedicated thread.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use arc_swap::ArcSwap;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use midir::{MidiOutput, MidiOutputConnection};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::sink::{MidiOutputSink, PortConnection};

const IDLE_WAIT_MS: f64 = 100.0;

#[derive(Debug, Clone)]
pub struct MidiOutputDevice {
    pub index: usize,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
struct PortStatus {
    connection: PortConnection,
    device: Option<String>,
}

enum MidiOutputCommand {
    Connect(usize),
    Disconnect,
    Send { bytes: Vec<u8>, when: Option<f64> },
    Clear,
    Shutdown,
}

/// Output port manager.
///
/// Sends carry an absolute time on the shared clock; the output thread holds
/// them in a time-ordered queue and emits each once it is due.
pub struct MidiOutputManager {
    client_name: String,
    command_sender: Sender<MidiOutputCommand>,
    status: Arc<ArcSwap<PortStatus>>,
    last_device: Option<usize>,
    thread: Option<JoinHandle<()>>,
}

impl MidiOutputManager {
    /// Fails with `AccessDenied` if the host refuses a MIDI client.
    pub fn new(client_name: &str, clock: Arc<dyn Clock>) -> Result<Self> {
        drop(MidiOutput::new(client_name)?);

        let (command_sender, command_receiver) = bounded(1024);
        let status = Arc::new(ArcSwap::from_pointee(PortStatus::default()));

        let thread = {
            let client_name = client_name.to_string();
            let status = Arc::clone(&status);
            thread::Builder::new()
                .name("damper-midi-output".to_string())
                .spawn(move || {
                    Self::midi_output_thread(&client_name, clock, command_receiver, status);
                })
                .map_err(|e| Error::MidiDevice(format!("failed to spawn output thread: {}", e)))?
        };

        Ok(Self {
            client_name: client_name.to_string(),
            command_sender,
            status,
            last_device: None,
            thread: Some(thread),
        })
    }

    fn midi_output_thread(
        client_name: &str,
        clock: Arc<dyn Clock>,
        command_receiver: Receiver<MidiOutputCommand>,
        status: Arc<ArcSwap<PortStatus>>,
    ) {
        let mut connection: Option<MidiOutputConnection> = None;
        let mut queue: VecDeque<(f64, Vec<u8>)> = VecDeque::new();

        loop {
            let wait_ms = queue
                .front()
                .map(|(when, _)| (when - clock.now_ms()).clamp(0.0, IDLE_WAIT_MS))
                .unwrap_or(IDLE_WAIT_MS);

            match command_receiver.recv_timeout(Duration::from_secs_f64(wait_ms / 1000.0)) {
                Ok(MidiOutputCommand::Connect(device_index)) => {
                    connection = None;
                    match Self::connect_to_device(client_name, device_index) {
                        Ok((conn, name)) => {
                            info!("Opened MIDI output {}", name);
                            connection = Some(conn);
                            status.store(Arc::new(PortStatus {
                                connection: PortConnection::Open,
                                device: Some(name),
                            }));
                        }
                        Err(e) => {
                            warn!("MIDI output connect failed: {}", e);
                            status.store(Arc::new(PortStatus::default()));
                        }
                    }
                }
                Ok(MidiOutputCommand::Disconnect) => {
                    connection = None;
                    queue.clear();
                    status.store(Arc::new(PortStatus::default()));
                }
                Ok(MidiOutputCommand::Send { bytes, when }) => {
                    let when = when.filter(|t| t.is_finite()).unwrap_or_else(|| clock.now_ms());
                    let index = queue.partition_point(|(t, _)| *t <= when);
                    queue.insert(index, (when, bytes));
                }
                Ok(MidiOutputCommand::Clear) => queue.clear(),
                Ok(MidiOutputCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }

            let now = clock.now_ms();
            while queue.front().is_some_and(|(when, _)| *when <= now) {
                let Some((_, bytes)) = queue.pop_front() else {
                    break;
                };
                match connection.as_mut() {
                    Some(conn) => {
                        if let Err(e) = conn.send(&bytes) {
                            warn!("MIDI output send failed: {}", e);
                        }
                    }
                    None => debug!("Cannot send MIDI message: no device connected"),
                }
            }
        }
    }

    fn connect_to_device(
        client_name: &str,
        device_index: usize,
    ) -> Result<(MidiOutputConnection, String)> {
        let midi_output = MidiOutput::new(client_name)?;

        let ports = midi_output.ports();
        let port = ports.get(device_index).ok_or_else(|| {
            Error::MidiDevice(format!("MIDI output device {} not found", device_index))
        })?;

        let port_name = midi_output
            .port_name(port)
            .unwrap_or_else(|_| format!("Device {}", device_index));

        let connection = midi_output.connect(port, "damper-output")?;

        Ok((connection, port_name))
    }

    pub fn list_devices(client_name: &str) -> Vec<MidiOutputDevice> {
        let mut devices = Vec::new();
        if let Ok(midi_output) = MidiOutput::new(client_name) {
            for (index, port) in midi_output.ports().iter().enumerate() {
                let name = midi_output
                    .port_name(port)
                    .unwrap_or_else(|_| format!("Unknown Device {}", index));
                devices.push(MidiOutputDevice { index, name });
            }
        }
        devices
    }

    /// Connect asynchronously; the port reads `Pending` until the thread
    /// reports back.
    pub fn connect(&mut self, device_index: usize) -> Result<()> {
        self.status.store(Arc::new(PortStatus {
            connection: PortConnection::Pending,
            device: None,
        }));
        self.last_device = Some(device_index);
        self.command_sender
            .send(MidiOutputCommand::Connect(device_index))
            .map_err(|_| Error::MidiDevice("MIDI output thread not running".to_string()))
    }

    /// Connect to the first device whose name contains `name`, ignoring case.
    pub fn connect_by_name(&mut self, name: &str) -> Result<()> {
        let needle = name.to_lowercase();
        let device = Self::list_devices(&self.client_name)
            .into_iter()
            .find(|d| d.name.to_lowercase().contains(&needle))
            .ok_or_else(|| {
                Error::MidiDevice(format!("No MIDI output device found matching '{}'", name))
            })?;
        self.connect(device.index)
    }

    pub fn disconnect(&self) {
        let _ = self.command_sender.send(MidiOutputCommand::Disconnect);
    }

    pub fn connected_device_name(&self) -> Option<String> {
        self.status.load().device.clone()
    }
}

impl MidiOutputSink for MidiOutputManager {
    fn name(&self) -> String {
        self.connected_device_name()
            .unwrap_or_else(|| self.client_name.clone())
    }

    fn connection(&self) -> PortConnection {
        self.status.load().connection
    }

    /// Reconnect to the last device passed to `connect`.
    fn open(&mut self) -> Result<()> {
        if self.connection() != PortConnection::Closed {
            return Ok(());
        }
        match self.last_device {
            Some(index) => self.connect(index),
            None => Err(Error::PortClosed("no MIDI output device selected".to_string())),
        }
    }

    fn close(&mut self) -> Result<()> {
        self.disconnect();
        Ok(())
    }

    fn send(&mut self, data: &[u8], when: Option<f64>) -> Result<()> {
        if self.connection() == PortConnection::Closed {
            self.open()?;
        }
        self.command_sender
            .try_send(MidiOutputCommand::Send {
                bytes: data.to_vec(),
                when,
            })
            .map_err(|e| Error::MidiPort(format!("MIDI output queue: {}", e)))
    }

    fn clear(&mut self) {
        let _ = self.command_sender.send(MidiOutputCommand::Clear);
    }
}

impl Drop for MidiOutputManager {
    fn drop(&mut self) {
        let _ = self.command_sender.send(MidiOutputCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
