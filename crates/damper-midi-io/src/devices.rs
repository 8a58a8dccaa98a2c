//! Device lists, selection, and hot-plug merging.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortKind {
    Input,
    Output,
}

/// A MIDI port as seen by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Stable identifier (the port name for midir ports).
    pub id: String,
    pub name: String,
    pub kind: PortKind,
}

impl DeviceInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: PortKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
        }
    }

    pub fn input(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(name.clone(), name, PortKind::Input)
    }

    pub fn output(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(name.clone(), name, PortKind::Output)
    }
}

/// Hot-plug notification from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Connected(DeviceInfo),
    Disconnected(DeviceInfo),
}

impl DeviceEvent {
    pub fn device(&self) -> &DeviceInfo {
        match self {
            DeviceEvent::Connected(device) | DeviceEvent::Disconnected(device) => device,
        }
    }
}

/// What changed after a registry update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryChange {
    InputDevices,
    OutputDevices,
    /// Selected input changed (`None` when cleared).
    InputDevice(Option<DeviceInfo>),
    OutputDevice(Option<DeviceInfo>),
}

/// Known input and output ports plus the current selection of each.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    inputs: Vec<DeviceInfo>,
    outputs: Vec<DeviceInfo>,
    input: Option<DeviceInfo>,
    output: Option<DeviceInfo>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a hot-plug event.
    ///
    /// Disconnecting the selected device clears the selection; that change is
    /// reported before the list change.
    pub fn apply(&mut self, event: DeviceEvent) -> Vec<RegistryChange> {
        let mut changes = Vec::new();
        match event {
            DeviceEvent::Connected(device) => {
                info!(kind = ?device.kind, "MIDI device connected: {}", device.name);
                let kind = device.kind;
                let list = self.list_mut(kind);
                if !list.iter().any(|d| d.id == device.id) {
                    list.push(device);
                }
                changes.push(list_change(kind));
            }
            DeviceEvent::Disconnected(device) => {
                info!(kind = ?device.kind, "MIDI device disconnected: {}", device.name);
                let kind = device.kind;
                self.list_mut(kind).retain(|d| d.id != device.id);
                let selected = self.selected_mut(kind);
                if selected.as_ref().is_some_and(|d| d.id == device.id) {
                    *selected = None;
                    changes.push(selection_change(kind, None));
                }
                changes.push(list_change(kind));
            }
        }
        changes
    }

    /// Select the input with `id`, or clear the selection with `None`.
    ///
    /// Returns the change, or `None` when the selection stayed the same.
    pub fn select_input(&mut self, id: Option<&str>) -> Result<Option<RegistryChange>> {
        self.select(PortKind::Input, id)
    }

    pub fn select_output(&mut self, id: Option<&str>) -> Result<Option<RegistryChange>> {
        self.select(PortKind::Output, id)
    }

    fn select(&mut self, kind: PortKind, id: Option<&str>) -> Result<Option<RegistryChange>> {
        let device = match id {
            Some(id) => Some(
                self.devices(kind)
                    .iter()
                    .find(|d| d.id == id)
                    .cloned()
                    .ok_or_else(|| Error::MidiDevice(format!("no {:?} device '{}'", kind, id)))?,
            ),
            None => None,
        };

        let selected = self.selected_mut(kind);
        if *selected == device {
            return Ok(None);
        }
        debug!(?kind, device = ?device.as_ref().map(|d| &d.name), "selection changed");
        *selected = device.clone();
        Ok(Some(selection_change(kind, device)))
    }

    pub fn inputs(&self) -> &[DeviceInfo] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[DeviceInfo] {
        &self.outputs
    }

    pub fn devices(&self, kind: PortKind) -> &[DeviceInfo] {
        match kind {
            PortKind::Input => &self.inputs,
            PortKind::Output => &self.outputs,
        }
    }

    pub fn input(&self) -> Option<&DeviceInfo> {
        self.input.as_ref()
    }

    pub fn output(&self) -> Option<&DeviceInfo> {
        self.output.as_ref()
    }

    fn list_mut(&mut self, kind: PortKind) -> &mut Vec<DeviceInfo> {
        match kind {
            PortKind::Input => &mut self.inputs,
            PortKind::Output => &mut self.outputs,
        }
    }

    fn selected_mut(&mut self, kind: PortKind) -> &mut Option<DeviceInfo> {
        match kind {
            PortKind::Input => &mut self.input,
            PortKind::Output => &mut self.output,
        }
    }
}

fn list_change(kind: PortKind) -> RegistryChange {
    match kind {
        PortKind::Input => RegistryChange::InputDevices,
        PortKind::Output => RegistryChange::OutputDevices,
    }
}

fn selection_change(kind: PortKind, device: Option<DeviceInfo>) -> RegistryChange {
    match kind {
        PortKind::Input => RegistryChange::InputDevice(device),
        PortKind::Output => RegistryChange::OutputDevice(device),
    }
}

#[cfg(feature = "midi-io")]
pub use watcher::{list_ports, DeviceWatcher};

#[cfg(feature = "midi-io")]
mod watcher {
    use std::collections::HashSet;
    use std::thread::{self, JoinHandle};
    use std::time::Duration;

    use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
    use midir::{MidiInput, MidiOutput};
    use tracing::{debug, error};

    use super::{DeviceEvent, DeviceInfo};
    use crate::error::{Error, Result};

    /// Current input and output ports.
    pub fn list_ports(client_name: &str) -> Result<Vec<DeviceInfo>> {
        let input = MidiInput::new(client_name)?;
        let output = MidiOutput::new(client_name)?;
        Ok(snapshot(&input, &output).into_iter().collect())
    }

    fn snapshot(input: &MidiInput, output: &MidiOutput) -> HashSet<DeviceInfo> {
        let inputs = input
            .ports()
            .iter()
            .enumerate()
            .map(|(index, port)| {
                DeviceInfo::input(
                    input
                        .port_name(port)
                        .unwrap_or_else(|_| format!("Unknown Device {}", index)),
                )
            })
            .collect::<Vec<_>>();
        let outputs = output
            .ports()
            .iter()
            .enumerate()
            .map(|(index, port)| {
                DeviceInfo::output(
                    output
                        .port_name(port)
                        .unwrap_or_else(|_| format!("Unknown Device {}", index)),
                )
            })
            .collect::<Vec<_>>();
        inputs.into_iter().chain(outputs).collect()
    }

    /// Polls the host's port lists and reports differences as [`DeviceEvent`]s.
    ///
    /// The first poll reports every present port as connected.
    pub struct DeviceWatcher {
        shutdown: Sender<()>,
        thread: Option<JoinHandle<()>>,
    }

    impl DeviceWatcher {
        /// Fails with `AccessDenied` if the host refuses a MIDI client.
        pub fn spawn(
            client_name: &str,
            poll_interval: Duration,
        ) -> Result<(Self, Receiver<DeviceEvent>)> {
            // Probe once so access problems surface here rather than in the thread.
            drop(MidiInput::new(client_name)?);

            let (shutdown, shutdown_receiver) = bounded(1);
            let (events, event_receiver) = unbounded();
            let client_name = client_name.to_string();

            let thread = thread::Builder::new()
                .name("damper-device-watcher".to_string())
                .spawn(move || {
                    Self::watch_thread(&client_name, poll_interval, shutdown_receiver, events);
                })
                .map_err(|e| Error::MidiDevice(format!("failed to spawn device watcher: {}", e)))?;

            Ok((
                Self {
                    shutdown,
                    thread: Some(thread),
                },
                event_receiver,
            ))
        }

        fn watch_thread(
            client_name: &str,
            poll_interval: Duration,
            shutdown: Receiver<()>,
            events: Sender<DeviceEvent>,
        ) {
            let (input, output) = match (MidiInput::new(client_name), MidiOutput::new(client_name)) {
                (Ok(input), Ok(output)) => (input, output),
                (Err(e), _) => {
                    error!("MIDI access denied: {}", e);
                    return;
                }
                (_, Err(e)) => {
                    error!("MIDI access denied: {}", e);
                    return;
                }
            };

            let mut known: HashSet<DeviceInfo> = HashSet::new();
            loop {
                let current = snapshot(&input, &output);
                let gone = known.difference(&current).cloned().map(DeviceEvent::Disconnected);
                let new = current.difference(&known).cloned().map(DeviceEvent::Connected);
                for event in gone.chain(new) {
                    if events.send(event).is_err() {
                        debug!("device event receiver dropped, stopping watcher");
                        return;
                    }
                }
                known = current;

                match shutdown.recv_timeout(poll_interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        }

        pub fn stop(&mut self) {
            let _ = self.shutdown.send(());
            if let Some(thread) = self.thread.take() {
                let _ = thread.join();
            }
        }
    }

    impl Drop for DeviceWatcher {
        fn drop(&mut self) {
            self.stop();
        }
    }
}
