//! Application model: devices, recording, playback and the activity log.
//!
//! The model is driven from one thread. Hot-plug events produced elsewhere
//! arrive over a channel and are merged by [`AppModel::pump`], between the
//! caller's other operations, so they never race a state change.

use crossbeam_channel::Receiver;
use tracing::debug;

use crate::config::DamperConfig;
use crate::io::Error as IoError;
use crate::log::{LogBook, LogLevel, LogMessage};
use crate::{
    AudioBackend, Clock, DeviceEvent, DeviceInfo, DeviceRegistry, MidiOutputSink,
    MidiSession, Playback, PlaybackEnd, PlaybackHandle, PlaybackSummary, Player, PolySynth, PortKind,
    RegistryChange, Result, SynthOutputPort,
};

/// Identifier of the software synth in the output device list.
pub const SOFTWARE_SYNTH_ID: &str = "software-synth";

/// What changed in the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelEvent {
    InputDevice,
    InputDevices,
    OutputDevice,
    OutputDevices,
    Log,
    MidiMessage,
    Recording,
    Playing,
}

impl From<&RegistryChange> for ModelEvent {
    fn from(change: &RegistryChange) -> Self {
        match change {
            RegistryChange::InputDevices => ModelEvent::InputDevices,
            RegistryChange::OutputDevices => ModelEvent::OutputDevices,
            RegistryChange::InputDevice(_) => ModelEvent::InputDevice,
            RegistryChange::OutputDevice(_) => ModelEvent::OutputDevice,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(ModelEvent)>;

/// Builder for [`AppModel`].
///
/// # Example
///
/// ```
/// use damper::{AppModel, DamperConfig};
///
/// let model = AppModel::builder()
///     .config(DamperConfig::default())
///     .build()?;
/// assert_eq!(model.registry().outputs().len(), 1); // the software synth
/// # Ok::<(), damper::Error>(())
/// ```
pub struct AppModelBuilder {
    config: DamperConfig,
    software_output: bool,
    devices: Vec<DeviceInfo>,
}

impl Default for AppModelBuilder {
    fn default() -> Self {
        Self {
            config: DamperConfig::default(),
            software_output: true,
            devices: Vec::new(),
        }
    }
}

impl AppModelBuilder {
    pub fn config(mut self, config: DamperConfig) -> Self {
        self.config = config;
        self
    }

    /// List the software synth as the first output. Default: true
    pub fn software_output(mut self, enabled: bool) -> Self {
        self.software_output = enabled;
        self
    }

    /// Devices known before any hot-plug event arrives.
    pub fn device(mut self, device: DeviceInfo) -> Self {
        self.devices.push(device);
        self
    }

    pub fn build(self) -> Result<AppModel> {
        self.config.validate()?;

        let mut registry = DeviceRegistry::new();
        if self.software_output {
            registry.apply(DeviceEvent::Connected(DeviceInfo::new(
                SOFTWARE_SYNTH_ID,
                "Software Synth",
                PortKind::Output,
            )));
        }
        for device in self.devices {
            registry.apply(DeviceEvent::Connected(device));
        }

        Ok(AppModel {
            log: LogBook::new(self.config.log_capacity, self.config.log_level),
            config: self.config,
            registry,
            subscribers: Vec::new(),
            next_subscription: 0,
            session: MidiSession::new(),
            is_recording: false,
            recording_start_time: None,
            playback: None,
            play_destination: None,
            play_start_time: None,
        })
    }
}

/// Observable application state.
pub struct AppModel {
    config: DamperConfig,
    registry: DeviceRegistry,
    log: LogBook,
    subscribers: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,

    session: MidiSession,
    is_recording: bool,
    recording_start_time: Option<f64>,

    playback: Option<PlaybackHandle>,
    /// Output the running playback sends to.
    play_destination: Option<DeviceInfo>,
    play_start_time: Option<f64>,
}

impl AppModel {
    pub fn builder() -> AppModelBuilder {
        AppModelBuilder::default()
    }

    pub fn config(&self) -> &DamperConfig {
        &self.config
    }

    // --- Subscriptions ---

    /// Listeners are called in subscription order.
    pub fn subscribe<F: FnMut(ModelEvent) + 'static>(&mut self, listener: F) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(listener)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    fn dispatch(&mut self, event: ModelEvent) {
        for (_, listener) in self.subscribers.iter_mut() {
            listener(event);
        }
    }

    // --- Log ---

    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        if self.log.push(level, message).is_some() {
            self.dispatch(ModelEvent::Log);
        }
    }

    /// Entries, newest first.
    pub fn log_messages(&self) -> impl Iterator<Item = &LogMessage> {
        self.log.entries()
    }

    pub fn log_level(&self) -> LogLevel {
        self.log.level()
    }

    pub fn set_log_level(&mut self, level: LogLevel) {
        self.log.set_level(level);
    }

    // --- Devices ---

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn input_device(&self) -> Option<&DeviceInfo> {
        self.registry.input()
    }

    pub fn output_device(&self) -> Option<&DeviceInfo> {
        self.registry.output()
    }

    /// Select an input by id, or clear the selection with `None`.
    pub fn set_input_device(&mut self, id: Option<&str>) -> Result<()> {
        if let Some(change) = self.registry.select_input(id)? {
            self.dispatch(ModelEvent::from(&change));
        }
        Ok(())
    }

    pub fn set_output_device(&mut self, id: Option<&str>) -> Result<()> {
        if let Some(change) = self.registry.select_output(id)? {
            self.dispatch(ModelEvent::from(&change));
        }
        Ok(())
    }

    /// Merge a hot-plug event. Losing the playback's destination stops the
    /// playback before the device changes are dispatched.
    pub fn handle_device_event(&mut self, event: DeviceEvent) {
        let (verb, lost_destination) = match &event {
            DeviceEvent::Connected(_) => ("Connected", false),
            DeviceEvent::Disconnected(device) => (
                "Disconnected",
                self.play_destination
                    .as_ref()
                    .is_some_and(|dest| dest.id == device.id && dest.kind == device.kind),
            ),
        };
        let device = event.device();
        let line = format!("{} <{:?}:{}>", verb, device.kind, device.name);

        let changes = self.registry.apply(event);
        self.log(LogLevel::Info, line);

        if lost_destination {
            self.stop_playback_for_disconnect();
        }
        for change in &changes {
            self.dispatch(ModelEvent::from(change));
        }
    }

    /// Merge queued hot-plug events and notice a playback that ended on its own.
    pub fn pump(&mut self, events: &Receiver<DeviceEvent>) {
        for event in events.try_iter() {
            self.handle_device_event(event);
        }
        self.poll_playback();
    }

    /// Start polling the host for hot-plug events.
    ///
    /// Access denial is logged once and returned; it is not retried.
    #[cfg(feature = "midi-hardware")]
    pub fn watch_devices(
        &mut self,
    ) -> Result<(crate::DeviceWatcher, Receiver<DeviceEvent>)> {
        let interval = std::time::Duration::from_millis(self.config.device_poll_ms);
        match crate::DeviceWatcher::spawn(&self.config.client_name, interval) {
            Ok(watcher) => {
                self.log(LogLevel::Info, "Obtained MIDI access");
                Ok(watcher)
            }
            Err(e) => {
                self.log(LogLevel::Error, format!("MIDI access denied: {}", e));
                Err(e.into())
            }
        }
    }

    // --- Recording ---

    pub fn is_recording(&self) -> bool {
        self.is_recording
    }

    pub fn recording_start_time(&self) -> Option<f64> {
        self.recording_start_time
    }

    /// Begin a fresh session with a fresh corrector.
    pub fn start_recording(&mut self, now: f64) {
        self.session = MidiSession::new();
        self.is_recording = true;
        self.recording_start_time = Some(now);
        self.log(LogLevel::Info, "Recording started");
        self.dispatch(ModelEvent::Recording);
    }

    /// Correct and append a captured message.
    ///
    /// Returns whether it was stored. Ignored while not recording. A protocol
    /// violation stops the recording and is returned.
    pub fn record(&mut self, when: f64, bytes: &[u8]) -> Result<bool> {
        if !self.is_recording {
            return Ok(false);
        }
        match self.session.add(when, bytes) {
            Ok(stored) => {
                if stored {
                    self.dispatch(ModelEvent::MidiMessage);
                }
                Ok(stored)
            }
            Err(e) => {
                self.is_recording = false;
                self.log(LogLevel::Error, format!("Recording halted: {}", e));
                self.dispatch(ModelEvent::Recording);
                Err(e.into())
            }
        }
    }

    pub fn stop_recording(&mut self) {
        if !self.is_recording {
            return;
        }
        self.is_recording = false;
        self.log(
            LogLevel::Info,
            format!("Recording stopped, {} messages", self.session.len()),
        );
        self.dispatch(ModelEvent::Recording);
    }

    pub fn session(&self) -> &MidiSession {
        &self.session
    }

    /// Serialize the session and start a new one.
    pub fn save(&mut self) -> Result<String> {
        let json = self.session.serialize()?;
        self.session.clear();
        Ok(json)
    }

    /// Replace the session with a stored one. The model is unchanged on error.
    pub fn load_session(&mut self, json: &str) -> Result<()> {
        match MidiSession::load(json) {
            Ok(session) => {
                self.log(
                    LogLevel::Info,
                    format!("Loaded session, {} messages", session.len()),
                );
                self.session = session;
                Ok(())
            }
            Err(e) => {
                self.log(LogLevel::Warning, format!("Could not load session: {}", e));
                Err(e.into())
            }
        }
    }

    // --- Playback ---

    /// True while a playback thread is ticking.
    pub fn is_playing(&self) -> bool {
        self.playback.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn play_start_time(&self) -> Option<f64> {
        self.play_start_time
    }

    /// Output the running playback sends to.
    pub fn play_destination(&self) -> Option<&DeviceInfo> {
        self.play_destination.as_ref()
    }

    /// Software synth port configured from this model's settings.
    pub fn software_synth<B: AudioBackend, C: Clock + ?Sized>(
        &self,
        backend: B,
        clock: &C,
    ) -> Result<SynthOutputPort<B>> {
        let synth = PolySynth::with_config(backend, self.config.waveform, self.config.envelope)?;
        Ok(SynthOutputPort::new(synth, clock))
    }

    /// Replay `session` on `sink`, replacing any running playback.
    ///
    /// `destination` is the id of the listed output `sink` writes to; the
    /// playback stops if that device disconnects.
    pub fn play<S, C>(
        &mut self,
        session: &MidiSession,
        destination: &str,
        sink: S,
        clock: C,
    ) -> Result<()>
    where
        S: MidiOutputSink + Send + 'static,
        C: Clock + 'static,
    {
        let device = self
            .registry
            .outputs()
            .iter()
            .find(|d| d.id == destination)
            .cloned()
            .ok_or_else(|| {
                IoError::MidiDevice(format!("no Output device '{}'", destination))
            })?;

        if self.playback.is_some() {
            self.stop()?;
        }

        let start = clock.now_ms();
        let name = sink.name();
        let handle = Playback::spawn(
            Player::from_session(session),
            sink,
            clock,
            self.config.playback,
        )?;
        self.playback = Some(handle);
        self.play_destination = Some(device);
        self.play_start_time = Some(start);
        self.log(
            LogLevel::Info,
            format!("Playing {} messages on {}", session.len(), name),
        );
        self.dispatch(ModelEvent::Playing);
        Ok(())
    }

    /// Cancel playback. Returns `None` if nothing was playing.
    pub fn stop(&mut self) -> Result<Option<PlaybackSummary>> {
        let Some(mut handle) = self.playback.take() else {
            return Ok(None);
        };
        let summary = handle.cancel()?;
        self.finish_playback(&summary);
        Ok(Some(summary))
    }

    fn stop_playback_for_disconnect(&mut self) {
        if let Some(mut handle) = self.playback.take() {
            match handle.port_disconnected() {
                Ok(summary) => self.finish_playback(&summary),
                Err(e) => {
                    self.play_start_time = None;
                    self.play_destination = None;
                    self.log(LogLevel::Error, format!("Playback stop failed: {}", e));
                    self.dispatch(ModelEvent::Playing);
                }
            }
        }
    }

    fn poll_playback(&mut self) {
        if !self.playback.as_ref().is_some_and(PlaybackHandle::is_finished) {
            return;
        }
        if let Some(handle) = self.playback.take() {
            match handle.join() {
                Ok(summary) => self.finish_playback(&summary),
                Err(e) => {
                    debug!("playback join failed: {}", e);
                    self.play_start_time = None;
                    self.play_destination = None;
                }
            }
        }
    }

    fn finish_playback(&mut self, summary: &PlaybackSummary) {
        self.play_start_time = None;
        self.play_destination = None;
        let (level, what) = match summary.end {
            PlaybackEnd::Completed => (LogLevel::Info, "Playback finished"),
            PlaybackEnd::Cancelled => (LogLevel::Info, "Playback stopped"),
            PlaybackEnd::PortDisconnected => (LogLevel::Warning, "Output disconnected, playback stopped"),
            PlaybackEnd::Failed => (LogLevel::Error, "Playback failed"),
        };
        self.log(
            level,
            format!("{} ({}/{} sent)", what, summary.dispatched, summary.total),
        );
        self.dispatch(ModelEvent::Playing);
    }
}

impl Drop for AppModel {
    fn drop(&mut self) {
        if let Some(mut handle) = self.playback.take() {
            if let Err(e) = handle.cancel() {
                debug!("playback cancel on drop failed: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for AppModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppModel")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("subscribers", &self.subscribers.len())
            .field("is_recording", &self.is_recording)
            .field("is_playing", &self.is_playing())
            .field("messages", &self.session.len())
            .finish()
    }
}
