//! # Damper - Sustain-pedal bug correcting MIDI recorder
//!
//! Records MIDI from a keyboard whose firmware sends the damper pedal as a
//! Note On/Off for key 64, repairs the stream as it arrives, and replays
//! stored sessions on hardware ports or a software piano voice.
//!
//! ## Architecture
//!
//! Damper is an umbrella crate that coordinates:
//! - **damper-midi** - Message model, pedal corrector, JSON session format
//! - **damper-synth** - Polyphonic voice with sustain pedal, audio backends
//! - **damper-midi-io** - Replay scheduler, output sinks, hardware ports, hot-plug
//!
//! ## Quick Start
//!
//! ```
//! use damper::prelude::*;
//!
//! let mut model = AppModel::builder().build()?;
//!
//! model.start_recording(0.0);
//! model.record(10.0, &[0x90, 0x40, 0x7F])?; // pedal sent as a note
//! model.record(20.0, &[0x90, 0x3C, 0x64])?;
//! model.stop_recording();
//!
//! // Stored as a damper controller change
//! assert_eq!(model.session().get(0).unwrap().data, vec![0xB0, 0x40, 0x7F]);
//! # Ok::<(), damper::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Same as `full`
//! - `full` - Everything enabled
//! - `midi-hardware` - Hardware MIDI ports and hot-plug polling (midir)

pub mod error;
pub use error::{Error, Result};

/// Re-export of damper-midi for direct access
pub use damper_midi as midi;
/// Re-export of damper-synth for direct access
pub use damper_synth as synth;
/// Re-export of damper-midi-io for direct access
pub use damper_midi_io as io;

// MIDI model
pub use damper_midi::{
    CorrectorState, Disposition, MidiEventCorrector, MidiMessageKind, MidiSession,
    TimestampedMessage,
};

// Synthesis
pub use damper_synth::{
    AudioBackend, EnvelopeConfig, PolySynth, RecordingBackend, Waveform,
};

// Replay and devices
pub use damper_midi_io::{
    Clock, DeviceEvent, DeviceInfo, DeviceRegistry, ManualClock, MidiOutputSink, Playback,
    PlaybackConfig, PlaybackEnd, PlaybackHandle, PlaybackSummary, Player, PortKind,
    RecordingSink, RegistryChange, SessionSink, SynthOutputPort, SystemClock,
};

#[cfg(feature = "midi-hardware")]
pub use damper_midi_io::{DeviceWatcher, MidiInputManager, MidiOutputManager};

pub mod config;
pub use config::DamperConfig;

pub mod log;
pub use log::{LogBook, LogLevel, LogMessage};

mod app;
pub use app::{AppModel, AppModelBuilder, ModelEvent, SubscriptionId, SOFTWARE_SYNTH_ID};

/// Convenience prelude for common imports
pub mod prelude {
    // Application
    pub use crate::{AppModel, AppModelBuilder, DamperConfig, LogLevel, ModelEvent};

    // Sessions
    pub use crate::{MidiSession, TimestampedMessage};

    // Replay
    pub use crate::{Clock, MidiOutputSink, SynthOutputPort, SystemClock};

    // Synthesis
    pub use crate::{PolySynth, Waveform};

    // Hardware
    #[cfg(feature = "midi-hardware")]
    pub use crate::{DeviceWatcher, MidiInputManager, MidiOutputManager};
}
