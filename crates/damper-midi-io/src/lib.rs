//! MIDI I/O for damper.
//!
//! Output sinks (hardware, software synth, session log), the replay scheduler
//! and its playback thread, and device hot-plug tracking.
//!
//! Feature gates: `midi-io` (hardware ports and hot-plug polling via midir).
//!
//! # Example
//!
//! ```
//! use damper_midi::TimestampedMessage;
//! use damper_midi_io::{Player, RecordingSink, TickOutcome};
//!
//! let mut player = Player::new(vec![
//!     TimestampedMessage::new(0.0, vec![0x90, 60, 100]),
//!     TimestampedMessage::new(500.0, vec![0x80, 60, 0]),
//! ]);
//! let mut sink = RecordingSink::new();
//! player.start(1000.0);
//! assert_eq!(player.tick(1000.0, &mut sink)?, TickOutcome::Continue);
//! assert_eq!(sink.len(), 1);
//! # Ok::<(), damper_midi_io::Error>(())
//! ```

pub mod error;
pub use error::{Error, Result};

mod clock;
pub use clock::{Clock, ManualClock, SystemClock};

mod config;
pub use config::PlaybackConfig;

mod sink;
pub use sink::{MidiOutputSink, PortConnection, RecordingSink, SentMessage, SessionSink};

mod synth_port;
pub use synth_port::SynthOutputPort;

mod player;
pub use player::{Player, TickOutcome, DEFAULT_LOOKAHEAD_MS};

mod playback;
pub use playback::{Playback, PlaybackEnd, PlaybackHandle, PlaybackSummary};

mod devices;
pub use devices::{DeviceEvent, DeviceInfo, DeviceRegistry, PortKind, RegistryChange};

#[cfg(feature = "midi-io")]
pub use devices::{list_ports, DeviceWatcher};

#[cfg(feature = "midi-io")]
mod io;

#[cfg(feature = "midi-io")]
pub use io::{
    CapturedMessage, MidiInputDevice, MidiInputManager, MidiOutputDevice, MidiOutputManager,
};
