//! MIDI capture model for damper.
//!
//! Provides the message types, the sustain-pedal bug corrector, and the
//! session log with its JSON format.
//!
//! # Example
//!
//! ```
//! use damper_midi::MidiSession;
//!
//! let mut session = MidiSession::new();
//! // A pedal press that arrived as a Note On for key 64
//! session.add(0.0, vec![0x90, 0x40, 0x7F])?;
//! assert_eq!(session.get(0).unwrap().data, vec![0xB0, 0x40, 0x7F]);
//!
//! let json = session.serialize()?;
//! let reloaded = MidiSession::load(&json)?;
//! assert_eq!(reloaded.len(), 1);
//! # Ok::<(), damper_midi::Error>(())
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod corrector;
pub use corrector::{
    correct, process, Confidence, Correction, CorrectorState, Disposition, MidiEventCorrector,
};

pub(crate) mod message;
pub use message::{
    format_hex, MidiMessageKind, RawMidiMessage, ACTIVE_SENSING, CONTROL_CHANGE, DAMPER_PEDAL,
    NOTE_OFF, NOTE_ON, PEDAL_DOWN, PEDAL_UP,
};

pub(crate) mod session;
pub use session::MidiSession;

pub(crate) mod timestamp;
pub use timestamp::TimestampedMessage;

pub(crate) mod utils;
pub use utils::{note_to_hz, velocity_to_gain};
