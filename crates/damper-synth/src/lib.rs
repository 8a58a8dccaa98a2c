//! Software piano voice for damper.
//!
//! Schedules oscillator and gain automation for corrected MIDI, handling
//! re-strikes and the damper pedal:
//!
//! - **[`PolySynth`]** - Per-key voice lists, pedal window, release sweeps
//! - **[`AudioBackend`]** - Audio graph capability the synth schedules into
//! - **[`RecordingBackend`]** - Records the schedule for inspection
//!
//! # Quick Start
//!
//! ```
//! use damper_synth::{PolySynth, RecordingBackend};
//!
//! let mut synth = PolySynth::new(RecordingBackend::new());
//! synth.sustain_on(0.0);
//! synth.note_on(60, 100, 0.1);
//! synth.note_off(60, 0.2); // held by the pedal
//! assert_eq!(synth.voices(60).len(), 1);
//! synth.sustain_off(0.5);
//! assert!(synth.voices(60).is_empty());
//! ```

pub mod error;
pub use error::{Error, Result};

mod backend;
pub use backend::{AudioBackend, AudioParam, Destination, NodeId, Waveform};

mod voice;
pub use voice::{NoteVoice, SustainState};

mod envelope;
pub use envelope::EnvelopeConfig;

mod polysynth;
pub use polysynth::PolySynth;

mod recording;
pub use recording::{RecordingBackend, ScheduledCall};

