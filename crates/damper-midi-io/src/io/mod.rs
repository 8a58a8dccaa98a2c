//! Hardware MIDI I/O.
//!
//! Capture from input ports and timed sends to output ports via midir.
//! Requires the `midi-io` feature.

mod input;
mod output;

pub use input::{CapturedMessage, MidiInputDevice, MidiInputManager};
pub use output::{MidiOutputDevice, MidiOutputManager};
