//! Centralized error type for the damper umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Midi(#[from] damper_midi::Error),

    #[error("Synth: {0}")]
    Synth(#[from] damper_synth::Error),

    #[error("MIDI I/O: {0}")]
    MidiIo(#[from] damper_midi_io::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
