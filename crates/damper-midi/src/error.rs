//! Error types for damper-midi.

use thiserror::Error;

/// Result type alias for damper-midi operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while correcting or persisting captured MIDI.
#[derive(Debug, Error)]
pub enum Error {
    /// A Control Change on the damper controller carried a value that no
    /// known pedal transition produces. Correction for the stream must stop.
    #[error(
        "protocol violation: CC {data1:#04x} with value {data2:#04x} (status {status:#04x}) \
         does not match any pedal transition"
    )]
    ProtocolViolation { status: u8, data1: u8, data2: u8 },

    /// Serialized session did not have the `[{ms, us, data}, ...]` shape.
    #[error("Malformed session data: {0}")]
    MalformedSessionData(String),

    /// Session could not be encoded.
    #[error("Session serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
