//! Error types for damper-synth.

use thiserror::Error;

/// Result type alias for damper-synth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in damper-synth.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration parameter.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
