//! Application configuration.

use serde::{Deserialize, Serialize};

use crate::log::LogLevel;
use crate::{EnvelopeConfig, Error, PlaybackConfig, Result, Waveform};

/// Top-level settings. Missing JSON fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DamperConfig {
    /// Client name registered with the host MIDI subsystem.
    pub client_name: String,
    pub playback: PlaybackConfig,
    pub envelope: EnvelopeConfig,
    pub waveform: Waveform,
    /// Hot-plug polling period.
    pub device_poll_ms: u64,
    /// Log entries kept; older ones are dropped.
    pub log_capacity: usize,
    pub log_level: LogLevel,
}

impl Default for DamperConfig {
    fn default() -> Self {
        Self {
            client_name: "damper".to_string(),
            playback: PlaybackConfig::default(),
            envelope: EnvelopeConfig::default(),
            waveform: Waveform::default(),
            device_poll_ms: 1000,
            log_capacity: 1000,
            log_level: LogLevel::Info,
        }
    }
}

impl DamperConfig {
    pub fn validate(&self) -> Result<()> {
        if self.client_name.trim().is_empty() {
            return Err(Error::InvalidConfig("client_name must not be empty".to_string()));
        }
        if self.device_poll_ms == 0 {
            return Err(Error::InvalidConfig(
                "device_poll_ms must be greater than 0".to_string(),
            ));
        }
        if self.log_capacity == 0 {
            return Err(Error::InvalidConfig(
                "log_capacity must be greater than 0".to_string(),
            ));
        }
        self.playback.validate()?;
        self.envelope.validate()?;
        Ok(())
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(source: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(source).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidConfig(e.to_string()))
    }
}
