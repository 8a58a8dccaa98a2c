//! Replay timing configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Tick period and lookahead window of the replay scheduler, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub tick_interval_ms: u64,
    pub lookahead_ms: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            lookahead_ms: 200.0,
        }
    }
}

impl PlaybackConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "tick_interval_ms must be greater than 0".to_string(),
            ));
        }
        // A window shorter than the period would leave gaps between ticks.
        if self.lookahead_ms.is_nan() || self.lookahead_ms < self.tick_interval_ms as f64 {
            return Err(Error::InvalidConfig(format!(
                "lookahead_ms {} must be at least tick_interval_ms {}",
                self.lookahead_ms, self.tick_interval_ms
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = PlaybackConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_rejects_short_lookahead() {
        let config = PlaybackConfig {
            tick_interval_ms: 100,
            lookahead_ms: 50.0,
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = PlaybackConfig {
            tick_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
