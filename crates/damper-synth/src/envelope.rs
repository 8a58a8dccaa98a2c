//! Fixed piano-like amplitude envelope.

use serde::{Deserialize, Serialize};

use crate::backend::{AudioBackend, AudioParam, NodeId};
use crate::error::{Error, Result};

/// Envelope timing, in seconds.
///
/// Onset: silence, linear attack to the peak, linear decay to
/// `sustain_ratio * peak`, then an exponential tail toward `floor`.
/// Release: exponential ramp to `floor` over `release`, then linear to zero
/// over `release_tail`, where the oscillator stops.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeConfig {
    pub attack: f64,
    pub decay: f64,
    pub sustain_ratio: f64,
    pub tail: f64,
    pub floor: f64,
    pub release: f64,
    pub release_tail: f64,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            attack: 0.02,
            decay: 0.02,
            sustain_ratio: 0.8,
            tail: 10.0,
            floor: 0.01,
            release: 0.1,
            release_tail: 0.05,
        }
    }
}

impl EnvelopeConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("attack", self.attack),
            ("decay", self.decay),
            ("tail", self.tail),
            ("release", self.release),
            ("release_tail", self.release_tail),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "{} must be a positive duration, got {}",
                    name, value
                )));
            }
        }
        if !(self.sustain_ratio > 0.0 && self.sustain_ratio <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "sustain_ratio {} out of range (0, 1]",
                self.sustain_ratio
            )));
        }
        // Exponential ramps cannot target zero.
        if !(self.floor > 0.0 && self.floor < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "floor {} out of range (0, 1)",
                self.floor
            )));
        }
        Ok(())
    }

    /// Time from release to oscillator stop.
    #[inline]
    pub fn release_duration(&self) -> f64 {
        self.release + self.release_tail
    }

    pub(crate) fn schedule_onset<B: AudioBackend + ?Sized>(
        &self,
        backend: &mut B,
        gain: NodeId,
        peak: f64,
        when: f64,
    ) {
        let attack_end = when + self.attack;
        let decay_end = attack_end + self.decay;
        backend.set_value_at_time(gain, AudioParam::Gain, 0.0, when);
        backend.linear_ramp_to_value_at_time(gain, AudioParam::Gain, peak, attack_end);
        backend.linear_ramp_to_value_at_time(
            gain,
            AudioParam::Gain,
            self.sustain_ratio * peak,
            decay_end,
        );
        backend.exponential_ramp_to_value_at_time(
            gain,
            AudioParam::Gain,
            self.floor,
            decay_end + self.tail,
        );
    }

    /// Schedule the release tail and the oscillator stop. Returns the stop time.
    pub(crate) fn schedule_release<B: AudioBackend + ?Sized>(
        &self,
        backend: &mut B,
        oscillator: NodeId,
        gain: NodeId,
        at: f64,
    ) -> f64 {
        let stop = at + self.release_duration();
        backend.exponential_ramp_to_value_at_time(
            gain,
            AudioParam::Gain,
            self.floor,
            at + self.release,
        );
        backend.linear_ramp_to_value_at_time(gain, AudioParam::Gain, 0.0, stop);
        backend.stop(oscillator, stop);
        stop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EnvelopeConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.release_duration() - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_zero_floor() {
        let config = EnvelopeConfig {
            floor: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_negative_duration() {
        let config = EnvelopeConfig {
            release: -0.1,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = EnvelopeConfig {
            attack: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_ratio_above_one() {
        let config = EnvelopeConfig {
            sustain_ratio: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
