//! MIDI utility functions

/// Equal-tempered frequency for a MIDI note, A4 (69) = 440 Hz.
#[inline]
pub fn note_to_hz(note: u8) -> f64 {
    440.0 * 2.0f64.powf((note as f64 - 69.0) / 12.0)
}

/// Peak gain for a velocity: `10^(velocity/127 - 1)`.
///
/// 127 maps to exactly 1.0 and 1 to about 0.076, one decade across the range.
#[inline]
pub fn velocity_to_gain(velocity: u8) -> f64 {
    10.0f64.powf(velocity as f64 / 127.0 - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_note_to_hz() {
        assert_relative_eq!(note_to_hz(69), 440.0);
        assert_relative_eq!(note_to_hz(81), 880.0, epsilon = 1e-9);
        assert_relative_eq!(note_to_hz(60), 261.6256, epsilon = 1e-3);
    }

    #[test]
    fn test_velocity_to_gain() {
        assert_eq!(velocity_to_gain(127), 1.0);
        assert_relative_eq!(velocity_to_gain(1), 0.0759, epsilon = 1e-3);
        assert_relative_eq!(velocity_to_gain(0), 0.1);
    }
}
