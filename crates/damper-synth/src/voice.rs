//! Voices and the damper pedal window.

use crate::backend::NodeId;

/// One sounding (or decaying) instance of a note.
///
/// Several voices may exist for the same key when it is struck again while an
/// earlier strike is still ringing.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteVoice {
    /// MIDI note number (0-127)
    pub midi_note: u8,
    pub velocity: u8,
    /// Onset, backend seconds.
    pub on_time: f64,
    /// Key release, backend seconds. `f64::INFINITY` while the key is held.
    pub off_time: f64,
    pub oscillator: NodeId,
    pub gain: NodeId,
}

impl NoteVoice {
    /// True until a key release has been seen.
    #[inline]
    pub fn is_held(&self) -> bool {
        self.off_time.is_infinite()
    }

    /// Latch the key release time. A finite release time never moves earlier.
    pub fn mark_released(&mut self, when: f64) {
        self.off_time = if self.is_held() {
            when
        } else {
            self.off_time.max(when)
        };
    }
}

/// Most recent pedal-down interval, `[sustain_start, sustain_stop)`.
///
/// Both bounds start at `+inf`, meaning no pedal has been seen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SustainState {
    pub sustain_start: f64,
    pub sustain_stop: f64,
}

impl Default for SustainState {
    fn default() -> Self {
        Self {
            sustain_start: f64::INFINITY,
            sustain_stop: f64::INFINITY,
        }
    }
}

impl SustainState {
    /// Pedal down at `timestamp`. Only the start bound moves.
    ///
    /// Known limitation: the stop bound of an earlier cycle is left in place,
    /// so after a full press/lift cycle a second press yields an empty window
    /// (`start > stop`) until the next lift. Releases in that gap retire
    /// their voices immediately.
    pub fn press(&mut self, timestamp: f64) {
        self.sustain_start = timestamp;
    }

    /// Pedal up at `timestamp`.
    pub fn lift(&mut self, timestamp: f64) {
        self.sustain_stop = timestamp;
    }

    /// True when `when` falls inside the pedal-down interval.
    #[inline]
    pub fn contains(&self, when: f64) -> bool {
        self.sustain_start <= when && when < self.sustain_stop
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice() -> NoteVoice {
        NoteVoice {
            midi_note: 60,
            velocity: 100,
            on_time: 0.0,
            off_time: f64::INFINITY,
            oscillator: NodeId(1),
            gain: NodeId(2),
        }
    }

    #[test]
    fn test_release_latch_is_monotonic() {
        let mut v = voice();
        assert!(v.is_held());
        v.mark_released(0.5);
        assert_eq!(v.off_time, 0.5);
        v.mark_released(0.3);
        assert_eq!(v.off_time, 0.5);
        v.mark_released(0.8);
        assert_eq!(v.off_time, 0.8);
        assert!(!v.is_held());
    }

    #[test]
    fn test_default_window_is_empty() {
        let sustain = SustainState::default();
        assert!(!sustain.contains(0.0));
        assert!(!sustain.contains(1e9));
    }

    #[test]
    fn test_window_bounds() {
        let mut sustain = SustainState::default();
        sustain.press(1.0);
        assert!(!sustain.contains(0.99));
        assert!(sustain.contains(1.0));
        assert!(sustain.contains(100.0));
        sustain.lift(2.0);
        assert!(sustain.contains(1.99));
        assert!(!sustain.contains(2.0));
    }

    #[test]
    fn test_press_keeps_stale_stop() {
        let mut sustain = SustainState::default();
        sustain.press(0.0);
        sustain.lift(1.0);
        sustain.press(2.0);
        assert_eq!(sustain.sustain_start, 2.0);
        assert_eq!(sustain.sustain_stop, 1.0);
        assert!(!sustain.contains(2.5));
    }

    #[test]
    fn test_lift_before_press() {
        // Out-of-order delivery: the lift was applied first
        let mut sustain = SustainState::default();
        sustain.lift(2.0);
        sustain.press(1.0);
        assert_eq!(sustain.sustain_stop, 2.0);
        assert!(sustain.contains(1.5));
    }
}
