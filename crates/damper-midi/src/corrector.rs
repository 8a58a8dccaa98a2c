//! Sustain-pedal bug correction.
//!
//! Some keyboards occasionally flip the status byte of a damper-pedal Control
//! Change (`B0 40 xx`) into a Note On (`90 40 xx`), which collides with real
//! presses of note 64. The corrector reclassifies those messages using only
//! what it has already seen on the same stream:
//!
//! | data2 | condition | result |
//! |-------|-----------|--------|
//! | `00` | key up, pedal down | status forced to `B0`, pedal up |
//! | `00` | key down, status `90` | key up |
//! | `7F` | key down | status forced to `B0`, pedal down (high confidence) |
//! | `7F` | key up | status forced to `B0`, pedal down (low confidence) |
//! | other | status `B0` | [`Error::ProtocolViolation`] |
//! | other | status `90` | key down |

use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::message::{
    format_hex, RawMidiMessage, ACTIVE_SENSING, CONTROL_CHANGE, DAMPER_PEDAL, NOTE_ON, PEDAL_DOWN,
    PEDAL_UP,
};

/// Per-stream correction state. One instance per recorded input device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrectorState {
    /// Note 64 is physically held.
    pub key_currently_down: bool,
    /// The pedal is believed to be down.
    pub sustain_active: bool,
}

/// How sure the corrector is about a pedal-down rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    /// A max-velocity press while the key was already down.
    High,
    /// A max-velocity press with the key up; could be a real hard press.
    Low,
}

/// What `correct` did to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    Unchanged,
    KeyDown,
    KeyUp,
    PedalUp,
    PedalDown { confidence: Confidence },
}

/// Whether a message belongs in the session log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Record(Correction),
    Drop,
}

/// Apply the correction rules to `msg`, rewriting its status byte in place.
pub fn correct(state: &mut CorrectorState, msg: &mut RawMidiMessage) -> Result<Correction> {
    if msg.data1 != DAMPER_PEDAL || !(msg.status == NOTE_ON || msg.status == CONTROL_CHANGE) {
        return Ok(Correction::Unchanged);
    }

    match msg.data2 {
        PEDAL_UP => {
            if !state.key_currently_down && state.sustain_active {
                msg.status = CONTROL_CHANGE;
                state.sustain_active = false;
                Ok(Correction::PedalUp)
            } else if state.key_currently_down && msg.status == NOTE_ON {
                state.key_currently_down = false;
                Ok(Correction::KeyUp)
            } else {
                Ok(Correction::Unchanged)
            }
        }
        PEDAL_DOWN => {
            let confidence = if state.key_currently_down {
                debug!("Adjusting false key press to sustain pedal down");
                Confidence::High
            } else {
                warn!("Possibly incorrectly adjusting false key press to sustain pedal down");
                Confidence::Low
            };
            msg.status = CONTROL_CHANGE;
            state.sustain_active = true;
            Ok(Correction::PedalDown { confidence })
        }
        _ if msg.status == CONTROL_CHANGE => Err(Error::ProtocolViolation {
            status: msg.status,
            data1: msg.data1,
            data2: msg.data2,
        }),
        _ => {
            state.key_currently_down = true;
            Ok(Correction::KeyDown)
        }
    }
}

/// Decide what to do with an arbitrary-length message and correct it in place.
///
/// Active Sensing is dropped. Three-byte messages go through [`correct`].
/// Anything else is recorded untouched.
pub fn process(state: &mut CorrectorState, bytes: &mut [u8]) -> Result<Disposition> {
    if let [ACTIVE_SENSING] = bytes {
        return Ok(Disposition::Drop);
    }

    let Some(mut msg) = RawMidiMessage::from_bytes(bytes) else {
        trace!("Unrecognized MIDI data passed through: {}", format_hex(bytes));
        return Ok(Disposition::Record(Correction::Unchanged));
    };

    let correction = correct(state, &mut msg)?;
    bytes[0] = msg.status;
    Ok(Disposition::Record(correction))
}

/// Owned corrector for one input stream.
#[derive(Debug, Clone, Default)]
pub struct MidiEventCorrector {
    state: CorrectorState,
}

impl MidiEventCorrector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn correct(&mut self, msg: &mut RawMidiMessage) -> Result<Correction> {
        correct(&mut self.state, msg)
    }

    pub fn process(&mut self, bytes: &mut [u8]) -> Result<Disposition> {
        process(&mut self.state, bytes)
    }

    pub fn state(&self) -> CorrectorState {
        self.state
    }

    /// Forget everything seen so far (new recording).
    pub fn reset(&mut self) {
        self.state = CorrectorState::default();
    }
}
