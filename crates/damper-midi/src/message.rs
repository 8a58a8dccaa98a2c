//! Raw channel-1 MIDI messages and their classification.

use midi_msg::{Channel, ChannelVoiceMsg, ControlChange, MidiMsg, SystemRealTimeMsg};
use serde::{Deserialize, Serialize};

/// Note Off, channel 1.
pub const NOTE_OFF: u8 = 0x80;
/// Note On, channel 1.
pub const NOTE_ON: u8 = 0x90;
/// Control Change, channel 1.
pub const CONTROL_CHANGE: u8 = 0xB0;
/// Controller 64, the damper (sustain) pedal.
pub const DAMPER_PEDAL: u8 = 0x40;
/// Pedal-down value for the damper controller.
pub const PEDAL_DOWN: u8 = 0x7F;
/// Pedal-up value for the damper controller.
pub const PEDAL_UP: u8 = 0x00;
/// System real-time Active Sensing (single byte).
pub const ACTIVE_SENSING: u8 = 0xFE;

/// Three-byte MIDI message as received from the keyboard.
///
/// The corrector may rewrite `status` in place; data bytes are never touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawMidiMessage {
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
}

impl RawMidiMessage {
    #[inline]
    pub fn new(status: u8, data1: u8, data2: u8) -> Self {
        Self {
            status,
            data1,
            data2,
        }
    }

    #[inline]
    pub fn note_on(note: u8, velocity: u8) -> Self {
        Self::new(NOTE_ON, note & 0x7F, velocity & 0x7F)
    }

    #[inline]
    pub fn note_off(note: u8) -> Self {
        Self::new(NOTE_OFF, note & 0x7F, 0)
    }

    #[inline]
    pub fn sustain(down: bool) -> Self {
        Self::new(
            CONTROL_CHANGE,
            DAMPER_PEDAL,
            if down { PEDAL_DOWN } else { PEDAL_UP },
        )
    }

    /// Returns `None` unless `bytes` holds exactly three bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match *bytes {
            [status, data1, data2] => Some(Self::new(status, data1, data2)),
            _ => None,
        }
    }

    #[inline]
    pub fn to_bytes(self) -> [u8; 3] {
        [self.status, self.data1, self.data2]
    }

    #[inline]
    pub fn kind(&self) -> MidiMessageKind {
        MidiMessageKind::classify(&self.to_bytes())
    }
}

impl From<RawMidiMessage> for Vec<u8> {
    fn from(msg: RawMidiMessage) -> Self {
        msg.to_bytes().to_vec()
    }
}

/// What a channel-1 message means to a sound-producing sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessageKind {
    /// Note Off, or Note On with velocity 0.
    NoteOff { note: u8 },
    NoteOn { note: u8, velocity: u8 },
    SustainOn,
    SustainOff,
    ActiveSensing,
    Unknown,
}

impl MidiMessageKind {
    /// Parse `bytes` and classify it. Only channel 1 voice messages and
    /// Active Sensing are recognised; a Note On with velocity 0 is a release.
    pub fn classify(bytes: &[u8]) -> Self {
        match MidiMsg::from_midi(bytes) {
            Ok((msg, _len)) => Self::from_midi_msg(&msg),
            Err(_) => Self::Unknown,
        }
    }

    pub fn from_midi_msg(msg: &MidiMsg) -> Self {
        match msg {
            MidiMsg::ChannelVoice {
                channel: Channel::Ch1,
                msg,
            } => match *msg {
                ChannelVoiceMsg::NoteOff { note, .. }
                | ChannelVoiceMsg::NoteOn { note, velocity: 0 } => Self::NoteOff { note },
                ChannelVoiceMsg::NoteOn { note, velocity } => Self::NoteOn { note, velocity },
                ChannelVoiceMsg::ControlChange {
                    control:
                        ControlChange::CC {
                            control: DAMPER_PEDAL,
                            value,
                        },
                } => match value {
                    PEDAL_DOWN => Self::SustainOn,
                    PEDAL_UP => Self::SustainOff,
                    _ => Self::Unknown,
                },
                _ => Self::Unknown,
            },
            MidiMsg::SystemRealTime {
                msg: SystemRealTimeMsg::ActiveSensing,
            } => Self::ActiveSensing,
            _ => Self::Unknown,
        }
    }
}

/// Format bytes as space-separated two-digit lowercase hex, e.g. `90 40 7f`.
pub fn format_hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 3);
    for (i, byte) in data.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_requires_three() {
        assert_eq!(
            RawMidiMessage::from_bytes(&[0x90, 60, 100]),
            Some(RawMidiMessage::new(0x90, 60, 100))
        );
        assert_eq!(RawMidiMessage::from_bytes(&[0xFE]), None);
        assert_eq!(RawMidiMessage::from_bytes(&[0xC0, 5]), None);
        assert_eq!(RawMidiMessage::from_bytes(&[0x90, 60, 100, 0]), None);
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            MidiMessageKind::classify(&[0x80, 60, 64]),
            MidiMessageKind::NoteOff { note: 60 }
        );
        assert_eq!(
            MidiMessageKind::classify(&[0x90, 60, 0]),
            MidiMessageKind::NoteOff { note: 60 }
        );
        assert_eq!(
            MidiMessageKind::classify(&[0x90, 60, 100]),
            MidiMessageKind::NoteOn {
                note: 60,
                velocity: 100
            }
        );
        assert_eq!(
            MidiMessageKind::classify(&[0xB0, 0x40, 0x7F]),
            MidiMessageKind::SustainOn
        );
        assert_eq!(
            MidiMessageKind::classify(&[0xB0, 0x40, 0x00]),
            MidiMessageKind::SustainOff
        );
        assert_eq!(
            MidiMessageKind::classify(&[0xB0, 0x40, 0x20]),
            MidiMessageKind::Unknown
        );
        assert_eq!(
            MidiMessageKind::classify(&[0xB0, 0x07, 0x7F]),
            MidiMessageKind::Unknown
        );
        assert_eq!(
            MidiMessageKind::classify(&[0xFE]),
            MidiMessageKind::ActiveSensing
        );
        // Channel 2 is not ours
        assert_eq!(
            MidiMessageKind::classify(&[0x91, 60, 100]),
            MidiMessageKind::Unknown
        );
        assert_eq!(
            MidiMessageKind::classify(&[0xB1, 0x40, 0x7F]),
            MidiMessageKind::Unknown
        );
        assert_eq!(MidiMessageKind::classify(&[]), MidiMessageKind::Unknown);
        assert_eq!(MidiMessageKind::classify(&[0x90, 60]), MidiMessageKind::Unknown);
    }

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex(&[0x90, 0x04, 0x7F]), "90 04 7f");
        assert_eq!(format_hex(&[0xFE]), "fe");
        assert_eq!(format_hex(&[]), "");
    }

    #[test]
    fn test_constructors_mask_data() {
        assert_eq!(RawMidiMessage::note_on(0xFF, 0xFF).to_bytes(), [0x90, 0x7F, 0x7F]);
        assert_eq!(RawMidiMessage::note_off(60).to_bytes(), [0x80, 60, 0]);
        assert_eq!(RawMidiMessage::sustain(true).to_bytes(), [0xB0, 0x40, 0x7F]);
        assert_eq!(RawMidiMessage::sustain(false).to_bytes(), [0xB0, 0x40, 0x00]);
    }
}
