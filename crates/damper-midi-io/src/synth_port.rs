//! Output port that plays MIDI on the software synth.

use damper_midi::{format_hex, MidiMessageKind};
use damper_synth::{AudioBackend, PolySynth};
use tracing::{trace, warn};

use crate::clock::Clock;
use crate::error::Result;
use crate::sink::{MidiOutputSink, PortConnection};

/// Software synth behind the [`MidiOutputSink`] interface.
///
/// Send times are clock milliseconds. They are mapped onto the audio clock as
/// `(when - start_time) / 1000` seconds, with `start_time` read from the clock
/// when the port is created.
pub struct SynthOutputPort<B: AudioBackend> {
    synth: PolySynth<B>,
    start_time: f64,
    connection: PortConnection,
}

impl<B: AudioBackend> SynthOutputPort<B> {
    pub fn new<C: Clock + ?Sized>(synth: PolySynth<B>, clock: &C) -> Self {
        Self {
            synth,
            start_time: clock.now_ms(),
            connection: PortConnection::Closed,
        }
    }

    /// Clock time that maps to audio time zero.
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn synth(&self) -> &PolySynth<B> {
        &self.synth
    }

    pub fn synth_mut(&mut self) -> &mut PolySynth<B> {
        &mut self.synth
    }

    pub fn into_synth(self) -> PolySynth<B> {
        self.synth
    }

    fn audio_time(&self, when: Option<f64>) -> f64 {
        match when {
            Some(ts) => (ts - self.start_time) / 1000.0,
            None => self.synth.backend().current_time(),
        }
    }
}

impl<B: AudioBackend> MidiOutputSink for SynthOutputPort<B> {
    fn name(&self) -> String {
        "Software Synth".to_string()
    }

    fn connection(&self) -> PortConnection {
        self.connection
    }

    fn open(&mut self) -> Result<()> {
        self.connection = PortConnection::Open;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.connection = PortConnection::Closed;
        Ok(())
    }

    fn send(&mut self, data: &[u8], when: Option<f64>) -> Result<()> {
        if self.connection != PortConnection::Open {
            self.open()?;
        }

        let t = self.audio_time(when);
        match MidiMessageKind::classify(data) {
            MidiMessageKind::NoteOff { note } => self.synth.note_on(note, 0, t),
            MidiMessageKind::NoteOn { note, velocity } => self.synth.note_on(note, velocity, t),
            MidiMessageKind::SustainOn => self.synth.sustain_on(t),
            MidiMessageKind::SustainOff => self.synth.sustain_off(t),
            MidiMessageKind::ActiveSensing => trace!("active sensing"),
            MidiMessageKind::Unknown => {
                warn!("ignoring unknown MIDI data {}", format_hex(data))
            }
        }
        Ok(())
    }

    /// Releases every sounding voice now.
    fn clear(&mut self) {
        let now = self.synth.backend().current_time();
        self.synth.all_notes_off(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use approx::assert_relative_eq;
    use damper_synth::RecordingBackend;

    fn port(start: f64) -> SynthOutputPort<RecordingBackend> {
        SynthOutputPort::new(PolySynth::new(RecordingBackend::new()), &ManualClock::new(start))
    }

    #[test]
    fn test_timestamp_conversion() {
        let mut port = port(1000.0);
        port.send(&[0x90, 60, 100], Some(1500.0)).unwrap();
        assert_relative_eq!(port.synth().voices(60)[0].on_time, 0.5);
    }

    #[test]
    fn test_missing_timestamp_uses_audio_clock() {
        let mut port = port(0.0);
        port.synth_mut().backend_mut().set_current_time(2.5);
        port.send(&[0x90, 60, 100], None).unwrap();
        assert_eq!(port.synth().voices(60)[0].on_time, 2.5);
    }

    #[test]
    fn test_dispatch() {
        let mut port = port(0.0);
        port.send(&[0xB0, 0x40, 0x7F], Some(0.0)).unwrap();
        port.send(&[0x90, 60, 100], Some(100.0)).unwrap();
        port.send(&[0x80, 60, 0], Some(200.0)).unwrap();
        assert_eq!(port.synth().voices(60).len(), 1);
        assert_relative_eq!(port.synth().voices(60)[0].off_time, 0.2);

        port.send(&[0xB0, 0x40, 0x00], Some(500.0)).unwrap();
        assert!(port.synth().voices(60).is_empty());
    }

    #[test]
    fn test_unknown_and_active_sensing_ignored() {
        let mut port = port(0.0);
        port.send(&[0xFE], None).unwrap();
        port.send(&[0xC0, 5], Some(0.0)).unwrap();
        port.send(&[0xB0, 0x40, 0x50], Some(0.0)).unwrap();
        assert!(port.synth().backend().calls().is_empty());
    }

    #[test]
    fn test_other_channels_ignored() {
        let mut port = port(0.0);
        port.send(&[0x91, 60, 100], Some(0.0)).unwrap();
        port.send(&[0xB1, 0x40, 0x7F], Some(0.0)).unwrap();
        assert!(port.synth().backend().calls().is_empty());
        assert!(port.synth().sustain().sustain_start.is_infinite());
    }

    #[test]
    fn test_zero_velocity_note_on_releases() {
        let mut port = port(0.0);
        port.send(&[0x90, 60, 100], Some(0.0)).unwrap();
        port.send(&[0x90, 60, 0], Some(100.0)).unwrap();
        assert!(port.synth().voices(60).is_empty());
        assert_eq!(port.synth().backend().released_count(), 1);
    }

    #[test]
    fn test_clear_releases_voices() {
        let mut port = port(0.0);
        port.send(&[0xB0, 0x40, 0x7F], Some(0.0)).unwrap();
        port.send(&[0x90, 60, 100], Some(0.0)).unwrap();
        port.send(&[0x90, 64, 100], Some(0.0)).unwrap();
        port.clear();
        assert_eq!(port.synth().active_voice_count(), 0);
        assert_eq!(port.synth().backend().released_count(), 2);
    }

    #[test]
    fn test_send_opens_port() {
        let mut port = port(0.0);
        assert_eq!(port.connection(), PortConnection::Closed);
        port.send(&[0xFE], None).unwrap();
        assert_eq!(port.connection(), PortConnection::Open);
        port.close().unwrap();
        assert_eq!(port.connection(), PortConnection::Closed);
    }
}
