//! Polyphonic note scheduler.
//!
//! Turns Note On/Off and damper pedal events into scheduled oscillator and
//! gain automation on an [`AudioBackend`]:
//! - Any number of voices per key (re-strikes layer, they do not steal)
//! - Key releases inside the pedal window only latch `off_time`
//! - Pedal release sweeps every latched voice into its release tail

use damper_midi::{note_to_hz, velocity_to_gain};
use tracing::trace;

use crate::backend::{AudioBackend, AudioParam, Destination, Waveform};
use crate::envelope::EnvelopeConfig;
use crate::error::Result;
use crate::voice::{NoteVoice, SustainState};

/// Polyphonic synthesizer driving a scheduled audio graph.
pub struct PolySynth<B: AudioBackend> {
    backend: B,
    waveform: Waveform,
    envelope: EnvelopeConfig,
    sustain: SustainState,

    // Voices per key, indexed by note 0-127
    keys: [Vec<NoteVoice>; 128],
}

impl<B: AudioBackend> PolySynth<B> {
    /// Triangle voices with the default envelope.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            waveform: Waveform::default(),
            envelope: EnvelopeConfig::default(),
            sustain: SustainState::default(),
            keys: std::array::from_fn(|_| Vec::new()),
        }
    }

    pub fn with_config(backend: B, waveform: Waveform, envelope: EnvelopeConfig) -> Result<Self> {
        envelope.validate()?;
        let mut synth = Self::new(backend);
        synth.waveform = waveform;
        synth.envelope = envelope;
        Ok(synth)
    }

    /// Set the oscillator waveform for subsequent notes
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Set the envelope for subsequent notes and releases
    pub fn set_envelope(&mut self, envelope: EnvelopeConfig) -> Result<()> {
        envelope.validate()?;
        self.envelope = envelope;
        Ok(())
    }

    /// Strike `note` at `when` seconds. Velocity 0 is a release.
    pub fn note_on(&mut self, note: u8, velocity: u8, when: f64) {
        if velocity == 0 {
            self.note_off(note, when);
            return;
        }

        let note = note & 0x7F;
        let peak = velocity_to_gain(velocity);
        let backend = &mut self.backend;

        let oscillator = backend.create_oscillator(self.waveform);
        let gain = backend.create_gain();
        backend.set_value_at_time(oscillator, AudioParam::Frequency, note_to_hz(note), when);
        self.envelope.schedule_onset(backend, gain, peak, when);
        backend.connect(oscillator, Destination::Node(gain));
        backend.connect(gain, Destination::Output);
        backend.start(oscillator, when);

        trace!(note, velocity, when, "voice on");
        self.keys[note as usize].push(NoteVoice {
            midi_note: note,
            velocity,
            on_time: when,
            off_time: f64::INFINITY,
            oscillator,
            gain,
        });
    }

    /// Release `note` at `when` seconds.
    ///
    /// Inside the pedal window the voices only remember the release time.
    /// Otherwise every voice on the key is faded out and retired.
    pub fn note_off(&mut self, note: u8, when: f64) {
        let voices = &mut self.keys[(note & 0x7F) as usize];

        if self.sustain.contains(when) {
            for voice in voices.iter_mut() {
                voice.mark_released(when);
            }
            return;
        }

        for mut voice in voices.drain(..) {
            voice.mark_released(when);
            retire(&mut self.backend, &self.envelope, &voice, when);
        }
    }

    /// Pedal down at `timestamp`. Voices are not touched.
    pub fn sustain_on(&mut self, timestamp: f64) {
        self.sustain.press(timestamp);
    }

    /// Pedal up at `timestamp`: every voice whose key was released before
    /// `timestamp` is faded out and retired. Held keys keep sounding.
    pub fn sustain_off(&mut self, timestamp: f64) {
        self.sustain.lift(timestamp);

        for voices in self.keys.iter_mut() {
            let mut i = 0;
            while i < voices.len() {
                if voices[i].off_time < timestamp {
                    // Order within a key is not meaningful
                    let voice = voices.swap_remove(i);
                    retire(&mut self.backend, &self.envelope, &voice, timestamp);
                } else {
                    i += 1;
                }
            }
        }
    }

    /// Fade out every voice regardless of pedal state and forget the pedal.
    pub fn all_notes_off(&mut self, when: f64) {
        for voices in self.keys.iter_mut() {
            for mut voice in voices.drain(..) {
                voice.mark_released(when);
                retire(&mut self.backend, &self.envelope, &voice, when);
            }
        }
        self.sustain.reset();
    }

    /// Voices currently tracked for `note`.
    pub fn voices(&self, note: u8) -> &[NoteVoice] {
        &self.keys[(note & 0x7F) as usize]
    }

    pub fn active_voice_count(&self) -> usize {
        self.keys.iter().map(Vec::len).sum()
    }

    pub fn sustain(&self) -> &SustainState {
        &self.sustain
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn envelope(&self) -> &EnvelopeConfig {
        &self.envelope
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }
}

fn retire<B: AudioBackend>(backend: &mut B, envelope: &EnvelopeConfig, voice: &NoteVoice, at: f64) {
    let stop = envelope.schedule_release(backend, voice.oscillator, voice.gain, at);
    trace!(note = voice.midi_note, at, stop, "voice retired");
    backend.release(voice);
}
