//! Audio graph capability the synth schedules into.
//!
//! Times are in seconds on the backend's own clock, not wall-clock.

use serde::{Deserialize, Serialize};

use crate::voice::NoteVoice;

/// Node in a backend's audio graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Oscillator waveform type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Saw,
    Square,
    #[default]
    Triangle,
}

/// Automatable parameter of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioParam {
    /// Oscillator frequency in Hz.
    Frequency,
    /// Gain node multiplier.
    Gain,
}

/// Where a node's output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Node(NodeId),
    /// The backend's final output.
    Output,
}

/// Oscillator + gain graph with scheduled parameter automation.
///
/// Implementations must not rely on dropped handles to free nodes: the synth
/// calls [`release`](AudioBackend::release) exactly once per voice after its
/// stop has been scheduled.
pub trait AudioBackend {
    /// Current time on the backend clock, in seconds.
    fn current_time(&self) -> f64;

    fn create_oscillator(&mut self, waveform: Waveform) -> NodeId;

    fn create_gain(&mut self) -> NodeId;

    fn connect(&mut self, source: NodeId, destination: Destination);

    fn set_value_at_time(&mut self, node: NodeId, param: AudioParam, value: f64, time: f64);

    fn linear_ramp_to_value_at_time(
        &mut self,
        node: NodeId,
        param: AudioParam,
        value: f64,
        time: f64,
    );

    /// `value` must be positive.
    fn exponential_ramp_to_value_at_time(
        &mut self,
        node: NodeId,
        param: AudioParam,
        value: f64,
        time: f64,
    );

    fn start(&mut self, node: NodeId, when: f64);

    fn stop(&mut self, node: NodeId, when: f64);

    /// The voice is retired; its nodes may be freed once its stop time passes.
    fn release(&mut self, voice: &NoteVoice);
}

impl<B: AudioBackend + ?Sized> AudioBackend for Box<B> {
    fn current_time(&self) -> f64 {
        (**self).current_time()
    }

    fn create_oscillator(&mut self, waveform: Waveform) -> NodeId {
        (**self).create_oscillator(waveform)
    }

    fn create_gain(&mut self) -> NodeId {
        (**self).create_gain()
    }

    fn connect(&mut self, source: NodeId, destination: Destination) {
        (**self).connect(source, destination)
    }

    fn set_value_at_time(&mut self, node: NodeId, param: AudioParam, value: f64, time: f64) {
        (**self).set_value_at_time(node, param, value, time)
    }

    fn linear_ramp_to_value_at_time(
        &mut self,
        node: NodeId,
        param: AudioParam,
        value: f64,
        time: f64,
    ) {
        (**self).linear_ramp_to_value_at_time(node, param, value, time)
    }

    fn exponential_ramp_to_value_at_time(
        &mut self,
        node: NodeId,
        param: AudioParam,
        value: f64,
        time: f64,
    ) {
        (**self).exponential_ramp_to_value_at_time(node, param, value, time)
    }

    fn start(&mut self, node: NodeId, when: f64) {
        (**self).start(node, when)
    }

    fn stop(&mut self, node: NodeId, when: f64) {
        (**self).stop(node, when)
    }

    fn release(&mut self, voice: &NoteVoice) {
        (**self).release(voice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waveform_names() {
        assert_eq!(Waveform::default(), Waveform::Triangle);
        let parsed: Waveform = serde_json::from_str(r#""square""#).unwrap();
        assert_eq!(parsed, Waveform::Square);
    }

    #[test]
    fn test_boxed_backend_forwards() {
        let mut boxed: Box<dyn AudioBackend> = Box::new(crate::RecordingBackend::new());
        let osc = boxed.create_oscillator(Waveform::Sine);
        let gain = boxed.create_gain();
        assert_ne!(osc, gain);
        assert_eq!(boxed.current_time(), 0.0);
    }
}
