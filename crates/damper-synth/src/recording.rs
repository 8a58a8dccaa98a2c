//! Backend that records the schedule instead of producing sound.
//!
//! Useful for inspecting exactly what the synth asked for (and when) without
//! an audio device, e.g. when checking a replay against expectations.

use crate::backend::{AudioBackend, AudioParam, Destination, NodeId, Waveform};
use crate::voice::NoteVoice;

/// One call made on the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduledCall {
    CreateOscillator {
        node: NodeId,
        waveform: Waveform,
    },
    CreateGain {
        node: NodeId,
    },
    Connect {
        source: NodeId,
        destination: Destination,
    },
    SetValue {
        node: NodeId,
        param: AudioParam,
        value: f64,
        time: f64,
    },
    LinearRamp {
        node: NodeId,
        param: AudioParam,
        value: f64,
        time: f64,
    },
    ExponentialRamp {
        node: NodeId,
        param: AudioParam,
        value: f64,
        time: f64,
    },
    Start {
        node: NodeId,
        when: f64,
    },
    Stop {
        node: NodeId,
        when: f64,
    },
    Release {
        oscillator: NodeId,
        gain: NodeId,
    },
}

impl ScheduledCall {
    /// Node the call is about (the oscillator for releases).
    pub fn node(&self) -> NodeId {
        match *self {
            ScheduledCall::CreateOscillator { node, .. }
            | ScheduledCall::CreateGain { node }
            | ScheduledCall::SetValue { node, .. }
            | ScheduledCall::LinearRamp { node, .. }
            | ScheduledCall::ExponentialRamp { node, .. }
            | ScheduledCall::Start { node, .. }
            | ScheduledCall::Stop { node, .. } => node,
            ScheduledCall::Connect { source, .. } => source,
            ScheduledCall::Release { oscillator, .. } => oscillator,
        }
    }
}

/// Records every call in order. Node ids start at 1.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    now: f64,
    next_id: u64,
    calls: Vec<ScheduledCall>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value returned by `current_time`.
    pub fn set_current_time(&mut self, now: f64) {
        self.now = now;
    }

    pub fn calls(&self) -> &[ScheduledCall] {
        &self.calls
    }

    /// Calls that touch `node`, in order.
    pub fn calls_for(&self, node: NodeId) -> Vec<&ScheduledCall> {
        self.calls
            .iter()
            .filter(|call| match call {
                ScheduledCall::Connect {
                    source,
                    destination,
                } => *source == node || *destination == Destination::Node(node),
                ScheduledCall::Release { oscillator, gain } => *oscillator == node || *gain == node,
                other => other.node() == node,
            })
            .collect()
    }

    pub fn start_time(&self, node: NodeId) -> Option<f64> {
        self.calls.iter().rev().find_map(|call| match *call {
            ScheduledCall::Start { node: n, when } if n == node => Some(when),
            _ => None,
        })
    }

    /// Last scheduled stop for `node`.
    pub fn stop_time(&self, node: NodeId) -> Option<f64> {
        self.calls.iter().rev().find_map(|call| match *call {
            ScheduledCall::Stop { node: n, when } if n == node => Some(when),
            _ => None,
        })
    }

    /// True once the voice owning `node` (oscillator or gain) was released.
    pub fn is_released(&self, node: NodeId) -> bool {
        self.calls.iter().any(|call| {
            matches!(*call, ScheduledCall::Release { oscillator, gain } if oscillator == node || gain == node)
        })
    }

    pub fn released_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, ScheduledCall::Release { .. }))
            .count()
    }

    /// Oscillators created so far.
    pub fn oscillator_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, ScheduledCall::CreateOscillator { .. }))
            .count()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    fn alloc(&mut self) -> NodeId {
        self.next_id += 1;
        NodeId(self.next_id)
    }
}

impl AudioBackend for RecordingBackend {
    fn current_time(&self) -> f64 {
        self.now
    }

    fn create_oscillator(&mut self, waveform: Waveform) -> NodeId {
        let node = self.alloc();
        self.calls
            .push(ScheduledCall::CreateOscillator { node, waveform });
        node
    }

    fn create_gain(&mut self) -> NodeId {
        let node = self.alloc();
        self.calls.push(ScheduledCall::CreateGain { node });
        node
    }

    fn connect(&mut self, source: NodeId, destination: Destination) {
        self.calls.push(ScheduledCall::Connect {
            source,
            destination,
        });
    }

    fn set_value_at_time(&mut self, node: NodeId, param: AudioParam, value: f64, time: f64) {
        self.calls.push(ScheduledCall::SetValue {
            node,
            param,
            value,
            time,
        });
    }

    fn linear_ramp_to_value_at_time(
        &mut self,
        node: NodeId,
        param: AudioParam,
        value: f64,
        time: f64,
    ) {
        self.calls.push(ScheduledCall::LinearRamp {
            node,
            param,
            value,
            time,
        });
    }

    fn exponential_ramp_to_value_at_time(
        &mut self,
        node: NodeId,
        param: AudioParam,
        value: f64,
        time: f64,
    ) {
        self.calls.push(ScheduledCall::ExponentialRamp {
            node,
            param,
            value,
            time,
        });
    }

    fn start(&mut self, node: NodeId, when: f64) {
        self.calls.push(ScheduledCall::Start { node, when });
    }

    fn stop(&mut self, node: NodeId, when: f64) {
        self.calls.push(ScheduledCall::Stop { node, when });
    }

    fn release(&mut self, voice: &NoteVoice) {
        self.calls.push(ScheduledCall::Release {
            oscillator: voice.oscillator,
            gain: voice.gain,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let mut backend = RecordingBackend::new();
        let a = backend.create_oscillator(Waveform::Sine);
        let b = backend.create_gain();
        assert_ne!(a, b);
        assert_eq!(a, NodeId(1));
        assert_eq!(backend.oscillator_count(), 1);
    }

    #[test]
    fn test_queries() {
        let mut backend = RecordingBackend::new();
        let osc = backend.create_oscillator(Waveform::Triangle);
        let gain = backend.create_gain();
        backend.connect(osc, Destination::Node(gain));
        backend.start(osc, 1.0);
        backend.stop(osc, 2.0);
        backend.stop(osc, 3.0);

        assert_eq!(backend.start_time(osc), Some(1.0));
        assert_eq!(backend.stop_time(osc), Some(3.0));
        assert_eq!(backend.stop_time(gain), None);
        assert_eq!(backend.calls_for(gain).len(), 2);
        assert!(!backend.is_released(osc));
    }
}
