//! Hardware tests against the host MIDI subsystem.
//!
//! All tests are `#[ignore]` so CI doesn't fail without a MIDI server.
//!
//! Run with:
//!   cargo test -p damper-midi-io --test hardware -- --ignored --test-threads=1

#![cfg(feature = "midi-io")]

use std::sync::Arc;
use std::time::Duration;

use damper_midi_io::{
    list_ports, DeviceWatcher, MidiInputManager, MidiOutputManager, MidiOutputSink, PortKind,
    SystemClock,
};

const CLIENT: &str = "damper-hardware-test";

/// Enumeration succeeds and agrees across the two listing paths.
#[test]
#[ignore]
fn test_enumerate_ports() {
    let ports = list_ports(CLIENT).expect("MIDI access");
    let inputs = MidiInputManager::list_devices(CLIENT);
    let outputs = MidiOutputManager::list_devices(CLIENT);

    assert_eq!(
        ports.iter().filter(|p| p.kind == PortKind::Input).count(),
        inputs.len()
    );
    assert_eq!(
        ports.iter().filter(|p| p.kind == PortKind::Output).count(),
        outputs.len()
    );
}

/// The first poll reports every present port.
#[test]
#[ignore]
fn test_watcher_reports_present_ports() {
    let expected = list_ports(CLIENT).expect("MIDI access").len();
    let (mut watcher, events) =
        DeviceWatcher::spawn(CLIENT, Duration::from_millis(50)).expect("MIDI access");

    let mut seen = 0;
    while seen < expected {
        events
            .recv_timeout(Duration::from_secs(1))
            .expect("device event");
        seen += 1;
    }
    watcher.stop();
}

/// Sending without a selected device is an error, not a silent drop.
#[test]
#[ignore]
fn test_output_requires_device() {
    let mut output =
        MidiOutputManager::new(CLIENT, Arc::new(SystemClock::new())).expect("MIDI access");
    assert!(output.send(&[0x90, 60, 100], None).is_err());
}

/// Input manager starts disconnected and can be dropped cleanly.
#[test]
#[ignore]
fn test_input_manager_lifecycle() {
    let input = MidiInputManager::new(CLIENT).expect("MIDI access");
    assert!(!input.is_connected());
    assert!(input.try_recv().is_none());
    input.disconnect();
}
