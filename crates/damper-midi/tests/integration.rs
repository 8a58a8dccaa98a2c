//! Integration tests for damper-midi.
//!
//! These tests drive the corrector and the session log the way a capture
//! loop does, without hardware.

use damper_midi::{
    Correction, CorrectorState, Error, MidiEventCorrector, MidiSession, RawMidiMessage,
};

/// Route `tracing` output through the test harness so failures show the log.
fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Every (status, value) pair that can be sent on controller 64.
const ALPHABET: [(u8, u8); 6] = [
    (0x90, 0x00),
    (0x90, 0x7F),
    (0x90, 0x50),
    (0xB0, 0x00),
    (0xB0, 0x7F),
    (0xB0, 0x50),
];

/// Enumerate every sequence of `len` symbols from `ALPHABET`.
fn sequences(len: usize) -> Vec<Vec<(u8, u8)>> {
    let mut out = vec![Vec::new()];
    for _ in 0..len {
        out = out
            .into_iter()
            .flat_map(|prefix| {
                ALPHABET.iter().map(move |&sym| {
                    let mut next = prefix.clone();
                    next.push(sym);
                    next
                })
            })
            .collect();
    }
    out
}

// ---------------------------------------------------------------------------
// 1. Corrector properties over exhaustive short sequences
// ---------------------------------------------------------------------------

/// Pedal-valued messages never fail, and any message that leaves the pedal
/// freshly down is emitted as a Control Change.
#[test]
fn test_pedal_values_never_violate_and_pedal_down_is_cc() {
    for seq in sequences(5) {
        let mut corrector = MidiEventCorrector::new();
        for (status, data2) in seq {
            let before = corrector.state();
            let mut msg = RawMidiMessage::new(status, 0x40, data2);
            match corrector.correct(&mut msg) {
                Ok(correction) => {
                    let after = corrector.state();
                    if !before.sustain_active && after.sustain_active {
                        assert_eq!(msg.status, 0xB0);
                    }
                    if data2 == 0x7F {
                        assert_eq!(msg.status, 0xB0);
                        assert!(after.sustain_active);
                        assert!(matches!(correction, Correction::PedalDown { .. }));
                    }
                }
                Err(Error::ProtocolViolation { status, data2, .. }) => {
                    assert_eq!(status, 0xB0);
                    assert!(data2 != 0x00 && data2 != 0x7F);
                    // Stream halts on violation
                    break;
                }
                Err(other) => panic!("unexpected error {other}"),
            }
        }
    }
}

/// Messages off controller 64, or outside Note On / Control Change, come back
/// byte-identical and never touch state.
#[test]
fn test_unrelated_messages_are_identity() {
    let mut corrector = MidiEventCorrector::new();
    // Put the corrector in a non-default state first
    corrector
        .correct(&mut RawMidiMessage::new(0x90, 0x40, 0x7F))
        .unwrap();
    let state = corrector.state();

    for status in [0x80u8, 0x90, 0xA0, 0xB0, 0xC0, 0xE0, 0x91, 0xB1] {
        for data1 in [0x00u8, 0x3F, 0x40, 0x41, 0x7F] {
            for data2 in [0x00u8, 0x01, 0x40, 0x7F] {
                let inspected = data1 == 0x40 && (status == 0x90 || status == 0xB0);
                if inspected {
                    continue;
                }
                let mut msg = RawMidiMessage::new(status, data1, data2);
                let correction = corrector.correct(&mut msg).unwrap();
                assert_eq!(correction, Correction::Unchanged);
                assert_eq!(msg, RawMidiMessage::new(status, data1, data2));
            }
        }
    }
    assert_eq!(corrector.state(), state);
}

/// Scenarios A and B: a false press followed by a false release.
#[test]
fn test_false_press_then_false_release() {
    init_tracing();
    let mut corrector = MidiEventCorrector::new();

    let mut press = RawMidiMessage::new(0x90, 0x40, 0x7F);
    corrector.correct(&mut press).unwrap();
    assert_eq!(press.status, 0xB0);
    assert!(corrector.state().sustain_active);

    let mut release = RawMidiMessage::new(0x90, 0x40, 0x00);
    corrector.correct(&mut release).unwrap();
    assert_eq!(release.status, 0xB0);
    assert_eq!(corrector.state(), CorrectorState::default());
}

// ---------------------------------------------------------------------------
// 2. Session log round trip
// ---------------------------------------------------------------------------

/// Serialize then reload: the corrected stream is identical.
#[test]
fn test_session_round_trip_preserves_corrected_stream() {
    let mut session = MidiSession::new();
    let raw: Vec<(f64, Vec<u8>)> = vec![
        (1000.125, vec![0x90, 0x3C, 0x64]),
        (1000.5, vec![0xFE]),
        (1100.0, vec![0x90, 0x40, 0x7F]),
        (1200.25, vec![0x90, 0x40, 0x45]),
        (1300.0, vec![0x90, 0x40, 0x00]),
        (1400.0, vec![0x80, 0x3C, 0x40]),
        (1500.999, vec![0x90, 0x40, 0x00]),
        (1600.0, vec![0xC0, 0x05]),
    ];
    for (when, data) in raw {
        session.add(when, data).unwrap();
    }
    assert_eq!(session.len(), 7, "active sensing is not stored");

    let json = session.serialize().unwrap();
    let reloaded = MidiSession::load(&json).unwrap();

    assert_eq!(reloaded.messages(), session.messages());
    assert_eq!(reloaded.corrector_state(), session.corrector_state());

    let statuses: Vec<u8> = reloaded.iter().map(|m| m.data[0]).collect();
    assert_eq!(statuses, vec![0x90, 0xB0, 0x90, 0x90, 0x80, 0xB0, 0xC0]);
}

/// Pretty output is still a valid session.
#[test]
fn test_pretty_output_loads() {
    let mut session = MidiSession::new();
    session.add(3.5, vec![0x90, 0x3C, 0x64]).unwrap();
    let pretty = session.serialize_pretty().unwrap();
    assert!(pretty.contains('\n'));
    let reloaded = MidiSession::load(&pretty).unwrap();
    assert_eq!(reloaded.messages(), session.messages());
}

/// Extra object keys are tolerated, fractional times are accepted.
#[test]
fn test_load_is_lenient_about_numbers_and_keys() {
    let json = r#"[{"ms": 10.5, "us": 250, "data": [144, 60, 1], "note": "x"}]"#;
    let session = MidiSession::load(json).unwrap();
    let msg = session.get(0).unwrap();
    assert_eq!((msg.ms, msg.us), (10, 750));
}

/// One bad record aborts the whole load.
#[test]
fn test_load_aborts_wholesale() {
    init_tracing();
    let json = r#"[{"ms":0,"us":0,"data":[144,60,100]},{"ms":1,"us":0,"data":[300]}]"#;
    assert!(matches!(
        MidiSession::load(json),
        Err(Error::MalformedSessionData(_))
    ));
}

/// An empty array is an empty session.
#[test]
fn test_load_empty() {
    let session = MidiSession::load("[]").unwrap();
    assert!(session.is_empty());
    assert_eq!(session.serialize().unwrap(), "[]");
}
