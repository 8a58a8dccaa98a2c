//! Captured session log and its JSON format.

use serde::Deserialize;
use tracing::trace;

use crate::corrector::{CorrectorState, Disposition, MidiEventCorrector};
use crate::error::{Error, Result};
use crate::message::format_hex;
use crate::timestamp::TimestampedMessage;

/// Loose record shape accepted on load. Any JSON number is allowed for the
/// time fields; `data` must be bytes.
#[derive(Deserialize)]
struct SessionRecord {
    ms: f64,
    us: f64,
    data: Vec<u8>,
}

/// Ordered log of corrected messages from one input stream.
///
/// Every message goes through the stream's corrector before it is stored, both
/// during live capture and when a saved session is loaded.
#[derive(Debug, Clone, Default)]
pub struct MidiSession {
    messages: Vec<TimestampedMessage>,
    corrector: MidiEventCorrector,
}

impl MidiSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Correct `data` and append it at `when_ms`.
    ///
    /// Returns `false` when the message was dropped (Active Sensing).
    pub fn add(&mut self, when_ms: f64, data: impl Into<Vec<u8>>) -> Result<bool> {
        let mut data = data.into();
        match self.corrector.process(&mut data)? {
            Disposition::Drop => Ok(false),
            Disposition::Record(_) => {
                trace!("Message: {} @{}", format_hex(&data), when_ms);
                self.messages.push(TimestampedMessage::new(when_ms, data));
                Ok(true)
            }
        }
    }

    /// Parse a serialized session, re-running every entry through a fresh
    /// corrector. Any shape error rejects the whole input.
    pub fn load(source: &str) -> Result<Self> {
        let records: Vec<SessionRecord> = serde_json::from_str(source)
            .map_err(|e| Error::MalformedSessionData(e.to_string()))?;

        let mut session = Self::new();
        for record in records {
            let when = record.ms + record.us / 1000.0;
            session.add(when, record.data)?;
        }
        Ok(session)
    }

    /// Compact JSON, `[{"ms":..,"us":..,"data":[..]},..]`.
    pub fn serialize(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.messages)?)
    }

    pub fn serialize_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.messages)?)
    }

    pub fn get(&self, index: usize) -> Option<&TimestampedMessage> {
        self.messages.get(index)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TimestampedMessage> {
        self.messages.iter()
    }

    pub fn messages(&self) -> &[TimestampedMessage] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<TimestampedMessage> {
        self.messages
    }

    /// Drop stored messages. Corrector state is kept.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Drop stored messages and corrector state.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.corrector.reset();
    }

    pub fn corrector_state(&self) -> CorrectorState {
        self.corrector.state()
    }
}

impl<'a> IntoIterator for &'a MidiSession {
    type Item = &'a TimestampedMessage;
    type IntoIter = std::slice::Iter<'a, TimestampedMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_corrects_and_drops() {
        let mut session = MidiSession::new();
        assert!(session.add(10.5, vec![0x90, 0x40, 0x7F]).unwrap());
        assert!(!session.add(11.0, vec![0xFE]).unwrap());
        assert_eq!(session.len(), 1);
        assert_eq!(session.get(0).unwrap().data, vec![0xB0, 0x40, 0x7F]);
        assert_eq!(session.get(0).unwrap().us, 500);
        assert!(session.corrector_state().sustain_active);
    }

    #[test]
    fn test_serialize_compact() {
        let mut session = MidiSession::new();
        session.add(1.25, vec![0x90, 60, 100]).unwrap();
        assert_eq!(
            session.serialize().unwrap(),
            r#"[{"ms":1,"us":250,"data":[144,60,100]}]"#
        );
    }

    #[test]
    fn test_load_recorrects() {
        // Stored verbatim with the wrong status byte
        let json = r#"[{"ms":0,"us":0,"data":[144,64,127]},{"ms":5,"us":0,"data":[144,64,0]}]"#;
        let session = MidiSession::load(json).unwrap();
        assert_eq!(session.get(0).unwrap().data, vec![0xB0, 0x40, 0x7F]);
        assert_eq!(session.get(1).unwrap().data, vec![0xB0, 0x40, 0x00]);
    }

    #[test]
    fn test_load_rejects_bad_shapes() {
        for bad in [
            r#"{"ms":0,"us":0,"data":[]}"#,
            r#"[{"ms":"0","us":0,"data":[]}]"#,
            r#"[{"ms":0,"us":null,"data":[]}]"#,
            r#"[{"ms":0,"us":0,"data":"90 40 7f"}]"#,
            r#"[{"ms":0,"us":0,"data":[144,"a"]}]"#,
            r#"[{"ms":0,"us":0}]"#,
            r#"not json"#,
        ] {
            let err = MidiSession::load(bad).unwrap_err();
            assert!(
                matches!(err, Error::MalformedSessionData(_)),
                "expected malformed for {bad}"
            );
        }
    }

    #[test]
    fn test_load_aborts_on_violation() {
        let json = r#"[{"ms":0,"us":0,"data":[176,64,5]}]"#;
        assert!(matches!(
            MidiSession::load(json),
            Err(Error::ProtocolViolation { .. })
        ));
    }

    #[test]
    fn test_clear_keeps_corrector() {
        let mut session = MidiSession::new();
        session.add(0.0, vec![0x90, 0x40, 0x7F]).unwrap();
        session.clear();
        assert!(session.is_empty());
        assert!(session.corrector_state().sustain_active);
        session.reset();
        assert!(!session.corrector_state().sustain_active);
    }
}
