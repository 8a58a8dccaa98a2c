//! Timestamped messages as stored in a session log.

use serde::{Deserialize, Serialize};

/// A captured message with a millisecond timestamp split into whole
/// milliseconds and a microsecond remainder.
///
/// Serializes as `{"ms": 1234, "us": 567, "data": [144, 60, 100]}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimestampedMessage {
    pub ms: i64,
    /// Sub-millisecond residue, 0..=999.
    pub us: u16,
    pub data: Vec<u8>,
}

impl TimestampedMessage {
    /// Split a fractional millisecond timestamp.
    ///
    /// `us` is rounded to the nearest microsecond; a remainder that rounds up
    /// to 1000 carries into `ms`.
    pub fn new(when_ms: f64, data: Vec<u8>) -> Self {
        let (ms, us) = split_millis(when_ms);
        Self { ms, us, data }
    }

    /// Full timestamp in milliseconds.
    #[inline]
    pub fn when_ms(&self) -> f64 {
        self.ms as f64 + self.us as f64 / 1000.0
    }
}

fn split_millis(when_ms: f64) -> (i64, u16) {
    let whole = when_ms.trunc();
    let mut ms = whole as i64;
    let mut us = ((when_ms - whole) * 1000.0).round() as i64;
    if us >= 1000 {
        ms += 1;
        us -= 1000;
    } else if us <= -1000 {
        ms -= 1;
        us += 1000;
    }
    // Negative timestamps keep a non-negative residue.
    if us < 0 {
        ms -= 1;
        us += 1000;
    }
    (ms, us as u16)
}
