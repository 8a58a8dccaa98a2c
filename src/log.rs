//! User-facing activity log.
//!
//! Entries are kept newest first and mirrored to `tracing`.

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Severity of a log entry. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    /// Increases by one per stored entry.
    pub id: u64,
    /// UTC, `YYYY-MM-DD HH:MM:SS.mmm`.
    pub when: String,
    pub message: String,
    pub level: LogLevel,
}

/// Bounded, level-filtered list of [`LogMessage`]s.
#[derive(Debug, Clone)]
pub struct LogBook {
    entries: VecDeque<LogMessage>,
    next_id: u64,
    capacity: usize,
    level: LogLevel,
}

impl LogBook {
    pub fn new(capacity: usize, level: LogLevel) -> Self {
        Self {
            entries: VecDeque::new(),
            next_id: 0,
            capacity: capacity.max(1),
            level,
        }
    }

    /// Store `message` if it meets the current level. Returns the new entry.
    pub fn push(&mut self, level: LogLevel, message: impl Into<String>) -> Option<&LogMessage> {
        let message = message.into();
        match level {
            LogLevel::Info => tracing::info!("{}", message),
            LogLevel::Warning => tracing::warn!("{}", message),
            LogLevel::Error => tracing::error!("{}", message),
        }
        if level < self.level {
            return None;
        }

        self.entries.push_front(LogMessage {
            id: self.next_id,
            when: format_utc(SystemTime::now()),
            message,
            level,
        });
        self.next_id += 1;
        self.entries.truncate(self.capacity);
        self.entries.front()
    }

    /// Entries, newest first.
    pub fn entries(&self) -> impl Iterator<Item = &LogMessage> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&LogMessage> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.level = level;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Format `time` as `YYYY-MM-DD HH:MM:SS.mmm` in UTC.
pub fn format_utc(time: SystemTime) -> String {
    let since_epoch = time.duration_since(UNIX_EPOCH).unwrap_or_default();
    let secs = since_epoch.as_secs();
    let (year, month, day) = civil_from_days((secs / 86_400) as i64);
    let secs_of_day = secs % 86_400;
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:03}",
        year,
        month,
        day,
        secs_of_day / 3600,
        secs_of_day % 3600 / 60,
        secs_of_day % 60,
        since_epoch.subsec_millis()
    )
}

// Proleptic Gregorian calendar date (UTC) for a day count since 1970-01-01.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn at(millis: u64) -> String {
        format_utc(UNIX_EPOCH + Duration::from_millis(millis))
    }

    #[test]
    fn test_format_utc() {
        assert_eq!(at(0), "1970-01-01 00:00:00.000");
        assert_eq!(at(1_000_000_000_123), "2001-09-09 01:46:40.123");
        assert_eq!(at(951_782_400_000), "2000-02-29 00:00:00.000");
        assert_eq!(at(1_704_067_199_999), "2023-12-31 23:59:59.999");
    }

    #[test]
    fn test_civil_from_days_gregorian() {
        assert_eq!(civil_from_days(-1), (1969, 12, 31));
        assert_eq!(civil_from_days(-719_162), (1, 1, 1));
        // 2100 is not a leap year
        assert_eq!(civil_from_days(47_541), (2100, 3, 1));
    }

    #[test]
    fn test_newest_first_with_increasing_ids() {
        let mut log = LogBook::new(10, LogLevel::Info);
        log.push(LogLevel::Info, "first");
        log.push(LogLevel::Warning, "second");
        let ids: Vec<u64> = log.entries().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 0]);
        assert_eq!(log.latest().unwrap().message, "second");
    }

    #[test]
    fn test_level_filter() {
        let mut log = LogBook::new(10, LogLevel::Warning);
        assert!(log.push(LogLevel::Info, "quiet").is_none());
        assert!(log.push(LogLevel::Error, "loud").is_some());
        assert_eq!(log.len(), 1);
        assert_eq!(log.latest().unwrap().id, 0);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut log = LogBook::new(2, LogLevel::Info);
        for i in 0..5 {
            log.push(LogLevel::Info, format!("m{}", i));
        }
        let messages: Vec<&str> = log.entries().map(|m| m.message.as_str()).collect();
        assert_eq!(messages, vec!["m4", "m3"]);
    }
}
