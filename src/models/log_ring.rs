use chrono::{DateTime, Local};
use std::collections::VecDeque;

/// Number of log entries kept in memory for the logs screen
pub const LOG_RING_CAPACITY: usize = 500;

/// A timestamped log line
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub message: String,
}

impl LogEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            message: message.into(),
        }
    }

    /// Line shown on the logs screen: `HH:MM:SS message`
    pub fn display_line(&self) -> String {
        format!("{} {}", self.timestamp.format("%H:%M:%S"), self.message)
    }
}

/// Bounded in-memory log history.
///
/// Holds at most `capacity` entries; pushing onto a full ring evicts the
/// oldest entry. The durable run log is written separately and is never
/// affected by eviction.
#[derive(Debug, Clone)]
pub struct LogRing {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl LogRing {
    pub fn new() -> Self {
        Self::with_capacity(LOG_RING_CAPACITY)
    }

    /// Create a ring holding at most `capacity` entries (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, returning the evicted one if the ring was full
    pub fn push(&mut self, entry: LogEntry) -> Option<LogEntry> {
        let evicted = if self.entries.len() == self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries oldest first
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn messages(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.message.as_str()).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for LogRing {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_push_until_full() {
        let mut ring = LogRing::with_capacity(3);

        assert!(ring.push(LogEntry::new("a")).is_none());
        assert!(ring.push(LogEntry::new("b")).is_none());
        assert!(ring.push(LogEntry::new("c")).is_none());

        let evicted = ring.push(LogEntry::new("d")).unwrap();
        assert_eq!(evicted.message, "a");
        assert_eq!(ring.messages(), vec!["b", "c", "d"]);
    }

    #[test]
    fn test_default_capacity() {
        let ring = LogRing::default();
        assert_eq!(ring.capacity(), LOG_RING_CAPACITY);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut ring = LogRing::with_capacity(0);
        ring.push(LogEntry::new("only"));
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn test_display_line_has_time_prefix() {
        let entry = LogEntry::new("Mining started");
        let line = entry.display_line();
        assert!(line.ends_with(" Mining started"));
        assert_eq!(line.len(), "00:00:00 Mining started".len());
    }

    proptest! {
        #[test]
        fn prop_ring_keeps_newest_in_order(count in 0usize..1200) {
            let mut ring = LogRing::new();
            for i in 0..count {
                ring.push(LogEntry::new(i.to_string()));
            }

            let expected: Vec<String> = (count.saturating_sub(LOG_RING_CAPACITY)..count)
                .map(|i| i.to_string())
                .collect();

            prop_assert_eq!(ring.len(), count.min(LOG_RING_CAPACITY));
            prop_assert_eq!(ring.messages(), expected.iter().map(String::as_str).collect::<Vec<_>>());
        }
    }
}
