//! Bounded, newest-first chat log.

use crate::event::ChatLogEntry;
use std::collections::VecDeque;

/// Maximum number of retained chat entries.
pub const CHAT_LOG_CAPACITY: usize = 100;

/// The conversation log shown on the dashboard: newest first, capped, with
/// eviction by capacity only.
#[derive(Debug, Clone, Default)]
pub struct ChatLog {
    entries: VecDeque<ChatLogEntry>,
}

impl ChatLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend one entry, evicting beyond capacity. Relative order of the
    /// retained entries is preserved.
    pub fn record(&mut self, entry: ChatLogEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(CHAT_LOG_CAPACITY);
    }

    /// Replace the log wholesale from a bulk fetch (already newest-first).
    pub fn load(&mut self, items: Vec<ChatLogEntry>) {
        self.entries = items.into_iter().take(CHAT_LOG_CAPACITY).collect();
    }

    /// Entries, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &ChatLogEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i64) -> ChatLogEntry {
        ChatLogEntry {
            id,
            guild_id: None,
            channel_id: None,
            channel_name: None,
            user_id: None,
            user_name: None,
            user_avatar: None,
            user_message: format!("message {id}"),
            bot_response: None,
            tokens: 0.0,
            latency_ms: 0.0,
            created_at: None,
        }
    }

    #[test]
    fn test_record_is_newest_first() {
        let mut log = ChatLog::new();
        log.record(entry(1));
        log.record(entry(2));
        log.record(entry(3));

        let ids: Vec<_> = log.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let mut log = ChatLog::new();
        for id in 0..250 {
            log.record(entry(id));
            assert!(log.len() <= CHAT_LOG_CAPACITY);
        }
        assert_eq!(log.len(), CHAT_LOG_CAPACITY);
    }

    #[test]
    fn test_eviction_drops_oldest_only() {
        let mut log = ChatLog::new();
        for id in 0..150 {
            log.record(entry(id));
        }
        let ids: Vec<_> = log.iter().map(|e| e.id).collect();
        let expected: Vec<i64> = (50..150).rev().collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_load_replaces_wholesale() {
        let mut log = ChatLog::new();
        log.record(entry(99));
        log.load(vec![entry(3), entry(2), entry(1)]);

        let ids: Vec<_> = log.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn test_load_truncates_to_capacity() {
        let mut log = ChatLog::new();
        log.load((0..200).map(entry).collect());
        assert_eq!(log.len(), CHAT_LOG_CAPACITY);
        // the first CAPACITY items of the fetch are the ones kept
        assert_eq!(log.iter().next().map(|e| e.id), Some(0));
    }
}
