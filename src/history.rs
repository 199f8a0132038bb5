//! Bounded history ring shared by session state: a flat log of notable
//! events (sends, interrupts, state transitions) kept per session so a
//! `tail` command has something to show beyond the live pane content.

use serde::{Deserialize, Serialize};

/// Maximum entries retained per session; oldest entries are dropped first.
pub const HISTORY_CAPACITY: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: u64,
    pub pane_id: String,
    pub summary: String,
}

/// Push `entry` onto `history`, evicting the oldest entry if at capacity.
pub fn push_bounded(history: &mut Vec<HistoryEntry>, entry: HistoryEntry) {
    if history.len() >= HISTORY_CAPACITY {
        history.remove(0);
    }
    history.push(entry);
}

/// Most recent `n` entries, newest last.
pub fn tail(history: &[HistoryEntry], n: usize) -> &[HistoryEntry] {
    let start = history.len().saturating_sub(n);
    &history[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ts: u64) -> HistoryEntry {
        HistoryEntry {
            timestamp: ts,
            pane_id: "%1".to_string(),
            summary: format!("event {ts}"),
        }
    }

    #[test]
    fn evicts_oldest_when_over_capacity() {
        let mut history = Vec::new();
        for i in 0..(HISTORY_CAPACITY + 10) {
            push_bounded(&mut history, entry(i as u64));
        }
        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert_eq!(history.first().unwrap().timestamp, 10);
    }

    #[test]
    fn tail_returns_newest_entries() {
        let mut history = Vec::new();
        for i in 0..5 {
            push_bounded(&mut history, entry(i));
        }
        let last_two = tail(&history, 2);
        assert_eq!(last_two.iter().map(|e| e.timestamp).collect::<Vec<_>>(), vec![3, 4]);
    }

    #[test]
    fn tail_longer_than_history_returns_all() {
        let mut history = Vec::new();
        push_bounded(&mut history, entry(0));
        assert_eq!(tail(&history, 10).len(), 1);
    }
}
