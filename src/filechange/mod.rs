//! Bounded ring buffer of observed file changes, with best-effort
//! attribution to whichever agent pane was actively working when the
//! change landed, and conflict detection across panes touching the same
//! path.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::activity::{Activity, State};

/// Default ring buffer size.
pub const DEFAULT_CAPACITY: usize = 2000;

/// Default window before a change within which a GENERATING/THINKING pane
/// is considered its likely author.
pub const DEFAULT_ATTRIBUTION_WINDOW: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
    pub timestamp: SystemTime,
    /// Best-effort author; `None` when no single active pane could be
    /// credited (no candidates, or more than one equally likely).
    pub pane_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    pub path: PathBuf,
    pub pane_ids: Vec<String>,
}

pub struct FileChangeTracker {
    ring: VecDeque<FileChange>,
    capacity: usize,
    attribution_window: Duration,
}

impl FileChangeTracker {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, DEFAULT_ATTRIBUTION_WINDOW)
    }

    pub fn with_capacity(capacity: usize, attribution_window: Duration) -> Self {
        Self {
            ring: VecDeque::with_capacity(capacity),
            capacity,
            attribution_window,
        }
    }

    /// Record a change observed at `timestamp`, attributing it to whichever
    /// pane in `candidates` was `GENERATING` (preferred) or `THINKING`
    /// within the attribution window and had the most recently started
    /// that state — i.e. the agent most likely still "holding" the file.
    /// If more than one candidate ties, attribution is left `None`.
    pub fn record(
        &mut self,
        path: PathBuf,
        kind: ChangeKind,
        timestamp: SystemTime,
        candidates: &[(String, Activity)],
    ) {
        let pane_id = attribute(timestamp, candidates, self.attribution_window);
        if self.ring.len() >= self.capacity {
            self.ring.pop_front();
        }
        self.ring.push_back(FileChange {
            path,
            kind,
            timestamp,
            pane_id,
        });
    }

    pub fn changes_since(&self, since: SystemTime) -> Vec<&FileChange> {
        self.ring.iter().filter(|c| c.timestamp >= since).collect()
    }

    /// Paths touched by more than one distinct attributed pane since
    /// `since`.
    pub fn conflicts_since(&self, since: SystemTime) -> Vec<Conflict> {
        let mut by_path: HashMap<&PathBuf, Vec<&str>> = HashMap::new();
        for change in self.changes_since(since) {
            if let Some(pane_id) = &change.pane_id {
                let panes = by_path.entry(&change.path).or_default();
                if !panes.contains(&pane_id.as_str()) {
                    panes.push(pane_id.as_str());
                }
            }
        }
        let mut conflicts: Vec<Conflict> = by_path
            .into_iter()
            .filter(|(_, panes)| panes.len() > 1)
            .map(|(path, panes)| Conflict {
                path: path.clone(),
                pane_ids: panes.into_iter().map(str::to_string).collect(),
            })
            .collect();
        conflicts.sort_by(|a, b| a.path.cmp(&b.path));
        conflicts
    }
}

impl Default for FileChangeTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn attribute(timestamp: SystemTime, candidates: &[(String, Activity)], window: Duration) -> Option<String> {
    // Score each eligible candidate as (generating?, state_since); higher is
    // a more likely author. Collect every candidate tied for the top score
    // and only attribute when exactly one holds it.
    let mut scored: Vec<(&str, bool, SystemTime)> = Vec::new();
    for (pane_id, activity) in candidates {
        let active = matches!(activity.state, State::Generating | State::Thinking);
        if !active {
            continue;
        }
        let within_window = timestamp
            .duration_since(activity.state_since)
            .map(|d| d <= window)
            .unwrap_or(true);
        if !within_window {
            continue;
        }
        scored.push((pane_id, activity.state == State::Generating, activity.state_since));
    }

    let top = scored.iter().max_by(|a, b| (a.1, a.2).cmp(&(b.1, b.2)))?;
    let top_score = (top.1, top.2);
    let mut tied = scored.iter().filter(|c| (c.1, c.2) == top_score);
    let winner = tied.next()?;
    if tied.next().is_some() {
        None
    } else {
        Some(winner.0.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    fn activity(state: State, state_since: SystemTime) -> Activity {
        Activity {
            agent_type: crate::multiplexer::AgentType::Claude,
            state,
            confidence: 1.0,
            velocity: 0.0,
            state_since,
            last_output: state_since,
            detected_patterns: Vec::new(),
        }
    }

    #[test]
    fn attributes_to_sole_generating_candidate() {
        let now = SystemTime::now();
        let mut tracker = FileChangeTracker::new();
        let candidates = vec![("%1".to_string(), activity(State::Generating, now))];
        tracker.record(PathBuf::from("a.rs"), ChangeKind::Modified, now, &candidates);
        let changes = tracker.changes_since(now - StdDuration::from_secs(1));
        assert_eq!(changes[0].pane_id.as_deref(), Some("%1"));
    }

    #[test]
    fn ignores_candidates_outside_window() {
        let now = SystemTime::now();
        let stale_since = now - StdDuration::from_secs(60);
        let mut tracker = FileChangeTracker::with_capacity(10, StdDuration::from_secs(10));
        let candidates = vec![("%1".to_string(), activity(State::Generating, stale_since))];
        tracker.record(PathBuf::from("a.rs"), ChangeKind::Modified, now, &candidates);
        let changes = tracker.changes_since(now - StdDuration::from_secs(1));
        assert_eq!(changes[0].pane_id, None);
    }

    #[test]
    fn generating_preferred_over_thinking() {
        let now = SystemTime::now();
        let mut tracker = FileChangeTracker::new();
        let candidates = vec![
            ("%1".to_string(), activity(State::Thinking, now)),
            ("%2".to_string(), activity(State::Generating, now)),
        ];
        tracker.record(PathBuf::from("a.rs"), ChangeKind::Modified, now, &candidates);
        let changes = tracker.changes_since(now - StdDuration::from_secs(1));
        assert_eq!(changes[0].pane_id.as_deref(), Some("%2"));
    }

    #[test]
    fn detects_conflict_across_two_panes() {
        let now = SystemTime::now();
        let mut tracker = FileChangeTracker::new();
        tracker.record(
            PathBuf::from("shared.rs"),
            ChangeKind::Modified,
            now,
            &[("%1".to_string(), activity(State::Generating, now))],
        );
        tracker.record(
            PathBuf::from("shared.rs"),
            ChangeKind::Modified,
            now,
            &[("%2".to_string(), activity(State::Generating, now))],
        );
        let conflicts = tracker.conflicts_since(now - StdDuration::from_secs(1));
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].pane_ids.len(), 2);
    }

    #[test]
    fn ring_buffer_evicts_oldest_past_capacity() {
        let mut tracker = FileChangeTracker::with_capacity(2, DEFAULT_ATTRIBUTION_WINDOW);
        let now = SystemTime::now();
        tracker.record(PathBuf::from("a.rs"), ChangeKind::Modified, now, &[]);
        tracker.record(PathBuf::from("b.rs"), ChangeKind::Modified, now, &[]);
        tracker.record(PathBuf::from("c.rs"), ChangeKind::Modified, now, &[]);
        let changes = tracker.changes_since(now - StdDuration::from_secs(1));
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|c| c.path != PathBuf::from("a.rs")));
    }
}
