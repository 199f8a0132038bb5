//! Snapshot/correlation builder: fuses live pane state, alerts, the
//! dependency graph, recent file changes and agent-mail status into one
//! JSON document. Each external subtree (beads, mail) degrades
//! independently on error or timeout rather than failing the whole
//! snapshot — the core invariant this module exists to uphold.

pub mod beads;
pub mod mail;

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, SystemTime};

use serde::Serialize;

use crate::activity::{Activity, Classifier};
use crate::alerts::{AlertSummary, AlertTracker};
use crate::errors::NzmError;
use crate::filechange::{Conflict, FileChange, FileChangeTracker};
use crate::multiplexer::Multiplexer;

use beads::{BeadsClient, DependencySummary};
use mail::{MailClient, MailboxStatus};

const SUBTREE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Serialize)]
pub struct PaneSnapshot {
    pub pane_id: String,
    pub title: String,
    pub agent_type: crate::multiplexer::AgentType,
    pub activity: Activity,
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub session: String,
    pub panes: Vec<PaneSnapshot>,
    pub alerts: AlertSummary,
    pub dependency_summary: Option<DependencySummary>,
    pub mailboxes: Vec<MailboxStatus>,
    pub file_changes: Vec<FileChange>,
    pub conflicts: Vec<Conflict>,
    /// Names of subtrees that degraded (errored or timed out) while
    /// building this snapshot, so a caller can tell "zero dependencies"
    /// from "couldn't reach the dependency service".
    pub degraded: Vec<String>,
}

pub struct SnapshotBuilder<'a> {
    mux: &'a dyn Multiplexer,
    beads: Option<&'a dyn BeadsClient>,
    mail: Option<&'a dyn MailClient>,
    subtree_timeout: Duration,
}

impl<'a> SnapshotBuilder<'a> {
    pub fn new(mux: &'a dyn Multiplexer) -> Self {
        Self {
            mux,
            beads: None,
            mail: None,
            subtree_timeout: SUBTREE_TIMEOUT,
        }
    }

    pub fn with_beads(mut self, client: &'a dyn BeadsClient) -> Self {
        self.beads = Some(client);
        self
    }

    pub fn with_mail(mut self, client: &'a dyn MailClient) -> Self {
        self.mail = Some(client);
        self
    }

    pub fn build(
        &self,
        session: &str,
        alerts: &AlertTracker,
        file_changes: &FileChangeTracker,
        since: SystemTime,
    ) -> anyhow::Result<Snapshot> {
        let mut degraded = Vec::new();

        let panes = self.mux.get_panes(session)?;
        let mut pane_snapshots = Vec::with_capacity(panes.len());
        for pane in &panes {
            let mut classifier = Classifier::new(pane.id.clone(), pane.agent_type);
            let activity = classifier.classify(self.mux);
            pane_snapshots.push(PaneSnapshot {
                pane_id: pane.id.clone(),
                title: pane.title.clone(),
                agent_type: pane.agent_type,
                activity,
            });
        }
        pane_snapshots.sort_by(|a, b| a.pane_id.cmp(&b.pane_id));

        let dependency_summary = match &self.beads {
            Some(client) => {
                let session = session.to_string();
                match run_with_timeout(self.subtree_timeout, {
                    let client = *client;
                    move || client.dependency_summary(&session)
                }) {
                    Ok(summary) => Some(summary),
                    Err(_) => {
                        degraded.push("dependency_summary".to_string());
                        None
                    }
                }
            }
            None => None,
        };

        let mut mailboxes = Vec::new();
        if let Some(client) = self.mail {
            let mut any_failed = false;
            for pane in &panes {
                let agent_label = pane.id.clone();
                match run_with_timeout(self.subtree_timeout, {
                    let client = client;
                    let agent_label = agent_label.clone();
                    move || client.mailbox_status(&agent_label)
                }) {
                    Ok(status) => mailboxes.push(status),
                    Err(_) => any_failed = true,
                }
            }
            if any_failed {
                degraded.push("mailboxes".to_string());
            }
        }

        let file_changes_list: Vec<FileChange> = file_changes.changes_since(since).into_iter().cloned().collect();
        let conflicts = file_changes.conflicts_since(since);

        Ok(Snapshot {
            session: session.to_string(),
            panes: pane_snapshots,
            alerts: alerts.summary(),
            dependency_summary,
            mailboxes,
            file_changes: file_changes_list,
            conflicts,
            degraded,
        })
    }
}

/// Run `f` on a background thread, returning its result if it completes
/// within `timeout` or `NzmError::Timeout` otherwise. The thread is
/// detached on timeout rather than joined — it may still finish, but its
/// result is dropped; correctness here is about never blocking the caller
/// past the deadline, not about cancelling the in-flight call.
fn run_with_timeout<T, F>(timeout: Duration, f: F) -> Result<T, NzmError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, NzmError> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(f());
    });
    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(_) => Err(NzmError::Timeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multiplexer::{AgentType, Pane, mock::MockMultiplexer};
    use std::path::Path;
    use std::time::Duration as StdDuration;

    fn pane(id: &str) -> Pane {
        Pane {
            id: id.to_string(),
            index: 0,
            title: String::new(),
            agent_type: AgentType::Claude,
            variant: None,
            active: false,
            width: 80,
            height: 24,
        }
    }

    struct FailingBeads;
    impl BeadsClient for FailingBeads {
        fn dependency_summary(&self, _session: &str) -> Result<DependencySummary, NzmError> {
            Err(NzmError::Upstream("unreachable".to_string()))
        }
    }

    struct SlowBeads;
    impl BeadsClient for SlowBeads {
        fn dependency_summary(&self, session: &str) -> Result<DependencySummary, NzmError> {
            std::thread::sleep(StdDuration::from_secs(10));
            Ok(DependencySummary {
                session: session.to_string(),
                open: 0,
                blocked: 0,
                ready: 0,
            })
        }
    }

    #[test]
    fn snapshot_degrades_on_beads_error_without_failing() {
        let mux = MockMultiplexer::new();
        mux.create_session("demo", Path::new("/tmp")).unwrap();
        mux.set_panes("demo", vec![pane("%1")]);

        let beads = FailingBeads;
        let builder = SnapshotBuilder::new(&mux).with_beads(&beads);
        let snapshot = builder
            .build("demo", &AlertTracker::new(), &FileChangeTracker::new(), SystemTime::now())
            .unwrap();

        assert!(snapshot.dependency_summary.is_none());
        assert!(snapshot.degraded.contains(&"dependency_summary".to_string()));
    }

    #[test]
    fn snapshot_degrades_on_beads_timeout() {
        let mux = MockMultiplexer::new();
        mux.create_session("demo", Path::new("/tmp")).unwrap();
        mux.set_panes("demo", vec![pane("%1")]);

        let beads = SlowBeads;
        let builder = SnapshotBuilder {
            mux: &mux,
            beads: Some(&beads),
            mail: None,
            subtree_timeout: StdDuration::from_millis(50),
        };
        let snapshot = builder
            .build("demo", &AlertTracker::new(), &FileChangeTracker::new(), SystemTime::now())
            .unwrap();

        assert!(snapshot.dependency_summary.is_none());
        assert!(snapshot.degraded.contains(&"dependency_summary".to_string()));
    }

    #[test]
    fn snapshot_includes_pane_activity_without_any_clients() {
        let mux = MockMultiplexer::new();
        mux.create_session("demo", Path::new("/tmp")).unwrap();
        mux.set_panes("demo", vec![pane("%1")]);
        mux.set_capture("%1", "claude> ");

        let builder = SnapshotBuilder::new(&mux);
        let snapshot = builder
            .build("demo", &AlertTracker::new(), &FileChangeTracker::new(), SystemTime::now())
            .unwrap();

        assert_eq!(snapshot.panes.len(), 1);
        assert!(snapshot.degraded.is_empty());
    }
}
