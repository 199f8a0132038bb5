//! `snapshot` subcommand: the full correlated snapshot document for one
//! session, or every known session when none is named.

use std::time::{Duration, SystemTime};

use anyhow::Result;
use serde::Serialize;

use crate::alerts::AlertTracker;
use crate::filechange::FileChangeTracker;
use crate::robot;
use crate::snapshot::beads::HttpBeadsClient;
use crate::snapshot::mail::HttpMailClient;
use crate::snapshot::{Snapshot, SnapshotBuilder};

use super::default_backend;

#[derive(Debug, Serialize)]
struct SnapshotsReport {
    snapshots: Vec<Snapshot>,
}

pub fn run(session: Option<&str>, mail_url: Option<&str>, beads_url: Option<&str>) -> Result<()> {
    let mux = default_backend();
    let beads_client = beads_url.map(HttpBeadsClient::new);
    let mail_client = mail_url.map(HttpMailClient::new);

    let mut builder = SnapshotBuilder::new(mux.as_ref());
    if let Some(client) = &beads_client {
        builder = builder.with_beads(client);
    }
    if let Some(client) = &mail_client {
        builder = builder.with_mail(client);
    }

    // One-shot CLI invocations start with empty trackers — alerts and file
    // changes only accumulate across a long-lived dashboard process.
    let alerts = AlertTracker::new();
    let file_changes = FileChangeTracker::new();
    let since = SystemTime::now() - Duration::from_secs(3600);

    let sessions: Vec<String> = match session {
        Some(s) => vec![s.to_string()],
        None => mux.list_sessions()?,
    };

    let mut snapshots = Vec::with_capacity(sessions.len());
    for session in &sessions {
        snapshots.push(builder.build(session, &alerts, &file_changes, since)?);
    }

    robot::emit_ok(&SnapshotsReport { snapshots })
}
