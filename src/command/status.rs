//! `status` subcommand: a snapshot of every known session and the
//! classifier state of each of its panes.

use anyhow::Result;
use serde::Serialize;

use crate::activity::Classifier;
use crate::robot;

use super::default_backend;

#[derive(Debug, Serialize)]
struct PaneRow {
    session: String,
    pane_id: String,
    title: String,
    agent_type: String,
    state: String,
    confidence: f64,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    sessions: usize,
    panes: Vec<PaneRow>,
}

pub fn run(robot: bool) -> Result<()> {
    let mux = default_backend();
    let sessions = mux.list_sessions()?;

    let mut rows = Vec::new();
    for session in &sessions {
        let mut panes = mux.get_panes(session)?;
        panes.sort_by_key(|p| p.index);
        for pane in panes {
            let mut classifier = Classifier::new(pane.id.clone(), pane.agent_type);
            let activity = classifier.classify(mux.as_ref());
            rows.push(PaneRow {
                session: session.clone(),
                pane_id: pane.id,
                title: pane.title,
                agent_type: pane.agent_type.to_string(),
                state: activity.state.to_string(),
                confidence: activity.confidence,
            });
        }
    }

    let report = StatusReport {
        sessions: sessions.len(),
        panes: rows,
    };

    if robot {
        return robot::emit_ok(&report);
    }

    println!("{} session(s)", report.sessions);
    for row in &report.panes {
        println!(
            "{:<16} {:<8} {:<8} {:<10} {:>5.2}  {}",
            row.session, row.pane_id, row.agent_type, row.state, row.confidence, row.title
        );
    }
    Ok(())
}
