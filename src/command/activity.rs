//! `activity` subcommand: classifier output for every pane in a session.

use anyhow::Result;
use serde::Serialize;

use crate::activity::{Activity, Classifier};
use crate::robot;

use super::{default_backend, session_exists, session_not_found};

#[derive(Debug, Serialize)]
struct PaneActivity {
    pane_id: String,
    title: String,
    agent_type: String,
    activity: Activity,
}

#[derive(Debug, Serialize)]
struct ActivityReport {
    session: String,
    panes: Vec<PaneActivity>,
}

pub fn run(session: &str, robot: bool) -> Result<()> {
    let mux = default_backend();
    if !session_exists(mux.as_ref(), session)? && session_not_found(session, robot)? {
        return Ok(());
    }

    let mut panes = mux.get_panes(session)?;
    panes.sort_by_key(|p| p.index);

    let mut pane_activities = Vec::with_capacity(panes.len());
    for pane in panes {
        let mut classifier = Classifier::new(pane.id.clone(), pane.agent_type);
        let activity = classifier.classify(mux.as_ref());
        pane_activities.push(PaneActivity {
            pane_id: pane.id,
            title: pane.title,
            agent_type: pane.agent_type.to_string(),
            activity,
        });
    }

    let report = ActivityReport {
        session: session.to_string(),
        panes: pane_activities,
    };

    if robot {
        return robot::emit_ok(&report);
    }

    for row in &report.panes {
        println!(
            "{:<8} {:<8} {:<10} conf={:.2} vel={:.1} patterns={:?}  {}",
            row.pane_id,
            row.agent_type,
            row.activity.state,
            row.activity.confidence,
            row.activity.velocity,
            row.activity.detected_patterns,
            row.title
        );
    }
    Ok(())
}
