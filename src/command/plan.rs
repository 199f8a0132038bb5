//! `plan` subcommand: recommends a next action per pane based on its
//! current classifier state — what an operator would otherwise have to
//! eyeball across every session's panes.

use anyhow::Result;
use serde::Serialize;

use crate::activity::{Classifier, State};
use crate::robot;

use super::default_backend;

#[derive(Debug, Serialize)]
struct PlanItem {
    session: String,
    pane_id: String,
    state: String,
    action: String,
    reason: String,
}

#[derive(Debug, Serialize)]
struct PlanReport {
    items: Vec<PlanItem>,
}

fn recommend(state: State) -> Option<(&'static str, &'static str)> {
    match state {
        State::Waiting => Some(("send", "pane is idle at a prompt and ready for the next instruction")),
        State::Error => Some(("interrupt", "pane surfaced an error token and may need attention before continuing")),
        State::Stalled => Some(("interrupt", "pane has produced no new output past the stall threshold")),
        State::Generating | State::Thinking | State::Unknown => None,
    }
}

pub fn run(robot: bool) -> Result<()> {
    let mux = default_backend();
    let mut items = Vec::new();

    for session in mux.list_sessions()? {
        let mut panes = mux.get_panes(&session)?;
        panes.sort_by_key(|p| p.index);
        for pane in panes {
            let mut classifier = Classifier::new(pane.id.clone(), pane.agent_type);
            let activity = classifier.classify(mux.as_ref());
            if let Some((action, reason)) = recommend(activity.state) {
                items.push(PlanItem {
                    session: session.clone(),
                    pane_id: pane.id,
                    state: activity.state.to_string(),
                    action: action.to_string(),
                    reason: reason.to_string(),
                });
            }
        }
    }

    let report = PlanReport { items };

    if robot {
        return robot::emit_ok(&report);
    }

    if report.items.is_empty() {
        println!("no recommended actions");
        return Ok(());
    }
    for item in &report.items {
        println!(
            "[{}] {} ({}) -> {} — {}",
            item.session, item.pane_id, item.state, item.action, item.reason
        );
    }
    Ok(())
}
