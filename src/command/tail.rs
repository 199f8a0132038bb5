//! `tail` subcommand: captured output per pane for one session.

use anyhow::Result;
use serde::Serialize;

use crate::robot;

use super::{default_backend, session_exists, session_not_found};

#[derive(Debug, Serialize)]
struct PaneTail {
    pane_id: String,
    title: String,
    output: String,
}

#[derive(Debug, Serialize)]
struct TailReport {
    session: String,
    panes: Vec<PaneTail>,
}

pub fn run(session: &str, lines: u16, panes: &[String], robot: bool) -> Result<()> {
    let mux = default_backend();
    if !session_exists(mux.as_ref(), session)? && session_not_found(session, robot)? {
        return Ok(());
    }

    let mut selected = mux.get_panes(session)?;
    selected.sort_by_key(|p| p.index);
    if !panes.is_empty() {
        selected.retain(|p| panes.contains(&p.id) || panes.contains(&p.index.to_string()));
    }

    let mut pane_tails = Vec::with_capacity(selected.len());
    for pane in selected {
        let output = mux.capture_pane_output(&pane.id, lines).unwrap_or_default();
        pane_tails.push(PaneTail {
            pane_id: pane.id,
            title: pane.title,
            output,
        });
    }

    let report = TailReport {
        session: session.to_string(),
        panes: pane_tails,
    };

    if robot {
        return robot::emit_ok(&report);
    }

    for pane in &report.panes {
        println!("=== {} ({}) ===", pane.pane_id, pane.title);
        println!("{}", pane.output);
    }
    Ok(())
}
