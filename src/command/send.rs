//! `send` subcommand: fans a message out to the panes resolved by the
//! multi-pane send engine.

use std::time::Duration;

use anyhow::Result;
use serde::Serialize;

use crate::multiplexer::AgentType;
use crate::robot;
use crate::send::{self, Selector, SendRequest};

use super::{default_backend, session_exists, session_not_found};

#[derive(Debug, Serialize)]
struct SendReport {
    preview: String,
    dry_run: bool,
    sent: Vec<String>,
    failed: Vec<FailedSend>,
}

#[derive(Debug, Serialize)]
struct FailedSend {
    pane_id: String,
    error: String,
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    session: &str,
    message: &str,
    all: bool,
    panes: &[String],
    agent_types: &[AgentType],
    exclude: &[String],
    delay_ms: u64,
    dry_run: bool,
    robot: bool,
) -> Result<()> {
    let mux = default_backend();
    if !session_exists(mux.as_ref(), session)? && session_not_found(session, robot)? {
        return Ok(());
    }

    let selector = Selector {
        session: session.to_string(),
        panes: panes.to_vec(),
        agent_types: agent_types.to_vec(),
        exclude: exclude.to_vec(),
        all,
    };

    let request = SendRequest {
        text: message.to_string(),
        target: selector,
        stagger: Duration::from_millis(delay_ms),
        dry_run,
    };

    let outcome = send::send(mux.as_ref(), &request)?;

    let mut sent = Vec::new();
    let mut failed = Vec::new();
    for result in &outcome.results {
        if result.success {
            sent.push(result.pane_id.clone());
        } else {
            failed.push(FailedSend {
                pane_id: result.pane_id.clone(),
                error: result.error.clone().unwrap_or_default(),
            });
        }
    }

    let report = SendReport {
        preview: outcome.preview.clone(),
        dry_run: outcome.dry_run,
        sent,
        failed,
    };

    if robot {
        return robot::emit_ok(&report);
    }

    if report.dry_run {
        println!("dry run: would send \"{}\" to {} pane(s)", report.preview, report.sent.len());
    } else {
        println!("sent \"{}\" to {} pane(s)", report.preview, report.sent.len());
    }
    for pane_id in &report.sent {
        println!("  ok     {pane_id}");
    }
    for failure in &report.failed {
        println!("  failed {} — {}", failure.pane_id, failure.error);
    }
    Ok(())
}
