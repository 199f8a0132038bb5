//! `interrupt` subcommand: fans a Ctrl-C out to the resolved panes, waits
//! for each to settle, and optionally follows up with a message.

use std::time::Duration;

use anyhow::Result;
use serde::Serialize;

use crate::interrupt::{self, InterruptRequest};
use crate::robot;
use crate::send::Selector;

use super::{default_backend, session_exists, session_not_found};

#[derive(Debug, Serialize)]
struct InterruptReport {
    session: String,
    interrupted: Vec<String>,
    method: &'static str,
    message_sent: bool,
    ready_for_input: Vec<String>,
    failed: Vec<interrupt::PaneFailure>,
    timed_out: bool,
    dry_run: bool,
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    session: &str,
    message: Option<&str>,
    panes: &[String],
    all: bool,
    force: bool,
    no_wait: bool,
    dry_run: bool,
    timeout_ms: u64,
    robot: bool,
) -> Result<()> {
    let mux = default_backend();
    if !session_exists(mux.as_ref(), session)? && session_not_found(session, robot)? {
        return Ok(());
    }

    let selector = Selector {
        session: session.to_string(),
        panes: panes.to_vec(),
        all,
        ..Default::default()
    };

    let request = InterruptRequest {
        target: selector,
        force,
        no_wait,
        dry_run,
        follow_up: message.map(str::to_string),
        timeout: Duration::from_millis(timeout_ms),
        ..Default::default()
    };

    let outcome = interrupt::interrupt(mux.as_ref(), &request)?;
    let report = InterruptReport {
        session: outcome.session,
        interrupted: outcome.interrupted,
        method: outcome.method,
        message_sent: outcome.message_sent,
        ready_for_input: outcome.ready_for_input,
        failed: outcome.failed,
        timed_out: outcome.timed_out,
        dry_run: outcome.dry_run,
    };

    if robot {
        return robot::emit_ok(&report);
    }

    if report.dry_run {
        println!("dry run: would interrupt {}", report.interrupted.join(", "));
        return Ok(());
    }

    for pane_id in &report.interrupted {
        let ready = report.ready_for_input.contains(pane_id);
        let settle_note = if ready { "ready for input" } else { "did not settle before timeout" };
        println!("{pane_id} {settle_note}");
    }
    for failure in &report.failed {
        println!("{} failed: {}", failure.pane_id, failure.error);
    }
    if report.message_sent {
        println!("follow-up sent to {}", report.ready_for_input.join(", "));
    }
    if report.timed_out {
        println!("warning: one or more panes timed out waiting to settle");
    }
    Ok(())
}
