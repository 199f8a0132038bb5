//! Interrupt coordinator: fans a Ctrl-C out to a set of panes, waits for
//! each to settle back into `WAITING`, and optionally sends a follow-up
//! message once it has.

use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime};

use anyhow::Result;
use serde::Serialize;

use crate::activity::{Classifier, State, patterns};
use crate::multiplexer::Multiplexer;
use crate::send::{Selector, resolve_targets};

#[derive(Debug, Clone)]
pub struct InterruptRequest {
    pub target: Selector,
    /// Include panes already `WAITING`/idle when resolving targets, instead
    /// of the default of dropping them as already-settled.
    pub force: bool,
    /// Skip the post-interrupt poll; every interrupted pane is treated as
    /// ready for input immediately.
    pub no_wait: bool,
    /// Resolve targets and capture their previous state, but never call
    /// `send_interrupt`/`send_keys`.
    pub dry_run: bool,
    pub follow_up: Option<String>,
    pub settle: Duration,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for InterruptRequest {
    fn default() -> Self {
        Self {
            target: Selector::default(),
            force: false,
            no_wait: false,
            dry_run: false,
            follow_up: None,
            settle: Duration::from_millis(200),
            poll_interval: Duration::from_millis(300),
            timeout: Duration::from_secs(10),
        }
    }
}

/// A target's state and tail output captured just before the interrupt is
/// sent, so a caller can tell what it interrupted out of.
#[derive(Debug, Clone, Serialize)]
pub struct PreviousState {
    pub state: State,
    pub tail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaneFailure {
    pub pane_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterruptOutcome {
    pub session: String,
    pub interrupted_at: SystemTime,
    pub completed_at: SystemTime,
    pub interrupted: Vec<String>,
    pub previous_states: HashMap<String, PreviousState>,
    pub method: &'static str,
    pub message_sent: bool,
    pub message: Option<String>,
    pub ready_for_input: Vec<String>,
    pub failed: Vec<PaneFailure>,
    pub timeout_ms: u64,
    pub timed_out: bool,
    pub dry_run: bool,
}

/// Last `limit` chars of `text`, on a char boundary.
fn tail_chars(text: &str, limit: usize) -> String {
    let count = text.chars().count();
    if count <= limit {
        text.to_string()
    } else {
        text.chars().skip(count - limit).collect()
    }
}

pub fn interrupt(mux: &dyn Multiplexer, request: &InterruptRequest) -> Result<InterruptOutcome> {
    let interrupted_at = SystemTime::now();
    let mut targets = resolve_targets(mux, &request.target)?;

    // Step 1: unless the caller named panes or passed `All`, drop panes
    // already settled — unless `Force` asks for them anyway.
    if !request.force && !request.target.all && request.target.panes.is_empty() {
        targets.retain(|pane| {
            Classifier::new(pane.id.clone(), pane.agent_type).classify(mux).state != State::Waiting
        });
    }

    // Step 2: snapshot prior state and tail output before sending anything.
    let mut previous_states = HashMap::with_capacity(targets.len());
    for pane in &targets {
        let state = Classifier::new(pane.id.clone(), pane.agent_type).classify(mux).state;
        let raw = mux
            .capture_pane_output(&pane.id, crate::activity::CAPTURE_LINES)
            .unwrap_or_default();
        let tail = tail_chars(&patterns::normalize(&raw), 200);
        previous_states.insert(pane.id.clone(), PreviousState { state, tail });
    }

    // Step 3: send the interrupt, unless this is a dry run.
    let mut interrupted = Vec::with_capacity(targets.len());
    let mut failed = Vec::new();
    for pane in &targets {
        if request.dry_run {
            interrupted.push(pane.id.clone());
            continue;
        }
        match mux.send_interrupt(&pane.id) {
            Ok(()) => interrupted.push(pane.id.clone()),
            Err(e) => failed.push(PaneFailure {
                pane_id: pane.id.clone(),
                error: e.to_string(),
            }),
        }
    }

    // Step 4: settle.
    if !request.dry_run && !interrupted.is_empty() {
        std::thread::sleep(request.settle);
    }

    // Step 5: poll for readiness, unless `NoWait` or `DryRun` skip it.
    let mut ready_for_input = Vec::new();
    let mut timed_out = false;

    if request.dry_run {
        // Nothing was sent, so nothing has settled.
    } else if request.no_wait {
        ready_for_input = interrupted.clone();
    } else {
        let deadline = Instant::now() + request.timeout;
        let mut pending = interrupted.clone();
        loop {
            pending.retain(|pane_id| {
                let Some(pane) = targets.iter().find(|p| &p.id == pane_id) else {
                    return false;
                };
                let state = Classifier::new(pane.id.clone(), pane.agent_type).classify(mux).state;
                if state == State::Waiting {
                    ready_for_input.push(pane_id.clone());
                    false
                } else {
                    true
                }
            });
            if pending.is_empty() {
                break;
            }
            if Instant::now() >= deadline {
                timed_out = true;
                ready_for_input.extend(pending.drain(..));
                break;
            }
            std::thread::sleep(request.poll_interval);
        }
    }

    // Step 6: follow-up, sent to every pane moved to `ReadyForInput` —
    // including those that only got there via a timeout.
    let mut message_sent = false;
    if !request.dry_run
        && let Some(text) = &request.follow_up
        && !ready_for_input.is_empty()
    {
        std::thread::sleep(Duration::from_millis(100));
        for pane_id in &ready_for_input {
            match mux.send_keys(pane_id, text, true) {
                Ok(()) => message_sent = true,
                Err(e) => failed.push(PaneFailure {
                    pane_id: pane_id.clone(),
                    error: e.to_string(),
                }),
            }
        }
    }

    let method = if request.follow_up.is_some() {
        "ctrl_c_then_send"
    } else {
        "ctrl_c"
    };

    Ok(InterruptOutcome {
        session: request.target.session.clone(),
        interrupted_at,
        completed_at: SystemTime::now(),
        interrupted,
        previous_states,
        method,
        message_sent,
        message: request.follow_up.clone(),
        ready_for_input,
        failed,
        timeout_ms: request.timeout.as_millis() as u64,
        timed_out,
        dry_run: request.dry_run,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multiplexer::{AgentType, Pane, mock::MockMultiplexer};
    use std::path::Path;

    fn pane(id: &str, agent_type: AgentType) -> Pane {
        Pane {
            id: id.to_string(),
            index: 0,
            title: String::new(),
            agent_type,
            variant: None,
            active: false,
            width: 80,
            height: 24,
        }
    }

    #[test]
    fn settles_and_sends_follow_up() {
        let mux = MockMultiplexer::new();
        mux.create_session("demo", Path::new("/tmp")).unwrap();
        mux.set_panes("demo", vec![pane("%1", AgentType::Claude)]);
        mux.set_capture("%1", "claude> ");

        let request = InterruptRequest {
            target: Selector {
                session: "demo".to_string(),
                panes: vec!["%1".to_string()],
                ..Default::default()
            },
            follow_up: Some("continue".to_string()),
            settle: Duration::from_millis(1),
            poll_interval: Duration::from_millis(1),
            timeout: Duration::from_millis(200),
            ..Default::default()
        };

        let outcome = interrupt(&mux, &request).unwrap();
        assert_eq!(outcome.interrupted, vec!["%1".to_string()]);
        assert_eq!(outcome.ready_for_input, vec!["%1".to_string()]);
        assert!(!outcome.timed_out);
        assert!(outcome.message_sent);
        assert_eq!(outcome.method, "ctrl_c_then_send");
        assert!(mux.interrupted().contains(&"%1".to_string()));
    }

    #[test]
    fn timed_out_pane_still_receives_follow_up() {
        let mux = MockMultiplexer::new();
        mux.create_session("demo", Path::new("/tmp")).unwrap();
        mux.set_panes("demo", vec![pane("%1", AgentType::Claude)]);
        mux.set_capture("%1", "streaming output with no prompt");

        let request = InterruptRequest {
            target: Selector {
                session: "demo".to_string(),
                panes: vec!["%1".to_string()],
                ..Default::default()
            },
            follow_up: Some("continue".to_string()),
            settle: Duration::from_millis(1),
            poll_interval: Duration::from_millis(1),
            timeout: Duration::from_millis(20),
            ..Default::default()
        };

        let outcome = interrupt(&mux, &request).unwrap();
        assert!(outcome.timed_out);
        assert_eq!(outcome.ready_for_input, vec!["%1".to_string()]);
        assert!(outcome.message_sent);
    }

    #[test]
    fn default_resolution_drops_already_waiting_panes() {
        let mux = MockMultiplexer::new();
        mux.create_session("demo", Path::new("/tmp")).unwrap();
        mux.set_panes("demo", vec![pane("%1", AgentType::Claude)]);
        mux.set_capture("%1", "claude> ");

        let request = InterruptRequest {
            target: Selector {
                session: "demo".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        let outcome = interrupt(&mux, &request).unwrap();
        assert!(outcome.interrupted.is_empty());
        assert!(!mux.interrupted().contains(&"%1".to_string()));
    }

    #[test]
    fn force_includes_already_waiting_panes() {
        let mux = MockMultiplexer::new();
        mux.create_session("demo", Path::new("/tmp")).unwrap();
        mux.set_panes("demo", vec![pane("%1", AgentType::Claude)]);
        mux.set_capture("%1", "claude> ");

        let request = InterruptRequest {
            target: Selector {
                session: "demo".to_string(),
                ..Default::default()
            },
            force: true,
            settle: Duration::from_millis(1),
            poll_interval: Duration::from_millis(1),
            timeout: Duration::from_millis(50),
            ..Default::default()
        };

        let outcome = interrupt(&mux, &request).unwrap();
        assert_eq!(outcome.interrupted, vec!["%1".to_string()]);
        assert!(mux.interrupted().contains(&"%1".to_string()));
    }

    #[test]
    fn no_wait_skips_poll_and_reports_ready_immediately() {
        let mux = MockMultiplexer::new();
        mux.create_session("demo", Path::new("/tmp")).unwrap();
        mux.set_panes("demo", vec![pane("%1", AgentType::Claude)]);
        mux.set_capture("%1", "streaming output with no prompt");

        let request = InterruptRequest {
            target: Selector {
                session: "demo".to_string(),
                panes: vec!["%1".to_string()],
                ..Default::default()
            },
            no_wait: true,
            settle: Duration::from_millis(1),
            timeout: Duration::from_secs(30),
            ..Default::default()
        };

        let outcome = interrupt(&mux, &request).unwrap();
        assert_eq!(outcome.ready_for_input, vec!["%1".to_string()]);
        assert!(!outcome.timed_out);
    }

    #[test]
    fn dry_run_resolves_targets_without_sending() {
        let mux = MockMultiplexer::new();
        mux.create_session("demo", Path::new("/tmp")).unwrap();
        mux.set_panes("demo", vec![pane("%1", AgentType::Claude)]);
        mux.set_capture("%1", "streaming output with no prompt");

        let request = InterruptRequest {
            target: Selector {
                session: "demo".to_string(),
                panes: vec!["%1".to_string()],
                ..Default::default()
            },
            dry_run: true,
            follow_up: Some("continue".to_string()),
            ..Default::default()
        };

        let outcome = interrupt(&mux, &request).unwrap();
        assert_eq!(outcome.interrupted, vec!["%1".to_string()]);
        assert!(outcome.ready_for_input.is_empty());
        assert!(!outcome.message_sent);
        assert!(mux.interrupted().is_empty());
        assert!(mux.sent().is_empty());
    }
}
