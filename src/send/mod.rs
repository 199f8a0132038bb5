//! Multi-pane send engine: resolves a target selector to a concrete pane
//! list following the ordered rules of §4.3, validates the message (reject
//! rather than mangle), sends it to each target with an optional stagger
//! delay between panes, and reports a structured per-pane result.

use std::thread;
use std::time::Duration;

use anyhow::Result;

use crate::errors::NzmError;
use crate::multiplexer::{AgentType, Multiplexer, Pane, detect_agent_type_from_title};

/// Target resolution input, following the ordered rules of spec §4.3:
/// exclude, then explicit panes, then agent types, then the `all` default.
#[derive(Debug, Clone, Default)]
pub struct Selector {
    pub session: String,
    /// Explicit pane IDs or indices (as decimal strings). Takes precedence
    /// over `agent_types` and `all` once populated.
    pub panes: Vec<String>,
    /// Agent types to keep. Only consulted when `panes` is empty.
    pub agent_types: Vec<AgentType>,
    /// Pane IDs or indices to drop before any other rule is applied.
    pub exclude: Vec<String>,
    /// When true, keep every eligible pane (still excluding `Type=user`).
    /// When false and no other filter narrowed the set, additionally drop
    /// `Index=0` panes whose detected type is `unknown`.
    pub all: bool,
}

impl Selector {
    pub fn session(session: impl Into<String>) -> Self {
        Self {
            session: session.into(),
            all: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct SendRequest {
    pub text: String,
    pub target: Selector,
    pub stagger: Duration,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct SendResult {
    pub pane_id: String,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub preview: String,
    pub dry_run: bool,
    pub results: Vec<SendResult>,
}

/// Reject payloads a pane should never receive, rather than silently
/// stripping them: embedded interrupt sequences, NUL bytes, and
/// whitespace-only text with zero visible length.
fn validate_message(text: &str) -> Result<(), NzmError> {
    if text.trim().is_empty() {
        return Err(NzmError::Validation(
            "message is empty or whitespace-only".to_string(),
        ));
    }
    for c in text.chars() {
        if c == '\0' {
            return Err(NzmError::Validation("message contains a NUL byte".to_string()));
        }
        if c == '\u{3}' || c == '\u{1a}' {
            return Err(NzmError::Validation(
                "message contains an embedded interrupt sequence".to_string(),
            ));
        }
        if c.is_control() && c != '\n' && c != '\t' {
            return Err(NzmError::Validation(format!(
                "message contains a disallowed control character: {:#04x}",
                c as u32
            )));
        }
    }
    Ok(())
}

/// First 47 runes of `text`, with a trailing `…` if anything was cut.
pub fn message_preview(text: &str) -> String {
    const PREVIEW_RUNES: usize = 47;
    let mut chars = text.chars();
    let truncated: String = chars.by_ref().take(PREVIEW_RUNES).collect();
    if chars.next().is_some() {
        format!("{truncated}…")
    } else {
        truncated
    }
}

fn matches_selector(pane: &Pane, needle: &str) -> bool {
    pane.id == needle || pane.index.to_string() == needle
}

/// Resolve a [`Selector`] against the multiplexer's live pane list, in
/// pane-index order, implementing spec §4.3 steps 2-7: fetch, exclude,
/// explicit panes, agent-type filter, and the `all`-flag default.
pub fn resolve_targets(mux: &dyn Multiplexer, selector: &Selector) -> Result<Vec<Pane>> {
    let mut panes = mux.get_panes(&selector.session)?;
    panes.sort_by_key(|p| p.index);

    if !selector.exclude.is_empty() {
        panes.retain(|p| !selector.exclude.iter().any(|needle| matches_selector(p, needle)));
    }

    if !selector.panes.is_empty() {
        panes.retain(|p| selector.panes.iter().any(|needle| matches_selector(p, needle)));
        return Ok(panes);
    }

    if !selector.agent_types.is_empty() {
        panes.retain(|p| {
            let effective_type = match p.agent_type {
                AgentType::User | AgentType::Unknown => detect_agent_type_from_title(&p.title),
                other => other,
            };
            selector.agent_types.contains(&effective_type)
        });
        return Ok(panes);
    }

    if selector.all {
        panes.retain(|p| p.agent_type != AgentType::User);
    } else {
        panes.retain(|p| !(p.index == 0 && p.agent_type == AgentType::Unknown));
        panes.retain(|p| p.agent_type != AgentType::User);
    }

    Ok(panes)
}

/// Send `request.text` to every pane resolved from `request.target`, in
/// order, sleeping `request.stagger` between sends after the first. In
/// dry-run mode no keys are actually sent; every target is reported as a
/// success so callers can preview the fan-out.
pub fn send(mux: &dyn Multiplexer, request: &SendRequest) -> Result<SendOutcome> {
    let targets = resolve_targets(mux, &request.target)?;
    let preview = message_preview(&request.text);

    if let Err(e) = validate_message(&request.text) {
        let results = targets
            .iter()
            .map(|pane| SendResult {
                pane_id: pane.id.clone(),
                success: false,
                error: Some(e.to_string()),
            })
            .collect();
        return Ok(SendOutcome {
            preview,
            dry_run: request.dry_run,
            results,
        });
    }

    let mut results = Vec::with_capacity(targets.len());
    for (i, pane) in targets.iter().enumerate() {
        if i > 0 && !request.stagger.is_zero() {
            thread::sleep(request.stagger);
        }
        if request.dry_run {
            results.push(SendResult {
                pane_id: pane.id.clone(),
                success: true,
                error: None,
            });
            continue;
        }
        match mux.send_keys(&pane.id, &request.text, true) {
            Ok(()) => results.push(SendResult {
                pane_id: pane.id.clone(),
                success: true,
                error: None,
            }),
            Err(e) => results.push(SendResult {
                pane_id: pane.id.clone(),
                success: false,
                error: Some(e.to_string()),
            }),
        }
    }

    Ok(SendOutcome {
        preview,
        dry_run: request.dry_run,
        results,
    })
}
