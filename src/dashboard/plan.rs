//! `planPaneCaptures`: decides which panes the scheduler refreshes on a
//! given tick, under a per-tick budget.
//!
//! Order, first-fit up to `max_per_tick`:
//! 1. the selected pane, if any and still present;
//! 2. panes with newly-observed activity (excluding user panes, unless
//!    selected), in index order;
//! 3. a round-robin sweep of the remaining panes (excluding user panes,
//!    unless selected) starting from the scheduler's cursor, wrapping once.
//!
//! The cursor only advances past whatever the round-robin sweep actually
//! picked; if rules 1-2 alone filled the budget, the cursor is left
//! untouched so the next tick's sweep resumes from the same place.

use std::collections::HashSet;

use crate::multiplexer::{AgentType, Pane};

pub fn plan_pane_captures(
    panes: &[Pane],
    selected_pane_id: Option<&str>,
    new_activity: &HashSet<String>,
    cursor: &mut usize,
    max_per_tick: usize,
) -> Vec<String> {
    if panes.is_empty() || max_per_tick == 0 {
        return Vec::new();
    }

    let mut planned = Vec::with_capacity(max_per_tick);
    let mut seen: HashSet<&str> = HashSet::new();

    let eligible = |pane: &Pane, id: &str| -> bool {
        pane.agent_type != AgentType::User || Some(id) == selected_pane_id
    };

    if let Some(sel) = selected_pane_id
        && let Some(pane) = panes.iter().find(|p| p.id == sel)
    {
        planned.push(pane.id.clone());
        seen.insert(pane.id.as_str());
    }

    for pane in panes {
        if planned.len() >= max_per_tick {
            break;
        }
        if seen.contains(pane.id.as_str()) {
            continue;
        }
        if new_activity.contains(&pane.id) && eligible(pane, &pane.id) {
            planned.push(pane.id.clone());
            seen.insert(pane.id.as_str());
        }
    }

    // Only rule 3 (round-robin) advances the cursor, and only to one past
    // whichever index it actually last picked — rules 1-2 filling the whole
    // budget must leave the cursor untouched (spec §4.2 rule 4 / §8 scenario 2).
    let mut last_round_robin_idx: Option<usize> = None;

    if planned.len() < max_per_tick {
        let n = panes.len();
        let start = *cursor % n;
        for offset in 0..n {
            if planned.len() >= max_per_tick {
                break;
            }
            let idx = (start + offset) % n;
            let pane = &panes[idx];
            if seen.contains(pane.id.as_str()) {
                continue;
            }
            if eligible(pane, &pane.id) {
                planned.push(pane.id.clone());
                seen.insert(pane.id.as_str());
                last_round_robin_idx = Some(idx);
            }
        }
    }

    if let Some(idx) = last_round_robin_idx {
        *cursor = (idx + 1) % panes.len();
    }
    planned
}
