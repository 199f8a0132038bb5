//! Reconciles a freshly-fetched pane list against the previous one, keeping
//! selection and per-pane classifier state anchored to pane ID rather than
//! list position (tmux reorders/renumbers panes across splits and closes).

use std::collections::HashSet;

use crate::multiplexer::Pane;

/// Outcome of reconciling the pane list for one tick.
pub struct Reconciled {
    pub panes: Vec<Pane>,
    /// Pane IDs present in `panes` that were not present before this tick.
    pub appeared: HashSet<String>,
    /// Pane IDs present before this tick that have since disappeared.
    pub vanished: HashSet<String>,
}

pub fn reconcile(previous: &[Pane], current: Vec<Pane>) -> Reconciled {
    let previous_ids: HashSet<&str> = previous.iter().map(|p| p.id.as_str()).collect();
    let current_ids: HashSet<&str> = current.iter().map(|p| p.id.as_str()).collect();

    let appeared = current_ids
        .iter()
        .filter(|id| !previous_ids.contains(*id))
        .map(|id| id.to_string())
        .collect();
    let vanished = previous_ids
        .iter()
        .filter(|id| !current_ids.contains(*id))
        .map(|id| id.to_string())
        .collect();

    Reconciled {
        panes: current,
        appeared,
        vanished,
    }
}

/// If the selected pane ID vanished this tick, clear the selection. Otherwise
/// selection is preserved automatically since it's tracked by ID, not index.
pub fn resolve_selection(selected: Option<String>, reconciled: &Reconciled) -> Option<String> {
    match selected {
        Some(id) if reconciled.vanished.contains(&id) => None,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multiplexer::AgentType;

    fn pane(id: &str) -> Pane {
        Pane {
            id: id.to_string(),
            index: 0,
            title: String::new(),
            agent_type: AgentType::Claude,
            variant: None,
            active: false,
            width: 80,
            height: 24,
        }
    }

    #[test]
    fn detects_appeared_and_vanished() {
        let previous = vec![pane("%1"), pane("%2")];
        let current = vec![pane("%2"), pane("%3")];
        let reconciled = reconcile(&previous, current);
        assert!(reconciled.appeared.contains("%3"));
        assert!(reconciled.vanished.contains("%1"));
        assert!(!reconciled.appeared.contains("%2"));
    }

    #[test]
    fn selection_cleared_only_when_pane_vanished() {
        let previous = vec![pane("%1"), pane("%2")];
        let current = vec![pane("%1")];
        let reconciled = reconcile(&previous, current);
        assert_eq!(resolve_selection(Some("%2".to_string()), &reconciled), None);
        assert_eq!(
            resolve_selection(Some("%1".to_string()), &reconciled),
            Some("%1".to_string())
        );
    }
}
