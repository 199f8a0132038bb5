//! Cooperative, single-threaded dashboard scheduler.
//!
//! The scheduler itself never blocks: each tick reconciles the pane list,
//! drains whatever capture results have landed on its channel since the
//! last tick, plans the next batch of captures, and dispatches that batch
//! to background threads bounded by `max_concurrent`. Classifier state for
//! a pane lives behind an `Arc<Mutex<_>>` so it can move into a capture
//! thread and back without the scheduler itself blocking on it.

pub mod plan;
pub mod reconcile;
pub mod tui;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Instant;

use anyhow::Result;

use crate::activity::{Activity, Classifier};
use crate::multiplexer::{AgentType, Multiplexer, Pane};

/// Cached classification for one pane plus scheduler bookkeeping.
#[derive(Clone)]
pub struct PaneStatus {
    pub activity: Option<Activity>,
    pub loading: bool,
    pub last_refreshed: Option<Instant>,
}

impl Default for PaneStatus {
    fn default() -> Self {
        Self {
            activity: None,
            loading: false,
            last_refreshed: None,
        }
    }
}

pub struct Scheduler {
    mux: Arc<dyn Multiplexer>,
    session: String,
    panes: Vec<Pane>,
    selected_pane_id: Option<String>,
    zoomed: bool,
    classifiers: HashMap<String, Arc<Mutex<Classifier>>>,
    statuses: HashMap<String, PaneStatus>,
    cursor: usize,
    max_per_tick: usize,
    max_concurrent: usize,
    in_flight: Arc<AtomicUsize>,
    priority: HashSet<String>,
    result_tx: mpsc::Sender<(String, Activity)>,
    result_rx: mpsc::Receiver<(String, Activity)>,
}

impl Scheduler {
    pub fn new(mux: Arc<dyn Multiplexer>, session: impl Into<String>) -> Self {
        let (result_tx, result_rx) = mpsc::channel();
        Self {
            mux,
            session: session.into(),
            panes: Vec::new(),
            selected_pane_id: None,
            zoomed: false,
            classifiers: HashMap::new(),
            statuses: HashMap::new(),
            cursor: 0,
            max_per_tick: 4,
            max_concurrent: 4,
            in_flight: Arc::new(AtomicUsize::new(0)),
            priority: HashSet::new(),
            result_tx,
            result_rx,
        }
    }

    pub fn with_budgets(mut self, max_per_tick: usize, max_concurrent: usize) -> Self {
        self.max_per_tick = max_per_tick.max(1);
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn panes(&self) -> &[Pane] {
        &self.panes
    }

    pub fn selected_pane_id(&self) -> Option<&str> {
        self.selected_pane_id.as_deref()
    }

    pub fn select(&mut self, pane_id: impl Into<String>) {
        self.selected_pane_id = Some(pane_id.into());
    }

    pub fn clear_selection(&mut self) {
        self.selected_pane_id = None;
    }

    pub fn toggle_zoom(&mut self) {
        if self.selected_pane_id.is_some() {
            self.zoomed = !self.zoomed;
        }
    }

    pub fn is_zoomed(&self) -> bool {
        self.zoomed
    }

    pub fn status_of(&self, pane_id: &str) -> Option<&PaneStatus> {
        self.statuses.get(pane_id)
    }

    pub fn statuses(&self) -> &HashMap<String, PaneStatus> {
        &self.statuses
    }

    /// Force `pane_id` to the front of the next plan, bypassing the normal
    /// round-robin order. Used after a send or interrupt so the pane that
    /// was just acted on refreshes immediately rather than waiting its turn.
    pub fn prioritize(&mut self, pane_id: impl Into<String>) {
        self.priority.insert(pane_id.into());
    }

    /// Run one scheduler tick: reconcile panes, drain finished captures,
    /// dispatch the next planned batch. Never blocks.
    pub fn tick(&mut self) -> Result<()> {
        let fresh = self.mux.get_panes(&self.session)?;
        let reconciled = reconcile::reconcile(&self.panes, fresh);
        for vanished in &reconciled.vanished {
            self.classifiers.remove(vanished);
            self.statuses.remove(vanished);
        }
        self.selected_pane_id = reconcile::resolve_selection(self.selected_pane_id.take(), &reconciled);
        self.panes = reconciled.panes;

        let mut new_activity: HashSet<String> = reconciled.appeared;
        new_activity.extend(self.priority.drain());

        while let Ok((pane_id, activity)) = self.result_rx.try_recv() {
            let status = self.statuses.entry(pane_id).or_default();
            status.activity = Some(activity);
            status.loading = false;
            status.last_refreshed = Some(Instant::now());
        }

        let planned = plan::plan_pane_captures(
            &self.panes,
            self.selected_pane_id.as_deref(),
            &new_activity,
            &mut self.cursor,
            self.max_per_tick,
        );

        for pane_id in planned {
            if self.statuses.get(&pane_id).map(|s| s.loading).unwrap_or(false) {
                continue;
            }
            if self.in_flight.load(Ordering::SeqCst) >= self.max_concurrent {
                break;
            }
            self.dispatch_capture(pane_id);
        }

        Ok(())
    }

    fn dispatch_capture(&mut self, pane_id: String) {
        let agent_type = self
            .panes
            .iter()
            .find(|p| p.id == pane_id)
            .map(|p| p.agent_type)
            .unwrap_or(AgentType::Unknown);

        let classifier = self
            .classifiers
            .entry(pane_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Classifier::new(pane_id.clone(), agent_type))))
            .clone();

        self.statuses.entry(pane_id.clone()).or_default().loading = true;
        self.in_flight.fetch_add(1, Ordering::SeqCst);

        let mux = self.mux.clone();
        let tx = self.result_tx.clone();
        let in_flight = self.in_flight.clone();
        let pane_id_for_thread = pane_id.clone();

        thread::spawn(move || {
            let activity = {
                let mut classifier = classifier.lock().unwrap();
                classifier.classify(mux.as_ref())
            };
            let _ = tx.send((pane_id_for_thread, activity));
            in_flight.fetch_sub(1, Ordering::SeqCst);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multiplexer::mock::MockMultiplexer;
    use std::path::Path;
    use std::time::Duration;

    fn pane(id: &str, index: u32) -> Pane {
        Pane {
            id: id.to_string(),
            index,
            title: String::new(),
            agent_type: AgentType::Claude,
            variant: None,
            active: false,
            width: 80,
            height: 24,
        }
    }

    #[test]
    fn tick_dispatches_and_eventually_populates_status() {
        let mux = Arc::new(MockMultiplexer::new());
        mux.create_session("demo", Path::new("/tmp")).unwrap();
        mux.set_panes("demo", vec![pane("%1", 0), pane("%2", 1)]);
        mux.set_capture("%1", "claude> ");
        mux.set_capture("%2", "claude> ");

        let mut scheduler = Scheduler::new(mux, "demo").with_budgets(2, 2);
        scheduler.tick().unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            scheduler.tick().unwrap();
            if scheduler.status_of("%1").and_then(|s| s.activity.as_ref()).is_some()
                && scheduler.status_of("%2").and_then(|s| s.activity.as_ref()).is_some()
            {
                break;
            }
            assert!(Instant::now() < deadline, "captures never completed");
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn selection_cleared_when_pane_removed() {
        let mux = Arc::new(MockMultiplexer::new());
        mux.create_session("demo", Path::new("/tmp")).unwrap();
        mux.set_panes("demo", vec![pane("%1", 0)]);
        let mut scheduler = Scheduler::new(mux.clone(), "demo");
        scheduler.tick().unwrap();
        scheduler.select("%1");

        mux.set_panes("demo", vec![]);
        scheduler.tick().unwrap();
        assert_eq!(scheduler.selected_pane_id(), None);
    }

    #[test]
    fn zoom_requires_selection() {
        let mux = Arc::new(MockMultiplexer::new());
        let mut scheduler = Scheduler::new(mux, "demo");
        scheduler.toggle_zoom();
        assert!(!scheduler.is_zoomed());
        scheduler.select("%1");
        scheduler.toggle_zoom();
        assert!(scheduler.is_zoomed());
    }
}
