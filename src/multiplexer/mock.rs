//! In-memory `Multiplexer` backend used by tests for the scheduler, send
//! engine, interrupt coordinator and snapshot builder — none of which should
//! need a live tmux server to exercise their logic.

use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::Multiplexer;
use super::types::Pane;

#[derive(Debug, Default)]
struct SessionData {
    panes: Vec<Pane>,
    captures: HashMap<String, String>,
    sent: Vec<(String, String, bool)>,
    interrupted: Vec<String>,
}

/// Scripted, in-memory multiplexer. Tests populate sessions/panes/captures
/// up front via [`MockMultiplexer::set_panes`] / [`MockMultiplexer::set_capture`]
/// and then assert against `sent()` / `interrupted()`.
#[derive(Debug, Default)]
pub struct MockMultiplexer {
    sessions: Mutex<HashMap<String, SessionData>>,
}

impl MockMultiplexer {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_panes(&self, session: &str, panes: Vec<Pane>) {
        self.sessions
            .lock()
            .unwrap()
            .entry(session.to_string())
            .or_default()
            .panes = panes;
    }

    pub fn set_capture(&self, pane_id: &str, content: &str) {
        let mut sessions = self.sessions.lock().unwrap();
        for data in sessions.values_mut() {
            if data.panes.iter().any(|p| p.id == pane_id) {
                data.captures.insert(pane_id.to_string(), content.to_string());
                return;
            }
        }
        // Pane not yet assigned to a session; stash under a sentinel key so
        // capture_pane_output can still find it regardless of session.
        sessions
            .entry(String::new())
            .or_default()
            .captures
            .insert(pane_id.to_string(), content.to_string());
    }

    pub fn sent(&self) -> Vec<(String, String, bool)> {
        self.sessions
            .lock()
            .unwrap()
            .values()
            .flat_map(|d| d.sent.clone())
            .collect()
    }

    pub fn interrupted(&self) -> Vec<String> {
        self.sessions
            .lock()
            .unwrap()
            .values()
            .flat_map(|d| d.interrupted.clone())
            .collect()
    }
}

impl Multiplexer for MockMultiplexer {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn list_sessions(&self) -> Result<Vec<String>> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .keys()
            .filter(|k| !k.is_empty())
            .cloned()
            .collect())
    }

    fn get_panes(&self, session: &str) -> Result<Vec<Pane>> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .get(session)
            .map(|d| d.panes.clone())
            .unwrap_or_default())
    }

    fn capture_pane_output(&self, pane_id: &str, _lines: u16) -> Result<String> {
        let sessions = self.sessions.lock().unwrap();
        for data in sessions.values() {
            if let Some(content) = data.captures.get(pane_id) {
                return Ok(content.clone());
            }
        }
        Ok(String::new())
    }

    fn send_keys(&self, pane_id: &str, text: &str, submit: bool) -> Result<()> {
        let mut sessions = self.sessions.lock().unwrap();
        for data in sessions.values_mut() {
            if data.panes.iter().any(|p| p.id == pane_id) {
                data.sent.push((pane_id.to_string(), text.to_string(), submit));
                return Ok(());
            }
        }
        Err(anyhow!("pane not found: {pane_id}"))
    }

    fn send_interrupt(&self, pane_id: &str) -> Result<()> {
        let mut sessions = self.sessions.lock().unwrap();
        for data in sessions.values_mut() {
            if data.panes.iter().any(|p| p.id == pane_id) {
                data.interrupted.push(pane_id.to_string());
                return Ok(());
            }
        }
        Err(anyhow!("pane not found: {pane_id}"))
    }

    fn create_session(&self, name: &str, _cwd: &Path) -> Result<String> {
        self.sessions.lock().unwrap().entry(name.to_string()).or_default();
        Ok("%0".to_string())
    }

    fn kill_session(&self, name: &str) -> Result<()> {
        self.sessions.lock().unwrap().remove(name);
        Ok(())
    }

    fn split_window(&self, _pane_id: &str, _vertical: bool) -> Result<String> {
        Ok(format!("%{}", getrandom_u16()))
    }

    fn set_pane_title(&self, pane_id: &str, title: &str) -> Result<()> {
        let mut sessions = self.sessions.lock().unwrap();
        for data in sessions.values_mut() {
            if let Some(pane) = data.panes.iter_mut().find(|p| p.id == pane_id) {
                pane.title = title.to_string();
                return Ok(());
            }
        }
        Err(anyhow!("pane not found: {pane_id}"))
    }

    fn get_client_active_pane_path(&self) -> Result<PathBuf> {
        Ok(PathBuf::from("/tmp"))
    }
}

fn getrandom_u16() -> u16 {
    let mut buf = [0u8; 2];
    let _ = getrandom::fill(&mut buf);
    u16::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multiplexer::types::AgentType;

    fn pane(id: &str, index: u32) -> Pane {
        Pane {
            id: id.to_string(),
            index,
            title: String::new(),
            agent_type: AgentType::Unknown,
            variant: None,
            active: false,
            width: 80,
            height: 24,
        }
    }

    #[test]
    fn records_sent_and_interrupted() {
        let mux = MockMultiplexer::new();
        mux.create_session("demo", Path::new("/tmp")).unwrap();
        mux.set_panes("demo", vec![pane("%1", 0)]);

        mux.send_keys("%1", "hello", true).unwrap();
        mux.send_interrupt("%1").unwrap();

        assert_eq!(mux.sent(), vec![("%1".to_string(), "hello".to_string(), true)]);
        assert_eq!(mux.interrupted(), vec!["%1".to_string()]);
    }

    #[test]
    fn send_to_unknown_pane_errors() {
        let mux = MockMultiplexer::new();
        assert!(mux.send_keys("%99", "hi", true).is_err());
    }
}
