//! Filesystem-backed session state: one JSON file per session under
//! `XDG_STATE_HOME`/`~/.local/state/nzm/sessions/`, guarded by an advisory
//! `flock(2)` (via `nix`) so a concurrent `nzm` invocation can't interleave
//! writes — falling back to a process-local `Mutex` on platforms without
//! `flock`, which is enough for this crate's low-concurrency CLI use.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::errors::NzmError;
use crate::history::{self, HistoryEntry};

/// Bumped whenever the on-disk schema changes incompatibly.
pub const SESSION_STATE_VERSION: u32 = 1;

/// Persisted state for one tmux session's panes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub version: u32,
    pub session: String,
    pub selected_pane_id: Option<String>,
    /// Opaque, preserved verbatim across save/restore — the scheduler and
    /// CLI never interpret it, only the TUI layout code that wrote it does.
    #[serde(default)]
    pub layout: Option<String>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    pub updated_at: u64,
}

impl SessionState {
    pub fn new(session: impl Into<String>) -> Self {
        Self {
            version: SESSION_STATE_VERSION,
            session: session.into(),
            selected_pane_id: None,
            layout: None,
            history: Vec::new(),
            updated_at: now(),
        }
    }

    /// Record a history entry, evicting the oldest if over capacity, and
    /// bump `updated_at`.
    pub fn record(&mut self, pane_id: impl Into<String>, summary: impl Into<String>) {
        history::push_bounded(
            &mut self.history,
            HistoryEntry {
                timestamp: now(),
                pane_id: pane_id.into(),
                summary: summary.into(),
            },
        );
        self.updated_at = now();
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Process-local fallback for platforms without advisory file locking.
/// Keyed by the canonicalized-ish path string since `Path` isn't directly
/// usable as a lock key across processes anyway — this only helps within
/// this process (e.g. a background thread racing the main thread).
static PROCESS_LOCKS: Mutex<()> = Mutex::new(());

pub struct StateStore {
    base_dir: PathBuf,
}

impl StateStore {
    pub fn new() -> Result<Self> {
        let base_dir = state_dir().join("sessions");
        fs::create_dir_all(&base_dir)
            .with_context(|| format!("failed to create session state directory at {}", base_dir.display()))?;
        Ok(Self { base_dir })
    }

    fn path_for(&self, session: &str) -> PathBuf {
        self.base_dir.join(format!("{session}.json"))
    }

    /// Save session state, replacing whatever was there for this session.
    pub fn save(&self, state: &SessionState) -> Result<()> {
        let path = self.path_for(&state.session);
        let _guard = PROCESS_LOCKS.lock().unwrap();

        let file = OpenOptions::new().create(true).write(true).truncate(false).read(true).open(&path)?;
        let mut file = lock_exclusive(file)?;

        let body = serde_json::to_vec_pretty(state)?;
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&body)?;
        Ok(())
    }

    /// Load session state, validating the `version` field before trusting
    /// the rest of the document.
    pub fn load(&self, session: &str) -> Result<Option<SessionState>> {
        let path = self.path_for(session);
        if !path.exists() {
            return Ok(None);
        }
        let _guard = PROCESS_LOCKS.lock().unwrap();

        let file = File::open(&path)?;
        let mut file = lock_shared(file)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let raw: serde_json::Value = serde_json::from_str(&contents)
            .map_err(|e| anyhow!(NzmError::Internal(format!("corrupt session state at {}: {e}", path.display()))))?;
        let version = raw.get("version").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
        if version != SESSION_STATE_VERSION {
            return Err(anyhow!(NzmError::Validation(format!(
                "session state at {} has version {version}, expected {SESSION_STATE_VERSION}",
                path.display()
            ))));
        }

        let state: SessionState = serde_json::from_value(raw)?;
        Ok(Some(state))
    }

    pub fn list_sessions(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        if !self.base_dir.exists() {
            return Ok(names);
        }
        for entry in fs::read_dir(&self.base_dir)? {
            let entry = entry?;
            if let Some(stem) = entry.path().file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn delete(&self, session: &str) -> Result<()> {
        let path = self.path_for(session);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn lock_exclusive(file: File) -> Result<nix::fcntl::Flock<File>> {
    nix::fcntl::Flock::lock(file, nix::fcntl::FlockArg::LockExclusive)
        .map_err(|(_file, errno)| anyhow!("flock failed: {errno}"))
}

#[cfg(unix)]
fn lock_shared(file: File) -> Result<nix::fcntl::Flock<File>> {
    nix::fcntl::Flock::lock(file, nix::fcntl::FlockArg::LockShared)
        .map_err(|(_file, errno)| anyhow!("flock failed: {errno}"))
}

#[cfg(not(unix))]
fn lock_exclusive(file: File) -> Result<File> {
    Ok(file)
}

#[cfg(not(unix))]
fn lock_shared(file: File) -> Result<File> {
    Ok(file)
}

fn state_dir() -> PathBuf {
    if let Ok(state_home) = std::env::var("XDG_STATE_HOME")
        && !state_home.is_empty()
    {
        return PathBuf::from(state_home).join("nzm");
    }
    if let Some(home_dir) = home::home_dir() {
        return home_dir.join(".local").join("state").join("nzm");
    }
    Path::new(".").to_path_buf()
}
