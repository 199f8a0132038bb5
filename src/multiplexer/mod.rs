//! Multiplexer abstraction layer for terminal multiplexer backends.
//!
//! The core is driver-agnostic: it talks to whichever terminal multiplexer is
//! running through this trait's capability set (`List`, `GetPanes`, `Capture`,
//! `Send`, `Interrupt`, `Create`, `Kill`, `Split`, `SetTitle`). Every method is
//! a blocking call that may fail; callers (the scheduler, send engine,
//! interrupt coordinator) are responsible for never invoking them from inside
//! the cooperative tick loop directly — see `dashboard::Scheduler`.

pub mod mock;
pub mod tmux;
pub mod types;

use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

pub use types::{AgentType, BackendType, Pane, ParsedTitle, detect_agent_type_from_title, parse_title};

/// Default deadline applied to multiplexer calls that don't specify one.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(5);

/// Main trait for terminal multiplexer backends.
///
/// Implementations must be `Send + Sync` to allow sharing via `Arc<dyn Multiplexer>`
/// across the scheduler's detached capture/send/interrupt tasks.
pub trait Multiplexer: Send + Sync {
    /// Name of this backend, e.g. "tmux".
    fn name(&self) -> &'static str;

    /// List all session names known to the multiplexer.
    fn list_sessions(&self) -> Result<Vec<String>>;

    /// Get all panes for a session, in multiplexer index order.
    fn get_panes(&self, session: &str) -> Result<Vec<Pane>>;

    /// Capture the last `lines` lines of a pane's output.
    fn capture_pane_output(&self, pane_id: &str, lines: u16) -> Result<String>;

    /// Send keys to a pane, optionally submitting (pressing Enter) afterward.
    fn send_keys(&self, pane_id: &str, text: &str, submit: bool) -> Result<()>;

    /// Send an interrupt (Ctrl-C equivalent) to a pane.
    fn send_interrupt(&self, pane_id: &str) -> Result<()>;

    /// Create a new session, returning the initial pane ID.
    fn create_session(&self, name: &str, cwd: &std::path::Path) -> Result<String>;

    /// Kill a session by name.
    fn kill_session(&self, name: &str) -> Result<()>;

    /// Split a window/pane, returning the new pane ID.
    fn split_window(&self, pane_id: &str, vertical: bool) -> Result<String>;

    /// Set a pane's title (used for the pane title grammar, §6).
    fn set_pane_title(&self, pane_id: &str, title: &str) -> Result<()>;

    /// Get the working directory of the active client pane, if known.
    fn get_client_active_pane_path(&self) -> Result<PathBuf>;
}

/// Construct a backend instance for the given [`BackendType`].
pub fn create_backend(backend: BackendType) -> std::sync::Arc<dyn Multiplexer> {
    match backend {
        BackendType::Tmux => std::sync::Arc::new(tmux::TmuxBackend::new()),
        BackendType::Mock => std::sync::Arc::new(mock::MockMultiplexer::new()),
    }
}

/// Detect which backend is active from the process environment, defaulting to tmux.
pub fn detect_backend() -> BackendType {
    if std::env::var_os("TMUX").is_some() {
        BackendType::Tmux
    } else {
        BackendType::Tmux
    }
}
