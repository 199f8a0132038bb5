//! Subcommand implementations. Each module owns one CLI verb and is a thin
//! layer over the library modules in `crate::{activity,send,interrupt,
//! snapshot,...}` — argument plumbing and output formatting only.

pub mod activity;
pub mod dashboard;
pub mod interrupt;
pub mod plan;
pub mod send;
pub mod snapshot;
pub mod status;
pub mod tail;

use std::sync::Arc;

use crate::multiplexer::{self, Multiplexer};

/// Resolve the multiplexer backend for the current environment.
pub fn default_backend() -> Arc<dyn Multiplexer> {
    multiplexer::create_backend(multiplexer::detect_backend())
}

/// Emit (or propagate, for non-robot callers) a `session not found` error.
/// Returns `Ok(true)` when the error was already emitted as robot output and
/// the caller should return `Ok(())` immediately.
pub fn session_not_found(session: &str, robot: bool) -> anyhow::Result<bool> {
    let err = crate::errors::NzmError::SessionNotFound(session.to_string());
    if robot {
        crate::robot::emit_err(&err)?;
        Ok(true)
    } else {
        Err(anyhow::anyhow!(err))
    }
}

pub fn session_exists(mux: &dyn Multiplexer, session: &str) -> anyhow::Result<bool> {
    Ok(mux.list_sessions()?.iter().any(|s| s == session))
}
