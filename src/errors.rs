//! Shared error kinds used across components.
//!
//! Component-internal code returns `Result<T, NzmError>` (or `anyhow::Result<T>`
//! for straight-line CLI glue) so that callers which need to distinguish, say, a
//! timeout from a missing session can match on `NzmError` instead of parsing
//! strings out of an `anyhow::Error` chain.

use thiserror::Error;

/// Error kinds surfaced to robot output as `error_code`.
#[derive(Debug, Error)]
pub enum NzmError {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("pane not found: {0}")]
    PaneNotFound(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl NzmError {
    /// Stable machine-readable code for robot-output `error_code` fields.
    pub fn code(&self) -> &'static str {
        match self {
            NzmError::SessionNotFound(_) => "session_not_found",
            NzmError::PaneNotFound(_) => "pane_not_found",
            NzmError::Upstream(_) => "upstream_error",
            NzmError::Timeout(_) => "timed_out",
            NzmError::Validation(_) => "validation_error",
            NzmError::Internal(_) => "internal_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_stable_per_variant() {
        assert_eq!(
            NzmError::SessionNotFound("demo".into()).code(),
            "session_not_found"
        );
        assert_eq!(NzmError::PaneNotFound("%9".into()).code(), "pane_not_found");
        assert_eq!(
            NzmError::Timeout(std::time::Duration::from_secs(1)).code(),
            "timed_out"
        );
    }
}
