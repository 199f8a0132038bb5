//! Dependency-graph ("beads") client contract: the snapshot builder asks
//! this for a session's open/blocked work-item counts. Like
//! [`crate::snapshot::mail`], only a thin bounded HTTP client is needed —
//! the graph service itself is out of scope.

use std::time::Duration;

use serde::Deserialize;

use crate::errors::NzmError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Deserialize)]
pub struct DependencySummary {
    pub session: String,
    pub open: u32,
    pub blocked: u32,
    pub ready: u32,
}

pub trait BeadsClient: Send + Sync {
    fn dependency_summary(&self, session: &str) -> Result<DependencySummary, NzmError>;
}

/// Blocking `ureq`-backed client. Expects `GET {base_url}/sessions/{session}/summary`.
pub struct HttpBeadsClient {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpBeadsClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            base_url: base_url.into(),
            agent,
        }
    }
}

impl BeadsClient for HttpBeadsClient {
    fn dependency_summary(&self, session: &str) -> Result<DependencySummary, NzmError> {
        let url = format!("{}/sessions/{session}/summary", self.base_url.trim_end_matches('/'));
        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| NzmError::Upstream(format!("beads request failed: {e}")))?;
        response
            .into_json()
            .map_err(|e| NzmError::Upstream(format!("beads response was not valid JSON: {e}")))
    }
}
