//! Agent-mail client contract: a minimal HTTP-like surface the snapshot
//! builder queries for each agent's unread inbox count. The actual mail
//! service lives out-of-process; this crate only needs a thin, bounded
//! client — no async runtime, matching the rest of the crate.

use std::time::Duration;

use serde::Deserialize;

use crate::errors::NzmError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Deserialize)]
pub struct MailboxStatus {
    pub agent: String,
    pub unread: u32,
}

pub trait MailClient: Send + Sync {
    fn mailbox_status(&self, agent: &str) -> Result<MailboxStatus, NzmError>;
}

/// Blocking `ureq`-backed client. The agent-mail endpoint is expected to
/// expose `GET {base_url}/mailbox/{agent}` returning `MailboxStatus` JSON.
pub struct HttpMailClient {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpMailClient {
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

impl MailClient for HttpMailClient {
    fn mailbox_status(&self, agent_name: &str) -> Result<MailboxStatus, NzmError> {
        let url = format!("{}/mailbox/{agent_name}", self.base_url.trim_end_matches('/'));
        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| NzmError::Upstream(format!("agent-mail request failed: {e}")))?;
        response
            .into_json()
            .map_err(|e| NzmError::Upstream(format!("agent-mail response was not valid JSON: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeMailClient {
        unread: u32,
    }

    impl MailClient for FakeMailClient {
        fn mailbox_status(&self, agent: &str) -> Result<MailboxStatus, NzmError> {
            Ok(MailboxStatus {
                agent: agent.to_string(),
                unread: self.unread,
            })
        }
    }

    #[test]
    fn trait_object_is_usable_behind_dyn() {
        let client: Box<dyn MailClient> = Box::new(FakeMailClient { unread: 3 });
        let status = client.mailbox_status("claude-1").unwrap();
        assert_eq!(status.unread, 3);
    }
}
