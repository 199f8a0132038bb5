//! tmux backend implementation for the `Multiplexer` trait.
//!
//! Wraps the `tmux` binary; every call shells out and is treated as a
//! suspension point by callers (the scheduler never invokes this directly
//! from inside a tick — see `dashboard::Scheduler`).

use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cmd::Cmd;

use super::Multiplexer;
use super::types::{AgentType, Pane, detect_agent_type_from_title, parse_title};

const QUERY_DEADLINE: Duration = Duration::from_secs(5);

/// tmux backend implementation.
#[derive(Debug, Default)]
pub struct TmuxBackend;

impl TmuxBackend {
    pub fn new() -> Self {
        Self
    }

    fn tmux_cmd(&self, args: &[&str]) -> Result<()> {
        Cmd::new("tmux")
            .args(args)
            .run_with_timeout(QUERY_DEADLINE)
            .with_context(|| format!("tmux command failed: {args:?}"))?;
        Ok(())
    }

    fn tmux_query(&self, args: &[&str]) -> Result<String> {
        let output = Cmd::new("tmux")
            .args(args)
            .run_with_timeout(QUERY_DEADLINE)
            .with_context(|| format!("tmux query failed: {args:?}"))?;
        Ok(String::from_utf8_lossy(&output.stdout).trim_end_matches('\n').to_string())
    }
}

/// Pane-list row format: id, index, title, active, width, height, session.
/// `\x1f` (unit separator) avoids collisions with pane titles containing spaces.
const PANE_FORMAT: &str =
    "#{pane_id}\x1f#{pane_index}\x1f#{pane_title}\x1f#{pane_active}\x1f#{pane_width}\x1f#{pane_height}";

fn parse_pane_line(line: &str) -> Option<Pane> {
    let mut parts = line.splitn(6, '\x1f');
    let id = parts.next()?.to_string();
    let index: u32 = parts.next()?.parse().ok()?;
    let title = parts.next()?.to_string();
    let active = parts.next()? == "1";
    let width: u16 = parts.next()?.parse().ok()?;
    let height: u16 = parts.next()?.parse().ok()?;

    let (agent_type, variant) = match parse_title(&title) {
        Some(parsed) => (parsed.agent_type, parsed.variant),
        None => (detect_agent_type_from_title(&title), None),
    };
    let agent_type = if title.is_empty() {
        AgentType::Unknown
    } else {
        agent_type
    };

    Some(Pane {
        id,
        index,
        title,
        agent_type,
        variant,
        active,
        width,
        height,
    })
}

impl Multiplexer for TmuxBackend {
    fn name(&self) -> &'static str {
        "tmux"
    }

    fn list_sessions(&self) -> Result<Vec<String>> {
        let output = self.tmux_query(&["list-sessions", "-F", "#{session_name}"])?;
        Ok(output.lines().map(str::to_string).collect())
    }

    fn get_panes(&self, session: &str) -> Result<Vec<Pane>> {
        let target = format!("{session}:");
        let output = self.tmux_query(&["list-panes", "-t", &target, "-F", PANE_FORMAT])?;
        let mut panes: Vec<Pane> = output.lines().filter_map(parse_pane_line).collect();
        panes.sort_by_key(|p| p.index);
        Ok(panes)
    }

    fn capture_pane_output(&self, pane_id: &str, lines: u16) -> Result<String> {
        let start_line = format!("-{lines}");
        self.tmux_query(&["capture-pane", "-p", "-e", "-S", &start_line, "-t", pane_id])
    }

    fn send_keys(&self, pane_id: &str, text: &str, submit: bool) -> Result<()> {
        self.tmux_cmd(&["send-keys", "-t", pane_id, "-l", text])?;
        if submit {
            self.tmux_cmd(&["send-keys", "-t", pane_id, "Enter"])?;
        }
        Ok(())
    }

    fn send_interrupt(&self, pane_id: &str) -> Result<()> {
        self.tmux_cmd(&["send-keys", "-t", pane_id, "C-c"])
    }

    fn create_session(&self, name: &str, cwd: &Path) -> Result<String> {
        let cwd_str = cwd
            .to_str()
            .ok_or_else(|| anyhow!("working directory path contains non-UTF8 characters"))?;
        self.tmux_query(&[
            "new-session", "-d", "-s", name, "-c", cwd_str, "-P", "-F", "#{pane_id}",
        ])
    }

    fn kill_session(&self, name: &str) -> Result<()> {
        self.tmux_cmd(&["kill-session", "-t", name])
    }

    fn split_window(&self, pane_id: &str, vertical: bool) -> Result<String> {
        let direction_flag = if vertical { "-v" } else { "-h" };
        self.tmux_query(&[
            "split-window", direction_flag, "-t", pane_id, "-P", "-F", "#{pane_id}",
        ])
    }

    fn set_pane_title(&self, pane_id: &str, title: &str) -> Result<()> {
        self.tmux_cmd(&["select-pane", "-t", pane_id, "-T", title])
    }

    fn get_client_active_pane_path(&self) -> Result<PathBuf> {
        let session = self.tmux_query(&["display-message", "-p", "#{client_session}"])?;
        let target = format!("{session}:");
        let path = self.tmux_query(&["display-message", "-p", "-t", &target, "#{pane_current_path}"])?;
        if path.is_empty() {
            return Err(anyhow!("empty path returned from tmux"));
        }
        Ok(PathBuf::from(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pane_line_with_grammar_title() {
        let line = "%3\x1f2\x1fdemo__cc_1_sonnet\x1f1\x1f120\x1f40";
        let pane = parse_pane_line(line).unwrap();
        assert_eq!(pane.id, "%3");
        assert_eq!(pane.index, 2);
        assert_eq!(pane.agent_type, AgentType::Claude);
        assert_eq!(pane.variant.as_deref(), Some("sonnet"));
        assert!(pane.active);
        assert_eq!(pane.width, 120);
        assert_eq!(pane.height, 40);
    }

    #[test]
    fn parses_pane_line_with_heuristic_title() {
        let line = "%4\x1f0\x1frunning codex\x1f0\x1f80\x1f24";
        let pane = parse_pane_line(line).unwrap();
        assert_eq!(pane.agent_type, AgentType::Codex);
        assert!(!pane.active);
    }

    #[test]
    fn empty_title_is_unknown_not_heuristic_matched() {
        let line = "%5\x1f1\x1f\x1f0\x1f80\x1f24";
        let pane = parse_pane_line(line).unwrap();
        assert_eq!(pane.agent_type, AgentType::Unknown);
    }

    #[test]
    fn rejects_malformed_line() {
        assert!(parse_pane_line("not enough fields").is_none());
    }
}
