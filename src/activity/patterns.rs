//! Prompt/error token tables and ANSI normalization used by the classifier.

use crate::multiplexer::AgentType;

/// Prompt tokens that mark a pane as `WAITING` when they appear at the tail
/// of the last non-empty line. Per-agent tokens first, then tokens shared by
/// plain shells.
pub fn prompt_tokens(agent_type: AgentType) -> &'static [&'static str] {
    match agent_type {
        AgentType::Claude => &["claude>", "Claude>", "claude >"],
        AgentType::Codex => &["codex>", "Codex>"],
        AgentType::Gemini => &["gemini>", "Gemini>"],
        AgentType::User | AgentType::Unknown => &[],
    }
}

/// Prompt tokens shared across shells, checked for every agent type after
/// the agent-specific set.
pub const SHARED_PROMPT_TOKENS: &[&str] = &["$ ", "% ", "# ", "> ", ">>> "];

/// Lowercase-substring "ready for input" phrases, checked in addition to
/// exact-tail prompt tokens.
pub const READY_PHRASES: &[&str] = &[
    "ready for input",
    "waiting for your input",
    "what would you like",
    "how can i help",
];

/// Case-sensitive error tokens. Substring match against any of the last five
/// non-empty lines.
pub const ERROR_TOKENS: &[&str] = &[
    "rate limit",
    "Rate limit",
    "429",
    "error:",
    "Error:",
    "ERROR:",
    "failed:",
    "Failed:",
    "panic:",
    "fatal:",
];

/// Strip ANSI CSI (`ESC [ ... final-byte`) and OSC (`ESC ] ... BEL|ESC \`)
/// sequences, normalize CRLF/CR to LF, and drop a single trailing empty line.
pub fn normalize(raw: &str) -> String {
    let stripped = strip_ansi_escapes::strip(raw.as_bytes());
    let bytes = match stripped {
        Ok(b) => b,
        Err(_) => raw.as_bytes().to_vec(),
    };
    let text = String::from_utf8_lossy(&bytes);
    let mut normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    if normalized.ends_with('\n') {
        normalized.pop();
    }
    normalized
}

/// Split normalized text into lines, in order.
pub fn lines(normalized: &str) -> Vec<&str> {
    if normalized.is_empty() {
        Vec::new()
    } else {
        normalized.split('\n').collect()
    }
}

/// Last non-empty line, if any.
pub fn last_non_empty_line<'a>(lines: &[&'a str]) -> Option<&'a str> {
    lines.iter().rev().find(|l| !l.trim().is_empty()).copied()
}

/// True if `line` ends with one of the prompt tokens for `agent_type`
/// (agent-specific tokens first, then the shared shell-prompt set).
pub fn ends_with_prompt_token(line: &str, agent_type: AgentType) -> bool {
    prompt_tokens(agent_type)
        .iter()
        .chain(SHARED_PROMPT_TOKENS.iter())
        .any(|tok| line.ends_with(tok))
}

/// True if `line`, lowercased, contains one of the "ready for input" phrases.
pub fn matches_ready_phrase(line: &str) -> bool {
    let lower = line.to_lowercase();
    READY_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

/// Index (within `all_lines`, counting from the end) of the last line that
/// contains a prompt token, if any — used to decide whether a later error
/// token should override a `WAITING` classification.
pub fn last_prompt_line_index(all_lines: &[&str], agent_type: AgentType) -> Option<usize> {
    all_lines
        .iter()
        .enumerate()
        .rev()
        .find(|(_, l)| ends_with_prompt_token(l, agent_type))
        .map(|(i, _)| i)
}

/// Index (within `all_lines`) of the last line containing an error token,
/// searched only over the final five non-empty lines per spec.
pub fn last_error_line_index(all_lines: &[&str]) -> Option<usize> {
    let non_empty_indices: Vec<usize> = all_lines
        .iter()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, _)| i)
        .collect();
    let tail: &[usize] = if non_empty_indices.len() > 5 {
        &non_empty_indices[non_empty_indices.len() - 5..]
    } else {
        &non_empty_indices
    };
    tail.iter()
        .rev()
        .find(|&&i| ERROR_TOKENS.iter().any(|tok| all_lines[i].contains(tok)))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_csi_and_crlf() {
        let raw = "\x1b[31mhello\x1b[0m\r\nworld\r\n";
        assert_eq!(normalize(raw), "hello\nworld");
    }

    #[test]
    fn normalize_empty_input_is_empty() {
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn normalize_plain_input_unchanged() {
        assert_eq!(normalize("plain text"), "plain text");
    }

    #[test]
    fn prompt_token_matches_agent_specific_and_shared() {
        assert!(ends_with_prompt_token("thinking... claude> ", AgentType::Claude));
        assert!(ends_with_prompt_token("done.claude> ", AgentType::Claude));
        assert!(ends_with_prompt_token("~/project $ ", AgentType::Codex));
    }

    #[test]
    fn error_override_only_applies_after_most_recent_prompt() {
        let lines = vec!["claude> ", "Error: rate limit exceeded"];
        let prompt_idx = last_prompt_line_index(&lines, AgentType::Claude).unwrap();
        let error_idx = last_error_line_index(&lines).unwrap();
        assert!(error_idx > prompt_idx);
    }
}
