//! Shared types for multiplexer backends and the pane title grammar.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Declared agent type for a pane, as resolved from the pane title grammar
/// or a title-substring heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    Claude,
    Codex,
    Gemini,
    User,
    Unknown,
}

impl AgentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::Claude => "claude",
            AgentType::Codex => "codex",
            AgentType::Gemini => "gemini",
            AgentType::User => "user",
            AgentType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A pane as reported by the multiplexer driver.
///
/// Identity is `(id, index)`; `id` is assigned by the multiplexer and stable
/// for the pane's lifetime, `index` is the pane's position within its window.
#[derive(Debug, Clone, PartialEq)]
pub struct Pane {
    pub id: String,
    pub index: u32,
    pub title: String,
    pub agent_type: AgentType,
    pub variant: Option<String>,
    pub active: bool,
    pub width: u16,
    pub height: u16,
}

/// Parsed components of a title matching the pane title grammar:
///
/// ```text
/// <session>__<type>_<index>[_<variant>][<suffix>]
/// type    := cc | cod | gmi
/// index   := positive integer
/// variant := [A-Za-z0-9._/@:+-]+
/// suffix  := "[" … "]"  (opaque, ignored for typing)
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTitle {
    pub session: String,
    pub agent_type: AgentType,
    pub index: u32,
    pub variant: Option<String>,
}

fn title_grammar() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<session>[^_]+)__(?P<type>cc|cod|gmi)_(?P<index>\d+)(?:_(?P<variant>[A-Za-z0-9._/@:+-]+))?(?:\[[^\]]*\])?$",
        )
        .expect("static pane title grammar regex is valid")
    })
}

/// Parse a pane title against the authoritative grammar. Returns `None` for
/// titles that don't match, which should then fall back to substring
/// heuristics over a closed set of agent names (see [`detect_agent_type_from_title`]).
pub fn parse_title(title: &str) -> Option<ParsedTitle> {
    let caps = title_grammar().captures(title)?;
    let agent_type = match &caps["type"] {
        "cc" => AgentType::Claude,
        "cod" => AgentType::Codex,
        "gmi" => AgentType::Gemini,
        _ => return None,
    };
    let index: u32 = caps["index"].parse().ok()?;
    Some(ParsedTitle {
        session: caps["session"].to_string(),
        agent_type,
        index,
        variant: caps.name("variant").map(|m| m.as_str().to_string()),
    })
}

/// Closed set of substring heuristics used when a title doesn't match the
/// authoritative grammar. Case-insensitive substring match, first hit wins.
pub fn detect_agent_type_from_title(title: &str) -> AgentType {
    if let Some(parsed) = parse_title(title) {
        return parsed.agent_type;
    }
    let lower = title.to_lowercase();
    const HEURISTICS: &[(&str, AgentType)] = &[
        ("claude", AgentType::Claude),
        ("codex", AgentType::Codex),
        ("gemini", AgentType::Gemini),
    ];
    for (needle, ty) in HEURISTICS {
        if lower.contains(needle) {
            return *ty;
        }
    }
    AgentType::Unknown
}

/// Backend selection for the multiplexer trait object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendType {
    #[default]
    Tmux,
    Mock,
}

impl std::str::FromStr for BackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tmux" => Ok(BackendType::Tmux),
            "mock" => Ok(BackendType::Mock),
            other => Err(format!("unknown multiplexer backend: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_title() {
        let parsed = parse_title("demo__cc_1_sonnet[abc]").unwrap();
        assert_eq!(parsed.session, "demo");
        assert_eq!(parsed.agent_type, AgentType::Claude);
        assert_eq!(parsed.index, 1);
        assert_eq!(parsed.variant.as_deref(), Some("sonnet"));
    }

    #[test]
    fn parses_title_without_variant_or_suffix() {
        let parsed = parse_title("demo__cod_2").unwrap();
        assert_eq!(parsed.agent_type, AgentType::Codex);
        assert_eq!(parsed.index, 2);
        assert_eq!(parsed.variant, None);
    }

    #[test]
    fn rejects_non_matching_title() {
        assert!(parse_title("zsh").is_none());
        assert!(parse_title("demo__xyz_1").is_none());
    }

    #[test]
    fn falls_back_to_substring_heuristic() {
        assert_eq!(
            detect_agent_type_from_title("~ claude code session"),
            AgentType::Claude
        );
        assert_eq!(
            detect_agent_type_from_title("gemini-cli"),
            AgentType::Gemini
        );
        assert_eq!(detect_agent_type_from_title("zsh"), AgentType::Unknown);
    }

    #[test]
    fn backend_type_parses_known_names() {
        assert_eq!("tmux".parse::<BackendType>().unwrap(), BackendType::Tmux);
        assert_eq!("Mock".parse::<BackendType>().unwrap(), BackendType::Mock);
        assert!("zellij".parse::<BackendType>().is_err());
    }
}
