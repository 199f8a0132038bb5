//! Pane activity classifier: turns noisy terminal scrollback into a discrete
//! agent state with confidence and velocity.
//!
//! Deterministic given the same `(lines, agent_type, prior_state,
//! prior_velocity)`; cheap (linear in the number of captured lines, which is
//! bounded to [`CAPTURE_LINES`]).

pub mod patterns;

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant, SystemTime};

use crate::multiplexer::{AgentType, Multiplexer};

/// Number of lines captured from a pane for classification.
pub const CAPTURE_LINES: u16 = 200;

/// Sustained-velocity threshold for `GENERATING`, in characters/second.
pub const VELOCITY_THRESHOLD: f64 = 20.0;

/// Below this, a velocity sample is considered "trivial" (≈0) for THINKING/STALLED.
const TRIVIAL_VELOCITY: f64 = 1.0;

/// Age beyond which an idle pane is considered stalled rather than thinking.
pub const STALL_THRESHOLD: Duration = Duration::from_secs(30);

const FRESH_OUTPUT_THRESHOLD: Duration = Duration::from_secs(5);

/// Discrete classifier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum State {
    Generating,
    Waiting,
    Thinking,
    Error,
    Stalled,
    Unknown,
}

impl Default for State {
    fn default() -> Self {
        State::Unknown
    }
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Generating => "GENERATING",
            State::Waiting => "WAITING",
            State::Thinking => "THINKING",
            State::Error => "ERROR",
            State::Stalled => "STALLED",
            State::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classifier output for one pane observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub agent_type: AgentType,
    pub state: State,
    pub confidence: f64,
    pub velocity: f64,
    pub state_since: SystemTime,
    pub last_output: SystemTime,
    pub detected_patterns: Vec<String>,
}

/// Pure, deterministic classification core: given normalized lines and the
/// prior observation, decide state, confidence and which named patterns
/// matched. Extracted from [`Classifier::classify`] so the state machine can
/// be tested without a multiplexer.
pub fn classify_lines(
    all_lines: &[&str],
    agent_type: AgentType,
    prior_state: State,
    velocity: f64,
    prior_velocity: f64,
    last_output_age: Duration,
) -> (State, f64, Vec<String>) {
    let mut patterns = Vec::new();

    let Some(tail) = patterns::last_non_empty_line(all_lines) else {
        return (State::Unknown, 0.0, patterns);
    };

    let prompt_at_tail = patterns::ends_with_prompt_token(tail, agent_type);
    let ready_phrase = patterns::matches_ready_phrase(tail);
    let waiting_match = prompt_at_tail || ready_phrase;

    let error_idx = patterns::last_error_line_index(all_lines);
    let prompt_idx = patterns::last_prompt_line_index(all_lines, agent_type);

    let sustained_generating = velocity > VELOCITY_THRESHOLD && prior_velocity > VELOCITY_THRESHOLD;
    let velocity_trivial = velocity.abs() < TRIVIAL_VELOCITY;

    let state = if waiting_match {
        let error_overrides = match (error_idx, prompt_idx) {
            (Some(e), Some(p)) => e > p,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if error_overrides {
            patterns.push("error_token".to_string());
            State::Error
        } else {
            if prompt_at_tail {
                patterns.push("prompt_token".to_string());
            }
            if ready_phrase {
                patterns.push("ready_phrase".to_string());
            }
            State::Waiting
        }
    } else if sustained_generating {
        patterns.push("sustained_velocity".to_string());
        State::Generating
    } else if velocity_trivial && prior_state == State::Generating && last_output_age < STALL_THRESHOLD {
        State::Thinking
    } else if let Some(_idx) = error_idx {
        patterns.push("error_token".to_string());
        State::Error
    } else if velocity_trivial
        && last_output_age >= STALL_THRESHOLD
        && matches!(prior_state, State::Generating | State::Thinking)
    {
        State::Stalled
    } else {
        State::Unknown
    };

    let mut confidence = 0.0;
    if prompt_at_tail {
        confidence += 0.4;
    }
    if !velocity_trivial {
        confidence += 0.3;
    }
    if last_output_age < FRESH_OUTPUT_THRESHOLD {
        confidence += 0.2;
    }
    if prior_state == state {
        confidence += 0.1;
    }
    confidence = confidence.clamp(0.0, 1.0);

    // ERROR and STALLED are reached by matching an explicit textual token or
    // a timing invariant, not by the confidence heuristic itself, so the
    // floor below must not suppress them back to UNKNOWN.
    let state = if confidence < 0.3 && !matches!(state, State::Error | State::Stalled) {
        State::Unknown
    } else {
        state
    };

    (state, confidence, patterns)
}

struct PaneHistory {
    last_content: Option<String>,
    last_capture_instant: Instant,
    last_output_instant: Instant,
    last_output_wall: SystemTime,
    velocity: f64,
    state: State,
    state_since: SystemTime,
}

/// Stateful, per-pane classifier handle. Holds one sample of history so
/// velocity and "agrees with prior observation" confidence bonuses can be
/// computed.
pub struct Classifier {
    pane_id: String,
    agent_type: AgentType,
    history: Option<PaneHistory>,
    last_error: Option<String>,
}

impl Classifier {
    /// `NewClassifier(paneID, cfg{AgentType})`.
    pub fn new(pane_id: impl Into<String>, agent_type: AgentType) -> Self {
        Self {
            pane_id: pane_id.into(),
            agent_type,
            history: None,
            last_error: None,
        }
    }

    pub fn pane_id(&self) -> &str {
        &self.pane_id
    }

    /// Last capture error recorded on this handle, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Capture fresh output via the multiplexer driver and run the state
    /// machine. Never panics: capture failures surface as
    /// `(UNKNOWN, confidence=0)` with the error recorded on the handle.
    pub fn classify(&mut self, mux: &dyn Multiplexer) -> Activity {
        let now_wall = SystemTime::now();
        let now_instant = Instant::now();

        let raw = match mux.capture_pane_output(&self.pane_id, CAPTURE_LINES) {
            Ok(raw) => {
                self.last_error = None;
                raw
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                return Activity {
                    agent_type: self.agent_type,
                    state: State::Unknown,
                    confidence: 0.0,
                    velocity: 0.0,
                    state_since: now_wall,
                    last_output: now_wall,
                    detected_patterns: Vec::new(),
                };
            }
        };

        let normalized = patterns::normalize(&raw);
        let line_vec = patterns::lines(&normalized);

        let prior_state = self.history.as_ref().map(|h| h.state).unwrap_or(State::Unknown);
        let prior_velocity = self.history.as_ref().map(|h| h.velocity).unwrap_or(0.0);

        let content_changed = self
            .history
            .as_ref()
            .map(|h| h.last_content.as_deref() != Some(normalized.as_str()))
            .unwrap_or(true);

        let velocity = match &self.history {
            None => 0.0,
            Some(h) => {
                let elapsed = now_instant.duration_since(h.last_capture_instant).as_secs_f64();
                if elapsed <= 0.0 {
                    0.0
                } else {
                    let prev_len = h.last_content.as_deref().map(str::len).unwrap_or(0);
                    let delta = normalized.len() as i64 - prev_len as i64;
                    (delta.max(0) as f64) / elapsed
                }
            }
        };

        let last_output_instant = if content_changed {
            now_instant
        } else {
            self.history
                .as_ref()
                .map(|h| h.last_output_instant)
                .unwrap_or(now_instant)
        };
        let last_output_wall = if content_changed {
            now_wall
        } else {
            self.history
                .as_ref()
                .map(|h| h.last_output_wall)
                .unwrap_or(now_wall)
        };
        let last_output_age = now_instant.duration_since(last_output_instant);

        let (state, confidence, detected_patterns) =
            classify_lines(&line_vec, self.agent_type, prior_state, velocity, prior_velocity, last_output_age);

        let state_since = if Some(state) == self.history.as_ref().map(|h| h.state) {
            self.history.as_ref().map(|h| h.state_since).unwrap_or(now_wall)
        } else {
            now_wall
        };

        self.history = Some(PaneHistory {
            last_content: Some(normalized),
            last_capture_instant: now_instant,
            last_output_instant,
            last_output_wall,
            velocity,
            state,
            state_since,
        });

        Activity {
            agent_type: self.agent_type,
            state,
            confidence,
            velocity,
            state_since,
            last_output: last_output_wall,
            detected_patterns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multiplexer::mock::MockMultiplexer;
    use std::time::Duration;

    #[test]
    fn waiting_from_claude_prompt_tail() {
        let lines = vec!["thinking...", "done.", "claude> "];
        let (state, confidence, _) =
            classify_lines(&lines, AgentType::Claude, State::Unknown, 0.0, 0.0, Duration::from_secs(1));
        assert_eq!(state, State::Waiting);
        assert!(confidence >= 0.4);
    }

    #[test]
    fn error_overrides_idle_prompt() {
        let lines = vec!["claude> ", "Error: rate limit exceeded"];
        let (state, _, patterns) =
            classify_lines(&lines, AgentType::Claude, State::Waiting, 0.0, 0.0, Duration::from_secs(1));
        assert_eq!(state, State::Error);
        assert!(patterns.contains(&"error_token".to_string()));
    }

    #[test]
    fn error_before_prompt_does_not_override_waiting() {
        let lines = vec!["Error: rate limit exceeded", "claude> "];
        let (state, _, _) =
            classify_lines(&lines, AgentType::Claude, State::Unknown, 0.0, 0.0, Duration::from_secs(1));
        assert_eq!(state, State::Waiting);
    }

    #[test]
    fn sustained_high_velocity_is_generating() {
        let lines = vec!["streaming output with no prompt tail"];
        let (state, _, _) =
            classify_lines(&lines, AgentType::Claude, State::Generating, 40.0, 30.0, Duration::from_secs(0));
        assert_eq!(state, State::Generating);
    }

    #[test]
    fn single_high_sample_without_prior_is_not_generating() {
        let lines = vec!["streaming output with no prompt tail"];
        let (state, _, _) =
            classify_lines(&lines, AgentType::Claude, State::Unknown, 40.0, 0.0, Duration::from_secs(0));
        assert_ne!(state, State::Generating);
    }

    #[test]
    fn idle_after_generating_within_stall_window_is_thinking() {
        let lines = vec!["..."];
        let (state, _, _) = classify_lines(
            &lines,
            AgentType::Claude,
            State::Generating,
            0.0,
            35.0,
            Duration::from_secs(5),
        );
        assert_eq!(state, State::Thinking);
    }

    #[test]
    fn idle_past_stall_threshold_is_stalled() {
        let lines = vec!["..."];
        let (state, _, _) = classify_lines(
            &lines,
            AgentType::Claude,
            State::Thinking,
            0.0,
            0.0,
            Duration::from_secs(31),
        );
        assert_eq!(state, State::Stalled);
    }

    #[test]
    fn no_lines_is_unknown_with_zero_confidence() {
        let (state, confidence, _) =
            classify_lines(&[], AgentType::Claude, State::Unknown, 0.0, 0.0, Duration::from_secs(0));
        assert_eq!(state, State::Unknown);
        assert_eq!(confidence, 0.0);
    }

    #[test]
    fn low_confidence_forces_unknown() {
        // Sustained velocity alone (without a fresh sample or prior agreement)
        // only earns the 0.3 "non-trivial velocity" bonus - below the 0.3 floor
        // it would tie, but pushing velocity_trivial true and nothing else
        // matching keeps confidence at 0.
        let lines = vec!["plain shell output, no prompt, no error"];
        let (state, confidence, _) =
            classify_lines(&lines, AgentType::Codex, State::Error, 0.0, 0.0, Duration::from_secs(60));
        assert_eq!(state, State::Unknown);
        assert_eq!(confidence, 0.0);
    }

    #[test]
    fn deterministic_given_same_inputs() {
        let lines = vec!["claude> "];
        let a = classify_lines(&lines, AgentType::Claude, State::Waiting, 0.0, 0.0, Duration::from_secs(2));
        let b = classify_lines(&lines, AgentType::Claude, State::Waiting, 0.0, 0.0, Duration::from_secs(2));
        assert_eq!(a.0, b.0);
        assert_eq!(a.1, b.1);
        assert_eq!(a.2, b.2);
    }

    #[test]
    fn classifier_handle_survives_capture_failure() {
        let mux = MockMultiplexer::new();
        // No session/pane registered, so capture_pane_output returns Ok("")
        // for the mock; simulate failure via an unregistered pane id against
        // a real backend is covered by the tmux module's own tests. Here we
        // assert the empty-capture path yields UNKNOWN/0 confidence and no panic.
        let mut classifier = Classifier::new("%404", AgentType::Claude);
        let activity = classifier.classify(&mux);
        assert_eq!(activity.state, State::Unknown);
    }
}
