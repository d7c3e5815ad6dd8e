//! Interaction - the multi-turn session state machine
//!
//! Each trajectory gets a [`Session`] keyed by an opaque id. Every
//! `generate_response` call is one turn: the latest assistant message is
//! scanned for tool-usage signals, scored by the [`ScoringPolicy`], and the
//! session either terminates or receives targeted improvement feedback.

use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::JudgeError;
use crate::message::{ChatMessage, latest_assistant};
use crate::policy::{KeywordPolicy, ScoringPolicy};
use crate::session::{Session, SessionState};

/// Completeness at or above this terminates the session successfully
pub const SUCCESS_COMPLETENESS: f64 = 0.8;
/// Tool usage and analysis quality count as sufficient from this value
pub const SUFFICIENT_FRACTION: f64 = 2.0 / 3.0;

const SUCCESS_FEEDBACK: &str = "Excellent analysis! You've systematically explored the codebase using multiple tools and provided comprehensive insights.";
const ALREADY_TERMINATED: &str = "This interaction has already terminated. No further turns are scored.";
const NOT_FOUND: &str = "Error: Instance not found";

/// Result of one turn
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub terminate: bool,
    pub feedback: String,
    pub score: f64,
    pub metadata: Value,
}

/// Session limits
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    pub max_turns: u32,
    pub min_analysis_length: usize,
}

impl Default for Settings {
    fn default() -> Self {
        let config = Config::default();
        Self {
            max_turns: config.max_turns,
            min_analysis_length: config.min_analysis_length,
        }
    }
}

/// Outcome of each completeness check for one turn
#[derive(Debug, Clone, Copy)]
struct Sufficiency {
    detailed: bool,
    tools: bool,
    analysis: bool,
}

impl Sufficiency {
    fn completeness(&self) -> f64 {
        let met = [self.detailed, self.tools, self.analysis].iter().filter(|c| **c).count();
        met as f64 / 3.0
    }
}

/// Owner of every live session
pub struct Interaction {
    settings: Settings,
    policy: Arc<dyn ScoringPolicy>,
    sessions: Mutex<HashMap<String, Session>>,
}

impl Interaction {
    pub fn new(settings: Settings, policy: Arc<dyn ScoringPolicy>) -> Result<Self, JudgeError> {
        if settings.max_turns == 0 {
            return Err(JudgeError::InvalidMaxTurns);
        }
        Ok(Self {
            settings,
            policy,
            sessions: Mutex::new(HashMap::new()),
        })
    }

    /// Build from configuration with the keyword policy
    pub fn from_config(config: &Config) -> Result<Self, JudgeError> {
        let policy: KeywordPolicy = config.policy()?;
        let settings = Settings {
            max_turns: config.max_turns,
            min_analysis_length: config.min_analysis_length,
        };
        Self::new(settings, Arc::new(policy))
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    /// Start (or restart) a session; returns its id
    pub async fn start_interaction(&self, instance_id: Option<String>, ground_truth: Option<String>) -> String {
        let id = instance_id.unwrap_or_else(|| uuid::Uuid::now_v7().to_string());
        let mut sessions = self.sessions.lock().await;
        if sessions.insert(id.clone(), Session::new(&id, ground_truth)).is_some() {
            debug!(%id, "Interaction::start_interaction: reset existing session");
        }
        info!(%id, "Started interaction");
        id
    }

    /// Score one turn of the transcript
    pub async fn generate_response(&self, instance_id: &str, messages: &[ChatMessage]) -> TurnOutcome {
        debug!(%instance_id, messages = messages.len(), "Interaction::generate_response: called");
        let mut sessions = self.sessions.lock().await;
        let Some(session) = sessions.get_mut(instance_id) else {
            warn!(%instance_id, "generate_response on unknown session");
            return TurnOutcome {
                terminate: true,
                feedback: NOT_FOUND.to_string(),
                score: 0.0,
                metadata: json!({ "error": "not_found" }),
            };
        };

        if session.is_terminated() {
            return TurnOutcome {
                terminate: true,
                feedback: ALREADY_TERMINATED.to_string(),
                score: session.score(),
                metadata: turn_metadata(session),
            };
        }

        let content = latest_assistant(messages).map(|m| m.content.as_str()).unwrap_or("");
        self.advance(session, content);

        let feedback = if session.completeness >= SUCCESS_COMPLETENESS {
            session.state = SessionState::Terminated;
            SUCCESS_FEEDBACK.to_string()
        } else if session.turn_count >= self.settings.max_turns {
            session.state = SessionState::Terminated;
            format!(
                "Analysis complete after {} turns. Consider using more tools for deeper exploration next time.",
                self.settings.max_turns
            )
        } else {
            improvement_feedback(session, self.sufficiency(session))
        };

        if session.is_terminated() {
            info!(id = %session.id, turns = session.turn_count, score = session.score(), "Interaction terminated");
        }

        TurnOutcome {
            terminate: session.is_terminated(),
            feedback,
            score: session.score(),
            metadata: turn_metadata(session),
        }
    }

    /// Update turn count, tool flags and the three sub-scores from one message
    fn advance(&self, session: &mut Session, content: &str) {
        session.turn_count += 1;
        for category in self.policy.tools_used(content) {
            session.mark_used(category);
        }

        session.tool_usage = session.tools_used_count() as f64 / 3.0;
        session.analysis_quality = self
            .policy
            .analysis_quality(session.ground_truth.as_deref(), content)
            .clamp(0.0, 1.0);

        session.last_response = content.to_string();
        session.completeness = self.sufficiency(session).completeness();

        debug!(
            id = %session.id,
            turn = session.turn_count,
            tool_usage = session.tool_usage,
            analysis = session.analysis_quality,
            completeness = session.completeness,
            "Interaction::advance: scored turn"
        );
    }

    /// The three completeness checks for the session's latest message
    fn sufficiency(&self, session: &Session) -> Sufficiency {
        Sufficiency {
            detailed: session.last_response.chars().count() >= self.settings.min_analysis_length,
            tools: session.tool_usage >= SUFFICIENT_FRACTION,
            analysis: session.analysis_quality >= SUFFICIENT_FRACTION,
        }
    }

    /// Current score without advancing the session; 0.0 for unknown ids
    pub async fn calculate_score(&self, instance_id: &str) -> f64 {
        let sessions = self.sessions.lock().await;
        sessions.get(instance_id).map(Session::score).unwrap_or(0.0)
    }

    /// Remove the session, returning its final state if it was present
    pub async fn finalize_interaction(&self, instance_id: &str) -> Option<Session> {
        let removed = self.sessions.lock().await.remove(instance_id);
        match &removed {
            Some(session) => info!(id = %instance_id, score = session.score(), "Finalized interaction"),
            None => debug!(%instance_id, "Interaction::finalize_interaction: already absent"),
        }
        removed
    }

    /// Read-only snapshot of a session
    pub async fn session(&self, instance_id: &str) -> Option<Session> {
        self.sessions.lock().await.get(instance_id).cloned()
    }
}

fn improvement_feedback(session: &Session, checks: Sufficiency) -> String {
    let mut lines = vec!["Good progress! Here's how to improve your analysis:".to_string()];
    if !checks.tools {
        lines.extend(session.unused_tools().iter().map(|c| format!("• {}", c.hint())));
    }
    if !checks.detailed {
        lines.push("• Provide more detailed analysis and insights".to_string());
    }
    if !checks.analysis {
        match &session.ground_truth {
            Some(gt) => lines.push(format!("• Focus on the key aspects for {}", gt.replace('_', " "))),
            None => lines.push("• Focus on the key aspects of the codebase".to_string()),
        }
    }
    lines.join("\n")
}

fn turn_metadata(session: &Session) -> Value {
    json!({
        "turn_count": session.turn_count,
        "tool_usage_score": session.tool_usage,
        "analysis_quality": session.analysis_quality,
        "completeness": session.completeness,
        "state": session.state.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interaction() -> Interaction {
        Interaction::from_config(&Config::default()).unwrap()
    }

    #[tokio::test]
    async fn test_start_generates_unique_ids() {
        let judge = interaction();
        let a = judge.start_interaction(None, None).await;
        let b = judge.start_interaction(None, None).await;
        assert_ne!(a, b);
        assert_eq!(judge.session(&a).await.unwrap().state, SessionState::Active);
    }

    #[tokio::test]
    async fn test_restart_resets_session() {
        let judge = interaction();
        let id = judge.start_interaction(Some("t1".into()), None).await;
        judge
            .generate_response(&id, &[ChatMessage::assistant("I will plan first")])
            .await;
        assert_eq!(judge.session(&id).await.unwrap().turn_count, 1);

        judge.start_interaction(Some("t1".into()), None).await;
        let session = judge.session(&id).await.unwrap();
        assert_eq!(session.turn_count, 0);
        assert!(!session.used_todo);
    }

    #[tokio::test]
    async fn test_feedback_names_missing_criteria() {
        let judge = interaction();
        let id = judge
            .start_interaction(None, Some("tools_architecture_analysis".into()))
            .await;

        let outcome = judge
            .generate_response(&id, &[ChatMessage::assistant("Here is my plan.")])
            .await;

        assert!(!outcome.terminate);
        assert!(outcome.feedback.starts_with("Good progress!"));
        assert!(!outcome.feedback.contains("todo_manager"));
        assert!(outcome.feedback.contains("Use bash"));
        assert!(outcome.feedback.contains("Use read_file"));
        assert!(outcome.feedback.contains("tools architecture analysis"));
        assert_eq!(outcome.metadata["turn_count"], 1);
        assert_eq!(outcome.metadata["state"], "active");
    }

    #[tokio::test]
    async fn test_uses_only_latest_assistant_message() {
        let judge = interaction();
        let id = judge.start_interaction(None, None).await;
        let messages = vec![
            ChatMessage::assistant("plan bash read"),
            ChatMessage::user("continue"),
            ChatMessage::assistant("nothing"),
        ];

        judge.generate_response(&id, &messages).await;
        let session = judge.session(&id).await.unwrap();
        assert_eq!(session.last_response, "nothing");
        assert_eq!(session.tool_usage, 0.0);
    }

    #[tokio::test]
    async fn test_no_assistant_message_counts_as_empty_turn() {
        let judge = interaction();
        let id = judge.start_interaction(None, None).await;

        let outcome = judge.generate_response(&id, &[ChatMessage::user("hello")]).await;
        assert_eq!(outcome.metadata["turn_count"], 1);
        assert_eq!(outcome.score, 0.0);
    }

    #[tokio::test]
    async fn test_calculate_score_does_not_advance() {
        let judge = interaction();
        let id = judge.start_interaction(None, None).await;
        let outcome = judge
            .generate_response(&id, &[ChatMessage::assistant("I ran a bash command")])
            .await;

        let score = judge.calculate_score(&id).await;
        assert_eq!(score, outcome.score);
        assert_eq!(judge.session(&id).await.unwrap().turn_count, 1);
        assert_eq!(judge.calculate_score("unknown").await, 0.0);
    }

    #[test]
    fn test_zero_max_turns_rejected() {
        let settings = Settings {
            max_turns: 0,
            min_analysis_length: 10,
        };
        assert!(matches!(
            Interaction::new(settings, Arc::new(KeywordPolicy::default())),
            Err(JudgeError::InvalidMaxTurns)
        ));
    }
}
