//! End-to-end session behaviour for the interaction judge

use std::sync::Arc;

use turnjudge::{
    ChatMessage, Config, Interaction, KeywordPolicy, ScoringPolicy, SessionState, Settings, exploration_reward,
};

/// Policy with a constant analysis score and the default tool keyword scan
struct FixedPolicy(f64);

impl ScoringPolicy for FixedPolicy {
    fn analysis_quality(&self, _ground_truth: Option<&str>, _text: &str) -> f64 {
        self.0
    }
}

fn thorough_message() -> String {
    "First I made a plan with the todo tool, then ran bash commands over the directory \
     and opened each file to read its content. "
        .repeat(3)
}

fn judge_with(policy: Arc<dyn ScoringPolicy>, max_turns: u32) -> Interaction {
    let settings = Settings {
        max_turns,
        min_analysis_length: 200,
    };
    Interaction::new(settings, policy).expect("valid settings")
}

// =============================================================================
// Termination
// =============================================================================

#[tokio::test]
async fn test_complete_turn_terminates_with_blended_score() {
    let judge = judge_with(Arc::new(FixedPolicy(0.9)), 5);
    let id = judge
        .start_interaction(None, Some("repository_overview_analysis".into()))
        .await;

    let message = thorough_message();
    assert!(message.chars().count() >= 200);
    let outcome = judge
        .generate_response(&id, &[ChatMessage::user("explore"), ChatMessage::assistant(message)])
        .await;

    assert!(outcome.terminate);
    assert!(outcome.feedback.starts_with("Excellent analysis!"));
    assert!((outcome.score - 0.96).abs() < 1e-9, "score was {}", outcome.score);
    assert_eq!(outcome.metadata["completeness"], 1.0);
    assert_eq!(outcome.metadata["tool_usage_score"], 1.0);
    assert_eq!(outcome.metadata["state"], "terminated");
}

#[tokio::test]
async fn test_keyword_policy_recognized_category() {
    let judge = Interaction::from_config(&Config::default()).unwrap();
    let id = judge
        .start_interaction(None, Some("repository_overview_analysis".into()))
        .await;

    let message = format!(
        "{}The architecture is a training system split into one module per concern.",
        thorough_message()
    );
    let outcome = judge.generate_response(&id, &[ChatMessage::assistant(message)]).await;

    assert!(outcome.terminate);
    let analysis = outcome.metadata["analysis_quality"].as_f64().unwrap();
    assert!((analysis - 1.0).abs() < 1e-9);
    assert!((outcome.score - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_terminates_at_max_turns() {
    let judge = judge_with(Arc::new(FixedPolicy(0.1)), 3);
    let id = judge.start_interaction(None, None).await;
    let turn = [ChatMessage::assistant("Still thinking.")];

    for n in 1..3 {
        let outcome = judge.generate_response(&id, &turn).await;
        assert!(!outcome.terminate, "terminated early on turn {}", n);
        assert!(outcome.feedback.contains("Use the todo_manager"));
        assert!(outcome.feedback.contains("Focus on the key aspects of the codebase"));
    }

    let last = judge.generate_response(&id, &turn).await;
    assert!(last.terminate);
    assert_eq!(
        last.feedback,
        "Analysis complete after 3 turns. Consider using more tools for deeper exploration next time."
    );
    assert_eq!(last.metadata["turn_count"], 3);
}

#[tokio::test]
async fn test_terminated_session_does_not_advance() {
    let judge = judge_with(Arc::new(FixedPolicy(0.0)), 1);
    let id = judge.start_interaction(None, None).await;

    let first = judge.generate_response(&id, &[ChatMessage::assistant("ok")]).await;
    assert!(first.terminate);

    let again = judge.generate_response(&id, &[ChatMessage::assistant("more")]).await;
    assert!(again.terminate);
    assert!(again.feedback.contains("already terminated"));
    assert_eq!(again.score, first.score);

    let session = judge.session(&id).await.unwrap();
    assert_eq!(session.turn_count, 1);
    assert_eq!(session.state, SessionState::Terminated);
    assert_eq!(session.last_response, "ok");
}

// =============================================================================
// Tool usage signals
// =============================================================================

#[tokio::test]
async fn test_tool_flags_accumulate_across_turns() {
    let judge = judge_with(Arc::new(FixedPolicy(0.0)), 10);
    let id = judge.start_interaction(None, None).await;

    judge.generate_response(&id, &[ChatMessage::assistant("A plan.")]).await;
    let outcome = judge
        .generate_response(&id, &[ChatMessage::assistant("Ran a command.")])
        .await;

    let tool_usage = outcome.metadata["tool_usage_score"].as_f64().unwrap();
    assert!((tool_usage - 2.0 / 3.0).abs() < 1e-9);
    // two of three tool families is sufficient, so no tool hints remain
    assert!(!outcome.feedback.contains("Use read_file"));
    assert!(!outcome.feedback.contains("Use bash"));
    assert!(!outcome.feedback.contains("todo_manager"));
    assert!(outcome.feedback.contains("Provide more detailed analysis"));
}

#[tokio::test]
async fn test_short_message_feedback_names_length() {
    let judge = judge_with(Arc::new(FixedPolicy(0.9)), 5);
    let id = judge.start_interaction(None, None).await;

    let outcome = judge
        .generate_response(&id, &[ChatMessage::assistant("I made a plan, ran bash, read a file.")])
        .await;

    assert!(!outcome.terminate);
    let completeness = outcome.metadata["completeness"].as_f64().unwrap();
    assert!((completeness - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(
        outcome.feedback,
        "Good progress! Here's how to improve your analysis:\n• Provide more detailed analysis and insights"
    );
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_unknown_session() {
    let judge = judge_with(Arc::new(KeywordPolicy::default()), 5);

    let outcome = judge.generate_response("missing", &[ChatMessage::assistant("hi")]).await;
    assert!(outcome.terminate);
    assert_eq!(outcome.feedback, "Error: Instance not found");
    assert_eq!(outcome.score, 0.0);
    assert_eq!(outcome.metadata["error"], "not_found");
}

#[tokio::test]
async fn test_finalize_twice_is_safe() {
    let judge = judge_with(Arc::new(KeywordPolicy::default()), 5);
    let id = judge.start_interaction(Some("traj-1".into()), None).await;
    assert_eq!(id, "traj-1");

    let first = judge.finalize_interaction(&id).await;
    assert!(first.is_some());
    assert!(judge.finalize_interaction(&id).await.is_none());
    assert!(judge.session(&id).await.is_none());
    assert_eq!(judge.calculate_score(&id).await, 0.0);
}

#[tokio::test]
async fn test_concurrent_sessions_are_independent() {
    let judge = Arc::new(judge_with(Arc::new(FixedPolicy(0.9)), 5));

    let mut handles = Vec::new();
    for n in 0..8 {
        let judge = Arc::clone(&judge);
        handles.push(tokio::spawn(async move {
            let id = judge.start_interaction(Some(format!("s{}", n)), None).await;
            let text = if n % 2 == 0 { thorough_message() } else { "short".to_string() };
            judge.generate_response(&id, &[ChatMessage::assistant(text)]).await
        }));
    }

    for (n, handle) in handles.into_iter().enumerate() {
        let outcome = handle.await.unwrap();
        assert_eq!(outcome.terminate, n % 2 == 0);
    }
}

// =============================================================================
// Standalone reward
// =============================================================================

#[test]
fn test_exploration_reward_range() {
    assert_eq!(exploration_reward("tiny"), 0.0);
    let score = exploration_reward(&thorough_message());
    assert!(score > 0.0 && score <= 1.0);
}
