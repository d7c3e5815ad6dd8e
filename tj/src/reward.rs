//! Trajectory rewards for a complete exploration answer
//!
//! [`exploration_reward`] is the quick keyword-and-length heuristic.
//! [`score_solution`] is the full weighted score: tool usage, rubric-keyed
//! analysis quality, completeness and methodology, plus bonus points.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::policy::{ScoringPolicy, contains_any};

/// Solutions shorter than this (trimmed, in chars) score zero
pub const MIN_SOLUTION_CHARS: usize = 50;

const TOOL_INDICATORS: [(&[&str], f64); 3] = [
    (&["todo", "task", "plan", "list"], 0.15),
    (&["ls", "bash", "command", "directory", "execute", "pwd", "find"], 0.15),
    (&["read", "file", "examine", "code", "analyze"], 0.10),
];

const ANALYSIS_INDICATORS: [(&[&str], f64); 3] = [
    (&["structure", "architecture", "organize", "system"], 0.10),
    (&["understand", "analyze", "explore", "investigate"], 0.10),
    (&["implement", "pattern", "design", "method"], 0.10),
];

fn length_tier(chars: usize) -> f64 {
    match chars {
        n if n >= 500 => 0.30,
        n if n >= 300 => 0.20,
        n if n >= 150 => 0.10,
        _ => 0.0,
    }
}

/// Score a solution text in [0, 1] from keyword indicators and length
pub fn exploration_reward(solution: &str) -> f64 {
    let trimmed = solution.trim();
    let chars = trimmed.chars().count();
    if chars < MIN_SOLUTION_CHARS {
        return 0.0;
    }

    let lower = solution.to_lowercase();
    let indicators: f64 = TOOL_INDICATORS
        .iter()
        .chain(ANALYSIS_INDICATORS.iter())
        .filter(|(words, _)| contains_any(&lower, words))
        .map(|(_, weight)| weight)
        .sum();

    (indicators + length_tier(chars)).min(1.0)
}

/// Solutions shorter than this (trimmed, in chars) get no full score
pub const MIN_SCORED_CHARS: usize = 30;

const TOOL_WEIGHT: f64 = 0.35;
const ANALYSIS_WEIGHT: f64 = 0.30;
const COMPLETENESS_WEIGHT: f64 = 0.20;
const METHODOLOGY_WEIGHT: f64 = 0.15;

/// Per-component breakdown of a full solution score
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub tool_usage: f64,
    pub analysis_quality: f64,
    pub completeness: f64,
    pub methodology: f64,
    pub bonus: f64,
    pub total: f64,
}

/// One entry of a batch; field names follow the dataset records
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RewardSample {
    pub data_source: String,
    pub solution_str: String,
    pub ground_truth: String,
}

fn count_present(lower: &str, words: &[&str]) -> usize {
    words.iter().filter(|w| lower.contains(*w)).count()
}

fn tool_usage(lower: &str) -> f64 {
    let mut score = 0.0;
    if contains_any(lower, &["todo", "task", "plan", "step", "organize", "list"]) {
        score += 0.4;
        if contains_any(lower, &["add", "complete", "mark"]) {
            score += 0.1;
        }
    }
    if contains_any(lower, &["ls", "bash", "command", "execute", "directory", "find", "grep", "cat"]) {
        score += 0.4;
        if count_present(lower, &["ls", "find", "grep", "cat", "pwd", "tree"]) >= 2 {
            score += 0.1;
        }
    }
    if contains_any(lower, &["read", "file", "examine", "content", "code", "implementation"]) {
        score += 0.3;
        if contains_any(lower, &[".py", ".yaml", ".md", ".txt"]) {
            score += 0.05;
        }
    }
    f64::min(score, 1.0)
}

fn completeness(chars: usize, lower: &str) -> f64 {
    let length = match chars {
        n if n >= 500 => 0.4,
        n if n >= 300 => 0.3,
        n if n >= 150 => 0.2,
        n if n >= 50 => 0.1,
        _ => 0.0,
    };
    let depth_words = [
        "detailed",
        "comprehensive",
        "thorough",
        "extensive",
        "deep",
        "multiple",
        "various",
        "different",
        "several",
        "many",
    ];
    let depth = match count_present(lower, &depth_words) {
        0 => 0.0,
        1 => 0.1,
        2 => 0.2,
        _ => 0.3,
    };
    let coverage = if contains_any(lower, &["overview", "summary", "conclusion", "insights"]) {
        0.2
    } else {
        0.0
    };
    let exploration_words = ["explore", "investigate", "discover", "find", "identify", "locate"];
    let breadth = if count_present(lower, &exploration_words) >= 2 { 0.1 } else { 0.0 };

    f64::min(length + depth + coverage + breadth, 1.0)
}

fn methodology(lower: &str) -> f64 {
    let steps = ["first", "next", "then", "finally", "step", "phase", "approach", "method"];
    let mut score = match count_present(lower, &steps) {
        0 => 0.0,
        1 => 0.2,
        2 => 0.3,
        _ => 0.4,
    };
    if contains_any(lower, &["plan", "strategy", "workflow", "process"]) {
        score += 0.3;
    }
    if contains_any(lower, &["verify", "check", "confirm", "validate"]) {
        score += 0.2;
    }
    if contains_any(lower, &["organize", "structure", "systematic", "methodical"]) {
        score += 0.2;
    }
    f64::min(score, 1.0)
}

/// Extra credit; code-pattern checks are case-sensitive on the raw text
fn bonus(lower: &str, raw: &str) -> f64 {
    let mut bonus = 0.0;
    let all_tools = contains_any(lower, &["todo", "task", "plan"])
        && contains_any(lower, &["ls", "bash", "command"])
        && contains_any(lower, &["read", "file", "examine"]);
    if all_tools {
        bonus += 0.1;
    }
    if contains_any(raw, &[".py", "def ", "class ", "import "]) {
        bonus += 0.05;
    }
    let structured = raw.matches('\n').count() >= 10 && contains_any(raw, &["*", "-", "1.", "2."]);
    if structured {
        bonus += 0.05;
    }
    let technical = ["async", "await", "inherit", "class", "method", "function", "api", "schema"];
    if count_present(lower, &technical) >= 3 {
        bonus += 0.05;
    }
    if contains_any(lower, &["recommend", "suggest", "should", "could", "improve"]) {
        bonus += 0.03;
    }
    bonus
}

/// Full weighted score of a solution against a ground-truth category
///
/// Analysis quality comes from `policy`, so configured rubrics apply here the
/// same way they do for interaction turns.
pub fn score_solution(solution: &str, ground_truth: Option<&str>, policy: &dyn ScoringPolicy) -> ScoreBreakdown {
    let chars = solution.trim().chars().count();
    if chars < MIN_SCORED_CHARS {
        return ScoreBreakdown::default();
    }

    let lower = solution.to_lowercase();
    let ground_truth = ground_truth.filter(|gt| !gt.is_empty());
    let mut breakdown = ScoreBreakdown {
        tool_usage: tool_usage(&lower),
        analysis_quality: policy.analysis_quality(ground_truth, solution).clamp(0.0, 1.0),
        completeness: completeness(chars, &lower),
        methodology: methodology(&lower),
        bonus: bonus(&lower, solution),
        total: 0.0,
    };

    let weighted = TOOL_WEIGHT * breakdown.tool_usage
        + ANALYSIS_WEIGHT * breakdown.analysis_quality
        + COMPLETENESS_WEIGHT * breakdown.completeness
        + METHODOLOGY_WEIGHT * breakdown.methodology;
    breakdown.total = f64::min(weighted + breakdown.bonus, 1.0);

    debug!(?breakdown, "reward::score_solution: scored");
    breakdown
}

/// Total scores for a batch of samples, in order
pub fn score_batch(samples: &[RewardSample], policy: &dyn ScoringPolicy) -> Vec<f64> {
    samples
        .iter()
        .map(|s| score_solution(&s.solution_str, Some(s.ground_truth.as_str()), policy).total)
        .collect()
}
