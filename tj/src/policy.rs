//! Scoring policies - turn a message into tool-usage signals and an analysis score
//!
//! The session state machine only sees the [`ScoringPolicy`] trait. The
//! default [`KeywordPolicy`] scores by weighted keyword groups per ground-truth
//! category, falling back to a generic rubric for unrecognized categories.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::error::JudgeError;

/// Category name of the fallback rubric
pub const GENERIC_CATEGORY: &str = "generic";

/// Tool families inferred from transcript text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Todo,
    Bash,
    FileReader,
}

impl ToolCategory {
    pub const ALL: [ToolCategory; 3] = [Self::Todo, Self::Bash, Self::FileReader];

    /// Words whose presence suggests the tool was used
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::Todo => &["todo", "task", "plan", "step"],
            Self::Bash => &["ls", "bash", "command", "execute"],
            Self::FileReader => &["read", "file", "examine", "content"],
        }
    }

    /// Improvement hint shown while the tool has not been used
    pub fn hint(&self) -> &'static str {
        match self {
            Self::Todo => "Use the todo_manager to create a structured exploration plan",
            Self::Bash => "Use bash to explore directory structures and file listings",
            Self::FileReader => "Use read_file to examine key implementation files",
        }
    }
}

/// Pluggable scorer consulted once per turn
pub trait ScoringPolicy: Send + Sync {
    /// Tool categories the message indicates were used
    fn tools_used(&self, text: &str) -> Vec<ToolCategory> {
        let lower = text.to_lowercase();
        ToolCategory::ALL
            .into_iter()
            .filter(|category| contains_any(&lower, category.keywords()))
            .collect()
    }

    /// Analysis quality in [0, 1] for a message against a ground-truth label
    fn analysis_quality(&self, ground_truth: Option<&str>, text: &str) -> f64;
}

/// Keywords that together are worth `weight`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordGroup {
    pub keywords: Vec<String>,
    pub weight: f64,
}

impl KeywordGroup {
    pub fn new(keywords: &[&str], weight: f64) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            weight,
        }
    }
}

/// Weighted keyword groups for one ground-truth category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rubric {
    pub category: String,
    pub groups: Vec<KeywordGroup>,
}

impl Rubric {
    pub fn new(category: impl Into<String>, groups: Vec<KeywordGroup>) -> Self {
        Self {
            category: category.into(),
            groups,
        }
    }

    /// Sum of the weights of every group with a keyword in `lower`, capped at 1.0
    pub fn score(&self, lower: &str) -> f64 {
        let total: f64 = self
            .groups
            .iter()
            .filter(|g| g.keywords.iter().any(|k| lower.contains(&k.to_lowercase())))
            .map(|g| g.weight)
            .sum();
        total.min(1.0)
    }

    pub fn validate(&self) -> Result<(), JudgeError> {
        if self.category.trim().is_empty() {
            return Err(JudgeError::EmptyCategory);
        }
        for group in &self.groups {
            if !group.weight.is_finite() || group.weight < 0.0 {
                return Err(JudgeError::InvalidWeight {
                    category: self.category.clone(),
                    weight: group.weight,
                });
            }
            if group.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(JudgeError::EmptyKeywordGroup {
                    category: self.category.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Complete rubric set: category rubrics plus the fallback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricSet {
    pub rubrics: Vec<Rubric>,
    pub fallback: Rubric,
}

impl Default for RubricSet {
    fn default() -> Self {
        Self {
            rubrics: vec![
                Rubric::new(
                    "repository_overview_analysis",
                    vec![
                        KeywordGroup::new(&["structure", "architecture", "organize", "framework"], 0.3),
                        KeywordGroup::new(&["purpose", "goal", "function", "system"], 0.3),
                        KeywordGroup::new(&["component", "module", "tool", "directory"], 0.2),
                        KeywordGroup::new(&["verl", "reinforcement", "learning", "training"], 0.2),
                    ],
                ),
                Rubric::new(
                    "tools_architecture_analysis",
                    vec![
                        KeywordGroup::new(&["basetool", "base_tool", "inherit", "abstract"], 0.4),
                        KeywordGroup::new(&["method", "async", "execute", "create"], 0.3),
                        KeywordGroup::new(&["schema", "config", "register", "load"], 0.3),
                    ],
                ),
                Rubric::new(
                    "configuration_system_analysis",
                    vec![
                        KeywordGroup::new(&["yaml", "config", "parameter", "setting"], 0.4),
                        KeywordGroup::new(&["example", "template", "sample"], 0.3),
                        KeywordGroup::new(&["model", "batch", "learning", "optimizer"], 0.3),
                    ],
                ),
            ],
            fallback: generic_rubric(),
        }
    }
}

fn generic_rubric() -> Rubric {
    Rubric::new(
        GENERIC_CATEGORY,
        vec![
            KeywordGroup::new(&["analyze", "understand", "examine", "investigate"], 0.5),
            KeywordGroup::new(&["pattern", "structure", "design", "implement"], 0.3),
            KeywordGroup::new(&["conclusion", "summary", "insight", "finding"], 0.2),
        ],
    )
}

/// Keyword-weighted rubric scoring
#[derive(Debug, Clone, Default)]
pub struct KeywordPolicy {
    set: RubricSet,
}

impl KeywordPolicy {
    /// Build from configured rubrics; a rubric named `generic` replaces the fallback
    pub fn new(rubrics: Vec<Rubric>) -> Result<Self, JudgeError> {
        let mut seen = HashSet::new();
        let mut fallback = generic_rubric();
        let mut categories = Vec::new();

        for rubric in rubrics {
            rubric.validate()?;
            if !seen.insert(rubric.category.clone()) {
                return Err(JudgeError::DuplicateCategory(rubric.category));
            }
            if rubric.category == GENERIC_CATEGORY {
                fallback = rubric;
            } else {
                categories.push(rubric);
            }
        }

        Ok(Self {
            set: RubricSet {
                rubrics: categories,
                fallback,
            },
        })
    }

    pub fn rubric_set(&self) -> &RubricSet {
        &self.set
    }

    /// The rubric applied for a ground-truth label
    pub fn rubric_for(&self, ground_truth: Option<&str>) -> &Rubric {
        ground_truth
            .and_then(|gt| self.set.rubrics.iter().find(|r| r.category == gt))
            .unwrap_or(&self.set.fallback)
    }
}

impl ScoringPolicy for KeywordPolicy {
    fn analysis_quality(&self, ground_truth: Option<&str>, text: &str) -> f64 {
        let rubric = self.rubric_for(ground_truth);
        let score = rubric.score(&text.to_lowercase());
        debug!(category = %rubric.category, score, "KeywordPolicy::analysis_quality: scored");
        score
    }
}

pub(crate) fn contains_any(lower: &str, words: &[&str]) -> bool {
    words.iter().any(|w| lower.contains(w))
}
