//! Per-trajectory interaction session

use serde::Serialize;

use crate::policy::ToolCategory;

/// Weight of tool usage in the turn score
pub const TOOL_WEIGHT: f64 = 0.4;
/// Weight of analysis quality in the turn score
pub const ANALYSIS_WEIGHT: f64 = 0.4;
/// Weight of completeness in the turn score
pub const COMPLETENESS_WEIGHT: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Active,
    Terminated,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Terminated => write!(f, "terminated"),
        }
    }
}

/// Signals and scores accumulated over one trajectory's turns
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,
    pub ground_truth: Option<String>,
    pub turn_count: u32,
    pub state: SessionState,
    pub used_todo: bool,
    pub used_bash: bool,
    pub used_file_reader: bool,
    pub tool_usage: f64,
    pub analysis_quality: f64,
    pub completeness: f64,
    pub last_response: String,
}

impl Session {
    pub fn new(id: impl Into<String>, ground_truth: Option<String>) -> Self {
        Self {
            id: id.into(),
            ground_truth,
            turn_count: 0,
            state: SessionState::Active,
            used_todo: false,
            used_bash: false,
            used_file_reader: false,
            tool_usage: 0.0,
            analysis_quality: 0.0,
            completeness: 0.0,
            last_response: String::new(),
        }
    }

    /// Weighted blend of the three sub-scores, capped at 1.0
    pub fn score(&self) -> f64 {
        let blended = TOOL_WEIGHT * self.tool_usage
            + ANALYSIS_WEIGHT * self.analysis_quality
            + COMPLETENESS_WEIGHT * self.completeness;
        blended.min(1.0)
    }

    pub fn is_terminated(&self) -> bool {
        self.state == SessionState::Terminated
    }

    /// Flags stay set once seen
    pub fn mark_used(&mut self, category: ToolCategory) {
        match category {
            ToolCategory::Todo => self.used_todo = true,
            ToolCategory::Bash => self.used_bash = true,
            ToolCategory::FileReader => self.used_file_reader = true,
        }
    }

    pub fn has_used(&self, category: ToolCategory) -> bool {
        match category {
            ToolCategory::Todo => self.used_todo,
            ToolCategory::Bash => self.used_bash,
            ToolCategory::FileReader => self.used_file_reader,
        }
    }

    /// Categories not yet seen, in display order
    pub fn unused_tools(&self) -> Vec<ToolCategory> {
        ToolCategory::ALL.into_iter().filter(|c| !self.has_used(*c)).collect()
    }

    pub fn tools_used_count(&self) -> usize {
        ToolCategory::ALL.len() - self.unused_tools().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_active_and_zeroed() {
        let session = Session::new("abc", None);
        assert_eq!(session.state, SessionState::Active);
        assert_eq!(session.turn_count, 0);
        assert_eq!(session.score(), 0.0);
        assert_eq!(session.unused_tools().len(), 3);
    }

    #[test]
    fn test_score_blend() {
        let mut session = Session::new("abc", None);
        session.tool_usage = 1.0;
        session.analysis_quality = 0.9;
        session.completeness = 1.0;
        assert!((session.score() - 0.96).abs() < 1e-9);
    }

    #[test]
    fn test_mark_used_is_sticky() {
        let mut session = Session::new("abc", None);
        session.mark_used(ToolCategory::Bash);
        session.mark_used(ToolCategory::Bash);
        assert_eq!(session.tools_used_count(), 1);
        assert_eq!(session.unused_tools(), vec![ToolCategory::Todo, ToolCategory::FileReader]);
    }
}
