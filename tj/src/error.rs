//! Judge error types

use thiserror::Error;

/// Errors raised while building a judge from configuration
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("max-turns must be at least 1")]
    InvalidMaxTurns,

    #[error("Rubric '{category}' has invalid weight {weight}; weights must be finite and non-negative")]
    InvalidWeight { category: String, weight: f64 },

    #[error("Rubric '{category}' has a keyword group with no keywords")]
    EmptyKeywordGroup { category: String },

    #[error("Rubric category must not be empty")]
    EmptyCategory,

    #[error("Duplicate rubric category: {0}")]
    DuplicateCategory(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_weight_message() {
        let err = JudgeError::InvalidWeight {
            category: "overview".to_string(),
            weight: -0.5,
        };
        let msg = err.to_string();
        assert!(msg.contains("overview"));
        assert!(msg.contains("-0.5"));
    }
}
