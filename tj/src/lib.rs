//! Turnjudge - multi-turn interaction judging for exploration trajectories
//!
//! A session tracks which tool families a trajectory's assistant messages
//! mention, scores each message against a category rubric and decides when the
//! interaction should end.
//!
//! # Modules
//!
//! - [`interaction`] - Session state machine and turn outcomes
//! - [`policy`] - Scoring policy trait and the keyword rubric policy
//! - [`session`] - Per-trajectory session record and score blend
//! - [`reward`] - Rewards for a complete solution text (quick heuristic and full weighted score)
//! - [`message`] - Transcript message types
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod error;
pub mod interaction;
pub mod message;
pub mod policy;
pub mod reward;
pub mod session;

pub use config::Config;
pub use error::JudgeError;
pub use interaction::{Interaction, Settings, TurnOutcome};
pub use message::{ChatMessage, Role};
pub use policy::{KeywordGroup, KeywordPolicy, Rubric, RubricSet, ScoringPolicy, ToolCategory};
pub use reward::{RewardSample, ScoreBreakdown, exploration_reward, score_batch, score_solution};
pub use session::{Session, SessionState};
