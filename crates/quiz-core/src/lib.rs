//! Core engine for the timed arithmetic quiz.
//!
//! - [`Generator`] produces problems for a difficulty tier
//! - [`Quiz`] feeds problems and checks answers digit by digit
//! - [`Session`] tracks the score and countdown of one timed game
//! - [`merge_session`] folds a finished game into a player's [`UserStatistics`]
//! - [`compute_leaderboard`] ranks players from a snapshot of their statistics

mod answer;
mod error;
mod generator;
mod leaderboard;
mod session;
mod stats;
mod types;

pub use answer::{submit, AttemptOutcome, Quiz, Submission};
pub use error::QuizError;
pub use generator::{Generator, GeneratorConfig, OperandRange, Problem};
pub use leaderboard::{
    compute_leaderboard, LeaderboardEntry, LeaderboardFilter, PlayerSnapshot,
    DEFAULT_LIMIT as DEFAULT_LEADERBOARD_LIMIT,
};
pub use session::{Session, SessionPhase, SessionResult, DEFAULT_DURATION_SECS, DURATION_CHOICES};
pub use stats::{
    merge_session, ActivityEntry, ByDifficulty, ByOperation, DifficultyStats, OperationStats,
    ScoreHistoryEntry, UserStatistics, RECENT_ACTIVITY_CAPACITY, SCORE_HISTORY_CAPACITY,
};
pub use types::{Difficulty, Operator, TimeBand};
