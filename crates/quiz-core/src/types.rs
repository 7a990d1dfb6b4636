use crate::QuizError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Difficulty tier of a quiz game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Difficulty {
    #[serde(alias = "easy", alias = "Easy")]
    Easy,
    #[serde(alias = "medium", alias = "Medium")]
    Medium,
    #[serde(alias = "hard", alias = "Hard")]
    Hard,
}

impl Difficulty {
    /// All tiers, easiest first
    pub fn all() -> &'static [Difficulty] {
        &[Difficulty::Easy, Difficulty::Medium, Difficulty::Hard]
    }

    /// Lower-case key used for the per-difficulty buckets of a stats document
    pub fn key(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn next(&self) -> Difficulty {
        match self {
            Difficulty::Easy => Difficulty::Medium,
            Difficulty::Medium => Difficulty::Hard,
            Difficulty::Hard => Difficulty::Easy,
        }
    }

    pub fn prev(&self) -> Difficulty {
        match self {
            Difficulty::Easy => Difficulty::Hard,
            Difficulty::Medium => Difficulty::Easy,
            Difficulty::Hard => Difficulty::Medium,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "EASY"),
            Difficulty::Medium => write!(f, "MEDIUM"),
            Difficulty::Hard => write!(f, "HARD"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = QuizError;

    /// Case-insensitive: "easy", "Easy" and "EASY" all parse
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(QuizError::UnknownVariant {
                kind: "difficulty",
                value: s.to_string(),
            }),
        }
    }
}

/// Arithmetic operator of a problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Add,
    Multiply,
}

impl Operator {
    pub fn apply(&self, a: u32, b: u32) -> u32 {
        match self {
            Operator::Add => a + b,
            Operator::Multiply => a * b,
        }
    }

    /// Symbol shown to the player
    pub fn symbol(&self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Multiply => '×',
        }
    }

    /// Key used for the per-operation buckets of a stats document
    pub fn key(&self) -> &'static str {
        match self {
            Operator::Add => "addition",
            Operator::Multiply => "multiplication",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Leaderboard filter on how long a game lasted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeBand {
    /// 30 seconds or less
    Fast,
    /// More than 30 and at most 60 seconds
    Medium,
    /// More than 60 seconds
    Slow,
}

impl TimeBand {
    pub fn all() -> &'static [TimeBand] {
        &[TimeBand::Fast, TimeBand::Medium, TimeBand::Slow]
    }

    pub fn contains(&self, time_secs: u64) -> bool {
        match self {
            TimeBand::Fast => time_secs <= 30,
            TimeBand::Medium => time_secs > 30 && time_secs <= 60,
            TimeBand::Slow => time_secs > 60,
        }
    }
}

impl fmt::Display for TimeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeBand::Fast => write!(f, "FAST"),
            TimeBand::Medium => write!(f, "MEDIUM"),
            TimeBand::Slow => write!(f, "SLOW"),
        }
    }
}

impl FromStr for TimeBand {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(TimeBand::Fast),
            "medium" => Ok(TimeBand::Medium),
            "slow" => Ok(TimeBand::Slow),
            _ => Err(QuizError::UnknownVariant {
                kind: "time band",
                value: s.to_string(),
            }),
        }
    }
}
