use crate::stats::ByOperation;
use crate::{AttemptOutcome, Difficulty};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Durations offered to the player, in seconds
pub const DURATION_CHOICES: [u64; 4] = [15, 30, 45, 60];
pub const DEFAULT_DURATION_SECS: u64 = 30;

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Settings can change; the countdown starts on the first answer
    Ready,
    Playing,
    Finished,
}

/// Result of a completed timed session, consumed once by [`crate::merge_session`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    pub score: u64,
    pub difficulty: Difficulty,
    pub duration_seconds: u64,
    pub completed_on_date: NaiveDate,
    #[serde(default)]
    pub correct_answers: u64,
    #[serde(default)]
    pub by_operation: ByOperation,
}

impl SessionResult {
    /// Bare result with no per-operator detail
    pub fn new(score: u64, difficulty: Difficulty, duration_seconds: u64, date: NaiveDate) -> Self {
        Self {
            score,
            difficulty,
            duration_seconds,
            completed_on_date: date,
            correct_answers: score,
            by_operation: ByOperation::default(),
        }
    }
}

/// Score and countdown of one timed game
#[derive(Debug, Clone)]
pub struct Session {
    difficulty: Difficulty,
    duration_secs: u64,
    remaining_secs: u64,
    phase: SessionPhase,
    score: u64,
    attempts: u64,
    by_operation: ByOperation,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Difficulty::Medium, DEFAULT_DURATION_SECS)
    }
}

impl Session {
    pub fn new(difficulty: Difficulty, duration_secs: u64) -> Self {
        Self {
            difficulty,
            duration_secs,
            remaining_secs: duration_secs,
            phase: SessionPhase::Ready,
            score: 0,
            attempts: 0,
            by_operation: ByOperation::default(),
        }
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_playing(&self) -> bool {
        self.phase == SessionPhase::Playing
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Fraction of time left, 1.0 at the start
    pub fn time_fraction(&self) -> f64 {
        if self.duration_secs == 0 {
            0.0
        } else {
            self.remaining_secs as f64 / self.duration_secs as f64
        }
    }

    /// Change difficulty. Ignored once the countdown is running.
    pub fn set_difficulty(&mut self, difficulty: Difficulty) -> bool {
        if self.phase != SessionPhase::Ready {
            return false;
        }
        self.difficulty = difficulty;
        true
    }

    /// Change duration and reset the countdown. Ignored once it is running.
    pub fn set_duration(&mut self, duration_secs: u64) -> bool {
        if self.phase != SessionPhase::Ready {
            return false;
        }
        self.duration_secs = duration_secs;
        self.remaining_secs = duration_secs;
        true
    }

    /// Start the countdown if it has not started yet
    pub fn start(&mut self) {
        if self.phase == SessionPhase::Ready {
            self.phase = SessionPhase::Playing;
        }
    }

    /// Count a resolved problem. Starts the countdown on the first one.
    pub fn record(&mut self, outcome: &AttemptOutcome) {
        match self.phase {
            SessionPhase::Finished => return,
            SessionPhase::Ready => self.start(),
            SessionPhase::Playing => {}
        }

        self.attempts += u64::from(outcome.attempt_count);
        let bucket = self.by_operation.get_mut(outcome.operator);
        bucket.total += u64::from(outcome.attempt_count);
        if outcome.is_correct {
            bucket.correct += 1;
            self.score += 1;
        }
    }

    /// Advance the countdown by one second.
    ///
    /// Returns true when this tick ran the clock out.
    pub fn tick_second(&mut self) -> bool {
        if self.phase != SessionPhase::Playing {
            return false;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.phase = SessionPhase::Finished;
            return true;
        }
        false
    }

    /// Build the result of a finished session
    pub fn result(&self, date: NaiveDate) -> Option<SessionResult> {
        if self.phase != SessionPhase::Finished {
            return None;
        }
        Some(SessionResult {
            score: self.score,
            difficulty: self.difficulty,
            duration_seconds: self.duration_secs,
            completed_on_date: date,
            correct_answers: self.score,
            by_operation: self.by_operation.clone(),
        })
    }

    /// Fresh session with the same settings
    pub fn reset(&mut self) {
        *self = Self::new(self.difficulty, self.duration_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Operator;

    fn outcome(is_correct: bool) -> AttemptOutcome {
        AttemptOutcome {
            operator: Operator::Add,
            is_correct,
            attempt_count: 1,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn test_first_answer_starts_countdown() {
        let mut session = Session::new(Difficulty::Easy, 15);
        assert_eq!(session.phase(), SessionPhase::Ready);
        assert!(!session.tick_second());
        assert_eq!(session.remaining_secs(), 15);

        session.record(&outcome(true));
        assert!(session.is_playing());
        assert_eq!(session.score(), 1);
    }

    #[test]
    fn test_countdown_finishes() {
        let mut session = Session::new(Difficulty::Easy, 15);
        session.start();
        for _ in 0..14 {
            assert!(!session.tick_second());
        }
        assert!(session.tick_second());
        assert_eq!(session.phase(), SessionPhase::Finished);

        // Late answers do not count
        session.record(&outcome(true));
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn test_settings_locked_while_playing() {
        let mut session = Session::new(Difficulty::Easy, 30);
        assert!(session.set_duration(45));
        assert_eq!(session.remaining_secs(), 45);

        session.start();
        assert!(!session.set_duration(15));
        assert!(!session.set_difficulty(Difficulty::Hard));
        assert_eq!(session.duration_secs(), 45);
        assert_eq!(session.difficulty(), Difficulty::Easy);
    }

    #[test]
    fn test_result_only_when_finished() {
        let mut session = Session::new(Difficulty::Hard, 15);
        session.record(&outcome(true));
        session.record(&outcome(false));
        assert!(session.result(date()).is_none());

        while !session.tick_second() {}
        let result = session.result(date()).unwrap();
        assert_eq!(result.score, 1);
        assert_eq!(result.difficulty, Difficulty::Hard);
        assert_eq!(result.duration_seconds, 15);
        assert_eq!(result.by_operation.addition.total, 2);
        assert_eq!(result.by_operation.addition.correct, 1);
    }

    #[test]
    fn test_reset_keeps_settings() {
        let mut session = Session::new(Difficulty::Medium, 60);
        session.record(&outcome(true));
        session.reset();
        assert_eq!(session.phase(), SessionPhase::Ready);
        assert_eq!(session.score(), 0);
        assert_eq!(session.duration_secs(), 60);
        assert_eq!(session.difficulty(), Difficulty::Medium);
    }
}
