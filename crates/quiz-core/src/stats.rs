//! Per-player running statistics and the session merge.

use crate::{Difficulty, Operator, SessionResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of games kept in `recent_activity`
pub const RECENT_ACTIVITY_CAPACITY: usize = 10;
/// Number of points kept in `score_history`
pub const SCORE_HISTORY_CAPACITY: usize = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationStats {
    pub total: u64,
    pub correct: u64,
}

impl OperationStats {
    /// Accuracy as a whole percentage
    pub fn accuracy_percent(&self) -> u64 {
        if self.total == 0 {
            0
        } else {
            round_div(self.correct * 100, self.total)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByOperation {
    #[serde(default)]
    pub addition: OperationStats,
    #[serde(default)]
    pub multiplication: OperationStats,
}

impl ByOperation {
    pub fn get(&self, operator: Operator) -> &OperationStats {
        match operator {
            Operator::Add => &self.addition,
            Operator::Multiply => &self.multiplication,
        }
    }

    pub fn get_mut(&mut self, operator: Operator) -> &mut OperationStats {
        match operator {
            Operator::Add => &mut self.addition,
            Operator::Multiply => &mut self.multiplication,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DifficultyStats {
    pub total: u64,
    pub correct: u64,
    pub avg_score: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByDifficulty {
    #[serde(default)]
    pub easy: DifficultyStats,
    #[serde(default)]
    pub medium: DifficultyStats,
    #[serde(default)]
    pub hard: DifficultyStats,
}

impl ByDifficulty {
    pub fn get(&self, difficulty: Difficulty) -> &DifficultyStats {
        match difficulty {
            Difficulty::Easy => &self.easy,
            Difficulty::Medium => &self.medium,
            Difficulty::Hard => &self.hard,
        }
    }

    pub fn get_mut(&mut self, difficulty: Difficulty) -> &mut DifficultyStats {
        match difficulty {
            Difficulty::Easy => &mut self.easy,
            Difficulty::Medium => &mut self.medium,
            Difficulty::Hard => &mut self.hard,
        }
    }
}

/// A finished game as shown in the recent-activity list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub score: u64,
    pub difficulty: Difficulty,
    /// Game length in seconds
    pub time: u64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreHistoryEntry {
    pub date: NaiveDate,
    pub score: u64,
}

/// Running statistics stored with each player
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserStatistics {
    pub total_games: u64,
    pub total_score: u64,
    pub total_correct: u64,
    pub average_score: u64,
    pub highest_score: u64,
    /// Seconds
    pub total_time_played: u64,
    pub by_operation: ByOperation,
    pub by_difficulty: ByDifficulty,
    /// Newest first
    pub recent_activity: Vec<ActivityEntry>,
    /// Oldest first
    pub score_history: Vec<ScoreHistoryEntry>,
}

impl UserStatistics {
    /// Fold a finished session into these statistics
    pub fn merged(&self, result: &SessionResult) -> UserStatistics {
        let mut stats = self.clone();

        stats.total_games += 1;
        stats.total_score += result.score;
        stats.total_time_played += result.duration_seconds;
        stats.average_score = round_div(stats.total_score, stats.total_games);
        stats.highest_score = stats.highest_score.max(result.score);

        // Running mean over every game at this tier
        let bucket = stats.by_difficulty.get_mut(result.difficulty);
        let old_total = bucket.total;
        bucket.total += 1;
        bucket.avg_score = round_div(bucket.avg_score * old_total + result.score, bucket.total);
        bucket.correct += result.correct_answers;

        stats.recent_activity.insert(
            0,
            ActivityEntry {
                score: result.score,
                difficulty: result.difficulty,
                time: result.duration_seconds,
                date: result.completed_on_date,
            },
        );
        stats.recent_activity.truncate(RECENT_ACTIVITY_CAPACITY);

        stats.score_history.push(ScoreHistoryEntry {
            date: result.completed_on_date,
            score: result.score,
        });
        if stats.score_history.len() > SCORE_HISTORY_CAPACITY {
            let excess = stats.score_history.len() - SCORE_HISTORY_CAPACITY;
            stats.score_history.drain(..excess);
        }

        stats.total_correct += result.correct_answers;
        for operator in [Operator::Add, Operator::Multiply] {
            let session = result.by_operation.get(operator);
            let bucket = stats.by_operation.get_mut(operator);
            bucket.total += session.total;
            bucket.correct += session.correct;
        }

        stats
    }
}

/// Merge a finished session into a player's statistics.
///
/// A player without statistics starts from zero. The input is never modified.
pub fn merge_session(stats: Option<&UserStatistics>, result: &SessionResult) -> UserStatistics {
    match stats {
        Some(stats) => stats.merged(result),
        None => UserStatistics::default().merged(result),
    }
}

/// `round(n / d)` with halves rounded up, for non-negative integers
fn round_div(n: u64, d: u64) -> u64 {
    if d == 0 {
        return 0;
    }
    (2 * n + d) / (2 * d)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() + chrono::Days::new(u64::from(day))
    }

    fn result(score: u64, difficulty: Difficulty) -> SessionResult {
        SessionResult::new(score, difficulty, 30, date(0))
    }

    #[test]
    fn test_round_div_half_up() {
        assert_eq!(round_div(60, 3), 20);
        assert_eq!(round_div(5, 2), 3);
        assert_eq!(round_div(7, 3), 2);
        assert_eq!(round_div(8, 3), 3);
        assert_eq!(round_div(0, 4), 0);
    }

    #[test]
    fn test_new_player_from_zero() {
        let stats = merge_session(None, &result(8, Difficulty::Easy));
        assert_eq!(stats.total_games, 1);
        assert_eq!(stats.total_score, 8);
        assert_eq!(stats.average_score, 8);
        assert_eq!(stats.highest_score, 8);
        assert_eq!(stats.total_time_played, 30);
        assert_eq!(stats.by_difficulty.easy.total, 1);
        assert_eq!(stats.by_difficulty.easy.avg_score, 8);
        assert_eq!(stats.by_difficulty.medium, DifficultyStats::default());
        assert_eq!(
            stats.recent_activity,
            vec![ActivityEntry {
                score: 8,
                difficulty: Difficulty::Easy,
                time: 30,
                date: date(0),
            }]
        );
    }

    #[test]
    fn test_average_score_rounds() {
        let mut stats = UserStatistics::default();
        for score in [10, 20, 30] {
            stats = stats.merged(&result(score, Difficulty::Medium));
        }
        assert_eq!(stats.average_score, 20);
        assert_eq!(stats.highest_score, 30);
        assert_eq!(stats.by_difficulty.medium.avg_score, 20);
    }

    #[test]
    fn test_same_session_twice_counts_twice() {
        let session = result(5, Difficulty::Hard);
        let once = merge_session(None, &session);
        let twice = merge_session(Some(&once), &session);
        assert_eq!(once.total_games, 1);
        assert_eq!(twice.total_games, 2);
        assert_eq!(twice.total_score, 10);
        assert_eq!(twice.by_difficulty.hard.total, 2);
    }

    #[test]
    fn test_merge_leaves_input_untouched() {
        let before = merge_session(None, &result(3, Difficulty::Easy));
        let copy = before.clone();
        let _after = merge_session(Some(&before), &result(9, Difficulty::Easy));
        assert_eq!(before, copy);
    }

    #[test]
    fn test_bounded_lists_evict_oldest() {
        let mut stats = UserStatistics::default();
        for i in 0..40u32 {
            let r = SessionResult::new(u64::from(i), Difficulty::Easy, 15, date(i));
            stats = stats.merged(&r);
        }
        assert_eq!(stats.recent_activity.len(), RECENT_ACTIVITY_CAPACITY);
        assert_eq!(stats.score_history.len(), SCORE_HISTORY_CAPACITY);

        // Newest first / oldest first
        assert_eq!(stats.recent_activity[0].score, 39);
        assert_eq!(stats.recent_activity[9].score, 30);
        assert_eq!(stats.score_history[0].score, 10);
        assert_eq!(stats.score_history[29].score, 39);
        assert_eq!(stats.total_games, 40);
    }

    #[test]
    fn test_bucket_mean_uses_all_games_at_tier() {
        let stats = merge_session(None, &result(4, Difficulty::Hard));
        let stats = merge_session(Some(&stats), &result(0, Difficulty::Hard));
        let stats = merge_session(Some(&stats), &result(7, Difficulty::Easy));
        // round((4 * 1 + 0) / 2)
        assert_eq!(stats.by_difficulty.hard.avg_score, 2);
        assert_eq!(stats.by_difficulty.hard.total, 2);
        assert_eq!(stats.by_difficulty.easy.avg_score, 7);
        assert_eq!(stats.average_score, 4); // round(11 / 3)
    }

    #[test]
    fn test_operation_tallies_accumulate() {
        let mut session = result(3, Difficulty::Medium);
        session.by_operation.addition = OperationStats { total: 4, correct: 2 };
        session.by_operation.multiplication = OperationStats { total: 1, correct: 1 };

        let stats = merge_session(None, &session);
        let stats = merge_session(Some(&stats), &session);
        assert_eq!(stats.by_operation.addition, OperationStats { total: 8, correct: 4 });
        assert_eq!(stats.by_operation.multiplication.accuracy_percent(), 100);
        assert_eq!(stats.total_correct, 6);
        assert_eq!(stats.by_difficulty.medium.correct, 6);
    }

    #[test]
    fn test_document_shape() {
        let stats = merge_session(None, &result(8, Difficulty::Easy));
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["totalGames"], 1);
        assert_eq!(json["byDifficulty"]["easy"]["avgScore"], 8);
        assert_eq!(json["recentActivity"][0]["difficulty"], "EASY");
        assert_eq!(json["recentActivity"][0]["date"], "2024-03-01");
        assert_eq!(json["scoreHistory"][0]["score"], 8);
    }

    #[test]
    fn test_sparse_document_deserializes() {
        let stats: UserStatistics =
            serde_json::from_str(r#"{"totalGames": 2, "totalScore": 9}"#).unwrap();
        assert_eq!(stats.total_games, 2);
        assert!(stats.recent_activity.is_empty());
        assert_eq!(stats.by_difficulty.hard, DifficultyStats::default());
    }
}
