//! Leaderboard ranking over a snapshot of every player's statistics.
//!
//! The ranking is recomputed from scratch on every call; nothing is cached.

use crate::{ActivityEntry, Difficulty, TimeBand, UserStatistics};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Scores closer than this are treated as tied
const SCORE_TIE_WINDOW: f64 = 0.1;

/// Default number of ranked entries
pub const DEFAULT_LIMIT: usize = 50;

/// One player's statistics as read from the store
#[derive(Debug, Clone)]
pub struct PlayerSnapshot {
    pub user_id: String,
    pub name: String,
    pub stats: UserStatistics,
}

/// Which games count towards the ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardFilter {
    pub difficulty: Option<Difficulty>,
    pub time_band: Option<TimeBand>,
    pub limit: usize,
}

impl Default for LeaderboardFilter {
    fn default() -> Self {
        Self {
            difficulty: None,
            time_band: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl LeaderboardFilter {
    fn matches(&self, game: &ActivityEntry) -> bool {
        self.difficulty.map_or(true, |d| game.difficulty == d)
            && self.time_band.map_or(true, |band| band.contains(game.time))
    }
}

/// A ranked player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub name: String,
    pub score: f64,
    pub highest_score: u64,
    pub difficulty: Difficulty,
    pub time: u64,
    pub date: NaiveDate,
}

/// Rank players by their recent games.
///
/// With a difficulty filter the score is the persisted per-difficulty
/// average rather than the mean of the matching games.
pub fn compute_leaderboard(
    players: &[PlayerSnapshot],
    filter: &LeaderboardFilter,
) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = players
        .iter()
        .filter_map(|player| rank_player(player, filter))
        .collect();

    sort_entries(&mut entries);
    entries.truncate(filter.limit);
    entries
}

fn rank_player(player: &PlayerSnapshot, filter: &LeaderboardFilter) -> Option<LeaderboardEntry> {
    let stats = &player.stats;

    if let Some(difficulty) = filter.difficulty {
        if stats.by_difficulty.get(difficulty).total == 0 {
            return None;
        }
    }

    let games: Vec<&ActivityEntry> = stats
        .recent_activity
        .iter()
        .filter(|game| filter.matches(game))
        .collect();
    if games.is_empty() {
        return None;
    }

    // First occurrence wins ties
    let best = games
        .iter()
        .copied()
        .reduce(|best, game| if game.score > best.score { game } else { best })?;

    let score = match filter.difficulty {
        Some(difficulty) => stats.by_difficulty.get(difficulty).avg_score as f64,
        None => games.iter().map(|g| g.score as f64).sum::<f64>() / games.len() as f64,
    };

    Some(LeaderboardEntry {
        user_id: player.user_id.clone(),
        name: player.name.clone(),
        score,
        highest_score: best.score,
        difficulty: filter.difficulty.unwrap_or(best.difficulty),
        time: best.time,
        date: best.date,
    })
}

/// Higher score first; near-equal scores fall back to the faster time
fn compare_entries(a: &LeaderboardEntry, b: &LeaderboardEntry) -> Ordering {
    if (b.score - a.score).abs() > SCORE_TIE_WINDOW {
        b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal)
    } else {
        a.time.cmp(&b.time)
    }
}

/// Stable insertion sort.
///
/// The tie window is not transitive, so `compare_entries` is not a total
/// order and cannot be handed to `slice::sort_by`.
fn sort_entries(entries: &mut [LeaderboardEntry]) {
    for i in 1..entries.len() {
        let mut j = i;
        while j > 0 && compare_entries(&entries[j - 1], &entries[j]) == Ordering::Greater {
            entries.swap(j - 1, j);
            j -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{merge_session, SessionResult};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn player(id: &str, games: &[(u64, Difficulty, u64)]) -> PlayerSnapshot {
        let mut stats: Option<UserStatistics> = None;
        for (i, &(score, difficulty, time)) in games.iter().enumerate() {
            let result = SessionResult::new(score, difficulty, time, day(i as u32 + 1));
            stats = Some(merge_session(stats.as_ref(), &result));
        }
        PlayerSnapshot {
            user_id: id.to_string(),
            name: id.to_uppercase(),
            stats: stats.unwrap_or_default(),
        }
    }

    fn entry(id: &str, score: f64, time: u64) -> LeaderboardEntry {
        LeaderboardEntry {
            user_id: id.to_string(),
            name: id.to_string(),
            score,
            highest_score: score as u64,
            difficulty: Difficulty::Easy,
            time,
            date: day(1),
        }
    }

    #[test]
    fn test_near_equal_scores_ordered_by_time() {
        let mut entries = vec![entry("slow", 50.05, 60), entry("fast", 50.0, 15)];
        sort_entries(&mut entries);
        assert_eq!(entries[0].user_id, "fast");
        assert_eq!(entries[1].user_id, "slow");
    }

    #[test]
    fn test_distinct_scores_ordered_by_score() {
        let mut entries = vec![entry("low", 50.0, 15), entry("high", 51.0, 60)];
        sort_entries(&mut entries);
        assert_eq!(entries[0].user_id, "high");
        assert_eq!(entries[1].user_id, "low");
    }

    #[test]
    fn test_ranking_from_player_stats() {
        let players = vec![
            player("slow", &[(50, Difficulty::Medium, 60)]),
            player("fast", &[(50, Difficulty::Medium, 15)]),
            player("high", &[(51, Difficulty::Medium, 60)]),
        ];
        let board = compute_leaderboard(&players, &LeaderboardFilter::default());
        let ids: Vec<&str> = board.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(ids, vec!["high", "fast", "slow"]);
        assert!((board[0].score - 51.0).abs() < f64::EPSILON);

        let filter = LeaderboardFilter {
            difficulty: Some(Difficulty::Medium),
            ..Default::default()
        };
        let board = compute_leaderboard(&players, &filter);
        let ids: Vec<&str> = board.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(ids, vec!["high", "fast", "slow"]);
    }

    #[test]
    fn test_players_without_matching_games_skipped() {
        let players = vec![
            player("a", &[(10, Difficulty::Easy, 30)]),
            player("b", &[(12, Difficulty::Hard, 30)]),
            player("c", &[]),
        ];
        let filter = LeaderboardFilter {
            difficulty: Some(Difficulty::Easy),
            ..Default::default()
        };
        let board = compute_leaderboard(&players, &filter);
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].user_id, "a");
    }

    #[test]
    fn test_unfiltered_score_is_mean_of_recent_games() {
        let players = vec![player(
            "a",
            &[(10, Difficulty::Easy, 30), (20, Difficulty::Hard, 60), (15, Difficulty::Medium, 45)],
        )];
        let board = compute_leaderboard(&players, &LeaderboardFilter::default());
        assert_eq!(board.len(), 1);
        assert!((board[0].score - 15.0).abs() < f64::EPSILON);
        assert_eq!(board[0].highest_score, 20);
        assert_eq!(board[0].difficulty, Difficulty::Hard);
        assert_eq!(board[0].time, 60);
    }

    #[test]
    fn test_difficulty_filter_uses_persisted_average() {
        let mut snapshot = player("a", &[(10, Difficulty::Easy, 30), (20, Difficulty::Easy, 30)]);
        // Persisted average deliberately out of line with the recent games
        snapshot.stats.by_difficulty.easy.avg_score = 99;

        let filter = LeaderboardFilter {
            difficulty: Some(Difficulty::Easy),
            ..Default::default()
        };
        let board = compute_leaderboard(&[snapshot], &filter);
        assert!((board[0].score - 99.0).abs() < f64::EPSILON);
        assert_eq!(board[0].highest_score, 20);
        assert_eq!(board[0].difficulty, Difficulty::Easy);
    }

    #[test]
    fn test_time_band_filter() {
        let players = vec![
            player("quick", &[(5, Difficulty::Easy, 15)]),
            player("steady", &[(7, Difficulty::Easy, 45)]),
            player("long", &[(9, Difficulty::Easy, 90)]),
        ];
        for (band, expected) in [
            (TimeBand::Fast, "quick"),
            (TimeBand::Medium, "steady"),
            (TimeBand::Slow, "long"),
        ] {
            let filter = LeaderboardFilter {
                time_band: Some(band),
                ..Default::default()
            };
            let board = compute_leaderboard(&players, &filter);
            assert_eq!(board.len(), 1, "{}", band);
            assert_eq!(board[0].user_id, expected);
        }
    }

    #[test]
    fn test_best_game_ties_keep_first_occurrence() {
        // Recent activity is newest first, so the later game comes first
        let players = vec![player("a", &[(8, Difficulty::Easy, 60), (8, Difficulty::Easy, 15)])];
        let board = compute_leaderboard(&players, &LeaderboardFilter::default());
        assert_eq!(board[0].time, 15);
        assert_eq!(board[0].date, day(2));
    }

    #[test]
    fn test_limit_truncates() {
        let players: Vec<PlayerSnapshot> = (0..10)
            .map(|i| player(&format!("p{}", i), &[(i, Difficulty::Medium, 30)]))
            .collect();
        let filter = LeaderboardFilter {
            limit: 3,
            ..Default::default()
        };
        let board = compute_leaderboard(&players, &filter);
        let ids: Vec<&str> = board.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(ids, vec!["p9", "p8", "p7"]);
    }
}
