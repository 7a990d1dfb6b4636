//! User documents and the operations the game performs on them.

use crate::error::{ServiceError, ServiceResult, StoreError};
use crate::store::{Document, DocumentStore, FieldFilter, OrderBy, Query, Snapshot};
use crate::theme::ThemeName;
use chrono::{DateTime, Utc};
use quiz_core::{
    compute_leaderboard, merge_session, LeaderboardEntry, LeaderboardFilter, PlayerSnapshot,
    SessionResult, UserStatistics,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const USERS: &str = "users";

/// Extra documents fetched per requested leaderboard entry
const LEADERBOARD_OVERFETCH: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub theme: ThemeName,
    pub sound: bool,
    pub notifications: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            theme: ThemeName::Dark,
            sound: true,
            notifications: true,
        }
    }
}

/// The document stored per user in the `users` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDocument {
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub stats: UserStatistics,
    #[serde(default)]
    pub settings: UserSettings,
}

fn to_document<T: Serialize>(value: &T) -> ServiceResult<Document> {
    match serde_json::to_value(value).map_err(StoreError::from)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Document::new()),
    }
}

fn fields(pairs: Vec<(&str, Value)>) -> Document {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

fn timestamp(now: DateTime<Utc>) -> ServiceResult<Value> {
    Ok(serde_json::to_value(now).map_err(StoreError::from)?)
}

/// Reads and writes user documents
pub struct UserService {
    store: Arc<dyn DocumentStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Create the document for a freshly registered account, with zeroed stats
    pub fn create_user(&self, uid: &str, name: &str, email: &str) -> ServiceResult<UserDocument> {
        let now = Utc::now();
        let user = UserDocument {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            created_at: now,
            updated_at: now,
            stats: UserStatistics::default(),
            settings: UserSettings::default(),
        };
        self.store.set_document(USERS, uid, to_document(&user)?)?;
        info!(uid, "user document created");
        Ok(user)
    }

    pub fn get_user(&self, uid: &str) -> ServiceResult<UserDocument> {
        let doc = self
            .store
            .get_document(USERS, uid)?
            .ok_or_else(|| ServiceError::UserNotFound(uid.to_string()))?;
        serde_json::from_value(Value::Object(doc)).map_err(|source| ServiceError::CorruptDocument {
            id: uid.to_string(),
            source,
        })
    }

    /// Find a user by email address
    pub fn find_by_email(&self, email: &str) -> ServiceResult<(String, UserDocument)> {
        let wanted = email.trim().to_ascii_lowercase();
        let snapshot = self
            .store
            .query(USERS, &Query::new())?
            .into_iter()
            .find(|s| {
                s.data
                    .get("email")
                    .and_then(Value::as_str)
                    .is_some_and(|e| e.trim().to_ascii_lowercase() == wanted)
            })
            .ok_or_else(|| ServiceError::UserNotFound(email.to_string()))?;
        let user = serde_json::from_value(Value::Object(snapshot.data)).map_err(|source| {
            ServiceError::CorruptDocument {
                id: snapshot.id.clone(),
                source,
            }
        })?;
        Ok((snapshot.id, user))
    }

    /// Fold a finished session into the user's stored statistics
    pub fn record_session(&self, uid: &str, result: &SessionResult) -> ServiceResult<UserStatistics> {
        let user = self.get_user(uid)?;
        let stats = merge_session(Some(&user.stats), result);

        let update = fields(vec![
            ("stats", Value::Object(to_document(&stats)?)),
            ("updatedAt", timestamp(Utc::now())?),
        ]);
        self.store.update_document(USERS, uid, update)?;

        info!(
            uid,
            score = result.score,
            difficulty = %result.difficulty,
            total_games = stats.total_games,
            "session recorded"
        );
        Ok(stats)
    }

    /// Ranked leaderboard recomputed from the stored statistics
    pub fn leaderboard(&self, filter: &LeaderboardFilter) -> ServiceResult<Vec<LeaderboardEntry>> {
        let (order, played) = match filter.difficulty {
            Some(difficulty) => {
                let bucket = format!("stats.byDifficulty.{}", difficulty.key());
                (format!("{bucket}.avgScore"), format!("{bucket}.total"))
            }
            None => ("stats.highestScore".to_string(), "stats.totalGames".to_string()),
        };
        // Players who never finished a game at this tier can't rank
        let query = Query::new()
            .filter(FieldFilter::greater_than(played, 0))
            .order_by(OrderBy::desc(order))
            .limit(filter.limit.saturating_mul(LEADERBOARD_OVERFETCH));

        let snapshots = self.store.query(USERS, &query)?;
        debug!(fetched = snapshots.len(), ?filter, "leaderboard query");

        let players: Vec<PlayerSnapshot> = snapshots.into_iter().filter_map(player_snapshot).collect();
        Ok(compute_leaderboard(&players, filter))
    }

    pub fn update_profile(&self, uid: &str, name: &str) -> ServiceResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::MissingName);
        }
        let update = fields(vec![
            ("name", Value::String(name.to_string())),
            ("updatedAt", timestamp(Utc::now())?),
        ]);
        self.store.update_document(USERS, uid, update)?;
        Ok(())
    }

    pub fn update_settings(&self, uid: &str, settings: &UserSettings) -> ServiceResult<()> {
        let update = fields(vec![
            ("settings", Value::Object(to_document(settings)?)),
            ("updatedAt", timestamp(Utc::now())?),
        ]);
        self.store.update_document(USERS, uid, update)?;
        Ok(())
    }
}

/// Players without a name or readable stats are left off the board
fn player_snapshot(snapshot: Snapshot) -> Option<PlayerSnapshot> {
    let Snapshot { id, mut data } = snapshot;
    let name = data.get("name").and_then(Value::as_str)?.to_string();
    if name.is_empty() {
        return None;
    }
    let stats = match serde_json::from_value(data.remove("stats")?) {
        Ok(stats) => stats,
        Err(e) => {
            warn!(uid = %id, error = %e, "skipping unreadable stats");
            return None;
        }
    };
    Some(PlayerSnapshot {
        user_id: id,
        name,
        stats,
    })
}
