//! Persistence gateway: the whole application state as JSON blobs in a
//! local SQLite database, one row per collection key.
//!
//! Reads never fail the app. A malformed blob for one key falls back to an
//! empty collection for that key only; a malformed current-user blob drops
//! the session and removes the stored row so the next load doesn't trip on
//! it again. Writes are full-snapshot overwrites per key — fine at the scale
//! of a single person's social data.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::{debug, warn};

use crate::db::migrations;
use crate::migrate;
use crate::pet;
use crate::types::{AppState, Group, Message, Notification, Post, Theme, User};

const KEY_CURRENT_USER: &str = "current_user";
const KEY_ROSTER: &str = "roster";
const KEY_POSTS: &str = "posts";
const KEY_MESSAGES: &str = "messages";
const KEY_GROUPS: &str = "groups";
const KEY_NOTIFICATIONS: &str = "notifications";
const KEY_THEME: &str = "theme";

pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    pub async fn new(db_path: &str) -> anyhow::Result<Self> {
        let opts = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;

        migrations::migrate_app_state(&pool).await?;
        Ok(Self { pool })
    }

    /// Hydrate the full in-memory state.
    ///
    /// Every user record passes through schema normalization; the current
    /// user additionally gets offline pet decay applied here, exactly once
    /// per load.
    pub async fn load(&self, now: DateTime<Utc>) -> anyhow::Result<AppState> {
        let current_user = self.load_current_user(now).await?;

        let roster = match self.read_key(KEY_ROSTER).await? {
            Some(raw) => match serde_json::from_str::<Vec<serde_json::Value>>(&raw) {
                Ok(entries) => entries.iter().map(|v| migrate::normalize(v, now)).collect(),
                Err(e) => {
                    warn!(key = KEY_ROSTER, error = %e, "Malformed stored blob; resetting to empty");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let posts: Vec<Post> = self.load_collection(KEY_POSTS).await?;
        let messages: Vec<Message> = self.load_collection(KEY_MESSAGES).await?;
        let groups: Vec<Group> = self.load_collection(KEY_GROUPS).await?;
        let notifications: Vec<Notification> = self.load_collection(KEY_NOTIFICATIONS).await?;

        let theme = match self.read_key(KEY_THEME).await? {
            Some(raw) => serde_json::from_str::<Theme>(&raw).unwrap_or_default(),
            None => Theme::default(),
        };

        Ok(AppState {
            current_user,
            roster,
            posts,
            messages,
            groups,
            notifications,
            theme,
        })
    }

    async fn load_current_user(&self, now: DateTime<Utc>) -> anyhow::Result<Option<User>> {
        let Some(raw) = self.read_key(KEY_CURRENT_USER).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => {
                let mut user = migrate::normalize(&value, now);
                pet::apply_offline_decay(&mut user, now);
                Ok(Some(user))
            }
            Err(e) => {
                // Drop to "no session" and remove the corrupted entry rather
                // than failing the same way on every subsequent load.
                warn!(error = %e, "Corrupt current-user record; dropping session");
                self.delete_key(KEY_CURRENT_USER).await?;
                Ok(None)
            }
        }
    }

    async fn load_collection<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Vec<T>> {
        match self.read_key(key).await? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(items) => Ok(items),
                Err(e) => {
                    warn!(key, error = %e, "Malformed stored blob; resetting to empty");
                    Ok(Vec::new())
                }
            },
            None => Ok(Vec::new()),
        }
    }

    /// Persist a full snapshot of every collection.
    pub async fn save(&self, state: &AppState) -> anyhow::Result<()> {
        match &state.current_user {
            Some(user) => self.write_json(KEY_CURRENT_USER, user).await?,
            None => self.delete_key(KEY_CURRENT_USER).await?,
        }
        self.write_json(KEY_ROSTER, &state.roster).await?;
        self.write_json(KEY_POSTS, &state.posts).await?;
        self.write_json(KEY_MESSAGES, &state.messages).await?;
        self.write_json(KEY_GROUPS, &state.groups).await?;
        self.write_json(KEY_NOTIFICATIONS, &state.notifications).await?;
        self.write_json(KEY_THEME, &state.theme).await?;
        debug!("State snapshot persisted");
        Ok(())
    }

    async fn read_key(&self, key: &str) -> anyhow::Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM app_state WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<String, _>("value")))
    }

    async fn write_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let json = serde_json::to_string(value)?;
        sqlx::query(
            "INSERT INTO app_state (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_key(&self, key: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM app_state WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Test hook: write a raw (possibly invalid) blob under a key.
    #[cfg(test)]
    async fn write_raw(&self, key: &str, raw: &str) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO app_state (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(raw)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::{self, MessageKind};
    use crate::social;
    use crate::types::Visibility;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        "2026-08-01T12:00:00Z".parse().unwrap()
    }

    async fn store_in(dir: &tempfile::TempDir) -> SqliteStateStore {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
        let path = dir.path().join("state.db");
        SqliteStateStore::new(path.to_str().unwrap()).await.unwrap()
    }

    fn sample_state() -> AppState {
        let mut state = AppState::default();
        let ana = User::new("ana", "Ana", "ana@example.com", now());
        state.roster.push(ana.clone());
        state.roster.push(User::new("ben", "Ben", "ben@example.com", now()));
        state.current_user = Some(ana);
        social::create_post(&mut state.posts, "ana", "first post", Visibility::Global, now());
        messaging::send(
            &mut state.messages,
            "ana",
            MessageKind::direct("ben").unwrap(),
            "hi",
            None,
            now(),
        );
        state.theme = Theme::Dark;
        state
    }

    #[tokio::test]
    async fn round_trip_reproduces_the_collections() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        let state = sample_state();

        store.save(&state).await.unwrap();
        // Reload at the same instant so pet decay is a no-op.
        let loaded = store.load(now()).await.unwrap();
        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn corrupt_collection_resets_only_that_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        store.save(&sample_state()).await.unwrap();

        store.write_raw(KEY_POSTS, "{{ not json").await.unwrap();
        let loaded = store.load(now()).await.unwrap();

        assert!(loaded.posts.is_empty(), "corrupt key falls back to empty");
        assert_eq!(loaded.messages.len(), 1, "other collections survive");
        assert!(loaded.current_user.is_some());
    }

    #[tokio::test]
    async fn corrupt_current_user_drops_session_and_removes_the_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        store.save(&sample_state()).await.unwrap();

        store.write_raw(KEY_CURRENT_USER, "not json at all").await.unwrap();
        let loaded = store.load(now()).await.unwrap();
        assert!(loaded.current_user.is_none());

        // The poisoned row is gone, not retried on the next load.
        assert!(store.read_key(KEY_CURRENT_USER).await.unwrap().is_none());
        assert_eq!(loaded.roster.len(), 2);
    }

    #[tokio::test]
    async fn load_normalizes_legacy_records_and_applies_decay_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;

        // A record written by an older app version: camelCase keys, missing
        // coin balance and pet gauges.
        let legacy = format!(
            r#"{{"username":"ana","displayName":"Ana","email":"a@example.com",
                 "petLastUpdate":"{}"}}"#,
            now().to_rfc3339()
        );
        store.write_raw(KEY_CURRENT_USER, &legacy).await.unwrap();
        store.write_raw(KEY_ROSTER, &format!("[{}]", legacy)).await.unwrap();

        let loaded = store.load(now() + Duration::minutes(100)).await.unwrap();
        let user = loaded.current_user.unwrap();
        assert_eq!(user.mood_coins, 100, "signup grant backfilled");
        assert_eq!(user.pet_hunger, 85.0, "100 minutes of offline decay");
        assert_eq!(user.pet_thirst, 80.0);

        // Roster entries are normalized but never decayed.
        assert_eq!(loaded.roster[0].pet_hunger, 100.0);
        assert_eq!(loaded.roster[0].display_name, "Ana");
    }

    #[tokio::test]
    async fn logged_out_save_clears_the_session_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        let mut state = sample_state();
        store.save(&state).await.unwrap();

        state.current_user = None;
        store.save(&state).await.unwrap();
        let loaded = store.load(now()).await.unwrap();
        assert!(loaded.current_user.is_none());
        assert_eq!(loaded.roster.len(), 2);
    }

    #[tokio::test]
    async fn empty_database_loads_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        let loaded = store.load(now()).await.unwrap();
        assert_eq!(loaded, AppState::default());
    }
}
