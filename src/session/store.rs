use crate::rpc::ServerConfig;
use crate::session::error::SessionResult;
use crate::session::history::ServerHistory;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;

/// Key the server history is stored under.
pub const HISTORY_STORAGE_KEY: &str = "glutton_server_history";

/// Small persistent key/value store backed by SQLite.
#[derive(Clone)]
pub struct LocalStore {
    pool: SqlitePool,
}

impl LocalStore {
    /// Open (creating if needed) the database at `url`
    pub async fn new(url: &str) -> SessionResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        // One connection keeps `sqlite::memory:` databases alive and shared
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// Open a database file on disk
    pub async fn open(path: impl AsRef<Path>) -> SessionResult<Self> {
        Self::new(&format!("sqlite://{}", path.as_ref().display())).await
    }

    /// Create store with in-memory database (for testing)
    pub async fn new_in_memory() -> SessionResult<Self> {
        Self::new("sqlite::memory:").await
    }

    /// Value stored under `key`, if any
    pub async fn get(&self, key: &str) -> SessionResult<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("value")?)),
            None => Ok(None),
        }
    }

    /// Insert or overwrite `key`
    pub async fn put(&self, key: &str, value: &str) -> SessionResult<()> {
        sqlx::query("INSERT OR REPLACE INTO kv_store (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Delete `key`. Returns whether a row was removed.
    pub async fn remove(&self, key: &str) -> SessionResult<bool> {
        let result = sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Load the server history, or an empty one if none was saved.
    pub async fn load_history(&self, defaults: &ServerConfig) -> SessionResult<ServerHistory> {
        match self.get(HISTORY_STORAGE_KEY).await? {
            Some(raw) => ServerHistory::from_json(&raw, defaults),
            None => Ok(ServerHistory::new()),
        }
    }

    /// Rewrite the stored history with `history`.
    pub async fn save_history(&self, history: &ServerHistory) -> SessionResult<()> {
        self.put(HISTORY_STORAGE_KEY, &history.to_json()?).await
    }

    /// Close database connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
