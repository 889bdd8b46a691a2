use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;

use crate::core::session::{TokenStore, TokenStoreError};

/// Client-side token store backed by a small SQLite file, so a session
/// survives between runs of the CLI.
pub struct SqliteTokenStore {
    pool: Pool<Sqlite>,
}

impl SqliteTokenStore {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure the file exists if it's a file path
        let path_str = database_url.trim_start_matches("sqlite://");
        if !database_url.contains(":memory:") && !Path::new(path_str).exists() {
            if let Some(parent) = Path::new(path_str).parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::File::create(path_str)?;
        }

        let conn_str = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            format!("sqlite://{}", database_url)
        };

        let pool = SqlitePoolOptions::new().connect(&conn_str).await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS session_tokens (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn storage(e: sqlx::Error) -> TokenStoreError {
    TokenStoreError::Storage(e.to_string())
}

#[async_trait]
impl TokenStore for SqliteTokenStore {
    async fn get(&self, key: &str) -> Result<Option<String>, TokenStoreError> {
        let row = sqlx::query("SELECT value FROM session_tokens WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        Ok(row.map(|row| row.get::<String, _>("value")))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), TokenStoreError> {
        sqlx::query(
            r#"
            INSERT INTO session_tokens (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), TokenStoreError> {
        sqlx::query("DELETE FROM session_tokens WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn tokens_survive_reopening_the_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("session.db");
        let path = path.to_str().unwrap();

        let store = SqliteTokenStore::new(path).await.unwrap();
        store.set("identity_token", "id-1").await.unwrap();
        store.set("identity_token", "id-2").await.unwrap();
        drop(store);

        let reopened = SqliteTokenStore::new(path).await.unwrap();
        assert_eq!(
            reopened.get("identity_token").await.unwrap().as_deref(),
            Some("id-2")
        );
    }

    #[tokio::test]
    async fn removed_keys_read_as_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.db");
        let store = SqliteTokenStore::new(path.to_str().unwrap()).await.unwrap();

        store.set("drive_access_token", "abc").await.unwrap();
        store.remove("drive_access_token").await.unwrap();
        store.remove("never_set").await.unwrap();

        assert_eq!(store.get("drive_access_token").await.unwrap(), None);
    }
}
