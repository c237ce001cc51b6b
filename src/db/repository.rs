//! Cache slot repository.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;

/// Slot holding the general snapshot of the tree.
pub const SNAPSHOT_KEY: &str = "folderTree_v1";

/// Slot mirroring the canonical document.
pub const FILE_CACHE_KEY: &str = "dataTree_file_cache";

/// Key/value access to the local cache.
#[derive(Clone)]
pub struct CacheRepository {
    pool: SqlitePool,
}

impl CacheRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Read a slot.
    pub async fn get_slot(&self, key: &str) -> Result<Option<String>, AppError> {
        let row = sqlx::query("SELECT value FROM cache_slots WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("value")))
    }

    /// Overwrite one slot.
    pub async fn put_slot(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.put_slots(&[key], value).await
    }

    /// Overwrite several slots with the same value in one transaction.
    pub async fn put_slots(&self, keys: &[&str], value: &str) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        for key in keys {
            sqlx::query(
                r#"INSERT INTO cache_slots (key, value, updated_at) VALUES (?, ?, ?)
                   ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at"#,
            )
            .bind(key)
            .bind(value)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
