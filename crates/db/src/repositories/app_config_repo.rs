//! Repository for the `app_config` table.

use sqlx::PgPool;

use crate::models::app_config::AppConfigEntry;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "key, value, updated_at";

/// Provides get/upsert access to application settings.
pub struct AppConfigRepo;

impl AppConfigRepo {
    /// Create the table when it does not exist yet. Safe to call repeatedly.
    pub async fn ensure_table(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS app_config (
                key TEXT PRIMARY KEY,
                value TEXT,
                updated_at TIMESTAMP DEFAULT NOW()
            )",
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Find a setting by key.
    pub async fn find(pool: &PgPool, key: &str) -> Result<Option<AppConfigEntry>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM app_config WHERE key = $1 LIMIT 1");
        sqlx::query_as::<_, AppConfigEntry>(&query)
            .bind(key)
            .fetch_optional(pool)
            .await
    }

    /// Insert or replace a setting, returning the stored row.
    pub async fn upsert(
        pool: &PgPool,
        key: &str,
        value: &str,
    ) -> Result<AppConfigEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO app_config (key, value, updated_at)
             VALUES ($1, $2, NOW())
             ON CONFLICT (key) DO UPDATE
                SET value = EXCLUDED.value, updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        let entry = sqlx::query_as::<_, AppConfigEntry>(&query)
            .bind(key)
            .bind(value)
            .fetch_one(pool)
            .await?;
        tracing::debug!(key, "app_config entry upserted");
        Ok(entry)
    }
}
