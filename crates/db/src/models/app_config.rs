//! Key/value application settings.

use sqlx::FromRow;

/// A row from the `app_config` table.
#[derive(Debug, Clone, FromRow)]
pub struct AppConfigEntry {
    pub key: String,
    pub value: Option<String>,
    pub updated_at: Option<chrono::NaiveDateTime>,
}
