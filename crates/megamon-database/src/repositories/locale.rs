//! Locale pack repository.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;

use megamon_core::error::{AppError, ErrorKind};
use megamon_core::result::AppResult;
use megamon_extension::registry::LocalePackStore;

/// PostgreSQL-backed locale pack storage, one JSONB row per
/// `(extension, language)`.
#[derive(Debug, Clone)]
pub struct LocalePackRepository {
    pool: PgPool,
}

impl LocalePackRepository {
    /// Create a new locale pack repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocalePackStore for LocalePackRepository {
    async fn upsert(
        &self,
        extension_id: i32,
        language: &str,
        strings: &HashMap<String, String>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO extension_locales (extension_id, language, strings)
            VALUES ($1, $2, $3)
            ON CONFLICT (extension_id, language)
            DO UPDATE SET strings = EXCLUDED.strings, updated_at = NOW()
            "#,
        )
        .bind(extension_id)
        .bind(language)
        .bind(Json(strings))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to upsert locale pack", e)
        })?;
        Ok(())
    }

    async fn find(
        &self,
        extension_id: i32,
        language: &str,
    ) -> AppResult<Option<HashMap<String, String>>> {
        let row: Option<Json<HashMap<String, String>>> = sqlx::query_scalar(
            "SELECT strings FROM extension_locales WHERE extension_id = $1 AND language = $2",
        )
        .bind(extension_id)
        .bind(language)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to fetch locale pack", e)
        })?;
        Ok(row.map(|Json(pack)| pack))
    }

    async fn languages(&self, extension_id: i32) -> AppResult<Vec<String>> {
        sqlx::query_scalar(
            "SELECT language FROM extension_locales WHERE extension_id = $1 ORDER BY language",
        )
        .bind(extension_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list locale languages", e)
        })
    }

    async fn delete_for_extension(&self, extension_id: i32) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM extension_locales WHERE extension_id = $1")
            .bind(extension_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete locale packs", e)
            })?;
        Ok(result.rows_affected())
    }
}
