//! Extension registry repository.

use async_trait::async_trait;
use sqlx::PgPool;

use megamon_core::error::{AppError, ErrorKind};
use megamon_core::result::AppResult;
use megamon_entity::{CreateExtension, ExtensionRecord};
use megamon_extension::registry::ExtensionRegistry;

/// PostgreSQL-backed extension catalog.
///
/// The `(name, version)` pair is unique at the database level; the
/// constraint violation is surfaced as `DuplicateExtension` so the
/// lifecycle layer can reject a re-upload cleanly.
#[derive(Debug, Clone)]
pub struct ExtensionRepository {
    pool: PgPool,
}

impl ExtensionRepository {
    /// Create a new extension repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExtensionRegistry for ExtensionRepository {
    async fn register(&self, data: &CreateExtension) -> AppResult<ExtensionRecord> {
        sqlx::query_as::<_, ExtensionRecord>(
            r#"
            INSERT INTO extensions
                (name, version, is_enabled, backend_entry, frontend_entry,
                 frontend_editor, provides)
            VALUES ($1, $2, TRUE, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.version)
        .bind(&data.backend_entry)
        .bind(&data.frontend_entry)
        .bind(&data.frontend_editor)
        .bind(&data.provides)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::duplicate_extension(format!(
                    "Extension '{}' version '{}' is already installed",
                    data.name, data.version
                ))
            } else {
                AppError::with_source(ErrorKind::Database, "Failed to register extension", e)
            }
        })
    }

    async fn find(&self, id: i32) -> AppResult<Option<ExtensionRecord>> {
        sqlx::query_as::<_, ExtensionRecord>("SELECT * FROM extensions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find extension by id", e)
            })
    }

    async fn list(&self) -> AppResult<Vec<ExtensionRecord>> {
        sqlx::query_as::<_, ExtensionRecord>("SELECT * FROM extensions ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to list extensions", e)
            })
    }

    async fn list_enabled(&self) -> AppResult<Vec<ExtensionRecord>> {
        sqlx::query_as::<_, ExtensionRecord>(
            "SELECT * FROM extensions WHERE is_enabled ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list enabled extensions", e)
        })
    }

    async fn set_enabled(&self, id: i32, enabled: bool) -> AppResult<()> {
        sqlx::query("UPDATE extensions SET is_enabled = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(enabled)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update enabled flag", e)
            })?;
        Ok(())
    }

    async fn set_last_error(&self, id: i32, error: Option<String>) -> AppResult<()> {
        sqlx::query("UPDATE extensions SET last_error = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(error)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to record extension error", e)
            })?;
        Ok(())
    }

    async fn remove(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM extensions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to remove extension", e)
            })?;
        Ok(result.rows_affected() > 0)
    }
}

/// PostgreSQL unique-violation SQLSTATE.
fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505")
    )
}
