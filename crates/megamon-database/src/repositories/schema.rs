//! Schema-level operations for extension-owned tables.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

use megamon_core::error::{AppError, ErrorKind};
use megamon_core::result::AppResult;
use megamon_extension::registry::SchemaStore;

/// PostgreSQL schema store over `information_schema`.
///
/// Only tables in the `ext_` namespace can be dropped; the identifier is
/// validated before being interpolated since DDL cannot take bind
/// parameters.
#[derive(Debug, Clone)]
pub struct SchemaRepository {
    pool: PgPool,
}

impl SchemaRepository {
    /// Create a new schema repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchemaStore for SchemaRepository {
    async fn tables_matching(&self, prefix: &str) -> AppResult<Vec<String>> {
        sqlx::query_scalar(
            r#"
            SELECT table_name FROM information_schema.tables
            WHERE table_schema = 'public' AND table_name LIKE $1 || '%'
            ORDER BY table_name
            "#,
        )
        .bind(prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list extension tables", e)
        })
    }

    async fn drop_table(&self, table: &str) -> AppResult<()> {
        validate_table_name(table)?;

        sqlx::query(&format!(r#"DROP TABLE IF EXISTS "{table}" CASCADE"#))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Failed to drop table '{table}'"),
                    e,
                )
            })?;

        info!(table = %table, "Extension table dropped");
        Ok(())
    }
}

/// Restricts droppable identifiers to lowercase `ext_`-namespaced names.
fn validate_table_name(table: &str) -> AppResult<()> {
    let valid_chars = table
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !table.starts_with("ext_") || !valid_chars {
        return Err(AppError::validation(format!(
            "Refusing to drop non-extension table '{table}'"
        )));
    }
    Ok(())
}
