//! Capability traits for the persistent stores the subsystem reads and
//! writes through.
//!
//! The registry is the single source of truth for what extensions exist
//! and are enabled. The route mounter and component loader always consult
//! it rather than caching extension lists, so enable/disable changes are
//! observable on the next request without a restart. PostgreSQL
//! implementations live in `megamon-database`; tests substitute in-memory
//! implementations.

use std::collections::HashMap;

use async_trait::async_trait;

use megamon_core::AppResult;
use megamon_entity::{CreateExtension, ExtensionRecord};

/// The catalog of installed extensions.
#[async_trait]
pub trait ExtensionRegistry: Send + Sync + 'static {
    /// Inserts a new record. Fails with `DuplicateExtension` when
    /// `(name, version)` already exists.
    async fn register(&self, data: &CreateExtension) -> AppResult<ExtensionRecord>;

    /// Finds a record by ID.
    async fn find(&self, id: i32) -> AppResult<Option<ExtensionRecord>>;

    /// Lists all records, ordered by ID ascending.
    async fn list(&self) -> AppResult<Vec<ExtensionRecord>>;

    /// Lists enabled records, ordered by ID ascending.
    async fn list_enabled(&self) -> AppResult<Vec<ExtensionRecord>>;

    /// Toggles the enabled flag. Does not touch files or tables.
    async fn set_enabled(&self, id: i32, enabled: bool) -> AppResult<()>;

    /// Records or clears the last lifecycle error for admin visibility.
    async fn set_last_error(&self, id: i32, error: Option<String>) -> AppResult<()>;

    /// Deletes the record. The lifecycle controller is responsible for
    /// prior cleanup of routes, tables, and files.
    async fn remove(&self, id: i32) -> AppResult<bool>;
}

/// Persistent storage for per-(extension, language) string tables.
#[async_trait]
pub trait LocalePackStore: Send + Sync + 'static {
    /// Inserts or replaces a pack.
    async fn upsert(
        &self,
        extension_id: i32,
        language: &str,
        strings: &HashMap<String, String>,
    ) -> AppResult<()>;

    /// Fetches one pack, if stored.
    async fn find(&self, extension_id: i32, language: &str)
    -> AppResult<Option<HashMap<String, String>>>;

    /// Languages stored for an extension, ascending.
    async fn languages(&self, extension_id: i32) -> AppResult<Vec<String>>;

    /// Removes every pack owned by an extension.
    async fn delete_for_extension(&self, extension_id: i32) -> AppResult<u64>;
}

/// Schema-level operations used by uninstall table garbage collection.
#[async_trait]
pub trait SchemaStore: Send + Sync + 'static {
    /// Table names starting with `prefix`, ascending.
    async fn tables_matching(&self, prefix: &str) -> AppResult<Vec<String>>;

    /// Drops one table if it exists.
    async fn drop_table(&self, table: &str) -> AppResult<()>;
}
