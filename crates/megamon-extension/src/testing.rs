//! In-memory store implementations for tests.
//!
//! Behave like the PostgreSQL repositories in `megamon-database` for the
//! parts the subsystem relies on: ID-ascending listings, duplicate
//! detection on `(name, version)`, and prefix matching for owned tables.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use megamon_core::{AppError, AppResult};
use megamon_entity::{CreateExtension, ExtensionRecord};

use crate::registry::{ExtensionRegistry, LocalePackStore, SchemaStore};

/// In-memory [`ExtensionRegistry`].
#[derive(Default)]
pub struct MemoryRegistry {
    records: Mutex<Vec<ExtensionRecord>>,
    next_id: Mutex<i32>,
    /// When set, every `register` fails. Used to exercise install
    /// rollback after file placement.
    pub fail_register: std::sync::atomic::AtomicBool,
}

impl MemoryRegistry {
    /// Inserts a ready-made record, assigning the next ID. Handy when a
    /// test does not want to go through a full install.
    pub async fn seed(&self, mut record: ExtensionRecord) -> i32 {
        let mut next_id = self.next_id.lock().await;
        *next_id += 1;
        record.id = *next_id;
        let id = record.id;
        self.records.lock().await.push(record);
        id
    }

    /// A minimal enabled record for seeding.
    pub fn record(name: &str, version: &str) -> ExtensionRecord {
        ExtensionRecord {
            id: 0,
            name: name.to_string(),
            version: version.to_string(),
            is_enabled: true,
            backend_entry: None,
            frontend_entry: None,
            frontend_editor: None,
            provides: serde_json::json!({}),
            last_error: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

#[async_trait]
impl ExtensionRegistry for MemoryRegistry {
    async fn register(&self, data: &CreateExtension) -> AppResult<ExtensionRecord> {
        if self.fail_register.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(AppError::database(format!(
                "Simulated failure registering '{}'",
                data.name
            )));
        }

        let mut records = self.records.lock().await;
        if records
            .iter()
            .any(|r| r.name == data.name && r.version == data.version)
        {
            return Err(AppError::duplicate_extension(format!(
                "Extension '{}' version '{}' is already installed",
                data.name, data.version
            )));
        }

        let mut next_id = self.next_id.lock().await;
        *next_id += 1;
        let record = ExtensionRecord {
            id: *next_id,
            name: data.name.clone(),
            version: data.version.clone(),
            is_enabled: true,
            backend_entry: data.backend_entry.clone(),
            frontend_entry: data.frontend_entry.clone(),
            frontend_editor: data.frontend_editor.clone(),
            provides: data.provides.clone(),
            last_error: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn find(&self, id: i32) -> AppResult<Option<ExtensionRecord>> {
        Ok(self.records.lock().await.iter().find(|r| r.id == id).cloned())
    }

    async fn list(&self) -> AppResult<Vec<ExtensionRecord>> {
        let mut records = self.records.lock().await.clone();
        records.sort_by_key(|r| r.id);
        Ok(records)
    }

    async fn list_enabled(&self) -> AppResult<Vec<ExtensionRecord>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|r| r.is_enabled)
            .collect())
    }

    async fn set_enabled(&self, id: i32, enabled: bool) -> AppResult<()> {
        for record in self.records.lock().await.iter_mut() {
            if record.id == id {
                record.is_enabled = enabled;
                record.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn set_last_error(&self, id: i32, error: Option<String>) -> AppResult<()> {
        for record in self.records.lock().await.iter_mut() {
            if record.id == id {
                record.last_error = error.clone();
                record.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn remove(&self, id: i32) -> AppResult<bool> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() != before)
    }
}

/// In-memory [`LocalePackStore`].
#[derive(Default)]
pub struct MemoryLocaleStore {
    packs: Mutex<HashMap<(i32, String), HashMap<String, String>>>,
}

#[async_trait]
impl LocalePackStore for MemoryLocaleStore {
    async fn upsert(
        &self,
        extension_id: i32,
        language: &str,
        strings: &HashMap<String, String>,
    ) -> AppResult<()> {
        self.packs
            .lock()
            .await
            .insert((extension_id, language.to_string()), strings.clone());
        Ok(())
    }

    async fn find(
        &self,
        extension_id: i32,
        language: &str,
    ) -> AppResult<Option<HashMap<String, String>>> {
        Ok(self
            .packs
            .lock()
            .await
            .get(&(extension_id, language.to_string()))
            .cloned())
    }

    async fn languages(&self, extension_id: i32) -> AppResult<Vec<String>> {
        let mut languages: Vec<String> = self
            .packs
            .lock()
            .await
            .keys()
            .filter(|(id, _)| *id == extension_id)
            .map(|(_, lang)| lang.clone())
            .collect();
        languages.sort();
        Ok(languages)
    }

    async fn delete_for_extension(&self, extension_id: i32) -> AppResult<u64> {
        let mut packs = self.packs.lock().await;
        let before = packs.len();
        packs.retain(|(id, _), _| *id != extension_id);
        Ok((before - packs.len()) as u64)
    }
}

/// In-memory [`SchemaStore`] over a sorted table-name set.
#[derive(Default)]
pub struct MemorySchemaStore {
    tables: Mutex<BTreeSet<String>>,
    /// When set, every drop fails. Used to exercise partial-uninstall
    /// reporting.
    pub fail_drops: std::sync::atomic::AtomicBool,
}

impl MemorySchemaStore {
    /// Creates a store pre-populated with `tables`.
    pub fn with_tables(tables: &[&str]) -> Self {
        Self {
            tables: Mutex::new(tables.iter().map(|t| t.to_string()).collect()),
            fail_drops: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Remaining table names, ascending.
    pub async fn remaining(&self) -> Vec<String> {
        self.tables.lock().await.iter().cloned().collect()
    }
}

#[async_trait]
impl SchemaStore for MemorySchemaStore {
    async fn tables_matching(&self, prefix: &str) -> AppResult<Vec<String>> {
        Ok(self
            .tables
            .lock()
            .await
            .iter()
            .filter(|t| t.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn drop_table(&self, table: &str) -> AppResult<()> {
        if self.fail_drops.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(AppError::database(format!(
                "Simulated failure dropping '{table}'"
            )));
        }
        self.tables.lock().await.remove(table);
        Ok(())
    }
}
