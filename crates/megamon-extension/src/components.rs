//! Frontend component loading.
//!
//! Widget and editor components are loaded lazily at first render, not at
//! registry load time. Loaded handles are cached per
//! `(name, version, entry_path)` for the lifetime of the process;
//! concurrent loads of the same key share one in-flight read. A load
//! failure degrades to a placeholder handle so a broken extension never
//! crashes the host view.

use std::path::PathBuf;
use std::sync::Arc;

use moka::future::Cache;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use megamon_core::{AppError, AppResult};
use megamon_entity::ExtensionRecord;

/// Which declared entry a caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryField {
    /// The widget component (`frontend_entry`).
    Widget,
    /// The config-editor component (`frontend_editor`).
    Editor,
}

impl EntryField {
    /// Declared entry path on a record, if any.
    pub fn entry_path(self, record: &ExtensionRecord) -> Option<&str> {
        match self {
            Self::Widget => record.frontend_entry.as_deref(),
            Self::Editor => record.frontend_editor.as_deref(),
        }
    }
}

/// An opaque handle to a loaded component module.
///
/// The loader performs no validation of the module's internal shape; a
/// module without a renderable default export is the caller's runtime
/// concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHandle {
    /// Deterministic module specifier:
    /// `{frontend_root}/{name}_{version}/{entry_path}`.
    pub specifier: String,
    /// Module source, when the load succeeded.
    pub source: Option<String>,
    /// Whether this is a degraded placeholder for a failed load.
    pub placeholder: bool,
}

impl ComponentHandle {
    fn loaded(specifier: String, source: String) -> Self {
        Self {
            specifier,
            source: Some(source),
            placeholder: false,
        }
    }

    /// A visible "unavailable" stand-in for a failed load.
    pub fn unavailable(specifier: String) -> Self {
        Self {
            specifier,
            source: None,
            placeholder: true,
        }
    }
}

/// Cache capacity; component modules are small and few.
const CACHE_CAPACITY: u64 = 1024;

/// Lazy, cached loader of extension UI components.
pub struct ComponentLoader {
    frontend_root: PathBuf,
    cache: Cache<(String, String, String), ComponentHandle>,
}

impl ComponentLoader {
    /// Creates a loader over a frontend root directory.
    pub fn new(frontend_root: impl Into<PathBuf>) -> Self {
        Self {
            frontend_root: frontend_root.into(),
            cache: Cache::new(CACHE_CAPACITY),
        }
    }

    /// Deterministic module specifier for a record and entry.
    pub fn specifier(&self, record: &ExtensionRecord, entry_path: &str) -> String {
        self.frontend_root
            .join(record.dir_name())
            .join(entry_path)
            .to_string_lossy()
            .into_owned()
    }

    /// Loads a component, reading the module at most once per
    /// `(name, version, entry_path)`; concurrent callers share the
    /// in-flight read.
    pub async fn load(
        &self,
        record: &ExtensionRecord,
        entry: EntryField,
    ) -> AppResult<ComponentHandle> {
        let entry_path = entry.entry_path(record).ok_or_else(|| {
            AppError::component_load_failure(format!(
                "Extension '{}' declares no {entry:?} entry",
                record.name
            ))
        })?;
        self.load_path(record, entry_path).await
    }

    /// Loads a component by explicit entry path. Capability descriptors
    /// may name components other than the record's declared entries.
    pub async fn load_path(
        &self,
        record: &ExtensionRecord,
        entry_path: &str,
    ) -> AppResult<ComponentHandle> {
        let specifier = self.specifier(record, entry_path);
        let key = (
            record.name.clone(),
            record.version.clone(),
            entry_path.to_string(),
        );

        let load_specifier = specifier.clone();
        self.cache
            .try_get_with(key, async move {
                debug!(specifier = %load_specifier, "Loading component module");
                let source = tokio::fs::read_to_string(&load_specifier)
                    .await
                    .map_err(|e| {
                        AppError::component_load_failure(format!(
                            "Cannot load component '{load_specifier}': {e}"
                        ))
                    })?;
                Ok::<_, AppError>(ComponentHandle::loaded(load_specifier, source))
            })
            .await
            .map_err(|e: Arc<AppError>| (*e).clone())
    }

    /// Like [`Self::load`], but a failure yields a placeholder handle the
    /// caller can render instead of propagating the error.
    pub async fn load_or_placeholder(
        &self,
        record: &ExtensionRecord,
        entry: EntryField,
    ) -> ComponentHandle {
        match self.load(record, entry).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(
                    extension = %record.name,
                    error = %e,
                    "Component load failed; rendering placeholder"
                );
                let specifier = entry
                    .entry_path(record)
                    .map(|p| self.specifier(record, p))
                    .unwrap_or_default();
                ComponentHandle::unavailable(specifier)
            }
        }
    }

    /// Drops every cached handle for an extension, called on uninstall.
    ///
    /// Capability descriptors can name components beyond the record's
    /// declared entries, so this walks the cache rather than the record.
    pub async fn invalidate(&self, record: &ExtensionRecord) {
        self.cache.run_pending_tasks().await;
        let keys: Vec<(String, String, String)> = self
            .cache
            .iter()
            .filter(|(key, _)| key.0 == record.name && key.1 == record.version)
            .map(|(key, _)| (*key).clone())
            .collect();
        for key in keys {
            self.cache.invalidate(&key).await;
        }
    }
}

impl std::fmt::Debug for ComponentLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentLoader")
            .field("frontend_root", &self.frontend_root)
            .field("cached", &self.cache.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;

    fn record(name: &str, version: &str, entry: &str) -> ExtensionRecord {
        ExtensionRecord {
            id: 1,
            name: name.to_string(),
            version: version.to_string(),
            is_enabled: true,
            backend_entry: None,
            frontend_entry: Some(entry.to_string()),
            frontend_editor: None,
            provides: serde_json::json!({}),
            last_error: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn specifier_is_deterministic() {
        let root = tempfile::tempdir().unwrap();
        let loader = ComponentLoader::new(root.path());
        let rec = record("ClockWidget", "1.0.0", "ClockWidget.vue");

        let expected = root
            .path()
            .join("ClockWidget_1.0.0")
            .join("ClockWidget.vue");
        assert_eq!(
            loader.specifier(&rec, "ClockWidget.vue"),
            expected.to_string_lossy()
        );
    }

    #[tokio::test]
    async fn loads_and_caches_component() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("ClockWidget_1.0.0");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("ClockWidget.vue"), "<template>clock</template>").unwrap();

        let loader = ComponentLoader::new(root.path());
        let rec = record("ClockWidget", "1.0.0", "ClockWidget.vue");

        let handle = loader.load(&rec, EntryField::Widget).await.unwrap();
        assert!(!handle.placeholder);
        assert!(handle.source.as_deref().unwrap().contains("clock"));

        // The module is served from cache even after the file disappears.
        std::fs::remove_file(dir.join("ClockWidget.vue")).unwrap();
        let cached = loader.load(&rec, EntryField::Widget).await.unwrap();
        assert_eq!(cached.source, handle.source);
    }

    #[tokio::test]
    async fn missing_component_degrades_to_placeholder() {
        let root = tempfile::tempdir().unwrap();
        let loader = ComponentLoader::new(root.path());
        let rec = record("Broken", "1.0.0", "Broken.vue");

        let err = loader.load(&rec, EntryField::Widget).await.unwrap_err();
        assert_eq!(err.kind, megamon_core::ErrorKind::ComponentLoadFailure);

        let placeholder = loader.load_or_placeholder(&rec, EntryField::Widget).await;
        assert!(placeholder.placeholder);
        assert!(placeholder.source.is_none());
    }

    #[tokio::test]
    async fn undeclared_editor_entry_fails() {
        let root = tempfile::tempdir().unwrap();
        let loader = ComponentLoader::new(root.path());
        let rec = record("ClockWidget", "1.0.0", "ClockWidget.vue");

        let err = loader.load(&rec, EntryField::Editor).await.unwrap_err();
        assert_eq!(err.kind, megamon_core::ErrorKind::ComponentLoadFailure);
    }

    #[tokio::test]
    async fn invalidate_forces_reload() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("ClockWidget_1.0.0");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("ClockWidget.vue"), "v1").unwrap();

        let loader = ComponentLoader::new(root.path());
        let rec = record("ClockWidget", "1.0.0", "ClockWidget.vue");

        loader.load(&rec, EntryField::Widget).await.unwrap();
        std::fs::write(dir.join("ClockWidget.vue"), "v2").unwrap();
        loader.invalidate(&rec).await;

        let reloaded = loader.load(&rec, EntryField::Widget).await.unwrap();
        assert_eq!(reloaded.source.as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn invalidate_covers_descriptor_named_components() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("Blog_1.0.0");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("Embed.vue"), "v1").unwrap();

        let loader = ComponentLoader::new(root.path());
        let rec = record("Blog", "1.0.0", "Blog.vue");

        // Cached under a path the record never declares.
        loader.load_path(&rec, "Embed.vue").await.unwrap();
        std::fs::write(dir.join("Embed.vue"), "v2").unwrap();
        loader.invalidate(&rec).await;

        let reloaded = loader.load_path(&rec, "Embed.vue").await.unwrap();
        assert_eq!(reloaded.source.as_deref(), Some("v2"));
    }
}
