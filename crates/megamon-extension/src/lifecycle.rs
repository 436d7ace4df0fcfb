//! Extension lifecycle orchestration.
//!
//! States per extension:
//! `Uploaded -> Validated -> Installed(enabled) <-> Installed(disabled) -> Removed`.
//!
//! Validation failures discard the staged files and create no record.
//! After file placement, a registry failure rolls the placed directories
//! back so no extension directory exists without a record. A backend
//! mount failure after registration is contained instead: the record
//! stays installed with `last_error` set and routes unmounted.
//!
//! All lifecycle and route-table mutations are serialized under one
//! coarse lock; these are rare administrative operations and the lock
//! keeps a request from observing a half-mounted route set.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use megamon_core::config::extensions::ExtensionsConfig;
use megamon_core::events::{EventBus, ExtensionEvent};
use megamon_core::{AppError, AppResult};
use megamon_entity::{ExtensionRecord, ManifestDescriptor};

use crate::archive;
use crate::components::ComponentLoader;
use crate::locales;
use crate::manifest;
use crate::mounter::RouteMounter;
use crate::registry::{ExtensionRegistry, LocalePackStore, SchemaStore};

/// Flags controlling how much an uninstall removes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UninstallOptions {
    /// Drop the extension's owned tables.
    pub delete_data: bool,
    /// Remove the extension's backend, frontend, and uploads directories.
    pub delete_files: bool,
}

/// Outcome of one uninstall step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UninstallStep {
    /// What the step did (e.g. `drop table ext_store_products`).
    pub step: String,
    /// Whether it succeeded.
    pub success: bool,
    /// The failure message, when it did not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-step report of a best-effort uninstall.
///
/// A failed step is logged and recorded here; the sequence continues so
/// the registry never keeps a record pointing at partially-deleted
/// files. Operators finish any remaining cleanup from this report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UninstallReport {
    /// The removed extension's registry ID.
    pub extension_id: i32,
    /// The removed extension's name.
    pub name: String,
    /// Every step attempted, in execution order.
    pub steps: Vec<UninstallStep>,
}

impl UninstallReport {
    /// Whether every step succeeded.
    pub fn clean(&self) -> bool {
        self.steps.iter().all(|s| s.success)
    }

    fn ok(&mut self, step: impl Into<String>) {
        self.steps.push(UninstallStep {
            step: step.into(),
            success: true,
            error: None,
        });
    }

    fn failed(&mut self, step: impl Into<String>, err: impl std::fmt::Display) {
        let step = step.into();
        error!(step = %step, error = %err, "Uninstall step failed; continuing");
        self.steps.push(UninstallStep {
            step,
            success: false,
            error: Some(err.to_string()),
        });
    }
}

/// Orchestrates install, enable/disable, and uninstall.
pub struct LifecycleController {
    config: ExtensionsConfig,
    registry: Arc<dyn ExtensionRegistry>,
    locale_store: Arc<dyn LocalePackStore>,
    schema_store: Arc<dyn SchemaStore>,
    mounter: Arc<RouteMounter>,
    components: Arc<ComponentLoader>,
    events: EventBus,
    /// Coarse lock over all registry + route-table mutations.
    admin_lock: Mutex<()>,
}

/// Staging directory removed on drop, so every early return during
/// validation discards the unpacked files.
struct StagingDir {
    path: PathBuf,
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to clean staging directory");
            }
        }
    }
}

impl LifecycleController {
    /// Creates a controller.
    pub fn new(
        config: ExtensionsConfig,
        registry: Arc<dyn ExtensionRegistry>,
        locale_store: Arc<dyn LocalePackStore>,
        schema_store: Arc<dyn SchemaStore>,
        mounter: Arc<RouteMounter>,
        components: Arc<ComponentLoader>,
        events: EventBus,
    ) -> Self {
        Self {
            config,
            registry,
            locale_store,
            schema_store,
            mounter,
            components,
            events,
            admin_lock: Mutex::new(()),
        }
    }

    /// Backend directory of an installed extension.
    pub fn backend_dir(&self, record: &ExtensionRecord) -> PathBuf {
        self.config.backend_root.join(record.dir_name())
    }

    /// Frontend directory of an installed extension.
    pub fn frontend_dir(&self, record: &ExtensionRecord) -> PathBuf {
        self.config.frontend_root.join(record.dir_name())
    }

    /// Installs an uploaded extension archive.
    ///
    /// Runs the full `Uploaded -> Validated -> Installed(enabled)`
    /// transition and returns the new registry record.
    pub async fn install(&self, archive_bytes: Bytes) -> AppResult<ExtensionRecord> {
        let _guard = self.admin_lock.lock().await;

        // ── Uploaded -> Validated ────────────────────────────────
        let staging = StagingDir {
            path: self.config.staging_root.join(uuid::Uuid::new_v4().to_string()),
        };
        let staging_path = staging.path.clone();
        tokio::task::spawn_blocking(move || archive::unpack(&archive_bytes, &staging_path))
            .await
            .map_err(|e| AppError::internal(format!("Unpack task failed: {e}")))??;

        let backend_src = existing_dir(staging.path.join("backend"));
        let frontend_src = existing_dir(staging.path.join("frontend"));
        if backend_src.is_none() && frontend_src.is_none() {
            return Err(AppError::manifest_invalid(
                "Archive contains neither a backend/ nor a frontend/ directory",
            ));
        }

        let backend_manifest = backend_src
            .as_deref()
            .map(manifest::read_manifest)
            .transpose()?;
        let frontend_manifest = frontend_src
            .as_deref()
            .map(manifest::read_manifest)
            .transpose()?;
        let merged = merge_manifests(backend_manifest, frontend_manifest)?;

        // UI strings require a base-language pack. The side that carries
        // the locale files is the frontend when present.
        if !merged.locales.is_empty() {
            let locale_side = frontend_src.as_deref().or(backend_src.as_deref());
            let has_en = locale_side
                .map(|dir| {
                    dir.join(locales::LOCALES_DIR)
                        .join(format!("{}.json", locales::BASE_LANGUAGE))
                        .exists()
                })
                .unwrap_or(false);
            if !merged.locales.iter().any(|l| l == locales::BASE_LANGUAGE) || !has_en {
                return Err(AppError::manifest_invalid(format!(
                    "Extension '{}' declares UI strings but ships no en locale pack",
                    merged.name
                )));
            }
        }

        // Duplicates must be refused before any file placement: the
        // installed copy's directories would otherwise be replaced by a
        // bundle the registry is about to reject.
        let duplicate = self
            .registry
            .list()
            .await?
            .into_iter()
            .any(|r| r.name == merged.name && r.version == merged.version);
        if duplicate {
            return Err(AppError::duplicate_extension(format!(
                "Extension '{}' version '{}' is already installed",
                merged.name, merged.version
            )));
        }

        info!(
            extension = %merged.name,
            version = %merged.version,
            "Extension bundle validated"
        );

        // ── Validated -> Installed ───────────────────────────────
        let dir_name = merged.dir_name();
        let mut placed: Vec<PathBuf> = Vec::new();

        if let Some(src) = &backend_src {
            let dest = self.config.backend_root.join(&dir_name);
            move_dir(src, &dest)?;
            placed.push(dest);
        }
        if let Some(src) = &frontend_src {
            let dest = self.config.frontend_root.join(&dir_name);
            if let Err(e) = move_dir(src, &dest) {
                rollback_placed(&placed);
                return Err(e);
            }
            placed.push(dest);
        }

        let record = match self.registry.register(&merged.to_create()).await {
            Ok(record) => record,
            Err(e) => {
                // No directory may outlive a failed registration.
                rollback_placed(&placed);
                return Err(e);
            }
        };

        self.store_locale_packs(&record).await;

        if record.backend_entry.is_some() {
            if let Err(e) = self.mounter.mount(&record).await {
                self.contain_mount_failure(&record, &e).await;
            }
        }

        info!(
            extension = %record.name,
            version = %record.version,
            id = record.id,
            "Extension installed"
        );
        self.events.publish(ExtensionEvent::Installed {
            extension_id: record.id,
            name: record.name.clone(),
            version: record.version.clone(),
        });

        // Pick up any last_error written during mounting.
        Ok(self.registry.find(record.id).await?.unwrap_or(record))
    }

    /// Enables or disables an extension: flips the registry flag and
    /// mounts/unmounts routes. Files and tables are untouched, so the
    /// transition is always reversible.
    pub async fn set_enabled(&self, id: i32, enabled: bool) -> AppResult<ExtensionRecord> {
        let _guard = self.admin_lock.lock().await;

        let record = self
            .registry
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Extension {id} not found")))?;

        self.registry.set_enabled(id, enabled).await?;

        if enabled {
            if let Err(e) = self.mounter.mount(&record).await {
                self.contain_mount_failure(&record, &e).await;
            } else {
                self.registry.set_last_error(id, None).await?;
            }
            self.events.publish(ExtensionEvent::Enabled {
                extension_id: id,
                name: record.name.clone(),
            });
        } else {
            self.mounter.unmount(&record.name).await;
            self.events.publish(ExtensionEvent::Disabled {
                extension_id: id,
                name: record.name.clone(),
            });
        }

        info!(extension = %record.name, enabled, "Extension enabled flag changed");

        self.registry
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Extension {id} not found")))
    }

    /// Uninstalls an extension.
    ///
    /// Best-effort and strictly ordered: routes are unmounted before any
    /// table is dropped, so no in-flight request can reference a table
    /// being removed. Each failure is recorded in the report and the
    /// sequence continues.
    pub async fn uninstall(&self, id: i32, opts: UninstallOptions) -> AppResult<UninstallReport> {
        let _guard = self.admin_lock.lock().await;

        let record = self
            .registry
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Extension {id} not found")))?;

        let mut report = UninstallReport {
            extension_id: record.id,
            name: record.name.clone(),
            steps: Vec::new(),
        };

        self.mounter.unmount(&record.name).await;
        report.ok("unmount routes");

        if opts.delete_data {
            self.drop_owned_tables(&record, &mut report).await;
        }

        if opts.delete_files {
            for dir in [
                self.backend_dir(&record),
                self.frontend_dir(&record),
                self.config.uploads_root.join(&record.name),
            ] {
                let step = format!("remove {}", dir.display());
                match remove_dir_if_present(&dir) {
                    Ok(()) => report.ok(step),
                    Err(e) => report.failed(step, e),
                }
            }
        }

        match self.locale_store.delete_for_extension(record.id).await {
            Ok(n) => report.ok(format!("remove {n} locale packs")),
            Err(e) => report.failed("remove locale packs", e),
        }

        match self.registry.remove(record.id).await {
            Ok(_) => report.ok("remove registry record"),
            Err(e) => report.failed("remove registry record", e),
        }

        self.components.invalidate(&record).await;

        let clean = report.clean();
        info!(
            extension = %record.name,
            id = record.id,
            clean,
            "Extension uninstalled"
        );
        self.events.publish(ExtensionEvent::Uninstalled {
            extension_id: record.id,
            name: record.name.clone(),
            clean,
        });

        Ok(report)
    }

    /// Mounts every enabled extension, containing per-extension failures.
    /// Called once at process start.
    pub async fn mount_enabled(&self) -> AppResult<()> {
        let _guard = self.admin_lock.lock().await;

        for record in self.registry.list_enabled().await? {
            if record.backend_entry.is_none() {
                continue;
            }
            if let Err(e) = self.mounter.mount(&record).await {
                self.contain_mount_failure(&record, &e).await;
            }
        }
        Ok(())
    }

    /// Resolves the tables an extension owns and drops them.
    ///
    /// The explicit `database_schema.json` declaration wins when present;
    /// otherwise the documented naming convention
    /// `ext_{name.lower()}_{suffix}` is the match pattern. Declared names
    /// outside the `ext_` namespace are refused: an extension cannot
    /// declare its way into dropping platform tables.
    async fn drop_owned_tables(&self, record: &ExtensionRecord, report: &mut UninstallReport) {
        let declared = match manifest::read_owned_schema(&self.backend_dir(record)) {
            Ok(schema) => schema.map(|s| s.tables),
            Err(e) => {
                warn!(extension = %record.name, error = %e, "Unreadable schema declaration; using naming convention");
                None
            }
        };

        let tables = match declared {
            Some(tables) => tables
                .into_iter()
                .filter(|t| {
                    let owned = t.starts_with("ext_");
                    if !owned {
                        warn!(table = %t, "Declared table outside ext_ namespace; refusing to drop");
                    }
                    owned
                })
                .collect(),
            None => match self.schema_store.tables_matching(&record.table_prefix()).await {
                Ok(tables) => tables,
                Err(e) => {
                    report.failed("list owned tables", e);
                    return;
                }
            },
        };

        for table in tables {
            let step = format!("drop table {table}");
            match self.schema_store.drop_table(&table).await {
                Ok(()) => report.ok(step),
                Err(e) => report.failed(step, e),
            }
        }
    }

    /// Copies an extension's locale files into the store so consumers
    /// (including relationship embedding) read them without touching the
    /// extension's directory. Store failures are logged, not fatal.
    async fn store_locale_packs(&self, record: &ExtensionRecord) {
        let dir = if self.frontend_dir(record).join(locales::LOCALES_DIR).exists() {
            self.frontend_dir(record)
        } else {
            self.backend_dir(record)
        };

        for language in locales::available_languages(&dir) {
            let pack: HashMap<String, String> = locales::load_pack(&dir, &language);
            if let Err(e) = self.locale_store.upsert(record.id, &language, &pack).await {
                warn!(
                    extension = %record.name,
                    language = %language,
                    error = %e,
                    "Failed to store locale pack"
                );
            }
        }
    }

    /// Records a mount failure without failing the surrounding
    /// transition: one broken extension must not crash the host or
    /// affect unrelated extensions.
    async fn contain_mount_failure(&self, record: &ExtensionRecord, err: &AppError) {
        error!(
            extension = %record.name,
            version = %record.version,
            error = %err,
            "Backend mount failed; extension left unmounted"
        );
        if let Err(e) = self
            .registry
            .set_last_error(record.id, Some(err.to_string()))
            .await
        {
            warn!(extension = %record.name, error = %e, "Failed to record mount error");
        }
        self.events.publish(ExtensionEvent::MountFailed {
            extension_id: record.id,
            name: record.name.clone(),
            error: err.to_string(),
        });
    }
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("config", &self.config)
            .finish()
    }
}

fn existing_dir(path: PathBuf) -> Option<PathBuf> {
    path.is_dir().then_some(path)
}

/// Merges the backend and frontend manifests of one bundle.
///
/// Identity must agree on both sides; frontend-specific fields from the
/// frontend manifest win, everything else comes from whichever side
/// declares it.
fn merge_manifests(
    backend: Option<ManifestDescriptor>,
    frontend: Option<ManifestDescriptor>,
) -> AppResult<ManifestDescriptor> {
    match (backend, frontend) {
        (Some(b), Some(f)) => {
            if b.name != f.name || b.version != f.version {
                return Err(AppError::manifest_mismatch(format!(
                    "Backend manifest '{}@{}' does not match frontend manifest '{}@{}'",
                    b.name, b.version, f.name, f.version
                )));
            }
            let mut merged = b;
            merged.frontend_entry = f.frontend_entry.or(merged.frontend_entry);
            merged.frontend_editor = f.frontend_editor.or(merged.frontend_editor);
            if !f.frontend_routes.is_empty() {
                merged.frontend_routes = f.frontend_routes;
            }
            if !f.locales.is_empty() {
                merged.locales = f.locales;
            }
            if merged
                .provides
                .as_object()
                .map(|o| o.is_empty())
                .unwrap_or(true)
            {
                merged.provides = f.provides;
            }
            Ok(merged)
        }
        (Some(single), None) | (None, Some(single)) => Ok(single),
        (None, None) => Err(AppError::manifest_invalid("Bundle contains no manifest")),
    }
}

fn rollback_placed(placed: &[PathBuf]) {
    for dir in placed {
        if let Err(e) = std::fs::remove_dir_all(dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %dir.display(), error = %e, "Rollback failed to remove directory");
            }
        }
    }
}

fn remove_dir_if_present(dir: &Path) -> std::io::Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Moves a staged directory into its installed location, replacing any
/// leftover from a previously rolled-back install.
fn move_dir(src: &Path, dest: &Path) -> AppResult<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    remove_dir_if_present(dest)?;
    match std::fs::rename(src, dest) {
        Ok(()) => Ok(()),
        // Staging and install roots may sit on different filesystems.
        Err(_) => {
            copy_dir_all(src, dest)?;
            remove_dir_if_present(src)?;
            Ok(())
        }
    }
}

fn copy_dir_all(src: &Path, dest: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;
    use std::sync::atomic::Ordering;

    use megamon_core::ErrorKind;

    use crate::entry::StaticEntryLoader;
    use crate::provider::{
        ExtensionRequest, ExtensionResponse, RouteBinding, RouteMethod, RouteProvider,
    };
    use crate::testing::{MemoryLocaleStore, MemoryRegistry, MemorySchemaStore};

    struct PingHandler;

    #[async_trait::async_trait]
    impl crate::provider::ExtensionHandler for PingHandler {
        async fn handle(&self, _request: ExtensionRequest) -> AppResult<ExtensionResponse> {
            Ok(ExtensionResponse::ok(serde_json::json!({"pong": true})))
        }
    }

    struct PingProvider;

    impl RouteProvider for PingProvider {
        fn routes(&self) -> Vec<RouteBinding> {
            vec![RouteBinding {
                method: RouteMethod::Get,
                path: "/ping".to_string(),
                handler: Arc::new(PingHandler),
            }]
        }
    }

    struct Rig {
        _root: tempfile::TempDir,
        config: ExtensionsConfig,
        registry: Arc<MemoryRegistry>,
        locales: Arc<MemoryLocaleStore>,
        schema: Arc<MemorySchemaStore>,
        mounter: Arc<RouteMounter>,
        loader: Arc<StaticEntryLoader>,
        controller: LifecycleController,
    }

    fn rig_with_schema(schema: MemorySchemaStore) -> Rig {
        let root = tempfile::tempdir().unwrap();
        let config = ExtensionsConfig {
            backend_root: root.path().join("backend"),
            frontend_root: root.path().join("frontend"),
            uploads_root: root.path().join("uploads"),
            staging_root: root.path().join("staging"),
            default_language: "en".to_string(),
            auto_mount: true,
        };

        let registry = Arc::new(MemoryRegistry::default());
        let locales = Arc::new(MemoryLocaleStore::default());
        let schema = Arc::new(schema);
        let loader = Arc::new(StaticEntryLoader::new());
        let mounter = Arc::new(RouteMounter::new(
            loader.clone(),
            config.backend_root.clone(),
        ));
        let components = Arc::new(ComponentLoader::new(config.frontend_root.clone()));

        let controller = LifecycleController::new(
            config.clone(),
            registry.clone(),
            locales.clone(),
            schema.clone(),
            mounter.clone(),
            components,
            EventBus::new(),
        );

        Rig {
            _root: root,
            config,
            registry,
            locales,
            schema,
            mounter,
            loader,
            controller,
        }
    }

    fn rig() -> Rig {
        rig_with_schema(MemorySchemaStore::default())
    }

    fn build_bundle(entries: &[(&str, &str)]) -> Bytes {
        let mut buf = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            for (name, content) in entries {
                writer
                    .start_file(*name, zip::write::SimpleFileOptions::default())
                    .unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        Bytes::from(buf.into_inner())
    }

    fn widget_bundle() -> Bytes {
        build_bundle(&[
            (
                "frontend/manifest.json",
                r#"{
                    "name": "ClockWidget",
                    "version": "1.0.0",
                    "frontend_entry": "ClockWidget.vue",
                    "locales": ["en"]
                }"#,
            ),
            ("frontend/ClockWidget.vue", "<template>clock</template>"),
            ("frontend/locales/en.json", r#"{"clock.label": "Clock"}"#),
        ])
    }

    fn backend_bundle(name: &str) -> Bytes {
        build_bundle(&[(
            "backend/manifest.json",
            &format!(
                r#"{{"name": "{name}", "version": "1.0.0", "backend_entry": "routes.so"}}"#
            ),
        )])
    }

    #[tokio::test]
    async fn installs_frontend_only_widget() {
        let rig = rig();

        let record = rig.controller.install(widget_bundle()).await.unwrap();

        assert_eq!(record.name, "ClockWidget");
        assert!(record.is_enabled);
        assert!(record.backend_entry.is_none());

        // Files landed under the canonical {Name}_{Version} directory.
        let component = rig
            .config
            .frontend_root
            .join("ClockWidget_1.0.0")
            .join("ClockWidget.vue");
        assert!(component.exists());

        // Locale pack copied into the store; nothing mounted.
        let pack = rig.locales.find(record.id, "en").await.unwrap().unwrap();
        assert_eq!(pack["clock.label"], "Clock");
        assert!(!rig.mounter.is_mounted("ClockWidget").await);
    }

    #[tokio::test]
    async fn install_mounts_backend_routes() {
        let rig = rig();
        rig.loader.insert("HiveOs", Arc::new(PingProvider));

        let record = rig.controller.install(backend_bundle("HiveOs")).await.unwrap();

        assert!(record.last_error.is_none());
        assert!(rig.mounter.is_mounted("HiveOs").await);
        assert!(rig
            .mounter
            .dispatch("HiveOs", RouteMethod::Get, "/ping")
            .await
            .is_some());
    }

    #[tokio::test]
    async fn duplicate_install_leaves_existing_files_untouched() {
        let rig = rig();

        rig.controller.install(widget_bundle()).await.unwrap();
        let err = rig.controller.install(widget_bundle()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateExtension);

        // The first install's files survive the rejected second attempt.
        assert!(rig
            .config
            .frontend_root
            .join("ClockWidget_1.0.0")
            .join("ClockWidget.vue")
            .exists());
        assert_eq!(rig.registry.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_registration_rolls_back_placed_directories() {
        let rig = rig();
        rig.registry.fail_register.store(true, Ordering::SeqCst);

        // Both sides so the rollback has to remove two placed dirs.
        let bundle = build_bundle(&[
            (
                "backend/manifest.json",
                r#"{"name": "Store", "version": "1.0.0", "backend_entry": "routes.so"}"#,
            ),
            (
                "frontend/manifest.json",
                r#"{"name": "Store", "version": "1.0.0", "frontend_entry": "Store.vue"}"#,
            ),
            ("frontend/Store.vue", "<template>store</template>"),
        ]);

        let err = rig.controller.install(bundle).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Database);

        // No directory outlives the failed registration.
        assert!(!rig.config.backend_root.join("Store_1.0.0").exists());
        assert!(!rig.config.frontend_root.join("Store_1.0.0").exists());
        assert!(!rig.mounter.is_mounted("Store").await);

        // A retry with a healthy registry starts from a clean slate.
        rig.registry.fail_register.store(false, Ordering::SeqCst);
        let record = rig
            .controller
            .install(build_bundle(&[(
                "backend/manifest.json",
                r#"{"name": "Store", "version": "1.0.0", "backend_entry": "routes.so"}"#,
            )]))
            .await
            .unwrap();
        assert_eq!(record.name, "Store");
    }

    #[tokio::test]
    async fn mismatched_sides_are_rejected_without_a_record() {
        let rig = rig();
        let bundle = build_bundle(&[
            (
                "backend/manifest.json",
                r#"{"name": "Store", "version": "1.0.0", "backend_entry": "routes.so"}"#,
            ),
            (
                "frontend/manifest.json",
                r#"{"name": "Store", "version": "2.0.0", "frontend_entry": "Store.vue"}"#,
            ),
        ]);

        let err = rig.controller.install(bundle).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ManifestMismatch);

        // Validation failure: no record, no placed directories.
        assert!(rig.registry.list().await.unwrap().is_empty());
        assert!(!rig.config.backend_root.join("Store_1.0.0").exists());
        assert!(!rig.config.frontend_root.join("Store_2.0.0").exists());
    }

    #[tokio::test]
    async fn declared_ui_strings_require_en_pack() {
        let rig = rig();
        let bundle = build_bundle(&[
            (
                "frontend/manifest.json",
                r#"{
                    "name": "Untranslated",
                    "version": "1.0.0",
                    "frontend_entry": "W.vue",
                    "locales": ["ru"]
                }"#,
            ),
            ("frontend/locales/ru.json", "{}"),
        ]);

        let err = rig.controller.install(bundle).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ManifestInvalid);
    }

    #[tokio::test]
    async fn mount_failure_is_contained() {
        let rig = rig();
        // No provider registered for this name; the entry load fails.

        let record = rig.controller.install(backend_bundle("Broken")).await.unwrap();

        assert!(record.last_error.is_some());
        assert!(!rig.mounter.is_mounted("Broken").await);
        // The record is installed and visible despite the mount failure.
        assert_eq!(rig.registry.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn disable_unmounts_and_enable_remounts() {
        let rig = rig();
        rig.loader.insert("HiveOs", Arc::new(PingProvider));
        let record = rig.controller.install(backend_bundle("HiveOs")).await.unwrap();

        let disabled = rig.controller.set_enabled(record.id, false).await.unwrap();
        assert!(!disabled.is_enabled);
        assert!(!rig.mounter.is_mounted("HiveOs").await);

        let enabled = rig.controller.set_enabled(record.id, true).await.unwrap();
        assert!(enabled.is_enabled);
        assert!(rig.mounter.is_mounted("HiveOs").await);
    }

    #[tokio::test]
    async fn uninstall_drops_only_prefix_matched_tables() {
        let rig = rig_with_schema(MemorySchemaStore::with_tables(&[
            "ext_storeextension_products",
            "ext_storeextension_orders",
            "ext_blogextension_posts",
        ]));
        let id = rig
            .registry
            .seed(MemoryRegistry::record("StoreExtension", "1.0.0"))
            .await;

        let report = rig
            .controller
            .uninstall(
                id,
                UninstallOptions {
                    delete_data: true,
                    delete_files: false,
                },
            )
            .await
            .unwrap();

        assert!(report.clean());
        // Another extension's table with a disjoint prefix survives.
        assert_eq!(rig.schema.remaining().await, vec!["ext_blogextension_posts"]);
        assert!(rig.registry.find(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn explicit_schema_declaration_overrides_convention() {
        let rig = rig_with_schema(MemorySchemaStore::with_tables(&[
            "ext_storeextension_products",
            "ext_storeextension_orders",
            "users",
        ]));
        let id = rig
            .registry
            .seed(MemoryRegistry::record("StoreExtension", "1.0.0"))
            .await;

        // The declaration names one owned table and one it must not be
        // allowed to drop.
        let backend_dir = rig.config.backend_root.join("StoreExtension_1.0.0");
        std::fs::create_dir_all(&backend_dir).unwrap();
        std::fs::write(
            backend_dir.join(manifest::SCHEMA_FILE),
            r#"{"tables": ["ext_storeextension_products", "users"]}"#,
        )
        .unwrap();

        rig.controller
            .uninstall(
                id,
                UninstallOptions {
                    delete_data: true,
                    delete_files: false,
                },
            )
            .await
            .unwrap();

        // Declared table dropped; undeclared one kept; platform table
        // refused.
        assert_eq!(
            rig.schema.remaining().await,
            vec!["ext_storeextension_orders", "users"]
        );
    }

    #[tokio::test]
    async fn uninstall_files_only_keeps_tables() {
        let rig = rig_with_schema(MemorySchemaStore::with_tables(&["ext_clockwidget_state"]));
        let record = rig.controller.install(widget_bundle()).await.unwrap();

        let report = rig
            .controller
            .uninstall(
                record.id,
                UninstallOptions {
                    delete_data: false,
                    delete_files: true,
                },
            )
            .await
            .unwrap();

        assert!(report.clean());
        assert!(!rig.config.frontend_root.join("ClockWidget_1.0.0").exists());
        // Tables survive for a later reinstall to adopt.
        assert_eq!(rig.schema.remaining().await, vec!["ext_clockwidget_state"]);
        assert!(rig.registry.find(record.id).await.unwrap().is_none());
        assert!(rig.locales.find(record.id, "en").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_steps_are_reported_and_removal_continues() {
        let rig = rig_with_schema(MemorySchemaStore::with_tables(&["ext_clockwidget_state"]));
        rig.schema.fail_drops.store(true, Ordering::SeqCst);
        let record = rig.controller.install(widget_bundle()).await.unwrap();

        let report = rig
            .controller
            .uninstall(
                record.id,
                UninstallOptions {
                    delete_data: true,
                    delete_files: true,
                },
            )
            .await
            .unwrap();

        assert!(!report.clean());
        assert!(report
            .steps
            .iter()
            .any(|s| !s.success && s.step.contains("ext_clockwidget_state")));
        // The registry record is still removed so no record points at
        // partially-deleted state.
        assert!(rig.registry.find(record.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn mount_enabled_skips_disabled_extensions() {
        let rig = rig();
        rig.loader.insert("HiveOs", Arc::new(PingProvider));

        let mut enabled = MemoryRegistry::record("HiveOs", "1.0.0");
        enabled.backend_entry = Some("routes.so".to_string());
        rig.registry.seed(enabled).await;

        let mut disabled = MemoryRegistry::record("Dormant", "1.0.0");
        disabled.backend_entry = Some("routes.so".to_string());
        disabled.is_enabled = false;
        rig.registry.seed(disabled).await;

        rig.controller.mount_enabled().await.unwrap();

        assert!(rig.mounter.is_mounted("HiveOs").await);
        assert!(!rig.mounter.is_mounted("Dormant").await);
    }

    #[tokio::test]
    async fn uninstall_missing_extension_is_not_found() {
        let rig = rig();
        let err = rig
            .controller
            .uninstall(404, UninstallOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
