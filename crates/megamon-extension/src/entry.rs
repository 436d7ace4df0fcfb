//! Backend entry loading.
//!
//! An [`EntryLoader`] resolves an extension record's `backend_entry` to a
//! [`RouteProvider`] instance. Two implementations exist: a
//! `libloading`-backed dynamic loader (feature `dynamic`) and a static
//! table of compiled-in providers used for built-in extensions and tests.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use megamon_core::{AppError, AppResult};
use megamon_entity::ExtensionRecord;

use crate::provider::RouteProvider;

/// Resolves a record's backend entry to a route provider.
///
/// Failure modes are part of the contract: `ImportFailure` when the
/// module cannot be loaded at all, `EntryPointMissing` when it loads but
/// exposes no provider.
#[async_trait]
pub trait EntryLoader: Send + Sync + 'static {
    /// Loads the provider for `record`, whose backend files live under
    /// `backend_dir`.
    async fn load(
        &self,
        record: &ExtensionRecord,
        backend_dir: &Path,
    ) -> AppResult<Arc<dyn RouteProvider>>;
}

/// Static table of compiled-in route providers keyed by extension name.
#[derive(Default)]
pub struct StaticEntryLoader {
    providers: DashMap<String, Arc<dyn RouteProvider>>,
}

impl StaticEntryLoader {
    /// Creates an empty loader.
    pub fn new() -> Self {
        Self {
            providers: DashMap::new(),
        }
    }

    /// Registers a compiled-in provider for an extension name.
    pub fn insert(&self, name: impl Into<String>, provider: Arc<dyn RouteProvider>) {
        self.providers.insert(name.into(), provider);
    }
}

impl std::fmt::Debug for StaticEntryLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticEntryLoader")
            .field("providers", &self.providers.len())
            .finish()
    }
}

#[async_trait]
impl EntryLoader for StaticEntryLoader {
    async fn load(
        &self,
        record: &ExtensionRecord,
        _backend_dir: &Path,
    ) -> AppResult<Arc<dyn RouteProvider>> {
        self.providers
            .get(&record.name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                AppError::entry_point_missing(format!(
                    "No compiled-in route provider for extension '{}'",
                    record.name
                ))
            })
    }
}

/// Dynamic loader backed by `libloading` (feature-gated).
#[cfg(feature = "dynamic")]
pub mod dynamic_loader {
    use std::path::Path;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;
    use tracing::info;

    use megamon_core::{AppError, AppResult};
    use megamon_entity::ExtensionRecord;

    use crate::provider::RouteProvider;

    use super::EntryLoader;

    /// Type of the provider creation function exported by dynamic entries.
    ///
    /// Backend entry libraries must export:
    /// `extern "C" fn create_route_provider() -> *mut dyn RouteProvider`
    pub type CreateProviderFn = unsafe extern "C" fn() -> *mut dyn RouteProvider;

    /// Loads route providers from shared libraries (.so / .dll / .dylib).
    pub struct DynamicEntryLoader {
        /// Loaded libraries (kept alive for the lifetime of the loader).
        libraries: Mutex<Vec<libloading::Library>>,
    }

    impl DynamicEntryLoader {
        /// Creates a new dynamic loader.
        pub fn new() -> Self {
            Self {
                libraries: Mutex::new(Vec::new()),
            }
        }
    }

    impl Default for DynamicEntryLoader {
        fn default() -> Self {
            Self::new()
        }
    }

    impl std::fmt::Debug for DynamicEntryLoader {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("DynamicEntryLoader").finish()
        }
    }

    #[async_trait]
    impl EntryLoader for DynamicEntryLoader {
        async fn load(
            &self,
            record: &ExtensionRecord,
            backend_dir: &Path,
        ) -> AppResult<Arc<dyn RouteProvider>> {
            let entry = record.backend_entry.as_deref().ok_or_else(|| {
                AppError::entry_point_missing(format!(
                    "Extension '{}' declares no backend entry",
                    record.name
                ))
            })?;
            let path = backend_dir.join(entry);

            // SAFETY: loads arbitrary code from the extension bundle.
            // Only admin-uploaded extensions reach this point.
            unsafe {
                let lib = libloading::Library::new(&path).map_err(|e| {
                    AppError::import_failure(format!(
                        "Failed to load entry library '{}': {e}",
                        path.display()
                    ))
                })?;

                let create_fn: libloading::Symbol<CreateProviderFn> =
                    lib.get(b"create_route_provider").map_err(|e| {
                        AppError::entry_point_missing(format!(
                            "Entry '{}' exposes no 'create_route_provider' symbol: {e}",
                            path.display()
                        ))
                    })?;

                let raw = create_fn();
                let provider = Arc::from_raw(raw);

                info!(
                    extension = %record.name,
                    path = %path.display(),
                    "Dynamic backend entry loaded"
                );

                self.libraries.lock().await.push(lib);

                Ok(provider)
            }
        }
    }
}

#[cfg(feature = "dynamic")]
pub use dynamic_loader::DynamicEntryLoader;
