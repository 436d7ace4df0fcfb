//! Backend route mounting.
//!
//! The mounter owns the live route table consulted on every dynamic
//! `/extensions/{name}/...` request. Mount and unmount are administrative
//! operations; the lifecycle controller serializes them under its coarse
//! lock so a request never observes a half-mounted route set.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use megamon_core::AppResult;
use megamon_entity::ExtensionRecord;

use crate::entry::EntryLoader;
use crate::provider::{ExtensionHandler, RouteBinding, RouteMethod};

/// Canonical mount prefix for extension backends. The admin API lives
/// under `/api`; mounted extension routes live here.
pub const MOUNT_PREFIX: &str = "/extensions";

/// Routes mounted for one extension.
struct MountedExtension {
    extension_id: i32,
    bindings: Vec<RouteBinding>,
}

/// The live route table, keyed by extension name.
pub struct RouteMounter {
    routes: RwLock<HashMap<String, MountedExtension>>,
    entry_loader: Arc<dyn EntryLoader>,
    backend_root: PathBuf,
}

impl RouteMounter {
    /// Creates a mounter over a backend root directory.
    pub fn new(entry_loader: Arc<dyn EntryLoader>, backend_root: impl Into<PathBuf>) -> Self {
        Self {
            routes: RwLock::new(HashMap::new()),
            entry_loader,
            backend_root: backend_root.into(),
        }
    }

    /// Backend directory of an installed extension.
    pub fn backend_dir(&self, record: &ExtensionRecord) -> PathBuf {
        self.backend_root.join(record.dir_name())
    }

    /// Mounts an extension's backend routes under `/extensions/{name}`.
    ///
    /// Idempotent: mounting an already-mounted extension is a no-op, not
    /// an error. Extensions without a backend entry mount nothing.
    /// Returns whether the route table changed.
    pub async fn mount(&self, record: &ExtensionRecord) -> AppResult<bool> {
        if record.backend_entry.is_none() {
            debug!(extension = %record.name, "No backend entry; nothing to mount");
            return Ok(false);
        }

        {
            let routes = self.routes.read().await;
            if routes.contains_key(&record.name) {
                debug!(extension = %record.name, "Already mounted; skipping");
                return Ok(false);
            }
        }

        let backend_dir = self.backend_dir(record);
        let provider = self.entry_loader.load(record, &backend_dir).await?;
        let bindings = provider.routes();

        let mut routes = self.routes.write().await;
        // Re-check under the write lock; a concurrent mount may have won.
        if routes.contains_key(&record.name) {
            return Ok(false);
        }

        info!(
            extension = %record.name,
            version = %record.version,
            routes = bindings.len(),
            prefix = %format!("{MOUNT_PREFIX}/{}", record.name),
            "Extension routes mounted"
        );

        routes.insert(
            record.name.clone(),
            MountedExtension {
                extension_id: record.id,
                bindings,
            },
        );

        Ok(true)
    }

    /// Unmounts an extension; subsequent dispatches return `None` (404).
    /// Returns whether anything was removed.
    pub async fn unmount(&self, name: &str) -> bool {
        let removed = self.routes.write().await.remove(name).is_some();
        if removed {
            info!(extension = %name, "Extension routes unmounted");
        }
        removed
    }

    /// Whether an extension currently has mounted routes.
    pub async fn is_mounted(&self, name: &str) -> bool {
        self.routes.read().await.contains_key(name)
    }

    /// Names of all mounted extensions.
    pub async fn mounted(&self) -> Vec<String> {
        let mut names: Vec<String> = self.routes.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// The `(method, path)` pairs mounted for one extension, sorted.
    pub async fn route_set(&self, name: &str) -> Vec<(RouteMethod, String)> {
        let routes = self.routes.read().await;
        let mut set: Vec<(RouteMethod, String)> = routes
            .get(name)
            .map(|m| {
                m.bindings
                    .iter()
                    .map(|b| (b.method, b.path.clone()))
                    .collect()
            })
            .unwrap_or_default();
        set.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.to_string().cmp(&b.0.to_string())));
        set
    }

    /// Resolves a request against the route table.
    ///
    /// `path` is the portion below the extension's mount prefix. Returns
    /// the handler with captured `:param` segments, the owning extension
    /// id, or `None` when nothing matches.
    pub async fn dispatch(
        &self,
        name: &str,
        method: RouteMethod,
        path: &str,
    ) -> Option<(Arc<dyn ExtensionHandler>, HashMap<String, String>, i32)> {
        let routes = self.routes.read().await;
        let mounted = routes.get(name)?;

        for binding in &mounted.bindings {
            if binding.method != method {
                continue;
            }
            if let Some(params) = match_path(&binding.path, path) {
                return Some((binding.handler.clone(), params, mounted.extension_id));
            }
        }
        None
    }
}

impl std::fmt::Debug for RouteMounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteMounter")
            .field("backend_root", &self.backend_root)
            .finish()
    }
}

/// Matches a `:param`-style pattern against a concrete path, returning
/// captured segments on success.
fn match_path(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    let pattern_segments: Vec<&str> = pattern.trim_matches('/').split('/').collect();
    let path_segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    if pattern_segments.len() != path_segments.len() {
        return None;
    }

    let mut params = HashMap::new();
    for (pat, seg) in pattern_segments.iter().zip(&path_segments) {
        if let Some(name) = pat.strip_prefix(':') {
            if seg.is_empty() {
                return None;
            }
            params.insert(name.to_string(), (*seg).to_string());
        } else if pat != seg {
            return None;
        }
    }
    Some(params)
}
