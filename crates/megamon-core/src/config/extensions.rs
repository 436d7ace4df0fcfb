//! Extension platform configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Extension platform configuration.
///
/// The four roots mirror the on-disk layout every installed extension
/// occupies: `{backend_root}/{Name}_{Version}/` for route modules and
/// `{frontend_root}/{Name}_{Version}/` for UI components, plus a staging
/// area for uploads in flight and a per-extension uploads tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionsConfig {
    /// Directory holding installed backend extension directories.
    #[serde(default = "default_backend_root")]
    pub backend_root: PathBuf,
    /// Directory holding installed frontend extension directories.
    #[serde(default = "default_frontend_root")]
    pub frontend_root: PathBuf,
    /// Directory holding per-extension upload trees (`uploads/{name}/`).
    #[serde(default = "default_uploads_root")]
    pub uploads_root: PathBuf,
    /// Scratch directory for unpacking uploaded archives before install.
    #[serde(default = "default_staging_root")]
    pub staging_root: PathBuf,
    /// Language used when a caller does not specify one.
    #[serde(default = "default_language")]
    pub default_language: String,
    /// Whether to mount all enabled extensions on startup.
    #[serde(default = "default_true")]
    pub auto_mount: bool,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            backend_root: default_backend_root(),
            frontend_root: default_frontend_root(),
            uploads_root: default_uploads_root(),
            staging_root: default_staging_root(),
            default_language: default_language(),
            auto_mount: default_true(),
        }
    }
}

fn default_backend_root() -> PathBuf {
    PathBuf::from("./data/extensions/backend")
}

fn default_frontend_root() -> PathBuf {
    PathBuf::from("./data/extensions/frontend")
}

fn default_uploads_root() -> PathBuf {
    PathBuf::from("./data/uploads")
}

fn default_staging_root() -> PathBuf {
    PathBuf::from("./data/staging")
}

fn default_language() -> String {
    "en".to_string()
}

fn default_true() -> bool {
    true
}
