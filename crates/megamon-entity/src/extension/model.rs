//! Extension registry record model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One installed extension, as stored in the registry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExtensionRecord {
    /// Stable integer identity assigned at install time. Widgets and
    /// cross-extension references key on this.
    pub id: i32,
    /// Extension name; the folder-name component before the version
    /// suffix. Unique together with `version`.
    pub name: String,
    /// Semantic-version string. `{name}_{version}` is the directory name
    /// on both the backend and frontend filesystems.
    pub version: String,
    /// When false, routes are unmounted but the record and files persist.
    pub is_enabled: bool,
    /// Relative path of the backend route module within the extension
    /// directory, if the extension contributes backend routes.
    pub backend_entry: Option<String>,
    /// Relative path of the widget component, if the extension
    /// contributes UI.
    pub frontend_entry: Option<String>,
    /// Relative path of the optional config-editor component.
    pub frontend_editor: Option<String>,
    /// Capability-name to descriptor-list mapping consumed by the
    /// relationship resolver.
    pub provides: serde_json::Value,
    /// Last mount or lifecycle error, shown to admins as
    /// "installed, inactive, error". Cleared on successful mount.
    pub last_error: Option<String>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl ExtensionRecord {
    /// Directory name shared by the backend and frontend trees.
    pub fn dir_name(&self) -> String {
        format!("{}_{}", self.name, self.version)
    }

    /// Prefix every table this extension owns must start with.
    ///
    /// This derivation is the documented contract: an extension that
    /// names its tables outside `ext_{name.lower()}_{suffix}` will leak
    /// them at uninstall unless it declares them explicitly.
    pub fn table_prefix(&self) -> String {
        format!("ext_{}", self.name.to_lowercase())
    }

    /// Whether this extension contributes a widget component.
    pub fn has_widget(&self) -> bool {
        self.frontend_entry.is_some()
    }

    /// Descriptors declared for a capability, or an empty slice.
    pub fn provided(&self, capability: &str) -> &[serde_json::Value] {
        self.provides
            .get(capability)
            .and_then(|v| v.as_array())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

/// Data required to register a new extension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExtension {
    /// Extension name.
    pub name: String,
    /// Semantic-version string.
    pub version: String,
    /// Backend route module path, relative to the extension directory.
    pub backend_entry: Option<String>,
    /// Widget component path.
    pub frontend_entry: Option<String>,
    /// Config-editor component path.
    pub frontend_editor: Option<String>,
    /// Declared capabilities.
    pub provides: serde_json::Value,
}
