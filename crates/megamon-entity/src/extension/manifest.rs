//! Extension manifest descriptor.
//!
//! The manifest is transient: it is read from `manifest.json` at install
//! and enable time, validated, and copied into the registry record. It is
//! never persisted as-is.

use serde::{Deserialize, Serialize};

use megamon_core::{AppError, AppResult};

use super::model::CreateExtension;

/// Parsed contents of an extension's `manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestDescriptor {
    /// Extension name.
    pub name: String,
    /// Semantic-version string.
    pub version: String,
    /// Backend route module path, relative to the extension directory.
    #[serde(default)]
    pub backend_entry: Option<String>,
    /// Widget component path, relative to the extension directory.
    #[serde(default)]
    pub frontend_entry: Option<String>,
    /// Optional config-editor component path.
    #[serde(default)]
    pub frontend_editor: Option<String>,
    /// Optional frontend route declarations (path/component/meta).
    #[serde(default)]
    pub frontend_routes: Vec<FrontendRoute>,
    /// Capability-name to descriptor-list mapping.
    #[serde(default = "empty_object")]
    pub provides: serde_json::Value,
    /// Languages this extension ships locale packs for.
    #[serde(default)]
    pub locales: Vec<String>,
}

/// A frontend route contributed by an extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontendRoute {
    /// Route path.
    pub path: String,
    /// Component path relative to the extension directory.
    pub component: String,
    /// Free-form route metadata.
    #[serde(default = "empty_object")]
    pub meta: serde_json::Value,
}

impl ManifestDescriptor {
    /// Validates the required-field contract: `name`, `version`, and at
    /// least one entry point must be present.
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::manifest_invalid("Manifest field 'name' is empty"));
        }
        if self.version.trim().is_empty() {
            return Err(AppError::manifest_invalid(
                "Manifest field 'version' is empty",
            ));
        }
        if self.backend_entry.is_none() && self.frontend_entry.is_none() {
            return Err(AppError::manifest_invalid(
                "Manifest must declare backend_entry or frontend_entry",
            ));
        }
        Ok(())
    }

    /// Directory name this extension occupies under both roots.
    pub fn dir_name(&self) -> String {
        format!("{}_{}", self.name, self.version)
    }

    /// Converts the descriptor into registry insert data.
    pub fn to_create(&self) -> CreateExtension {
        CreateExtension {
            name: self.name.clone(),
            version: self.version.clone(),
            backend_entry: self.backend_entry.clone(),
            frontend_entry: self.frontend_entry.clone(),
            frontend_editor: self.frontend_editor.clone(),
            provides: self.provides.clone(),
        }
    }
}

/// Optional `database_schema.json`: explicit declaration of the tables an
/// extension owns. Uninstall consults this before falling back to the
/// naming-convention pattern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OwnedSchema {
    /// Table names this extension created and owns.
    #[serde(default)]
    pub tables: Vec<String>,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}
