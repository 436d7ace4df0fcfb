//! Request DTOs.

use serde::{Deserialize, Serialize};

use megamon_extension::components::EntryField;

/// PATCH /api/extensions/{id} body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateExtensionRequest {
    /// New enabled state.
    pub is_enabled: bool,
}

/// DELETE /api/extensions/{id} query flags.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UninstallQuery {
    /// Drop the extension's owned tables.
    #[serde(default)]
    pub delete_data: bool,
    /// Remove the extension's directories.
    #[serde(default)]
    pub delete_files: bool,
}

/// GET /api/extensions/{id}/component query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ComponentQuery {
    /// Which declared entry to load.
    #[serde(default = "default_entry")]
    pub entry: EntryField,
}

fn default_entry() -> EntryField {
    EntryField::Widget
}
