//! Manifest reading and validation.
//!
//! Pure reads: nothing here touches the registry or moves files.

use std::path::Path;

use tracing::debug;

use megamon_core::{AppError, AppResult};
use megamon_entity::{ManifestDescriptor, OwnedSchema};

/// File name of the per-extension descriptor.
pub const MANIFEST_FILE: &str = "manifest.json";

/// File name of the optional owned-table declaration.
pub const SCHEMA_FILE: &str = "database_schema.json";

/// Reads and validates `manifest.json` from an extension directory.
///
/// Fails with `ManifestInvalid` when the file is absent, malformed, or
/// missing required fields (`name`, `version`, and at least one entry
/// point).
pub fn read_manifest(dir: &Path) -> AppResult<ManifestDescriptor> {
    let path = dir.join(MANIFEST_FILE);
    let raw = std::fs::read_to_string(&path).map_err(|e| {
        AppError::manifest_invalid(format!("Cannot read manifest '{}': {e}", path.display()))
    })?;

    let manifest: ManifestDescriptor = serde_json::from_str(&raw).map_err(|e| {
        AppError::manifest_invalid(format!("Malformed manifest '{}': {e}", path.display()))
    })?;

    manifest.validate()?;

    debug!(
        extension = %manifest.name,
        version = %manifest.version,
        "Manifest read"
    );

    Ok(manifest)
}

/// Reads the optional `database_schema.json` declaring owned tables.
///
/// A missing file is `Ok(None)`; a present but malformed file is a
/// `ManifestInvalid` error so install surfaces it instead of silently
/// losing the declaration.
pub fn read_owned_schema(dir: &Path) -> AppResult<Option<OwnedSchema>> {
    let path = dir.join(SCHEMA_FILE);
    if !path.exists() {
        return Ok(None);
    }

    let raw = std::fs::read_to_string(&path).map_err(|e| {
        AppError::manifest_invalid(format!("Cannot read schema file '{}': {e}", path.display()))
    })?;

    let schema: OwnedSchema = serde_json::from_str(&raw).map_err(|e| {
        AppError::manifest_invalid(format!("Malformed schema file '{}': {e}", path.display()))
    })?;

    Ok(Some(schema))
}
