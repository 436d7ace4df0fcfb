//! Locale pack loading and key resolution.
//!
//! A missing locale degrades to showing raw keys; it never breaks
//! navigation. The fallback chain is deterministic at every tier:
//! requested language, then `en`, then the remaining languages in
//! ascending language-code order, then a literal placeholder.

use std::collections::HashMap;
use std::path::Path;

use tracing::warn;

use megamon_core::AppResult;

use crate::registry::LocalePackStore;

/// Subdirectory holding `{language}.json` files inside an extension.
pub const LOCALES_DIR: &str = "locales";

/// The language every UI-owning extension must provide.
pub const BASE_LANGUAGE: &str = "en";

/// Reads one `locales/{language}.json` file. Malformed or unreadable
/// files are logged and treated as absent.
fn read_pack_file(extension_dir: &Path, language: &str) -> Option<HashMap<String, String>> {
    let path = extension_dir.join(LOCALES_DIR).join(format!("{language}.json"));
    let raw = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(pack) => Some(pack),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring malformed locale pack");
            None
        }
    }
}

/// Loads an extension's pack for `language`, falling back to `en`, then
/// to an empty mapping. Never fails the caller.
pub fn load_pack(extension_dir: &Path, language: &str) -> HashMap<String, String> {
    if let Some(pack) = read_pack_file(extension_dir, language) {
        return pack;
    }
    if language != BASE_LANGUAGE {
        if let Some(pack) = read_pack_file(extension_dir, BASE_LANGUAGE) {
            return pack;
        }
    }
    HashMap::new()
}

/// Languages an extension ships packs for, ascending.
pub fn available_languages(extension_dir: &Path) -> Vec<String> {
    let dir = extension_dir.join(LOCALES_DIR);
    let mut languages: Vec<String> = std::fs::read_dir(&dir)
        .into_iter()
        .flatten()
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().into_string().ok()?;
            name.strip_suffix(".json").map(str::to_string)
        })
        .collect();
    languages.sort();
    languages
}

/// Resolves one key across a set of language packs.
///
/// Lookup order: `language`, then `en`, then any remaining language in
/// ascending code order, then `fallback_literal`.
pub fn resolve(
    packs: &HashMap<String, HashMap<String, String>>,
    key: &str,
    language: &str,
    fallback_literal: &str,
) -> String {
    if let Some(value) = packs.get(language).and_then(|p| p.get(key)) {
        return value.clone();
    }
    if let Some(value) = packs.get(BASE_LANGUAGE).and_then(|p| p.get(key)) {
        return value.clone();
    }

    let mut remaining: Vec<&String> = packs
        .keys()
        .filter(|l| l.as_str() != language && l.as_str() != BASE_LANGUAGE)
        .collect();
    remaining.sort();
    for lang in remaining {
        if let Some(value) = packs.get(lang).and_then(|p| p.get(key)) {
            return value.clone();
        }
    }

    fallback_literal.to_string()
}

/// Fetches an extension's pack from the store with the same fallback
/// chain as [`load_pack`], used when the pack is needed out-of-band from
/// the extension's own activation path (embedded components).
pub async fn pack_from_store(
    store: &dyn LocalePackStore,
    extension_id: i32,
    language: &str,
) -> AppResult<HashMap<String, String>> {
    if let Some(pack) = store.find(extension_id, language).await? {
        return Ok(pack);
    }
    if language != BASE_LANGUAGE {
        if let Some(pack) = store.find(extension_id, BASE_LANGUAGE).await? {
            return Ok(pack);
        }
    }
    // Ascending order makes the last tier deterministic.
    for lang in store.languages(extension_id).await? {
        if let Some(pack) = store.find(extension_id, &lang).await? {
            return Ok(pack);
        }
    }
    Ok(HashMap::new())
}
