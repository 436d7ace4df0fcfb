//! Extension bundle unpacking.
//!
//! Uploaded extensions arrive as zip archives with `backend/` and/or
//! `frontend/` top-level directories. Entries resolving outside the
//! destination (zip-slip) are rejected.

use std::io::Cursor;
use std::path::Path;

use tracing::debug;

use megamon_core::{AppError, AppResult};

/// Unpacks `bytes` into `dest`, creating it if needed.
///
/// Synchronous; callers on the async runtime wrap this in
/// `spawn_blocking`.
pub fn unpack(bytes: &[u8], dest: &Path) -> AppResult<()> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| AppError::validation(format!("Unreadable extension archive: {e}")))?;

    std::fs::create_dir_all(dest)?;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| AppError::validation(format!("Corrupt archive entry {index}: {e}")))?;

        // enclosed_name() rejects absolute paths and `..` traversal.
        let relative = entry.enclosed_name().ok_or_else(|| {
            AppError::validation(format!(
                "Archive entry '{}' escapes the extraction root",
                entry.name()
            ))
        })?;
        let target = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = std::fs::File::create(&target)?;
        std::io::copy(&mut entry, &mut out)?;
    }

    debug!(dest = %dest.display(), entries = archive.len(), "Archive unpacked");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use zip::write::SimpleFileOptions;

    fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            for (name, content) in entries {
                writer
                    .start_file(*name, SimpleFileOptions::default())
                    .unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn unpacks_nested_entries() {
        let dest = tempfile::tempdir().unwrap();
        let bytes = build_zip(&[
            ("backend/manifest.json", "{}"),
            ("frontend/locales/en.json", "{}"),
        ]);

        unpack(&bytes, dest.path()).unwrap();

        assert!(dest.path().join("backend/manifest.json").exists());
        assert!(dest.path().join("frontend/locales/en.json").exists());
    }

    #[test]
    fn rejects_zip_slip() {
        let dest = tempfile::tempdir().unwrap();
        let bytes = build_zip(&[("../evil.txt", "pwned")]);

        let err = unpack(&bytes, dest.path()).unwrap_err();
        assert_eq!(err.kind, megamon_core::ErrorKind::Validation);
        assert!(!dest.path().parent().unwrap().join("evil.txt").exists());
    }

    #[test]
    fn rejects_garbage_bytes() {
        let dest = tempfile::tempdir().unwrap();
        let err = unpack(b"not a zip", dest.path()).unwrap_err();
        assert_eq!(err.kind, megamon_core::ErrorKind::Validation);
    }
}
