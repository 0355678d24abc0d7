//! Artifact archive extraction.
//!
//! The work dir is wiped and rebuilt on every extraction so it always
//! mirrors exactly one artifact version.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use cdwatch_core::WatchError;
use tracing::{debug, warn};
use zip::ZipArchive;

/// Wipe `dest` and extract every entry of the zip archive at `archive_path`
/// into it.
pub fn extract_archive(archive_path: &Path, dest: &Path) -> Result<(), WatchError> {
    debug!(archive = %archive_path.display(), dest = %dest.display(), "extracting");

    match fs::remove_dir_all(dest) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(WatchError::io(dest, e)),
    }
    fs::create_dir_all(dest).map_err(|e| WatchError::io(dest, e))?;

    let file = File::open(archive_path).map_err(|e| WatchError::io(archive_path, e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| archive_error(archive_path, &e))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| archive_error(archive_path, &e))?;

        // Entries with absolute or parent-escaping names never leave dest
        let Some(relative) = entry.enclosed_name() else {
            warn!(entry = entry.name(), "skipping unsafe archive entry");
            continue;
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| WatchError::io(&out_path, e))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| WatchError::io(parent, e))?;
        }
        let mut out_file = File::create(&out_path).map_err(|e| WatchError::io(&out_path, e))?;
        io::copy(&mut entry, &mut out_file).map_err(|e| WatchError::io(&out_path, e))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&out_path, fs::Permissions::from_mode(mode));
        }
    }

    Ok(())
}

fn archive_error(path: &Path, error: &zip::result::ZipError) -> WatchError {
    WatchError::Archive {
        path: path.to_path_buf(),
        reason: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_test_zip(path: &Path, entries: &[(&str, &str)]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, content) in entries {
            writer
                .start_file(name.to_string(), SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn extracts_nested_entries() {
        let tmp = TempDir::new().unwrap();
        let zip_path = tmp.path().join("a.zip");
        write_test_zip(&zip_path, &[("test.txt", "hello"), ("sub/inner.txt", "nested")]);

        let dest = tmp.path().join("out");
        extract_archive(&zip_path, &dest).unwrap();

        assert_eq!(fs::read_to_string(dest.join("test.txt")).unwrap(), "hello");
        assert_eq!(
            fs::read_to_string(dest.join("sub/inner.txt")).unwrap(),
            "nested"
        );
    }

    #[test]
    fn extraction_wipes_previous_contents() {
        let tmp = TempDir::new().unwrap();
        let zip_path = tmp.path().join("a.zip");
        write_test_zip(&zip_path, &[("fresh.txt", "v2")]);

        let dest = tmp.path().join("out");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("stale.txt"), "v1").unwrap();

        extract_archive(&zip_path, &dest).unwrap();

        assert!(!dest.join("stale.txt").exists());
        assert_eq!(fs::read_to_string(dest.join("fresh.txt")).unwrap(), "v2");
    }

    #[test]
    fn missing_archive_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let result = extract_archive(&tmp.path().join("nope.zip"), &tmp.path().join("out"));
        assert!(result.is_err());
    }
}
