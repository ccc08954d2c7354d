//! Atomic file replacement.
//!
//! New content is written to a temporary file in the target's directory and
//! renamed over the target, so readers see either the old file or the new
//! one, never a partial write.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::config::SyncMode;
use crate::error::{io_at, LedgerError, Result};

/// Whether an existing target may be replaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Replace {
    Overwrite,
    /// Fail with `AlreadyExists` if the target is present.
    NoClobber,
}

pub(crate) fn write_atomic(
    path: &Path,
    bytes: &[u8],
    sync: SyncMode,
    replace: Replace,
) -> Result<()> {
    let dir = parent_dir(path);
    fs::create_dir_all(dir).map_err(io_at(dir))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_at(dir))?;
    tmp.write_all(bytes).map_err(io_at(path))?;
    tmp.flush().map_err(io_at(path))?;
    if sync == SyncMode::EveryWrite {
        tmp.as_file().sync_all().map_err(io_at(path))?;
    }

    match replace {
        Replace::Overwrite => tmp.persist(path).map(drop),
        Replace::NoClobber => tmp.persist_noclobber(path).map(drop),
    }
    .map_err(|e| io_at(path)(e.error))?;

    if sync == SyncMode::EveryWrite {
        sync_dir(dir)?;
    }

    debug!(path = %path.display(), bytes = bytes.len(), "atomic write");
    Ok(())
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    fs::File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(io_at(dir))
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

/// True if `err` wraps an `AlreadyExists` I/O failure.
pub(crate) fn is_already_exists(err: &LedgerError) -> bool {
    matches!(err, LedgerError::Io { source, .. } if source.kind() == io::ErrorKind::AlreadyExists)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.json");

        write_atomic(&path, b"first", SyncMode::EveryWrite, Replace::Overwrite).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"first");

        write_atomic(&path, b"second", SyncMode::OsDefault, Replace::Overwrite).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");
    }

    #[test]
    fn creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("file.json");
        write_atomic(&path, b"x", SyncMode::EveryWrite, Replace::Overwrite).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn no_clobber_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.json");
        write_atomic(&path, b"original", SyncMode::OsDefault, Replace::NoClobber).unwrap();

        let err =
            write_atomic(&path, b"other", SyncMode::OsDefault, Replace::NoClobber).unwrap_err();
        assert!(is_already_exists(&err));
        assert_eq!(fs::read(&path).unwrap(), b"original");
    }

    #[test]
    fn leaves_no_temp_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.json");
        write_atomic(&path, b"x", SyncMode::EveryWrite, Replace::Overwrite).unwrap();
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("file.json")]);
    }

    #[test]
    fn parent_of_bare_name_is_cwd() {
        assert_eq!(parent_dir(Path::new("evolution.json")), Path::new("."));
        assert_eq!(parent_dir(Path::new("a/evolution.json")), Path::new("a"));
    }
}
