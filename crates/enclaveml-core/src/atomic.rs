//! Crash-safe file replacement.
//!
//! Data goes to a uniquely named sibling first, is synced, then renamed over
//! the destination. Readers see either the previous file or the complete new
//! one. The sibling is removed on every failure path.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::warn;
use uuid::Uuid;

use crate::{Error, Result};

/// Removes the temporary file unless the rename went through.
struct PendingFile {
    path: PathBuf,
    armed: bool,
}

impl Drop for PendingFile {
    fn drop(&mut self) {
        if self.armed {
            let _ = fs::remove_file(&self.path);
        }
    }
}

fn parent_dir(path: &Path) -> Result<&Path> {
    let parent = path.parent().ok_or_else(|| {
        Error::io(
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "path has no parent directory"),
        )
    })?;
    if parent.as_os_str().is_empty() {
        Ok(Path::new("."))
    } else {
        Ok(parent)
    }
}

fn temp_path(dir: &Path, path: &Path) -> Result<PathBuf> {
    let file_name = path.file_name().ok_or_else(|| {
        Error::io(
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
        )
    })?;
    let mut temp = OsString::from(".");
    temp.push(file_name);
    temp.push(format!(".tmp.{}", Uuid::new_v4()));
    Ok(dir.join(temp))
}

#[cfg(unix)]
fn fsync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn fsync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

/// Logs a failed directory sync. The replaced file is already in place.
fn finish_dir_sync(dir: &Path, synced: io::Result<()>) {
    if let Err(e) = synced {
        warn!(dir = %dir.display(), error = %e, "directory sync failed after replace");
    }
}

/// Creates missing parent directories, then atomically replaces `path` with `data`.
/// Returns `Ok` once the rename succeeds, even if the directory sync afterwards fails.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = parent_dir(path)?;
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

    let temp = temp_path(dir, path)?;
    let mut pending = PendingFile {
        path: temp.clone(),
        armed: true,
    };

    {
        let mut file = File::create(&temp).map_err(|e| Error::io(&temp, e))?;
        file.write_all(data).map_err(|e| Error::io(&temp, e))?;
        file.sync_all().map_err(|e| Error::io(&temp, e))?;
    }

    fs::rename(&temp, path).map_err(|e| Error::io(path, e))?;
    pending.armed = false;

    finish_dir_sync(dir, fsync_dir(dir));
    Ok(())
}
