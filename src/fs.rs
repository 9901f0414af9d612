// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

use crate::error::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Create `path` and any missing parents. Existing directories are fine.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| Error::CreateDir {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write `contents` to a fresh temporary file next to `dest` and return its path.
///
/// The temp file lives in the same directory so that the later rename stays
/// on one filesystem. Secret files are created with mode 0600 from the start.
pub fn stage(dest: &Path, contents: &[u8], secret: bool) -> Result<PathBuf> {
    let parent = dest
        .parent()
        .ok_or_else(|| Error::InvalidPath(dest.to_path_buf()))?;

    let random_suffix: u64 = rand::Rng::random(&mut rand::rng());
    let temp_path = parent.join(format!(".tmp-{:x}", random_suffix));

    let written = if secret {
        write_secret_file(&temp_path, contents)
    } else {
        write_file(&temp_path, contents)
    };
    if written.is_err() {
        discard(&temp_path);
    }
    written.map(|()| temp_path)
}

/// Move a staged file over `dest`, replacing whatever is there.
pub fn commit(staged: &Path, dest: &Path) -> std::io::Result<()> {
    fs::rename(staged, dest)
}

/// Remove a staged file that will not be committed.
pub fn discard(staged: &Path) {
    if staged.exists() {
        if let Err(e) = fs::remove_file(staged) {
            tracing::warn!(path = %staged.display(), error = %e, "failed to remove temporary file");
        }
    }
}

/// Atomically write data to a file using a temporary file and rename.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let staged = stage(path, contents, false)?;
    commit(&staged, path).map_err(|e| {
        discard(&staged);
        Error::WriteFile {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    let to_error = |e| Error::WriteFile {
        path: path.to_path_buf(),
        source: e,
    };

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(to_error)?;
    file.write_all(contents).map_err(to_error)?;
    // Flush to disk before the rename makes the file visible
    file.sync_all().map_err(to_error)
}

#[cfg(unix)]
pub fn write_secret_file(path: &Path, contents: &[u8]) -> Result<()> {
    use std::os::unix::fs::OpenOptionsExt;

    let to_error = |e| Error::WriteFile {
        path: path.to_path_buf(),
        source: e,
    };

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
        .map_err(to_error)?;
    file.write_all(contents).map_err(to_error)?;
    file.sync_all().map_err(to_error)
}

#[cfg(not(unix))]
pub fn write_secret_file(path: &Path, contents: &[u8]) -> Result<()> {
    tracing::warn!(
        path = %path.display(),
        "owner-only permissions are not enforced on this platform"
    );
    write_file(path, contents)
}
