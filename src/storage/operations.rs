//! Storage operations
//!
//! Thin wrappers over the filesystem calls the command handlers need. Paths
//! are resolved against the session's working directory, never the process
//! one.

use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Resolves a client-supplied name against the session's working directory.
/// Absolute names are used as given.
pub fn resolve_path(cwd: &Path, name: &str) -> PathBuf {
    cwd.join(name)
}

/// Opens a file read-only for RETR.
pub fn open_for_read(path: &Path) -> Result<File, StorageError> {
    File::open(path).map_err(|source| StorageError::Open {
        path: path.to_path_buf(),
        source,
    })
}

/// Creates a new file for STOR. Fails if the file already exists, including
/// when another session creates it first.
pub fn create_exclusive(path: &Path) -> Result<File, StorageError> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|source| match source.kind() {
            ErrorKind::AlreadyExists => StorageError::AlreadyExists(path.to_path_buf()),
            _ => StorageError::Open {
                path: path.to_path_buf(),
                source,
            },
        })
}

/// Opens a file for APPE, creating it if needed.
pub fn open_for_append(path: &Path) -> Result<File, StorageError> {
    OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map_err(|source| StorageError::Open {
            path: path.to_path_buf(),
            source,
        })
}

pub fn make_directory(path: &Path) -> Result<(), StorageError> {
    fs::create_dir(path).map_err(|source| StorageError::CreateDirectory {
        path: path.to_path_buf(),
        source,
    })
}

/// Removes an empty directory.
pub fn remove_directory(path: &Path) -> Result<(), StorageError> {
    fs::remove_dir(path).map_err(|source| StorageError::RemoveDirectory {
        path: path.to_path_buf(),
        source,
    })
}
