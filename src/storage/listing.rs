//! Directory listing for LIST.

use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use crate::error::StorageError;

/// Returns the names of the visible entries of `dir`, one per line.
///
/// Names starting with `.` are hidden, which also drops `.` and `..`.
/// Entries are sorted so repeated listings are stable. Names are copied as
/// raw bytes, so non-UTF-8 names survive unchanged.
pub fn list_directory(dir: &Path) -> Result<Vec<u8>, StorageError> {
    let read_error = |source| StorageError::ReadDirectory {
        path: dir.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_error)? {
        let name = name_bytes(&entry.map_err(read_error)?.file_name());
        if name.first() != Some(&b'.') {
            names.push(name);
        }
    }
    names.sort();

    let mut listing = Vec::new();
    for name in names {
        listing.extend_from_slice(&name);
        listing.push(b'\n');
    }
    Ok(listing)
}

#[cfg(unix)]
fn name_bytes(name: &OsStr) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    name.as_bytes().to_vec()
}

#[cfg(not(unix))]
fn name_bytes(name: &OsStr) -> Vec<u8> {
    name.to_string_lossy().into_owned().into_bytes()
}
