//! Navigation operations implementation

use crate::error::NavigateError;
use std::path::{Path, PathBuf};

/// Resolves `target` against the session's working directory and returns the
/// new canonical working directory. The caller keeps its old directory on
/// error.
pub fn change_directory(current: &Path, target: &str) -> Result<PathBuf, NavigateError> {
    let candidate = current.join(target);

    let canonical = candidate
        .canonicalize()
        .map_err(|_| NavigateError::DirectoryNotFound(candidate.clone()))?;

    if !canonical.is_dir() {
        return Err(NavigateError::NotADirectory(canonical));
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn relative_and_parent_paths() {
        let root = tempfile::tempdir().unwrap();
        let root_path = root.path().canonicalize().unwrap();
        fs::create_dir(root_path.join("pub")).unwrap();

        let sub = change_directory(&root_path, "pub").unwrap();
        assert_eq!(sub, root_path.join("pub"));
        assert_eq!(change_directory(&sub, "..").unwrap(), root_path);
    }

    #[test]
    fn absolute_target_replaces_cwd() {
        let root = tempfile::tempdir().unwrap();
        let root_path = root.path().canonicalize().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();

        let moved = change_directory(&root_path, elsewhere.path().to_str().unwrap()).unwrap();
        assert_eq!(moved, elsewhere.path().canonicalize().unwrap());
    }

    #[test]
    fn missing_or_file_targets_fail() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("file.txt"), b"x").unwrap();

        assert!(matches!(
            change_directory(root.path(), "nope"),
            Err(NavigateError::DirectoryNotFound(_))
        ));
        assert!(matches!(
            change_directory(root.path(), "file.txt"),
            Err(NavigateError::NotADirectory(_))
        ));
    }
}
