use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use jwalk::{Parallelism, WalkDir};
use tracing::debug;

use crate::error::{DirsumError, Result};

/// Whether a directory at `depth` below the root has its aggregate reported.
///
/// Reported directories sit one level below `report_depth`: with
/// `report_depth = 0` the root's immediate subdirectories are reported.
pub fn is_reportable(depth: usize, report_depth: usize) -> bool {
    depth == report_depth + 1
}

/// Check that `root` names an existing directory and return it cleaned of
/// redundant separators. Symlinks in the path are kept as given.
pub(crate) fn resolve_root(root: &Path) -> Result<PathBuf> {
    if root.as_os_str().is_empty() {
        return Err(DirsumError::EmptyPath);
    }

    let metadata = fs::metadata(root).map_err(|e| match e.kind() {
        ErrorKind::NotFound => DirsumError::PathNotFound(root.to_path_buf()),
        _ => DirsumError::Io(e),
    })?;
    if !metadata.is_dir() {
        return Err(DirsumError::NotADirectory(root.to_path_buf()));
    }

    Ok(root.components().collect())
}

/// List every directory whose aggregate will be reported for `root`.
///
/// Paths come back depth-first, sorted by name within each directory, so an
/// unchanged tree always yields the same sequence. Unreadable directories
/// contribute nothing below themselves.
pub fn target_paths(root: &Path, report_depth: usize) -> Result<Vec<PathBuf>> {
    let root = resolve_root(root)?;
    Ok(enumerate(&root, report_depth))
}

/// Enumerate reportable directories below an already resolved `root`.
pub(crate) fn enumerate(root: &Path, report_depth: usize) -> Vec<PathBuf> {
    // Walk the link target but report paths under the root as given
    let walk_root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());

    let walker = WalkDir::new(&walk_root)
        .skip_hidden(false)
        .follow_links(false)
        .sort(true)
        .min_depth(1)
        .max_depth(report_depth + 1)
        .parallelism(Parallelism::Serial)
        .process_read_dir(|_depth, _path, _read_dir_state, children| {
            // Only directories can lead to reportable paths
            children.retain(|entry| {
                entry
                    .as_ref()
                    .map(|e| e.file_type().is_dir())
                    .unwrap_or(false)
            });
        });

    let mut paths = Vec::new();
    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            Err(e) => {
                debug!("skipping unreadable entry during enumeration: {e}");
                continue;
            }
        };

        if let Some(err) = &entry.read_children_error {
            debug!(path = %entry.path().display(), "cannot list directory: {err}");
        }

        if !entry.file_type().is_dir() || !is_reportable(entry.depth, report_depth) {
            continue;
        }

        let path = entry.path();
        match path.strip_prefix(&walk_root) {
            Ok(rel) => paths.push(root.join(rel)),
            Err(_) => paths.push(path),
        }
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(root: &Path, paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| {
                p.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    fn sample_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("b/inner/deep")).unwrap();
        fs::create_dir_all(temp.path().join("a/x")).unwrap();
        fs::create_dir_all(temp.path().join("a/y")).unwrap();
        fs::create_dir(temp.path().join(".hidden")).unwrap();
        fs::write(temp.path().join("a/file.txt"), "not a dir").unwrap();
        fs::write(temp.path().join("top.txt"), "not a dir").unwrap();
        temp
    }

    #[test]
    fn test_report_depth_zero_lists_children() {
        let temp = sample_tree();
        let root = temp.path().canonicalize().unwrap();

        let paths = target_paths(&root, 0).unwrap();
        assert_eq!(names(&root, &paths), vec![".hidden", "a", "b"]);
    }

    #[test]
    fn test_report_depth_one_lists_grandchildren_only() {
        let temp = sample_tree();
        let root = temp.path().canonicalize().unwrap();

        let paths = target_paths(&root, 1).unwrap();
        assert_eq!(names(&root, &paths), vec!["a/x", "a/y", "b/inner"]);
    }

    #[test]
    fn test_deterministic() {
        let temp = sample_tree();
        let first = target_paths(temp.path(), 1).unwrap();
        let second = target_paths(temp.path(), 1).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_too_deep_is_empty() {
        let temp = sample_tree();
        assert!(target_paths(temp.path(), 10).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_dir_not_listed() {
        let temp = sample_tree();
        let root = temp.path().canonicalize().unwrap();
        std::os::unix::fs::symlink(root.join("a"), root.join("link")).unwrap();

        let paths = target_paths(&root, 0).unwrap();
        assert_eq!(names(&root, &paths), vec![".hidden", "a", "b"]);
    }

    #[test]
    fn test_invalid_roots() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file.txt");
        fs::write(&file, "x").unwrap();

        assert!(matches!(
            target_paths(Path::new(""), 0),
            Err(DirsumError::EmptyPath)
        ));
        assert!(matches!(
            target_paths(&temp.path().join("missing"), 0),
            Err(DirsumError::PathNotFound(_))
        ));
        assert!(matches!(
            target_paths(&file, 0),
            Err(DirsumError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_is_reportable() {
        assert!(!is_reportable(0, 0));
        assert!(is_reportable(1, 0));
        assert!(!is_reportable(2, 0));
        assert!(is_reportable(3, 2));
    }

    #[test]
    fn test_vanished_root_contributes_nothing() {
        let root = Path::new("/nonexistent/dirsum/vanished");
        assert!(enumerate(root, 0).is_empty());
        assert!(enumerate(root, 3).is_empty());
    }

    #[test]
    fn test_root_is_cleaned_not_resolved() {
        let temp = sample_tree();
        let with_slash = PathBuf::from(format!("{}/", temp.path().display()));

        assert_eq!(resolve_root(&with_slash).unwrap(), temp.path());
        let paths = target_paths(&with_slash, 0).unwrap();
        assert_eq!(paths[1], temp.path().join("a"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_root_keeps_link_path() {
        let temp = sample_tree();
        let holder = TempDir::new().unwrap();
        let link = holder.path().join("link");
        std::os::unix::fs::symlink(temp.path(), &link).unwrap();

        let paths = target_paths(&link, 0).unwrap();
        assert_eq!(names(&link, &paths), vec![".hidden", "a", "b"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_unlistable_subtree_contributes_nothing() {
        use std::os::unix::fs::PermissionsExt;

        let temp = sample_tree();
        let locked = temp.path().join("b");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        let listable = fs::read_dir(&locked).is_ok();

        let paths = target_paths(temp.path(), 1);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let names = names(temp.path(), &paths.unwrap());
        if listable {
            // Permission bits do not bind a privileged user
            assert_eq!(names, vec!["a/x", "a/y", "b/inner"]);
        } else {
            assert_eq!(names, vec!["a/x", "a/y"]);
        }
    }
}
