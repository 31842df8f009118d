//! Discovery of packages linked into the dependency directory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Prefix of scoped package directories (`@scope/name`).
const SCOPE_PREFIX: char = '@';

/// Nested dependency directory searched inside each linked package.
const NESTED_DEPENDENCY_DIR: &str = "node_modules";

/// Real paths of the directories symlinked inside `dir`.
///
/// Direct entries are inspected, as are entries one level inside `@scope`
/// directories. Each link target is then searched the same way through its
/// own `node_modules`, so transitively linked packages are found too. Every
/// target appears once, in directory-name order of discovery. A missing or
/// unreadable `dir` yields nothing.
pub fn find_symlink_paths(dir: &Path) -> Vec<PathBuf> {
    let mut visited = HashSet::new();
    let mut found = Vec::new();
    collect_links(dir, &mut visited, &mut found);
    found
}

fn collect_links(dir: &Path, visited: &mut HashSet<PathBuf>, found: &mut Vec<PathBuf>) {
    for entry in list_dir(dir) {
        if is_scope_dir(&entry) {
            for scoped in list_dir(entry.path()) {
                follow_link(&scoped, visited, found);
            }
        } else {
            follow_link(&entry, visited, found);
        }
    }
}

fn follow_link(entry: &DirEntry, visited: &mut HashSet<PathBuf>, found: &mut Vec<PathBuf>) {
    if !entry.path_is_symlink() {
        return;
    }

    let target = match std::fs::canonicalize(entry.path()) {
        Ok(target) => target,
        Err(e) => {
            debug!("Skipping broken symlink {}: {}", entry.path().display(), e);
            return;
        }
    };

    if !target.is_dir() || !visited.insert(target.clone()) {
        return;
    }

    debug!("Found linked package {} -> {}", entry.path().display(), target.display());
    found.push(target.clone());
    collect_links(&target.join(NESTED_DEPENDENCY_DIR), visited, found);
}

fn is_scope_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(SCOPE_PREFIX))
}

fn list_dir(dir: &Path) -> impl Iterator<Item = DirEntry> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("Cannot read dependency directory entry: {}", e);
                None
            }
        })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    #[test]
    fn test_missing_dir_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        assert!(find_symlink_paths(&temp_dir.path().join("absent")).is_empty());
    }

    #[test]
    fn test_finds_direct_and_scoped_links() {
        let temp_dir = TempDir::new().unwrap();
        let modules = temp_dir.path().join("node_modules");
        let linked_a = temp_dir.path().join("linked-a");
        let linked_b = temp_dir.path().join("linked-b");
        fs::create_dir_all(modules.join("@scope")).unwrap();
        fs::create_dir_all(modules.join("plain-package")).unwrap();
        fs::create_dir_all(&linked_a).unwrap();
        fs::create_dir_all(&linked_b).unwrap();
        symlink(&linked_a, modules.join("a")).unwrap();
        symlink(&linked_b, modules.join("@scope").join("b")).unwrap();

        let found = find_symlink_paths(&modules);
        assert_eq!(
            found,
            vec![
                fs::canonicalize(&linked_b).unwrap(),
                fs::canonicalize(&linked_a).unwrap(),
            ]
        );
    }

    #[test]
    fn test_follows_nested_links_without_cycles() {
        let temp_dir = TempDir::new().unwrap();
        let modules = temp_dir.path().join("node_modules");
        let outer = temp_dir.path().join("outer");
        let inner = temp_dir.path().join("inner");
        fs::create_dir_all(&modules).unwrap();
        fs::create_dir_all(outer.join("node_modules")).unwrap();
        fs::create_dir_all(inner.join("node_modules")).unwrap();
        symlink(&outer, modules.join("outer")).unwrap();
        symlink(&inner, outer.join("node_modules").join("inner")).unwrap();
        // inner links back to outer
        symlink(&outer, inner.join("node_modules").join("outer")).unwrap();

        let found = find_symlink_paths(&modules);
        assert_eq!(
            found,
            vec![
                fs::canonicalize(&outer).unwrap(),
                fs::canonicalize(&inner).unwrap(),
            ]
        );
    }

    #[test]
    fn test_skips_broken_and_file_links() {
        let temp_dir = TempDir::new().unwrap();
        let modules = temp_dir.path().join("node_modules");
        fs::create_dir_all(&modules).unwrap();
        let file = temp_dir.path().join("file.txt");
        fs::write(&file, "x").unwrap();
        symlink(&file, modules.join("file-link")).unwrap();
        symlink(temp_dir.path().join("gone"), modules.join("broken")).unwrap();

        assert!(find_symlink_paths(&modules).is_empty());
    }
}
