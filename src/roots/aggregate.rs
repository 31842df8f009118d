use std::path::{Path, PathBuf};

use tracing::debug;

use super::symlinks::find_symlink_paths;
use crate::options::{ResolveError, ResolvedConfig};

/// Ordered bundler search roots. Earlier entries take precedence and
/// duplicates are kept.
pub type RootSet = Vec<PathBuf>;

/// Concatenate project roots, extra `--root` entries and the linked
/// packages that `discover` finds under `dependency_root`.
///
/// No deduplication or existence check is done.
pub fn aggregate<F>(
    resolved: &ResolvedConfig,
    dependency_root: &Path,
    discover: F,
) -> Result<RootSet, ResolveError>
where
    F: FnOnce(&Path) -> Vec<PathBuf>,
{
    let mut roots: RootSet = resolved
        .project_roots()?
        .iter()
        .map(PathBuf::from)
        .collect();
    roots.extend(resolved.root()?.iter().cloned());

    let linked = discover(dependency_root);
    debug!(
        "Adding {} linked package(s) from {}",
        linked.len(),
        dependency_root.display()
    );
    roots.extend(linked);

    Ok(roots)
}

/// [`aggregate`] using filesystem symlink discovery.
pub fn aggregate_with_symlinks(
    resolved: &ResolvedConfig,
    dependency_root: &Path,
) -> Result<RootSet, ResolveError> {
    aggregate(resolved, dependency_root, find_symlink_paths)
}
