use std::path::{Component, Path, PathBuf};

/// Name of the optional project configuration file.
pub const CONFIG_FILE_NAME: &str = "packager.config.json";

/// Find the directory holding `packager.config.json` by searching upward from `start`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut path = start;

    loop {
        if path.join(CONFIG_FILE_NAME).is_file() {
            return Some(path.to_path_buf());
        }
        path = path.parent()?;
    }
}

/// Resolve `raw` against `base` and normalize `.` and `..` lexically.
///
/// An absolute `raw` ignores `base`. An empty `raw` yields `base` itself.
/// Symlinks are not followed and the path does not need to exist.
pub fn absolutize(base: &Path, raw: impl AsRef<Path>) -> PathBuf {
    let raw = raw.as_ref();
    let joined = if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        base.join(raw)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `/..` stays at `/`
                if !normalized.pop() && !normalized.has_root() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_absolutize_relative() {
        let base = Path::new("/work/app");
        assert_eq!(absolutize(base, "src"), PathBuf::from("/work/app/src"));
        assert_eq!(absolutize(base, "./lib/../vendor"), PathBuf::from("/work/app/vendor"));
        assert_eq!(absolutize(base, "../shared"), PathBuf::from("/work/shared"));
    }

    #[test]
    fn test_absolutize_absolute_and_empty() {
        let base = Path::new("/work/app");
        assert_eq!(absolutize(base, "/opt/other"), PathBuf::from("/opt/other"));
        assert_eq!(absolutize(base, ""), PathBuf::from("/work/app"));
        assert_eq!(absolutize(Path::new("/"), "../.."), PathBuf::from("/"));
    }

    #[test]
    fn test_find_project_root_walks_upward() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "{}").unwrap();

        assert_eq!(find_project_root(&nested).as_deref(), Some(temp_dir.path()));
    }
}
