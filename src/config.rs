//! Project configuration consulted for option defaults.
//!
//! Settings live in an optional `packager.config.json` at the project root
//! (found by searching upward from the working directory) or at an explicit
//! `--config` path. Every key is optional:
//!
//! ```json
//! {
//!   "projectRoots": ["src", "../shared"],
//!   "assetRoots": ["assets"],
//!   "assetExts": ["ttf"],
//!   "dependencyRoot": "node_modules",
//!   "cacheDir": ".packager-cache"
//! }
//! ```
//!
//! Relative paths are resolved against the directory holding the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::cli::paths::{absolutize, find_project_root, CONFIG_FILE_NAME};

/// Directory name searched for linked packages when none is configured.
pub const DEFAULT_DEPENDENCY_DIR: &str = "node_modules";

/// Source of project-level defaults for the option resolver.
pub trait ProjectConfig {
    fn project_roots(&self) -> Vec<String>;
    fn asset_roots(&self) -> Vec<PathBuf>;
    fn asset_exts(&self) -> Vec<String>;
}

/// Raw contents of `packager.config.json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    project_roots: Option<Vec<String>>,
    #[serde(default)]
    asset_roots: Option<Vec<PathBuf>>,
    #[serde(default)]
    asset_exts: Option<Vec<String>>,
    #[serde(default)]
    dependency_root: Option<PathBuf>,
    #[serde(default)]
    cache_dir: Option<PathBuf>,
}

/// Project configuration backed by an optional JSON file.
#[derive(Debug, Clone)]
pub struct FileProjectConfig {
    base_dir: PathBuf,
    file: ConfigFile,
}

impl FileProjectConfig {
    /// Configuration with built-in defaults rooted at `base_dir`.
    pub fn with_defaults(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            file: ConfigFile::default(),
        }
    }

    /// Load the configuration.
    ///
    /// An explicit `path` must exist. Without one, `packager.config.json` is
    /// looked up from `cwd` upward and defaults are used if none is found.
    pub fn load(path: Option<&Path>, cwd: &Path) -> Result<Self> {
        let path = match path {
            Some(path) => absolutize(cwd, path),
            None => match find_project_root(cwd) {
                Some(root) => root.join(CONFIG_FILE_NAME),
                None => {
                    debug!("No {} found, using defaults", CONFIG_FILE_NAME);
                    return Ok(Self::with_defaults(cwd));
                }
            },
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read project config: {:?}", path))?;
        let base_dir = path.parent().unwrap_or(cwd);
        let config = Self::from_json(&content, base_dir)
            .with_context(|| format!("Failed to parse project config: {:?}", path))?;

        info!("Loaded project config from {}", path.display());
        Ok(config)
    }

    /// Parse configuration JSON whose relative paths are anchored at `base_dir`.
    pub fn from_json(content: &str, base_dir: &Path) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(content)?;
        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            file,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory whose symlinked entries are added to the search roots.
    pub fn dependency_root(&self) -> PathBuf {
        match &self.file.dependency_root {
            Some(dir) => absolutize(&self.base_dir, dir),
            None => self.base_dir.join(DEFAULT_DEPENDENCY_DIR),
        }
    }

    /// Configured on-disk cache directory, if any.
    pub fn cache_dir(&self) -> Option<PathBuf> {
        self.file
            .cache_dir
            .as_ref()
            .map(|dir| absolutize(&self.base_dir, dir))
    }
}

impl ProjectConfig for FileProjectConfig {
    fn project_roots(&self) -> Vec<String> {
        match &self.file.project_roots {
            Some(roots) => roots
                .iter()
                .map(|root| absolutize(&self.base_dir, root).display().to_string())
                .collect(),
            None => vec![self.base_dir.display().to_string()],
        }
    }

    fn asset_roots(&self) -> Vec<PathBuf> {
        self.file
            .asset_roots
            .iter()
            .flatten()
            .map(|root| absolutize(&self.base_dir, root))
            .collect()
    }

    fn asset_exts(&self) -> Vec<String> {
        self.file.asset_exts.clone().unwrap_or_default()
    }
}
