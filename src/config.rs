//! TOML configuration for an ingestion run.
//!
//! Every key is optional. A missing file section falls back to the defaults
//! below, so `Config::default()` is a complete, usable configuration.
//!
//! ```toml
//! [traversal]
//! ignored_dirs = [".git", "node_modules"]
//! ignored_files = [".env"]
//! ignored_extensions = ["png", ".jpg"]
//! exclude_globs = ["docs/generated/**"]
//!
//! [extraction]
//! max_file_size = 153600
//! max_images = 3
//! max_image_dimension = 512
//!
//! [acquisition]
//! branch = "main"
//! shallow = true
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub traversal: TraversalConfig,
    pub extraction: ExtractionConfig,
    pub acquisition: AcquisitionConfig,
}

/// Inclusion/exclusion policy applied while walking a workspace.
#[derive(Debug, Deserialize, Clone)]
pub struct TraversalConfig {
    /// Directory names pruned at any depth.
    #[serde(default = "default_ignored_dirs")]
    pub ignored_dirs: Vec<String>,
    /// Exact file names that are never included.
    #[serde(default = "default_ignored_files")]
    pub ignored_files: Vec<String>,
    /// File extensions that are never included, with or without the leading dot.
    #[serde(default = "default_ignored_extensions")]
    pub ignored_extensions: Vec<String>,
    /// Extra globs matched against the path relative to the workspace root.
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            ignored_dirs: default_ignored_dirs(),
            ignored_files: default_ignored_files(),
            ignored_extensions: default_ignored_extensions(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_ignored_dirs() -> Vec<String> {
    [
        ".git",
        "node_modules",
        "__pycache__",
        "venv",
        "env",
        ".idea",
        ".vscode",
        "site-packages",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_ignored_files() -> Vec<String> {
    [".env", "package-lock.json", "yarn.lock"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_ignored_extensions() -> Vec<String> {
    [
        "png", "jpg", "jpeg", "gif", "svg", "pkl", "h5", "parquet", "zip", "exe", "bin", "pyc",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Size and count limits applied during content extraction.
#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionConfig {
    /// Plain-text files larger than this (bytes) are replaced with a placeholder.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Notebooks larger than this (bytes) are replaced with a placeholder.
    #[serde(default = "default_max_notebook_size")]
    pub max_notebook_size: u64,
    /// Hard cap on images decoded over a whole run. Zero disables image extraction.
    #[serde(default = "default_max_images")]
    pub max_images: usize,
    /// Neither side of an extracted image exceeds this many pixels.
    #[serde(default = "default_max_image_dimension")]
    pub max_image_dimension: u32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            max_notebook_size: default_max_notebook_size(),
            max_images: default_max_images(),
            max_image_dimension: default_max_image_dimension(),
        }
    }
}

fn default_max_file_size() -> u64 {
    150 * 1024
}
fn default_max_notebook_size() -> u64 {
    20 * 1024 * 1024
}
fn default_max_images() -> usize {
    3
}
fn default_max_image_dimension() -> u32 {
    512
}

#[derive(Debug, Deserialize, Clone)]
pub struct AcquisitionConfig {
    /// Clone this branch instead of the remote's default branch.
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default = "default_shallow")]
    pub shallow: bool,
    /// Parent directory for workspaces. Defaults to the system temp dir.
    #[serde(default)]
    pub workspace_parent: Option<PathBuf>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            branch: None,
            shallow: default_shallow(),
            workspace_parent: None,
        }
    }
}

fn default_shallow() -> bool {
    true
}

impl Config {
    /// Check the limits that would make a run meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.extraction.max_file_size == 0 {
            anyhow::bail!("extraction.max_file_size must be > 0");
        }
        if self.extraction.max_notebook_size == 0 {
            anyhow::bail!("extraction.max_notebook_size must be > 0");
        }
        if self.extraction.max_image_dimension == 0 {
            anyhow::bail!("extraction.max_image_dimension must be > 0");
        }
        if let Some(branch) = &self.acquisition.branch {
            if branch.trim().is_empty() || branch.starts_with('-') {
                anyhow::bail!("acquisition.branch is not a valid branch name: '{}'", branch);
            }
        }
        for pattern in &self.traversal.exclude_globs {
            globset::Glob::new(pattern)
                .with_context(|| format!("Invalid traversal.exclude_globs entry: '{}'", pattern))?;
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    tracing::debug!(path = %path.display(), ?config, "Loaded configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.extraction.max_file_size, 150 * 1024);
        assert_eq!(config.extraction.max_images, 3);
        assert_eq!(config.extraction.max_image_dimension, 512);
        assert!(config.traversal.ignored_dirs.contains(&".git".to_string()));
        assert!(config.traversal.ignored_files.contains(&"yarn.lock".to_string()));
        assert!(config.acquisition.shallow);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
[extraction]
max_images = 0

[traversal]
ignored_extensions = [".csv"]
"#,
        )
        .unwrap();
        assert_eq!(config.extraction.max_images, 0);
        assert_eq!(config.extraction.max_file_size, 150 * 1024);
        assert_eq!(config.traversal.ignored_extensions, vec![".csv".to_string()]);
        assert!(config.traversal.ignored_dirs.contains(&"node_modules".to_string()));
    }

    #[test]
    fn zero_file_size_is_rejected() {
        let mut config = Config::default();
        config.extraction.max_file_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_glob_is_rejected() {
        let mut config = Config::default();
        config.traversal.exclude_globs = vec!["a/[".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_config_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repoctx.toml");
        std::fs::write(&path, "[acquisition]\nbranch = \"dev\"\nshallow = false\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.acquisition.branch.as_deref(), Some("dev"));
        assert!(!config.acquisition.shallow);
    }

    #[test]
    fn load_config_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
