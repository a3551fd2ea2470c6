//! Inclusion/exclusion policy for the workspace walk.
//!
//! The filter fails open: anything not matched by an ignore rule is
//! accepted. Directory rules look at the directory *name* only, so a
//! `node_modules` nested ten levels deep is pruned just like a top-level one.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::HashSet;
use std::path::Path;

use crate::config::TraversalConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Descend,
    Accept,
    Reject,
}

#[derive(Debug, Clone)]
pub struct TraversalFilter {
    ignored_dirs: HashSet<String>,
    ignored_files: HashSet<String>,
    ignored_extensions: HashSet<String>,
    exclude_set: GlobSet,
    /// `dir/**` patterns with the `/**` removed, matched against directories.
    exclude_dir_set: GlobSet,
}

impl TraversalFilter {
    pub fn from_config(config: &TraversalConfig) -> Result<Self, globset::Error> {
        Ok(Self {
            ignored_dirs: config.ignored_dirs.iter().cloned().collect(),
            ignored_files: config.ignored_files.iter().cloned().collect(),
            ignored_extensions: config
                .ignored_extensions
                .iter()
                .map(|ext| normalize_extension(ext))
                .collect(),
            exclude_set: build_globset(&config.exclude_globs)?,
            exclude_dir_set: build_globset(&directory_patterns(&config.exclude_globs))?,
        })
    }

    /// Decide what to do with one walk entry.
    ///
    /// `relative_path` is relative to the workspace root.
    pub fn decide(&self, relative_path: &Path, kind: EntryKind) -> Decision {
        let name = match relative_path.file_name() {
            Some(name) => name.to_string_lossy(),
            None => return Decision::Reject,
        };

        match kind {
            EntryKind::Directory => {
                if self.ignored_dirs.contains(&*name)
                    || self.exclude_set.is_match(relative_path)
                    || self.exclude_dir_set.is_match(relative_path)
                {
                    Decision::Reject
                } else {
                    Decision::Descend
                }
            }
            EntryKind::File => {
                if self.ignored_files.contains(&*name) {
                    return Decision::Reject;
                }
                if let Some(ext) = extension_of(&name) {
                    if self.ignored_extensions.contains(&ext) {
                        return Decision::Reject;
                    }
                }
                if self.exclude_set.is_match(relative_path) {
                    return Decision::Reject;
                }
                Decision::Accept
            }
        }
    }
}

/// Lowercased extension of a file name, ignoring leading dots.
///
/// `.env` has no extension, `archive.tar.gz` has `gz`.
pub fn extension_of(name: &str) -> Option<String> {
    let stem_start = name.len() - name.trim_start_matches('.').len();
    let rest = &name[stem_start..];
    match rest.rfind('.') {
        Some(idx) if idx + 1 < rest.len() => Some(rest[idx + 1..].to_ascii_lowercase()),
        _ => None,
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// A glob ending in `/**` excludes everything below a directory, so the
/// directory itself is pruned instead of walked.
fn directory_patterns(patterns: &[String]) -> Vec<String> {
    patterns
        .iter()
        .filter_map(|p| p.strip_suffix("/**"))
        .filter(|prefix| !prefix.is_empty())
        .map(str::to_string)
        .collect()
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_filter() -> TraversalFilter {
        TraversalFilter::from_config(&TraversalConfig::default()).unwrap()
    }

    #[test]
    fn ignored_directories_are_pruned_at_any_depth() {
        let filter = default_filter();
        assert_eq!(
            filter.decide(Path::new(".git"), EntryKind::Directory),
            Decision::Reject
        );
        assert_eq!(
            filter.decide(Path::new("web/app/node_modules"), EntryKind::Directory),
            Decision::Reject
        );
        assert_eq!(
            filter.decide(Path::new("src/env_utils"), EntryKind::Directory),
            Decision::Descend
        );
    }

    #[test]
    fn directory_rule_uses_name_not_path() {
        let filter = default_filter();
        // a file under an ignored-looking parent is judged by its own name
        assert_eq!(
            filter.decide(Path::new("venv_notes/readme.md"), EntryKind::File),
            Decision::Accept
        );
    }

    #[test]
    fn ignored_file_names_win_first() {
        let filter = default_filter();
        assert_eq!(
            filter.decide(Path::new(".env"), EntryKind::File),
            Decision::Reject
        );
        assert_eq!(
            filter.decide(Path::new("frontend/package-lock.json"), EntryKind::File),
            Decision::Reject
        );
        assert_eq!(
            filter.decide(Path::new("package.json"), EntryKind::File),
            Decision::Accept
        );
    }

    #[test]
    fn ignored_extensions_are_case_insensitive() {
        let filter = default_filter();
        assert_eq!(
            filter.decide(Path::new("img/logo.PNG"), EntryKind::File),
            Decision::Reject
        );
        assert_eq!(
            filter.decide(Path::new("model.pkl"), EntryKind::File),
            Decision::Reject
        );
        assert_eq!(
            filter.decide(Path::new("main.py"), EntryKind::File),
            Decision::Accept
        );
    }

    #[test]
    fn configured_extensions_accept_leading_dot() {
        let config = TraversalConfig {
            ignored_extensions: vec![".CSV".to_string(), "log".to_string()],
            ..TraversalConfig::default()
        };
        let filter = TraversalFilter::from_config(&config).unwrap();
        assert_eq!(
            filter.decide(Path::new("data.csv"), EntryKind::File),
            Decision::Reject
        );
        assert_eq!(
            filter.decide(Path::new("run.log"), EntryKind::File),
            Decision::Reject
        );
        // defaults are replaced, not merged
        assert_eq!(
            filter.decide(Path::new("logo.png"), EntryKind::File),
            Decision::Accept
        );
    }

    #[test]
    fn exclude_globs_match_relative_paths() {
        let config = TraversalConfig {
            exclude_globs: vec!["docs/generated/**".to_string()],
            ..TraversalConfig::default()
        };
        let filter = TraversalFilter::from_config(&config).unwrap();
        assert_eq!(
            filter.decide(Path::new("docs/generated/api.md"), EntryKind::File),
            Decision::Reject
        );
        assert_eq!(
            filter.decide(Path::new("docs/guide.md"), EntryKind::File),
            Decision::Accept
        );
    }

    #[test]
    fn exclude_globs_prune_directories() {
        let config = TraversalConfig {
            exclude_globs: vec!["docs/generated/**".to_string(), "**/build".to_string()],
            ..TraversalConfig::default()
        };
        let filter = TraversalFilter::from_config(&config).unwrap();
        assert_eq!(
            filter.decide(Path::new("docs/generated"), EntryKind::Directory),
            Decision::Reject
        );
        assert_eq!(
            filter.decide(Path::new("web/app/build"), EntryKind::Directory),
            Decision::Reject
        );
        assert_eq!(
            filter.decide(Path::new("docs"), EntryKind::Directory),
            Decision::Descend
        );
        assert_eq!(
            filter.decide(Path::new("docs/generated_notes"), EntryKind::Directory),
            Decision::Descend
        );
    }

    #[test]
    fn directory_patterns_strip_recursive_suffix() {
        let patterns = vec![
            "target/**".to_string(),
            "**/*.md".to_string(),
            "/**".to_string(),
        ];
        assert_eq!(directory_patterns(&patterns), vec!["target".to_string()]);
    }

    #[test]
    fn extension_parsing() {
        assert_eq!(extension_of("main.rs"), Some("rs".to_string()));
        assert_eq!(extension_of("archive.tar.GZ"), Some("gz".to_string()));
        assert_eq!(extension_of(".env"), None);
        assert_eq!(extension_of(".eslintrc.json"), Some("json".to_string()));
        assert_eq!(extension_of("Makefile"), None);
        assert_eq!(extension_of("trailing."), None);
    }
}
