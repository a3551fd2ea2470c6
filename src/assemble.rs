//! Walks a workspace and folds every accepted file into one context.
//!
//! Order is deterministic: a pre-order walk where the entries of each
//! directory are visited sorted by file name. Images are collected in the
//! same order, so the first notebook plot in the walk is always image 0.

use std::path::{Component, Path};
use walkdir::{DirEntry, WalkDir};

use crate::config::Config;
use crate::extract::ContentExtractor;
use crate::filter::{extension_of, Decision, EntryKind, TraversalFilter};
use crate::images::ImageBudget;
use crate::models::{AssembledContext, DocumentKind, FileEntry};

/// Delimiter placed before each file's text.
pub fn file_header(relative_path: &str) -> String {
    format!("\n\n--- FILE: {} ---\n", relative_path)
}

#[derive(Debug, Clone)]
pub struct ContextAssembler {
    filter: TraversalFilter,
    extractor: ContentExtractor,
    follow_symlinks: bool,
}

impl ContextAssembler {
    pub fn new(config: &Config) -> Result<Self, globset::Error> {
        Ok(Self {
            filter: TraversalFilter::from_config(&config.traversal)?,
            extractor: ContentExtractor::new(config.extraction.clone()),
            follow_symlinks: config.traversal.follow_symlinks,
        })
    }

    /// Accepted files under `root`, lazily, in traversal order.
    ///
    /// Each call starts a fresh walk. Entries the walker cannot read are
    /// logged and skipped. When symlinks are not followed, a link to a
    /// regular file inside `root` is read like the file itself and a link
    /// leading outside `root` becomes a [`DocumentKind::ExternalLink`]
    /// entry. Links to directories are not entered.
    pub fn entries<'a>(&'a self, root: &'a Path) -> impl Iterator<Item = FileEntry> + 'a {
        let canonical_root = root.canonicalize().ok();
        WalkDir::new(root)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name()
            .min_depth(1)
            .into_iter()
            .filter_entry(move |entry| self.admit(root, entry))
            .filter_map(|res| match res {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable entry");
                    None
                }
            })
            .filter_map(move |entry| to_file_entry(root, canonical_root.as_deref(), &entry))
    }

    /// Walk `root` and build the context. Per-file failures become
    /// placeholders; this never fails.
    pub fn assemble(&self, root: &Path) -> AssembledContext {
        let budget = ImageBudget::new(
            self.extractor.config().max_images,
            self.extractor.config().max_image_dimension,
        );

        let (blocks, budget) = self.entries(root).fold(
            (Vec::new(), budget),
            |(mut blocks, mut budget), entry| {
                let body = self.extractor.extract(&entry, &mut budget);
                tracing::debug!(path = %entry.relative_path, kind = ?entry.kind, "Included file");
                blocks.push(file_header(&entry.relative_path) + &body);
                (blocks, budget)
            },
        );

        let context = AssembledContext {
            file_count: blocks.len(),
            text: blocks.join("\n"),
            images: budget.into_images(),
        };
        tracing::info!(
            root = %root.display(),
            files = context.file_count,
            images = context.images.len(),
            chars = context.char_count(),
            "Assembled repository context"
        );
        context
    }

    fn admit(&self, root: &Path, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return true;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let kind = if entry.file_type().is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        let decision = self.filter.decide(relative, kind);
        if decision == Decision::Reject {
            tracing::debug!(path = %relative.display(), "Excluded by traversal filter");
        }
        decision != Decision::Reject
    }
}

fn to_file_entry(root: &Path, canonical_root: Option<&Path>, entry: &DirEntry) -> Option<FileEntry> {
    let kind_override = if entry.file_type().is_file() {
        None
    } else if entry.path_is_symlink() {
        match resolve_link(entry.path(), canonical_root) {
            LinkTarget::ReadAsFile => None,
            LinkTarget::Outside => Some(DocumentKind::ExternalLink),
            LinkTarget::Skip => {
                tracing::debug!(path = %entry.path().display(), "Not following symlink");
                return None;
            }
        }
    } else {
        return None;
    };

    let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
    let relative_path = slash_path(relative);
    let extension = extension_of(&entry.file_name().to_string_lossy());
    // Follows links. An unreadable size surfaces later as a read error placeholder.
    let size = std::fs::metadata(entry.path()).map(|m| m.len()).unwrap_or(0);

    Some(FileEntry {
        relative_path,
        path: entry.path().to_path_buf(),
        kind: kind_override.unwrap_or_else(|| DocumentKind::from_extension(extension.as_deref())),
        extension,
        size,
    })
}

enum LinkTarget {
    ReadAsFile,
    Outside,
    Skip,
}

fn resolve_link(path: &Path, canonical_root: Option<&Path>) -> LinkTarget {
    let target = match path.canonicalize() {
        Ok(target) => target,
        // Dangling: kept so the read error shows up as a placeholder.
        Err(_) => return LinkTarget::ReadAsFile,
    };
    if target.is_dir() {
        return LinkTarget::Skip;
    }
    let inside = canonical_root.is_some_and(|r| target.starts_with(r));
    if !inside {
        LinkTarget::Outside
    } else if target.is_file() {
        LinkTarget::ReadAsFile
    } else {
        LinkTarget::Skip
    }
}

fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
