//! Per-file content extraction.
//!
//! Plain files are decoded as lossy UTF-8; notebooks are parsed into tagged
//! cell/output segments with their PNG outputs fed to the run's
//! [`ImageBudget`]. Every failure stays inside the file it happened in:
//! the `read_*` functions return an [`ExtractError`] and [`ContentExtractor::extract`]
//! turns it into a placeholder string.

use thiserror::Error;

use crate::config::ExtractionConfig;
use crate::images::ImageBudget;
use crate::models::{DocumentKind, FileEntry, NotebookCell};
use crate::notebook::{self, NotebookError};

pub const TOO_LARGE_PLACEHOLDER: &str = "[CONTENT SKIPPED: File too large]";
pub const EXTERNAL_LINK_PLACEHOLDER: &str = "[Skipped: symlink outside repository]";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("file too large: {size} bytes (limit {limit})")]
    TooLarge { size: u64, limit: u64 },
    #[error("{0}")]
    Read(#[from] std::io::Error),
    #[error("{0}")]
    Notebook(#[from] NotebookError),
    #[error("symlink resolves outside the workspace")]
    ExternalLink,
}

impl ExtractError {
    /// Text that stands in for the file's content in the assembled context.
    pub fn placeholder(&self) -> String {
        match self {
            ExtractError::TooLarge { .. } => TOO_LARGE_PLACEHOLDER.to_string(),
            ExtractError::Read(e) => format!("[Error reading file: {}]", e),
            ExtractError::Notebook(e) => format!("[Error parsing notebook: {}]", e),
            ExtractError::ExternalLink => EXTERNAL_LINK_PLACEHOLDER.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContentExtractor {
    config: ExtractionConfig,
}

impl ContentExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Text for one accepted file. Never fails; see [`ExtractError::placeholder`].
    pub fn extract(&self, entry: &FileEntry, budget: &mut ImageBudget) -> String {
        let result = match entry.kind {
            DocumentKind::PlainText => self.read_plain(entry),
            DocumentKind::Notebook => self.read_notebook(entry).map(|cells| {
                collect_images(&entry.relative_path, &cells, budget);
                notebook::segments(&cells).join("\n")
            }),
            DocumentKind::ExternalLink => Err(ExtractError::ExternalLink),
        };

        result.unwrap_or_else(|e| {
            match &e {
                ExtractError::TooLarge { size, limit } => {
                    tracing::debug!(path = %entry.relative_path, size, limit, "Skipping large file")
                }
                ExtractError::ExternalLink => {
                    tracing::warn!(path = %entry.relative_path, "Skipping symlink outside workspace")
                }
                other => {
                    tracing::warn!(path = %entry.relative_path, error = %other, "Extraction failed")
                }
            }
            e.placeholder()
        })
    }

    /// Read a plain-text file, replacing invalid UTF-8 with U+FFFD.
    pub fn read_plain(&self, entry: &FileEntry) -> Result<String, ExtractError> {
        check_size(entry.size, self.config.max_file_size)?;
        let bytes = std::fs::read(&entry.path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn read_notebook(&self, entry: &FileEntry) -> Result<Vec<NotebookCell>, ExtractError> {
        check_size(entry.size, self.config.max_notebook_size)?;
        let bytes = std::fs::read(&entry.path)?;
        let content = String::from_utf8_lossy(&bytes);
        Ok(notebook::parse_notebook(&content)?)
    }
}

fn check_size(size: u64, limit: u64) -> Result<(), ExtractError> {
    if size > limit {
        return Err(ExtractError::TooLarge { size, limit });
    }
    Ok(())
}

fn collect_images(origin: &str, cells: &[NotebookCell], budget: &mut ImageBudget) {
    for payload in notebook::png_payloads(cells) {
        if budget.is_exhausted() {
            break;
        }
        if let Err(e) = budget.offer(origin, payload) {
            tracing::debug!(path = origin, error = %e, "Skipping notebook image");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::tests::png_base64;
    use image::GenericImageView;
    use std::path::Path;

    fn entry(dir: &Path, name: &str, content: &[u8]) -> FileEntry {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        let extension = crate::filter::extension_of(name);
        FileEntry {
            relative_path: name.to_string(),
            size: content.len() as u64,
            kind: DocumentKind::from_extension(extension.as_deref()),
            extension,
            path,
        }
    }

    fn extractor(max_file_size: u64) -> ContentExtractor {
        ContentExtractor::new(ExtractionConfig {
            max_file_size,
            ..ExtractionConfig::default()
        })
    }

    #[test]
    fn plain_file_at_threshold_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let e = entry(dir.path(), "a.txt", b"0123456789");
        let mut budget = ImageBudget::new(3, 512);
        assert_eq!(extractor(10).extract(&e, &mut budget), "0123456789");
    }

    #[test]
    fn plain_file_over_threshold_is_a_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let e = entry(dir.path(), "a.txt", b"0123456789X");
        let mut budget = ImageBudget::new(3, 512);
        assert_eq!(
            extractor(10).extract(&e, &mut budget),
            TOO_LARGE_PLACEHOLDER
        );
    }

    #[test]
    fn invalid_utf8_is_replaced_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let e = entry(dir.path(), "latin1.c", b"caf\xe9 = 1;");
        let text = extractor(1024).read_plain(&e).unwrap();
        assert_eq!(text, "caf\u{FFFD} = 1;");
    }

    #[test]
    fn unreadable_file_yields_read_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let mut e = entry(dir.path(), "gone.txt", b"x");
        std::fs::remove_file(&e.path).unwrap();
        e.size = 1;
        let mut budget = ImageBudget::new(3, 512);
        let text = extractor(1024).extract(&e, &mut budget);
        assert!(text.starts_with("[Error reading file: "), "{}", text);
    }

    #[test]
    fn malformed_notebook_is_a_single_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let e = entry(
            dir.path(),
            "broken.ipynb",
            br#"{"cells": [{"cell_type": "markdown", "source": "partial"}"#,
        );
        let mut budget = ImageBudget::new(3, 512);
        let text = extractor(1024).extract(&e, &mut budget);
        assert!(text.starts_with("[Error parsing notebook: "), "{}", text);
        assert!(!text.contains("partial"));
    }

    #[test]
    fn notebook_images_go_to_the_budget_not_the_text() {
        let dir = tempfile::tempdir().unwrap();
        let png = png_base64(600, 300);
        let nb = format!(
            r#"{{"nbformat": 4, "cells": [{{"cell_type": "code", "source": "plot()", "outputs": [
                {{"output_type": "display_data", "data": {{"image/png": "{png}"}}}},
                {{"output_type": "display_data", "data": {{"image/png": "broken"}}}},
                {{"output_type": "display_data", "data": {{"image/png": "{png}"}}}}
            ]}}]}}"#
        );
        let e = entry(dir.path(), "plots.ipynb", nb.as_bytes());
        let mut budget = ImageBudget::new(3, 512);
        let text = extractor(16).extract(&e, &mut budget);
        assert_eq!(text, "[CODE]:\nplot()");
        let images = budget.into_images();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].origin, "plots.ipynb");
        assert_eq!(images[0].image.dimensions(), (512, 256));
    }

    #[test]
    fn notebooks_ignore_plain_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let nb = r#"{"nbformat": 4, "cells": [{"cell_type": "markdown", "source": "big enough"}]}"#;
        let e = entry(dir.path(), "n.ipynb", nb.as_bytes());
        let mut budget = ImageBudget::new(3, 512);
        assert_eq!(
            extractor(4).extract(&e, &mut budget),
            "[MARKDOWN]: big enough"
        );
    }

    #[test]
    fn external_link_is_never_read() {
        let dir = tempfile::tempdir().unwrap();
        let mut e = entry(dir.path(), "leak.txt", b"OUTSIDE");
        e.kind = DocumentKind::ExternalLink;
        let mut budget = ImageBudget::new(3, 512);
        assert_eq!(
            extractor(1024).extract(&e, &mut budget),
            EXTERNAL_LINK_PLACEHOLDER
        );
    }
}
