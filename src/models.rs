//! Core data types that flow through the ingestion pipeline.
//!
//! Everything except [`ExtractedImage`] and [`AssembledContext`] is transient:
//! produced and consumed while a single file is being extracted.

use image::{DynamicImage, GenericImageView};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// How a file's content is turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    PlainText,
    Notebook,
    /// A symlink resolving outside the workspace root. Never read.
    ExternalLink,
}

impl DocumentKind {
    /// Select the extractor for a (lowercased, dot-less) extension.
    pub fn from_extension(extension: Option<&str>) -> Self {
        match extension {
            Some(ext) if ext.eq_ignore_ascii_case("ipynb") => DocumentKind::Notebook,
            _ => DocumentKind::PlainText,
        }
    }
}

/// A file accepted by the traversal filter.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Path relative to the workspace root, `/`-separated.
    pub relative_path: String,
    pub path: PathBuf,
    /// Lowercased extension without the leading dot.
    pub extension: Option<String>,
    pub size: u64,
    pub kind: DocumentKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Markdown,
    Code,
    Raw,
}

/// One notebook cell, in the order it is stored in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotebookCell {
    pub kind: CellKind,
    pub source: String,
    pub outputs: Vec<CellOutput>,
}

/// A recorded execution output of a code cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellOutput {
    Stream {
        text: String,
    },
    ExecuteResult {
        text: Option<String>,
        png: Option<String>,
    },
    DisplayData {
        text: Option<String>,
        png: Option<String>,
    },
    /// Only the short message is kept; tracebacks are dropped.
    Error {
        evalue: String,
    },
}

impl CellOutput {
    /// Base64 `image/png` payload carried by this output, if any.
    pub fn png(&self) -> Option<&str> {
        match self {
            CellOutput::ExecuteResult { png, .. } | CellOutput::DisplayData { png, .. } => {
                png.as_deref()
            }
            _ => None,
        }
    }
}

/// A decoded, downscaled image found in a notebook output.
#[derive(Debug, Clone)]
pub struct ExtractedImage {
    pub image: DynamicImage,
    /// Relative path of the notebook the image came from.
    pub origin: String,
    /// Position in the run's discovery order, starting at 0.
    pub order: usize,
}

impl PartialEq for ExtractedImage {
    fn eq(&self, other: &Self) -> bool {
        self.origin == other.origin
            && self.order == other.order
            && self.image.dimensions() == other.image.dimensions()
            && self.image.color() == other.image.color()
            && self.image.as_bytes() == other.image.as_bytes()
    }
}

/// Result of one ingestion run.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledContext {
    /// Per-file blocks (header + extracted text) in traversal order.
    pub text: String,
    /// Number of accepted files, including those replaced by a placeholder.
    pub file_count: usize,
    pub images: Vec<ExtractedImage>,
}

impl AssembledContext {
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// The first `max_chars` characters of the text.
    ///
    /// Counts and images still describe the whole context.
    pub fn truncated(&self, max_chars: usize) -> &str {
        match self.text.char_indices().nth(max_chars) {
            Some((idx, _)) => &self.text[..idx],
            None => &self.text,
        }
    }
}

/// Hex SHA-256 of a context text, as reported next to the written output.
pub fn text_digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(text: &str) -> AssembledContext {
        AssembledContext {
            text: text.to_string(),
            file_count: 1,
            images: Vec::new(),
        }
    }

    #[test]
    fn notebook_kind_from_extension() {
        assert_eq!(
            DocumentKind::from_extension(Some("ipynb")),
            DocumentKind::Notebook
        );
        assert_eq!(
            DocumentKind::from_extension(Some("IPYNB")),
            DocumentKind::Notebook
        );
        assert_eq!(
            DocumentKind::from_extension(Some("py")),
            DocumentKind::PlainText
        );
        assert_eq!(DocumentKind::from_extension(None), DocumentKind::PlainText);
    }

    #[test]
    fn truncated_respects_char_boundaries() {
        let ctx = context("héllo wörld");
        assert_eq!(ctx.truncated(2), "hé");
        assert_eq!(ctx.truncated(0), "");
        assert_eq!(ctx.truncated(100), "héllo wörld");
        assert_eq!(ctx.char_count(), 11);
    }

    #[test]
    fn digest_is_stable() {
        assert_eq!(text_digest("abc"), text_digest("abc"));
        assert_ne!(text_digest("abc"), text_digest("abd"));
        assert_eq!(
            text_digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn png_payload_only_on_rich_outputs() {
        let rich = CellOutput::DisplayData {
            text: None,
            png: Some("AAAA".to_string()),
        };
        assert_eq!(rich.png(), Some("AAAA"));
        let stream = CellOutput::Stream {
            text: "x".to_string(),
        };
        assert_eq!(stream.png(), None);
    }
}
