//! Persist an assembled context for batch use.
//!
//! Writes the (optionally truncated) text verbatim and, if requested, the
//! extracted images as numbered PNG files. Truncation happens here, at the
//! point of use, never during assembly.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::models::{text_digest, AssembledContext, ExtractedImage};

/// What was written, for the CLI report.
#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub files: usize,
    pub images: usize,
    /// Characters written, after truncation.
    pub characters: usize,
    /// Characters in the full assembled text.
    pub total_characters: usize,
    pub truncated: bool,
    pub sha256: String,
    /// `None` when the text went to stdout.
    pub output: Option<PathBuf>,
    pub image_paths: Vec<PathBuf>,
}

/// Write the context text to `output` (stdout when `None`).
pub fn export_context(
    context: &AssembledContext,
    output: Option<&Path>,
    max_chars: Option<usize>,
    images_dir: Option<&Path>,
) -> Result<ExportSummary> {
    let text = match max_chars {
        Some(limit) => context.truncated(limit),
        None => context.text.as_str(),
    };

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create output directory: {}", parent.display())
                    })?;
                }
            }
            std::fs::write(path, text)
                .with_context(|| format!("Failed to write context to {}", path.display()))?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
        }
    }

    let image_paths = match images_dir {
        Some(dir) => export_images(&context.images, dir)?,
        None => Vec::new(),
    };

    let characters = text.chars().count();
    let total_characters = context.char_count();

    Ok(ExportSummary {
        files: context.file_count,
        images: context.images.len(),
        characters,
        total_characters,
        truncated: characters < total_characters,
        sha256: text_digest(text),
        output: output.map(Path::to_path_buf),
        image_paths,
    })
}

/// Save images as `image_1.png`, `image_2.png`, … in discovery order.
pub fn export_images(images: &[ExtractedImage], dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create image directory: {}", dir.display()))?;

    images
        .iter()
        .map(|img| {
            let path = dir.join(format!("image_{}.png", img.order + 1));
            img.image
                .save_with_format(&path, image::ImageFormat::Png)
                .with_context(|| format!("Failed to write image {}", path.display()))?;
            Ok(path)
        })
        .collect()
}
