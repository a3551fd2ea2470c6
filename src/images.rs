//! Notebook image decoding under a run-wide budget.
//!
//! The budget is checked before every decode: once the cap is reached no
//! further payloads are even base64-decoded for the rest of the run.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, GenericImageView, ImageFormat};
use thiserror::Error;

use crate::models::ExtractedImage;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("invalid base64 image payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("undecodable PNG: {0}")]
    Decode(#[from] image::ImageError),
}

/// Decode a base64 PNG payload. Embedded whitespace is ignored.
pub fn decode_png(encoded: &str) -> Result<DynamicImage, ImageError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(compact.as_bytes())?;
    Ok(image::load_from_memory_with_format(&bytes, ImageFormat::Png)?)
}

/// Downscale so neither side exceeds `max_dimension`, keeping the aspect
/// ratio. Images already within bounds are returned untouched.
pub fn fit_within(image: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    if width <= max_dimension && height <= max_dimension {
        return image;
    }
    image.thumbnail(max_dimension, max_dimension)
}

/// Run-scoped collection of extracted images with a hard cap.
#[derive(Debug)]
pub struct ImageBudget {
    cap: usize,
    max_dimension: u32,
    images: Vec<ExtractedImage>,
}

impl ImageBudget {
    pub fn new(cap: usize, max_dimension: u32) -> Self {
        Self {
            cap,
            max_dimension,
            images: Vec::new(),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.images.len() >= self.cap
    }

    /// Decode and keep one payload if the budget allows it.
    ///
    /// Returns `Ok(false)` without decoding when the budget is exhausted.
    pub fn offer(&mut self, origin: &str, encoded: &str) -> Result<bool, ImageError> {
        if self.is_exhausted() {
            return Ok(false);
        }
        let image = fit_within(decode_png(encoded)?, self.max_dimension);
        let order = self.images.len();
        tracing::debug!(
            origin,
            order,
            width = image.width(),
            height = image.height(),
            "Extracted notebook image"
        );
        self.images.push(ExtractedImage {
            image,
            origin: origin.to_string(),
            order,
        });
        Ok(true)
    }

    pub fn into_images(self) -> Vec<ExtractedImage> {
        self.images
    }
}
