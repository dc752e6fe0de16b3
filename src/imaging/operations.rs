//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take configuration, compute parameters, and call the backend.

use super::backend::{BackendError, ImageBackend};
use super::calculations::calculate_cover_dimensions;
use super::params::{CoverParams, Quality};
use crate::color::Rgb;
use crate::config::{CoverFormat, CoversConfig};
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, path: &Path) -> Result<(u32, u32)> {
    let dims = backend.identify(path)?;
    Ok((dims.width, dims.height))
}

/// Configuration for cover generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverConfig {
    pub max_width: u32,
    pub quality: Quality,
    pub format: CoverFormat,
}

impl CoverConfig {
    pub fn from_covers_config(config: &CoversConfig) -> Self {
        Self {
            max_width: config.max_width,
            quality: Quality::new(config.quality),
            format: config.format,
        }
    }
}

impl Default for CoverConfig {
    fn default() -> Self {
        Self::from_covers_config(&CoversConfig::default())
    }
}

/// A cover written to the covers directory.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedCover {
    /// File name inside the covers directory, e.g. `42.jpg`.
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub color: Rgb,
}

/// Output file name for a book's cover.
pub fn cover_file_name(book_id: i64, format: CoverFormat) -> String {
    format!("{}.{}", book_id, format.extension())
}

/// Produce one book's cover in `output_dir`.
///
/// Reads the source dimensions, bounds the width by `config.max_width`
/// (never upscaling), and has the backend encode it under a name derived
/// from the book id.
pub fn create_cover(
    backend: &impl ImageBackend,
    source: &Path,
    output_dir: &Path,
    book_id: i64,
    config: &CoverConfig,
) -> Result<GeneratedCover> {
    let original = get_dimensions(backend, source)?;
    if original.0 == 0 || original.1 == 0 {
        return Err(BackendError::ProcessingFailed(format!(
            "Empty image: {}",
            source.display()
        )));
    }
    let (width, height) = calculate_cover_dimensions(original, config.max_width);
    let file_name = cover_file_name(book_id, config.format);

    let encoded = backend.encode_cover(&CoverParams {
        source: source.to_path_buf(),
        output: output_dir.join(&file_name),
        width,
        height,
        quality: config.quality,
        format: config.format,
    })?;

    Ok(GeneratedCover {
        file_name,
        width: encoded.width,
        height: encoded.height,
        color: encoded.color,
    })
}
