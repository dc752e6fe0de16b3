//! Cover mosaic wallpaper.
//!
//! Tiles every exported cover into one JPEG sized for a 16:9 screen. Two
//! orderings:
//!
//! - **flat**: shelf traversal order (author, series, position)
//! - **colorful**: ascending cover hue, a left-to-right color gradient
//!
//! ## Grid
//!
//! All tiles share one size. The width is configured; the height follows
//! from the average aspect ratio of the covers (0.75 when none can be
//! measured). The column count is chosen so the whole grid comes out close
//! to 16:9:
//!
//! ```text
//! cols = ceil(sqrt(n × (16/9) / avg_ratio))
//! rows = ceil(n / cols)
//! ```
//!
//! Covers are scaled to fill their tile and center-cropped. Unused slots in
//! the last row stay black, as do slots whose cover fails to load.

use crate::config::{CoverFormat, MosaicConfig, MosaicMode};
use crate::imaging::BackendError;
use crate::imaging::rust_backend::{load_image, save_cover};
use crate::types::BookRecord;
use crate::viewer::{self, Shelf, ViewerError, sort_by_hue};
use image::RgbImage;
use image::imageops::{self, FilterType};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Aspect ratio assumed when no cover can be measured.
pub const DEFAULT_COVER_RATIO: f64 = 0.75;

/// Target width:height of the whole mosaic.
const SCREEN_RATIO: f64 = 16.0 / 9.0;

#[derive(Error, Debug)]
pub enum MosaicError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot read book records {path}: {source}")]
    Books { path: PathBuf, source: ViewerError },
    #[error("No exported covers found; run export first")]
    NoCovers,
    #[error("Mosaic too large: {0}x{1} pixels")]
    TooLarge(u64, u64),
    #[error("Image error: {0}")]
    Imaging(#[from] BackendError),
}

/// What a mosaic run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct MosaicSummary {
    pub path: PathBuf,
    pub mode: MosaicMode,
    pub cols: u32,
    pub rows: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub average_ratio: f64,
    pub placed: usize,
    pub failed: usize,
}

impl MosaicSummary {
    pub fn width(&self) -> u32 {
        self.cols * self.tile_width
    }

    pub fn height(&self) -> u32 {
        self.rows * self.tile_height
    }
}

/// Columns and rows for `count` tiles of the given aspect ratio.
pub fn grid_size(count: usize, tile_ratio: f64) -> (u32, u32) {
    if count == 0 {
        return (0, 0);
    }
    let target = SCREEN_RATIO / tile_ratio;
    let cols = ((count as f64 * target).sqrt().ceil() as usize).clamp(1, count);
    let rows = count.div_ceil(cols);
    (cols as u32, rows as u32)
}

/// Tile height for a tile width and cover aspect ratio (width / height).
pub fn tile_height(tile_width: u32, ratio: f64) -> u32 {
    ((tile_width as f64 / ratio).round() as u32).max(1)
}

/// Mean width/height ratio, or [`DEFAULT_COVER_RATIO`] for no samples.
pub fn average_ratio(dimensions: &[(u32, u32)]) -> f64 {
    let ratios: Vec<f64> = dimensions
        .iter()
        .filter(|(w, h)| *w > 0 && *h > 0)
        .map(|(w, h)| *w as f64 / *h as f64)
        .collect();
    if ratios.is_empty() {
        DEFAULT_COVER_RATIO
    } else {
        ratios.iter().sum::<f64>() / ratios.len() as f64
    }
}

/// Books with a cover, in mosaic order.
pub fn mosaic_order(books: Vec<BookRecord>, mode: MosaicMode) -> Vec<BookRecord> {
    let shelf = Shelf::build(books);
    let flat: Vec<&BookRecord> = shelf
        .flatten()
        .into_iter()
        .filter(|b| b.cover_path.is_some())
        .collect();
    let ordered = match mode {
        MosaicMode::Flat => flat,
        MosaicMode::Colorful => sort_by_hue(&flat),
    };
    ordered.into_iter().cloned().collect()
}

/// Build the mosaic from the book-records file.
///
/// Cover paths in the file are resolved against `output_dir`; `out` is
/// where the JPEG is written.
pub fn create_mosaic(
    books_path: &Path,
    output_dir: &Path,
    out: &Path,
    config: &MosaicConfig,
) -> Result<MosaicSummary, MosaicError> {
    let books = viewer::load_books(books_path).map_err(|source| MosaicError::Books {
        path: books_path.to_path_buf(),
        source,
    })?;
    let covers: Vec<PathBuf> = mosaic_order(books, config.mode)
        .into_iter()
        .filter_map(|b| {
            let path = output_dir.join(b.cover_path.as_deref()?);
            path.is_file().then_some(path)
        })
        .collect();
    if covers.is_empty() {
        return Err(MosaicError::NoCovers);
    }

    let dimensions: Vec<(u32, u32)> = covers
        .par_iter()
        .filter_map(|path| image::image_dimensions(path).ok())
        .collect();
    let ratio = average_ratio(&dimensions);
    let tile_w = config.tile_width;
    let tile_h = tile_height(tile_w, ratio);
    let (cols, rows) = grid_size(covers.len(), ratio);
    let (width, height) = (cols as u64 * tile_w as u64, rows as u64 * tile_h as u64);
    if width > u32::MAX as u64 || height > u32::MAX as u64 || width * height > 1 << 30 {
        return Err(MosaicError::TooLarge(width, height));
    }
    debug!(
        "Mosaic grid {}x{} of {}x{} tiles (avg ratio {:.3})",
        cols, rows, tile_w, tile_h, ratio
    );

    let tiles: Vec<Option<RgbImage>> = covers
        .par_iter()
        .map(|path| match load_image(path) {
            Ok(img) => Some(
                img.resize_to_fill(tile_w, tile_h, FilterType::Lanczos3)
                    .to_rgb8(),
            ),
            Err(e) => {
                warn!("Skipping {} in mosaic: {}", path.display(), e);
                None
            }
        })
        .collect();

    let mut mosaic = RgbImage::new(width as u32, height as u32);
    let mut placed = 0;
    for (i, tile) in tiles.iter().enumerate() {
        let Some(tile) = tile else { continue };
        let (col, row) = (i as u32 % cols, i as u32 / cols);
        imageops::replace(
            &mut mosaic,
            tile,
            (col * tile_w) as i64,
            (row * tile_h) as i64,
        );
        placed += 1;
    }

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    save_cover(&mosaic, out, CoverFormat::Jpeg, config.quality)?;

    Ok(MosaicSummary {
        path: out.to_path_buf(),
        mode: config.mode,
        cols,
        rows,
        tile_width: tile_w,
        tile_height: tile_h,
        average_ratio: ratio,
        placed,
        failed: tiles.len() - placed,
    })
}
