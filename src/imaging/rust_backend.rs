//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP) | `image` crate, format sniffed from content |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |
//! | Average color | mean of the resized RGB8 pixels |
//!
//! Calibre always names covers `cover.jpg`, but hand-added covers are
//! sometimes PNG or WebP under that name, so the decoder guesses the format
//! from the file's magic bytes rather than trusting the extension.

use super::backend::{BackendError, Dimensions, EncodedCover, ImageBackend};
use super::params::CoverParams;
use crate::color::Rgb;
use crate::config::CoverFormat;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, RgbImage};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Pure Rust backend using the `image` crate.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn open_reader(path: &Path) -> Result<ImageReader<std::io::BufReader<std::fs::File>>, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)
}

/// Load and decode an image from disk.
pub(crate) fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    open_reader(path)?.decode().map_err(|e| {
        BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
    })
}

/// Per-channel mean, rounded to the nearest integer.
pub(crate) fn average_color(img: &RgbImage) -> Rgb {
    let count = (img.width() as u64) * (img.height() as u64);
    if count == 0 {
        return Rgb::new(0, 0, 0);
    }
    let mut sums = [0u64; 3];
    for pixel in img.pixels() {
        for (sum, channel) in sums.iter_mut().zip(pixel.0) {
            *sum += channel as u64;
        }
    }
    let mean = |sum: u64| ((sum + count / 2) / count) as u8;
    Rgb::new(mean(sums[0]), mean(sums[1]), mean(sums[2]))
}

/// Encode `img` to `path`. Writes to a `.part` sibling first and renames, so
/// an interrupted encode never leaves a truncated cover behind.
pub(crate) fn save_cover(
    img: &RgbImage,
    path: &Path,
    format: CoverFormat,
    quality: u32,
) -> Result<(), BackendError> {
    let mut partial = PathBuf::from(path);
    partial.as_mut_os_string().push(".part");

    let result = write_encoded(img, &partial, format, quality);
    if result.is_err() {
        let _ = std::fs::remove_file(&partial);
        return result;
    }
    std::fs::rename(&partial, path).map_err(BackendError::Io)
}

fn write_encoded(
    img: &RgbImage,
    path: &Path,
    format: CoverFormat,
    quality: u32,
) -> Result<(), BackendError> {
    let file = std::fs::File::create(path).map_err(BackendError::Io)?;
    let writer = BufWriter::new(file);
    let quality = quality.clamp(1, 100) as u8;
    let result = match format {
        CoverFormat::Jpeg => {
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(writer, quality);
            img.write_with_encoder(encoder)
        }
        CoverFormat::Avif => {
            let encoder =
                image::codecs::avif::AvifEncoder::new_with_speed_quality(writer, 6, quality);
            img.write_with_encoder(encoder)
        }
    };
    result.map_err(|e| {
        BackendError::ProcessingFailed(format!(
            "{} encode failed: {}",
            format.extension().to_uppercase(),
            e
        ))
    })
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = open_reader(path)?.into_dimensions().map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
        })?;
        Ok(Dimensions { width, height })
    }

    fn encode_cover(&self, params: &CoverParams) -> Result<EncodedCover, BackendError> {
        let img = load_image(&params.source)?;
        let scaled = if img.width() == params.width && img.height() == params.height {
            img
        } else {
            img.resize_exact(params.width, params.height, FilterType::Lanczos3)
        };
        let rgb = scaled.to_rgb8();
        let color = average_color(&rgb);
        save_cover(&rgb, &params.output, params.format, params.quality.value())?;
        Ok(EncodedCover {
            width: rgb.width(),
            height: rgb.height(),
            color,
        })
    }
}
