//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations cover processing
//! needs: identify (read dimensions without decoding) and encode_cover
//! (decode, scale, encode, and measure the average color in one pass).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests use the
//! recording `MockBackend` below.

use super::params::CoverParams;
use crate::color::Rgb;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// What an encode produced: final pixel size and average color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedCover {
    pub width: u32,
    pub height: u32,
    pub color: Rgb,
}

/// Trait for image processing backends.
///
/// `Sync` so one backend can be shared across rayon workers.
pub trait ImageBackend: Sync {
    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Decode, scale, encode and write one cover; report its average color.
    fn encode_cover(&self, params: &CoverParams) -> Result<EncodedCover, BackendError>;
}
