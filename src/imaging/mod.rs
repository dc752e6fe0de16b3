//! Cover image processing in pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Resize** | `DynamicImage::resize_exact` with Lanczos3 |
//! | **Encode → JPEG** | `image::codecs::jpeg::JpegEncoder` |
//! | **Encode → AVIF** | `image::codecs::avif::AvifEncoder` (rav1e) |
//! | **Average color** | per-channel mean over the resized pixels |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, EncodedCover, ImageBackend};
pub use calculations::calculate_cover_dimensions;
pub use operations::{CoverConfig, GeneratedCover, cover_file_name, create_cover, get_dimensions};
pub use params::{CoverParams, Quality};
pub use rust_backend::RustBackend;
