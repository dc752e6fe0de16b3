//! Book records shared by the exporter and the viewer.
//!
//! [`BookRecord`] is the row type of `books.json` and the tabular export.
//! The exporter builds it; the viewer reads it back leniently through
//! [`crate::viewer::load_books`], so the serialized shape here is the contract
//! between the two phases.

use crate::color::Rgb;
use serde::{Deserialize, Serialize};

/// Author shown when a book has no linked author.
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// Series label for books that are not part of a series.
pub const NO_SERIES: &str = "No Series";

/// One exported book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    /// Calibre's `books.id`; unique and stable across runs.
    pub id: i64,
    pub author: String,
    pub title: String,
    /// `None` when the book is not in a series.
    pub series: Option<String>,
    pub series_index: Option<f64>,
    /// Path of the re-encoded cover relative to the output directory.
    pub cover_path: Option<String>,
    /// SHA-256 of the source cover. Change detection only.
    pub cover_hash: Option<String>,
    pub cover_color: Option<Rgb>,
    /// 1 when the library marks the book as read, else 0.
    pub is_read: u8,
}

impl BookRecord {
    /// Drop every cover field (no cover, or processing failed).
    pub fn clear_cover(&mut self) {
        self.cover_path = None;
        self.cover_hash = None;
        self.cover_color = None;
    }
}

/// A book as read from the library database, before cover processing.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedBook {
    pub record: BookRecord,
    /// Absolute path of the source cover, when the file exists.
    pub cover_source: Option<std::path::PathBuf>,
}
