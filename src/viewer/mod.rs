//! Reading exported books, and the page that displays them.
//!
//! The page itself is a shell; its script fetches the book-records file at
//! load time and does the grouping, search and color sort in the browser.
//! The Rust side reads the same file for the generate summary and the
//! mosaic:
//!
//! | Module | Role |
//! |--------|------|
//! | [`shelf`] | Author → series → book hierarchy and traversal order |
//! | [`order`] | Hue ordering of the flattened shelf |
//! | [`mode`] | The three presentations |
//! | [`render`] | Maud rendering of the page shell |
//!
//! Loading is lenient. `books.json` may have been edited by hand or written
//! by an older exporter, so a malformed field falls back to a safe default
//! instead of failing the whole page.

pub mod mode;
pub mod order;
pub mod render;
pub mod shelf;

pub use mode::ViewMode;
pub use order::sort_by_hue;
pub use shelf::{AuthorGroup, SeriesGroup, Shelf};

use crate::color::Rgb;
use crate::types::{BookRecord, UNKNOWN_AUTHOR};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Book records file must contain a JSON array")]
    NotAnArray,
}

/// Read a book-records file.
pub fn load_books(path: &Path) -> Result<Vec<BookRecord>, ViewerError> {
    let content = std::fs::read_to_string(path)?;
    parse_books(&content)
}

/// Parse book records leniently.
///
/// Entries that aren't JSON objects are skipped. Within an object every
/// missing or malformed field gets a default: empty title, the
/// unknown-author sentinel, no series, absent cover fields, unread.
/// `series_index` given as a numeric string is parsed.
pub fn parse_books(content: &str) -> Result<Vec<BookRecord>, ViewerError> {
    let value: Value = serde_json::from_str(content)?;
    let Value::Array(items) = value else {
        return Err(ViewerError::NotAnArray);
    };

    let mut books = Vec::with_capacity(items.len());
    for (position, item) in items.iter().enumerate() {
        match item {
            Value::Object(_) => books.push(book_from_value(item)),
            other => warn!("Skipping book record {}: not an object ({})", position, other),
        }
    }
    Ok(books)
}

fn book_from_value(v: &Value) -> BookRecord {
    BookRecord {
        id: v.get("id").and_then(as_i64).unwrap_or(0),
        author: text(v, "author").unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
        title: v
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        series: text(v, "series"),
        series_index: v.get("series_index").and_then(as_f64),
        cover_path: text(v, "cover_path"),
        cover_hash: text(v, "cover_hash"),
        cover_color: v.get("cover_color").and_then(as_rgb),
        is_read: v.get("is_read").map(as_flag).unwrap_or(0),
    }
}

/// Non-empty string field.
fn text(v: &Value, key: &str) -> Option<String> {
    v.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn as_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    let f = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    f.is_finite().then_some(f)
}

fn as_rgb(v: &Value) -> Option<Rgb> {
    let channels = v.as_array()?;
    if channels.len() != 3 {
        return None;
    }
    let mut rgb = [0u8; 3];
    for (slot, c) in rgb.iter_mut().zip(channels) {
        *slot = u8::try_from(c.as_u64()?).ok()?;
    }
    Some(Rgb(rgb))
}

fn as_flag(v: &Value) -> u8 {
    let set = match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        _ => false,
    };
    u8::from(set)
}
