//! Shared test utilities for the calibre-shelf test suite.
//!
//! Builds throwaway Calibre libraries: a `metadata.db` with the subset of
//! Calibre's schema the exporter reads, plus synthetic `cover.jpg` files in
//! each book folder. Only external crates are used here, so the integration
//! tests under `tests/` include this same file.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let fixture = CalibreFixture::new();
//! fixture.add_book(
//!     FixtureBook::new(1, "The Hobbit", &["J.R.R. Tolkien"])
//!         .series("Middle-earth", 1.0)
//!         .read(true)
//!         .cover([200, 40, 40]),
//! );
//! let library = Library::open(fixture.root()).unwrap();
//! ```

use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Label of the yes/no custom column every fixture library carries.
pub const FIXTURE_READ_LABEL: &str = "read";

const SCHEMA: &str = "
CREATE TABLE books (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL DEFAULT 'Unknown',
    sort TEXT,
    series_index REAL NOT NULL DEFAULT 1.0,
    path TEXT NOT NULL DEFAULT '',
    has_cover BOOL DEFAULT 0
);
CREATE TABLE authors (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE, sort TEXT);
CREATE TABLE books_authors_link (
    id INTEGER PRIMARY KEY, book INTEGER NOT NULL, author INTEGER NOT NULL
);
CREATE TABLE series (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE, sort TEXT);
CREATE TABLE books_series_link (
    id INTEGER PRIMARY KEY, book INTEGER NOT NULL UNIQUE, series INTEGER NOT NULL
);
CREATE TABLE languages (id INTEGER PRIMARY KEY, lang_code TEXT NOT NULL UNIQUE);
CREATE TABLE books_languages_link (
    id INTEGER PRIMARY KEY, book INTEGER NOT NULL, lang_code INTEGER NOT NULL,
    item_order INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE custom_columns (
    id INTEGER PRIMARY KEY, label TEXT NOT NULL, name TEXT NOT NULL, datatype TEXT NOT NULL
);
CREATE TABLE custom_column_1 (id INTEGER PRIMARY KEY, book INTEGER UNIQUE, value BOOL NOT NULL);
INSERT INTO custom_columns (id, label, name, datatype) VALUES (1, 'read', 'Read', 'bool');
";

// =========================================================================
// Fixture setup
// =========================================================================

/// A Calibre library in a temp directory. Deleted on drop.
pub struct CalibreFixture {
    dir: TempDir,
}

impl CalibreFixture {
    /// Create an empty library with the Calibre tables and a `read` column.
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let conn = Connection::open(dir.path().join("metadata.db")).unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    fn connect(&self) -> Connection {
        Connection::open(self.root().join("metadata.db")).unwrap()
    }

    /// Insert a book and write its cover, if it has one.
    pub fn add_book(&self, book: FixtureBook) {
        let conn = self.connect();
        let folder = format!("Books/{} ({})", book.title, book.id);

        conn.execute(
            "INSERT INTO books (id, title, series_index, path, has_cover) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                book.id,
                book.title,
                book.series.as_ref().map(|(_, i)| *i).unwrap_or(1.0),
                folder,
                book.cover.is_some()
            ],
        )
        .unwrap();

        for author in &book.authors {
            conn.execute(
                "INSERT OR IGNORE INTO authors (name, sort) VALUES (?1, ?1)",
                [author],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO books_authors_link (book, author)
                 SELECT ?1, id FROM authors WHERE name = ?2",
                params![book.id, author],
            )
            .unwrap();
        }

        if let Some((name, _)) = &book.series {
            conn.execute(
                "INSERT OR IGNORE INTO series (name, sort) VALUES (?1, ?1)",
                [name],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO books_series_link (book, series)
                 SELECT ?1, id FROM series WHERE name = ?2",
                params![book.id, name],
            )
            .unwrap();
        }

        for (order, code) in book.languages.iter().enumerate() {
            conn.execute(
                "INSERT OR IGNORE INTO languages (lang_code) VALUES (?1)",
                [code],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO books_languages_link (book, lang_code, item_order)
                 SELECT ?1, id, ?3 FROM languages WHERE lang_code = ?2",
                params![book.id, code, order as i64],
            )
            .unwrap();
        }

        if let Some(read) = book.read {
            conn.execute(
                "INSERT INTO custom_column_1 (book, value) VALUES (?1, ?2)",
                params![book.id, read],
            )
            .unwrap();
        }

        let folder_path = self.root().join(&folder);
        std::fs::create_dir_all(&folder_path).unwrap();
        if let Some(color) = book.cover {
            write_test_jpeg(&folder_path.join("cover.jpg"), 500, 750, color);
        }
    }

    /// Run raw SQL against the library, for schemas the builder can't express.
    pub fn execute_batch(&self, sql: &str) {
        self.connect().execute_batch(sql).unwrap();
    }

    /// Path of a book's source cover.
    pub fn cover_path(&self, id: i64, title: &str) -> PathBuf {
        self.root()
            .join(format!("Books/{} ({})", title, id))
            .join("cover.jpg")
    }
}

impl Default for CalibreFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for one fixture book.
#[derive(Debug, Clone)]
pub struct FixtureBook {
    pub id: i64,
    pub title: String,
    pub authors: Vec<String>,
    pub series: Option<(String, f64)>,
    pub languages: Vec<String>,
    pub read: Option<bool>,
    pub cover: Option<[u8; 3]>,
}

impl FixtureBook {
    pub fn new(id: i64, title: &str, authors: &[&str]) -> Self {
        Self {
            id,
            title: title.to_string(),
            authors: authors.iter().map(|a| a.to_string()).collect(),
            series: None,
            languages: Vec::new(),
            read: None,
            cover: None,
        }
    }

    pub fn series(mut self, name: &str, index: f64) -> Self {
        self.series = Some((name.to_string(), index));
        self
    }

    pub fn language(mut self, code: &str) -> Self {
        self.languages.push(code.to_string());
        self
    }

    pub fn read(mut self, read: bool) -> Self {
        self.read = Some(read);
        self
    }

    /// Give the book a flat-colored 500x750 JPEG cover.
    pub fn cover(mut self, color: [u8; 3]) -> Self {
        self.cover = Some(color);
        self
    }
}

// =========================================================================
// Images
// =========================================================================

/// Write a flat-colored JPEG, creating parent directories.
pub fn write_test_jpeg(path: &Path, width: u32, height: u32, color: [u8; 3]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    image::RgbImage::from_pixel(width, height, image::Rgb(color))
        .save_with_format(path, image::ImageFormat::Jpeg)
        .unwrap();
}
