//! Read-only access to a Calibre library.
//!
//! First stage of the export. Opens `metadata.db` inside the library root and
//! pulls one [`ExtractedBook`] per `books` row, plus the set of language codes
//! in use. The database is opened with `SQLITE_OPEN_READ_ONLY`; nothing here
//! ever writes to it.
//!
//! ## Tables read
//!
//! ```text
//! books                 id, title, series_index, path
//! authors               id, name
//! books_authors_link    book → author (link order = display order)
//! series                id, name
//! books_series_link     book → series
//! languages             id, lang_code
//! books_languages_link  book → lang_code
//! custom_columns        id, label, datatype  (locates the read flag)
//! custom_column_<id>    book, value      (the read flag itself)
//! ```
//!
//! ## Covers
//!
//! Calibre stores each book's cover as `<root>/<books.path>/cover.jpg`. A
//! missing file is normal (not every book has a cover) and simply leaves
//! [`ExtractedBook::cover_source`] empty.
//!
//! ## Read flag
//!
//! "Read" is not a built-in Calibre field. Users add a yes/no custom column
//! for it, and Calibre stores each custom column in its own
//! `custom_column_<id>` table. The column is found by its lookup label
//! (`read` unless configured otherwise) and must be a `bool` or `int`
//! column. Libraries without one export every book as unread; a label
//! pointing at another column type is skipped with a warning, never an
//! error.

use crate::types::{BookRecord, ExtractedBook, UNKNOWN_AUTHOR};
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Database file inside every Calibre library.
pub const DATABASE_FILE: &str = "metadata.db";

/// Cover file name Calibre writes into each book folder.
pub const COVER_FILE: &str = "cover.jpg";

/// Custom column types that can carry the read flag.
const READ_COLUMN_TYPES: [&str; 2] = ["bool", "int"];

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Library root not found: {0}")]
    RootNotFound(PathBuf),
    #[error("Calibre library not found: {} is missing", .0.display())]
    DatabaseMissing(PathBuf),
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// An open Calibre library.
pub struct Library {
    root: PathBuf,
    conn: Connection,
}

impl Library {
    /// Open the library at `root` read-only.
    pub fn open(root: &Path) -> Result<Self, LibraryError> {
        if !root.is_dir() {
            return Err(LibraryError::RootNotFound(root.to_path_buf()));
        }
        let db_path = root.join(DATABASE_FILE);
        if !db_path.is_file() {
            return Err(LibraryError::DatabaseMissing(db_path));
        }
        let conn = Connection::open_with_flags(
            &db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        debug!("Opened {} read-only", db_path.display());
        Ok(Self {
            root: root.to_path_buf(),
            conn,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Id of the custom column labelled `label`, if the library has one that
    /// can hold a read flag.
    ///
    /// Only `bool` and `int` columns qualify; Calibre stores those as a
    /// `custom_column_<id>` table with one `(book, value)` row per book.
    /// Any other column type is skipped with a warning.
    pub fn read_column_id(&self, label: &str) -> Result<Option<i64>, LibraryError> {
        if !self.has_table("custom_columns")? {
            return Ok(None);
        }
        let column: Option<(i64, String)> = self
            .conn
            .query_row(
                "SELECT id, datatype FROM custom_columns WHERE label = ?1",
                [label],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((id, datatype)) = column else {
            return Ok(None);
        };

        if !READ_COLUMN_TYPES.contains(&datatype.as_str()) {
            warn!(
                "Custom column '{}' has type '{}', expected one of {:?}; every book exports as unread",
                label, datatype, READ_COLUMN_TYPES
            );
            return Ok(None);
        }
        let table = format!("custom_column_{id}");
        let shape: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name IN ('book', 'value')",
            [&table],
            |row| row.get(0),
        )?;
        if shape != 2 {
            warn!(
                "Custom column '{}' has no (book, value) table {}; every book exports as unread",
                label, table
            );
            return Ok(None);
        }
        Ok(Some(id))
    }

    fn has_table(&self, name: &str) -> Result<bool, LibraryError> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            [name],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Every book, ordered by id.
    ///
    /// `read_column` is the lookup label of the yes/no custom column holding
    /// the read flag.
    pub fn books(&self, read_column: &str) -> Result<Vec<ExtractedBook>, LibraryError> {
        let read_expr = match self.read_column_id(read_column)? {
            Some(id) => {
                debug!("Read flag from custom column '{}' (#{})", read_column, id);
                format!("(SELECT value FROM custom_column_{id} WHERE book = b.id)")
            }
            None => {
                info!(
                    "No usable custom column labelled '{}'; every book exports as unread",
                    read_column
                );
                "NULL".to_string()
            }
        };

        let sql = format!(
            "SELECT b.id, b.title, b.series_index, b.path,
                    (SELECT group_concat(name, ', ') FROM (
                        SELECT a.name FROM books_authors_link l
                        JOIN authors a ON a.id = l.author
                        WHERE l.book = b.id ORDER BY l.id)) AS authors,
                    (SELECT s.name FROM books_series_link l
                        JOIN series s ON s.id = l.series
                        WHERE l.book = b.id) AS series,
                    {read_expr} AS is_read
             FROM books b
             ORDER BY b.id"
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(RawBook {
                id: row.get(0)?,
                title: row.get(1)?,
                series_index: row.get(2)?,
                path: row.get(3)?,
                authors: row.get(4)?,
                series: row.get(5)?,
                is_read: row.get(6)?,
            })
        })?;

        let mut books = Vec::new();
        for raw in rows {
            books.push(self.to_extracted(raw?));
        }
        debug!("Read {} books", books.len());
        Ok(books)
    }

    /// Distinct language codes linked to any book, sorted ascending.
    pub fn languages(&self) -> Result<Vec<String>, LibraryError> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT g.lang_code FROM books_languages_link l
             JOIN languages g ON g.id = l.lang_code
             ORDER BY g.lang_code",
        )?;
        let codes = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(codes)
    }

    fn to_extracted(&self, raw: RawBook) -> ExtractedBook {
        let cover = raw
            .path
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(|p| self.root.join(p).join(COVER_FILE))
            .filter(|p| p.is_file());

        let author = raw
            .authors
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

        ExtractedBook {
            record: BookRecord {
                id: raw.id,
                author,
                title: raw.title.unwrap_or_default(),
                series: raw.series.filter(|s| !s.is_empty()),
                series_index: raw.series_index,
                cover_path: None,
                cover_hash: None,
                cover_color: None,
                is_read: u8::from(read_flag(&raw.is_read)),
            },
            cover_source: cover,
        }
    }
}

/// One row of the books query, before cover resolution.
struct RawBook {
    id: i64,
    title: Option<String>,
    series_index: Option<f64>,
    path: Option<String>,
    authors: Option<String>,
    series: Option<String>,
    is_read: Value,
}

/// Whatever SQLite holds in the read column, as a flag. Calibre writes
/// integers; text and reals from other tools are accepted, anything else
/// is unread.
fn read_flag(value: &Value) -> bool {
    match value {
        Value::Integer(n) => *n != 0,
        Value::Real(f) => *f != 0.0,
        Value::Text(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes"
        ),
        Value::Null | Value::Blob(_) => false,
    }
}
