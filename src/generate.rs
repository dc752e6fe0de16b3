//! Viewer page generation.
//!
//! Writes a single self-contained `index.html` next to the exported
//! book-records file. The page's script fetches that file at load time, so
//! a later export shows up on reload without regenerating. The records are
//! still read here to validate them and to summarize the shelf:
//!
//! ```text
//! site/
//! ├── books.json        # input (from export), fetched by the page
//! ├── covers/           # referenced by relative path
//! └── index.html        # generated
//! ```
//!
//! ## CSS and JavaScript
//!
//! Static assets are embedded at compile time:
//! - `static/style.css`: Base styles (colors injected from config)
//! - `static/viewer.js`: Loading and grouping records, search, view switching,
//!   color sort, cover size, tooltip
//!
//! ## HTML Generation
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating.
//! Templates are type-safe Rust code with automatic XSS escaping. The
//! The template itself lives in [`crate::viewer::render`].

use crate::config::{self, ShelfConfig};
use crate::export::write_atomic;
use crate::viewer::{self, Shelf, ViewerError, render};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot read book records {path}: {source}")]
    Books { path: PathBuf, source: ViewerError },
}

const CSS_STATIC: &str = include_str!("../static/style.css");
const JS: &str = include_str!("../static/viewer.js");

/// Name of the generated page.
pub const INDEX_FILE: &str = "index.html";

/// What a generate run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateSummary {
    pub page: PathBuf,
    pub authors: usize,
    pub series: usize,
    pub books: usize,
    pub read: usize,
}

pub fn generate(
    books_path: &Path,
    output_dir: &Path,
    config: &ShelfConfig,
) -> Result<GenerateSummary, GenerateError> {
    let books = viewer::load_books(books_path).map_err(|source| GenerateError::Books {
        path: books_path.to_path_buf(),
        source,
    })?;
    let read = books.iter().filter(|b| b.is_read != 0).count();
    let shelf = Shelf::build(books);
    debug!(
        "Shelf: {} authors, {} books",
        shelf.authors.len(),
        shelf.book_count()
    );

    // Generate CSS with colors from config
    let color_css = config::generate_color_css(&config.colors);
    let css = format!("{}\n\n{}", color_css, CSS_STATIC);

    std::fs::create_dir_all(output_dir)?;
    let page = output_dir.join(INDEX_FILE);
    let books_url = books_url(books_path, output_dir);
    let html = render::render_page(&config.viewer, &books_url, &css, JS);
    write_atomic(&page, html.into_string().as_bytes())?;

    Ok(GenerateSummary {
        page,
        authors: shelf.authors.len(),
        series: shelf.authors.iter().map(|a| a.series.len()).sum(),
        books: shelf.book_count(),
        read,
    })
}

/// URL of the book-records file relative to the page, `/`-separated.
///
/// A file outside the output directory can't be fetched from the page's
/// origin; the page then asks for a file of the same name next to itself.
fn books_url(books_path: &Path, output_dir: &Path) -> String {
    let file_name = || {
        books_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    match books_path.strip_prefix(output_dir) {
        Ok(relative) if !relative.as_os_str().is_empty() => relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        _ => {
            warn!(
                "{} is outside {}; the page will look for {} next to itself",
                books_path.display(),
                output_dir.display(),
                file_name()
            );
            file_name()
        }
    }
}
