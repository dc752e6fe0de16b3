//! Export orchestration and file writers.
//!
//! Runs the exporter end to end: open the library, read books and
//! languages, process covers, then write the export files into the output
//! directory:
//!
//! ```text
//! site/
//! ├── books.json                  # pretty JSON array of BookRecord
//! ├── languages.json              # sorted language codes
//! ├── calibre_books_export.csv    # same records, one row per book
//! └── covers/
//!     ├── .cache-manifest.json
//!     ├── 1.jpg
//!     └── ...
//! ```
//!
//! Each file is rendered completely in memory, written to a hidden sibling
//! and renamed over the target, so a reader never sees a half-written file.
//! The library is opened before anything is created, so a missing library
//! leaves the output directory untouched.

use crate::cache::CoverStats;
use crate::config::ShelfConfig;
use crate::imaging::{ImageBackend, RustBackend};
use crate::library::{Library, LibraryError};
use crate::process::{self, ProcessConfig, ProcessError, ProcessEvent};
use crate::types::BookRecord;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Library(#[from] LibraryError),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Column order of the tabular export.
pub const CSV_HEADER: [&str; 9] = [
    "id",
    "author",
    "title",
    "series",
    "series_index",
    "cover_path",
    "cover_hash",
    "cover_color",
    "is_read",
];

/// Switches for one export run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Don't hash or encode covers; reuse whatever the cache already has.
    pub skip_covers: bool,
    /// Don't write the CSV file.
    pub skip_csv: bool,
    /// Ignore the cache and re-encode every cover.
    pub force: bool,
}

/// What an export produced.
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub books: usize,
    pub languages: usize,
    pub covers: CoverStats,
    /// Whether cover processing ran or was skipped.
    pub covers_skipped: bool,
    /// Files written, in write order.
    pub files: Vec<PathBuf>,
}

/// Export with the production image backend.
pub fn export(
    config: &ShelfConfig,
    output_dir: &Path,
    options: ExportOptions,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<ExportSummary, ExportError> {
    export_with_backend(&RustBackend::new(), config, output_dir, options, progress)
}

/// Export using a specific backend (allows testing with mock).
pub fn export_with_backend(
    backend: &impl ImageBackend,
    config: &ShelfConfig,
    output_dir: &Path,
    options: ExportOptions,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<ExportSummary, ExportError> {
    let library = Library::open(&config.library_root)?;
    let extracted = library.books(&config.export.read_column)?;
    let languages = library.languages()?;
    info!(
        "Read {} books and {} languages from {}",
        extracted.len(),
        languages.len(),
        library.root().display()
    );

    std::fs::create_dir_all(output_dir)?;

    let result = if options.skip_covers {
        info!("Skipping cover processing");
        process::reuse_cached_covers(
            extracted,
            library.root(),
            output_dir,
            &config.export.covers_dir,
        )
    } else {
        let process_config = ProcessConfig {
            use_cache: !options.force,
            ..ProcessConfig::from_shelf_config(config)
        };
        process::process_with_backend(
            backend,
            extracted,
            library.root(),
            output_dir,
            &process_config,
            progress,
        )?
    };

    let mut files = Vec::new();

    let books_path = output_dir.join(&config.export.books_file);
    write_atomic(&books_path, books_json(&result.books)?.as_bytes())?;
    files.push(books_path);

    let languages_path = output_dir.join(&config.export.languages_file);
    write_atomic(&languages_path, languages_json(&languages)?.as_bytes())?;
    files.push(languages_path);

    if options.skip_csv {
        info!("Skipping CSV export");
    } else {
        let csv_path = output_dir.join(&config.export.csv_file);
        write_atomic(&csv_path, &books_csv(&result.books)?)?;
        files.push(csv_path);
    }

    Ok(ExportSummary {
        books: result.books.len(),
        languages: languages.len(),
        covers: result.stats,
        covers_skipped: options.skip_covers,
        files,
    })
}

/// The book-records file: a pretty-printed JSON array.
pub fn books_json(books: &[BookRecord]) -> Result<String, serde_json::Error> {
    let mut json = serde_json::to_string_pretty(books)?;
    json.push('\n');
    Ok(json)
}

/// The language file: a JSON array of codes, sorted ascending.
pub fn languages_json(languages: &[String]) -> Result<String, serde_json::Error> {
    let mut sorted = languages.to_vec();
    sorted.sort();
    sorted.dedup();
    let mut json = serde_json::to_string_pretty(&sorted)?;
    json.push('\n');
    Ok(json)
}

/// The tabular export: header row plus one row per book.
///
/// Absent values are empty cells; the cover color is written `r;g;b`.
pub fn books_csv(books: &[BookRecord]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for book in books {
        writer.write_record([
            book.id.to_string(),
            book.author.clone(),
            book.title.clone(),
            book.series.clone().unwrap_or_default(),
            book.series_index.map(format_series_index).unwrap_or_default(),
            book.cover_path.clone().unwrap_or_default(),
            book.cover_hash.clone().unwrap_or_default(),
            book.cover_color
                .map(|c| format!("{};{};{}", c.r(), c.g(), c.b()))
                .unwrap_or_default(),
            book.is_read.to_string(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))
}

/// `1.0` → `1.0`, `2.5` → `2.5`.
fn format_series_index(index: f64) -> String {
    if index.fract() == 0.0 {
        format!("{:.1}", index)
    } else {
        index.to_string()
    }
}

/// Write `contents` to `path` via a temporary sibling and a rename.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));
    let result = std::fs::File::create(&tmp).and_then(|mut f| {
        f.write_all(contents)?;
        f.sync_all()
    });
    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    std::fs::rename(&tmp, path)
}
