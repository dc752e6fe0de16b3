//! Cover processing.
//!
//! Second stage of the export. Takes the books read from the library and
//! turns each source `cover.jpg` into a web-sized cover in the output's
//! covers directory, filling in the cover fields of every [`BookRecord`].
//!
//! ## Per-book flow
//!
//! ```text
//! no cover.jpg          → Missing   (cover fields absent)
//! sha256(cover.jpg)
//!   cache hit           → Cached    (reuse file name + color)
//!   cache miss          → Encoded   (resize ≤ max_width, encode, measure color)
//!   any error           → Failed    (logged, cover fields absent)
//! ```
//!
//! A single cover never aborts the run. Only setup problems (covers directory
//! not creatable, manifest not writable) are errors.
//!
//! ## Parallel Processing
//!
//! Books are processed in parallel with [rayon](https://docs.rs/rayon). The
//! cache manifest is only read during the parallel phase; the new manifest is
//! built afterwards from the collected results, which keep book order, so
//! the exported files come out identical no matter how work was scheduled.

use crate::cache::{self, CacheEntry, CacheManifest, CoverStats};
use crate::config::ShelfConfig;
use crate::imaging::{CoverConfig, ImageBackend, RustBackend, create_cover};
use crate::types::{BookRecord, ExtractedBook};
use rayon::prelude::*;
use std::path::Path;
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot create covers directory {path}: {source}")]
    CoversDir {
        path: String,
        source: std::io::Error,
    },
}

/// Configuration for cover processing.
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    pub cover: CoverConfig,
    /// Covers directory name inside the output directory.
    pub covers_dir: String,
    /// `false` starts from an empty cache, re-encoding everything.
    pub use_cache: bool,
}

impl ProcessConfig {
    /// Build a ProcessConfig from ShelfConfig values.
    pub fn from_shelf_config(config: &ShelfConfig) -> Self {
        Self {
            cover: CoverConfig::from_covers_config(&config.covers),
            covers_dir: config.export.covers_dir.clone(),
            use_cache: true,
        }
    }
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self::from_shelf_config(&ShelfConfig::default())
    }
}

/// What happened to one book's cover.
#[derive(Debug, Clone, PartialEq)]
pub enum CoverStatus {
    /// Unchanged source; previous output reused.
    Cached,
    /// Freshly resized and written.
    Encoded { width: u32, height: u32 },
    /// The book has no cover in the library.
    Missing,
    /// The cover exists but could not be processed.
    Failed(String),
}

/// Progress events emitted while covers are processed.
///
/// Sent through an optional channel so the CLI can print progress as it
/// happens. Events for different books arrive in completion order, not
/// book order.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    Started {
        total: usize,
    },
    CoverProcessed {
        book_id: i64,
        title: String,
        author: String,
        status: CoverStatus,
    },
}

/// Books with cover fields filled in, plus per-status counts.
#[derive(Debug)]
pub struct ProcessResult {
    pub books: Vec<BookRecord>,
    pub stats: CoverStats,
}

/// Process covers with the production image backend.
pub fn process_covers(
    books: Vec<ExtractedBook>,
    library_root: &Path,
    output_dir: &Path,
    config: &ProcessConfig,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<ProcessResult, ProcessError> {
    let backend = RustBackend::new();
    process_with_backend(&backend, books, library_root, output_dir, config, progress)
}

/// Process covers using a specific backend (allows testing with mock).
pub fn process_with_backend(
    backend: &impl ImageBackend,
    books: Vec<ExtractedBook>,
    library_root: &Path,
    output_dir: &Path,
    config: &ProcessConfig,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<ProcessResult, ProcessError> {
    let covers_dir = output_dir.join(&config.covers_dir);
    std::fs::create_dir_all(&covers_dir).map_err(|source| ProcessError::CoversDir {
        path: covers_dir.display().to_string(),
        source,
    })?;

    let manifest = if config.use_cache {
        CacheManifest::load(&covers_dir, library_root)
    } else {
        debug!("Cache disabled; re-encoding every cover");
        CacheManifest::empty(library_root)
    };
    let params_hash = cache::hash_cover_params(
        config.cover.max_width,
        config.cover.quality.value(),
        config.cover.format,
    );

    if let Some(tx) = &progress {
        tx.send(ProcessEvent::Started { total: books.len() }).ok();
    }

    let outcomes: Vec<(BookRecord, CoverStatus, Option<CacheEntry>)> = books
        .into_par_iter()
        .map(|book| {
            let outcome = process_one(
                backend,
                book,
                &manifest,
                &params_hash,
                &covers_dir,
                config,
            );
            if let Some(tx) = &progress {
                tx.send(ProcessEvent::CoverProcessed {
                    book_id: outcome.0.id,
                    title: outcome.0.title.clone(),
                    author: outcome.0.author.clone(),
                    status: outcome.1.clone(),
                })
                .ok();
            }
            outcome
        })
        .collect();

    let mut next_manifest = CacheManifest::empty(library_root);
    let mut stats = CoverStats::default();
    let mut records = Vec::with_capacity(outcomes.len());
    for (record, status, entry) in outcomes {
        match status {
            CoverStatus::Cached => stats.cached += 1,
            CoverStatus::Encoded { .. } => stats.encoded += 1,
            CoverStatus::Missing => stats.missing += 1,
            CoverStatus::Failed(_) => stats.failed += 1,
        }
        if let Some(entry) = entry {
            next_manifest.insert(record.id, entry);
        }
        records.push(record);
    }
    next_manifest.save(&covers_dir)?;
    let pruned = next_manifest.prune_orphans(&covers_dir)?;
    if pruned > 0 {
        info!("Removed {} covers of books no longer in the library", pruned);
    }

    Ok(ProcessResult {
        books: records,
        stats,
    })
}

fn process_one(
    backend: &impl ImageBackend,
    book: ExtractedBook,
    manifest: &CacheManifest,
    params_hash: &str,
    covers_dir: &Path,
    config: &ProcessConfig,
) -> (BookRecord, CoverStatus, Option<CacheEntry>) {
    let ExtractedBook {
        mut record,
        cover_source,
    } = book;
    record.clear_cover();

    let Some(source) = cover_source else {
        return (record, CoverStatus::Missing, None);
    };

    let source_hash = match cache::hash_file(&source) {
        Ok(h) => h,
        Err(e) => {
            warn!("Cannot read cover for book {} ({}): {}", record.id, source.display(), e);
            return (record, CoverStatus::Failed(e.to_string()), None);
        }
    };

    let (entry, status) =
        match manifest.find_cached(record.id, &source_hash, params_hash, covers_dir) {
            Some(hit) => (hit.clone(), CoverStatus::Cached),
            None => match create_cover(backend, &source, covers_dir, record.id, &config.cover) {
                Ok(cover) => (
                    CacheEntry {
                        source_hash,
                        params_hash: params_hash.to_string(),
                        file: cover.file_name,
                        color: cover.color,
                    },
                    CoverStatus::Encoded {
                        width: cover.width,
                        height: cover.height,
                    },
                ),
                Err(e) => {
                    warn!(
                        "Failed to process cover for book {} ({}): {}",
                        record.id,
                        source.display(),
                        e
                    );
                    return (record, CoverStatus::Failed(e.to_string()), None);
                }
            },
        };

    record.cover_path = Some(format!("{}/{}", config.covers_dir, entry.file));
    record.cover_hash = Some(entry.source_hash.clone());
    record.cover_color = Some(entry.color);
    (record, status, Some(entry))
}

/// Fill cover fields from the existing cache without hashing or encoding.
///
/// Used when cover processing is skipped. Books whose previous output is
/// still on disk keep their cover fields; every other book has none. The
/// manifest is left untouched.
pub fn reuse_cached_covers(
    books: Vec<ExtractedBook>,
    library_root: &Path,
    output_dir: &Path,
    covers_dir: &str,
) -> ProcessResult {
    let covers_path = output_dir.join(covers_dir);
    let manifest = CacheManifest::load(&covers_path, library_root);
    let mut stats = CoverStats::default();

    let records = books
        .into_iter()
        .map(|book| {
            let mut record = book.record;
            record.clear_cover();
            match manifest.find_existing(record.id, &covers_path) {
                Some(entry) => {
                    record.cover_path = Some(format!("{}/{}", covers_dir, entry.file));
                    record.cover_hash = Some(entry.source_hash.clone());
                    record.cover_color = Some(entry.color);
                    stats.cached += 1;
                }
                None => stats.missing += 1,
            }
            record
        })
        .collect();

    ProcessResult {
        books: records,
        stats,
    }
}
