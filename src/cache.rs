//! Cover processing cache for incremental exports.
//!
//! Decoding, resampling and re-encoding a cover is by far the most expensive
//! part of an export, AVIF especially. Most covers never change between
//! runs, so this module lets the cover processor skip them.
//!
//! # Design
//!
//! Entries are keyed by **book id**, which Calibre keeps stable for the
//! lifetime of a book. Each entry records:
//!
//! - **`source_hash`**: SHA-256 of the source `cover.jpg` bytes. Content-based
//!   rather than mtime-based, so copying or syncing the library doesn't
//!   invalidate anything.
//! - **`params_hash`**: SHA-256 of the encoding parameters (max width,
//!   quality, format). Changing any of them re-encodes every cover.
//! - **`file`**: the output file name inside the covers directory.
//! - **`color`**: the average color measured when the cover was encoded, so
//!   a skipped cover keeps its color without being decoded again.
//!
//! A cache hit requires:
//! 1. An entry for the book id with matching `source_hash` and `params_hash`
//! 2. The previously-written output file still exists on disk
//!
//! ## Storage
//!
//! The manifest is a JSON file at `<covers_dir>/.cache-manifest.json`, next
//! to the covers it describes. It also records the library root it was
//! built from; a manifest written for a different library is ignored, so
//! two libraries exported into the same directory never share entries.
//!
//! ## Bypassing the cache
//!
//! `--force` loads an empty manifest, so every cover is re-encoded and the
//! old output files are overwritten naturally.
//!
//! ## Orphans
//!
//! After each run the manifest only holds the books still in the library.
//! [`CacheManifest::prune_orphans`] then deletes cover files no entry
//! refers to, so books removed from Calibre don't leave covers behind.

use crate::color::Rgb;
use crate::config::CoverFormat;
use crate::export::write_atomic;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the cache manifest file within the covers directory.
const MANIFEST_FILENAME: &str = ".cache-manifest.json";

/// Version of the cache manifest format. Bump this to invalidate all
/// existing caches when the format or key computation changes.
const MANIFEST_VERSION: u32 = 1;

/// A single cached cover.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub source_hash: String,
    pub params_hash: String,
    pub file: String,
    pub color: Rgb,
}

/// On-disk cache manifest mapping book ids to their cached covers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    /// Library root the entries were produced from.
    pub library: String,
    pub entries: BTreeMap<String, CacheEntry>,
}

impl CacheManifest {
    /// Create an empty manifest (used for `--force` or first export).
    pub fn empty(library_root: &Path) -> Self {
        Self {
            version: MANIFEST_VERSION,
            library: library_identity(library_root),
            entries: BTreeMap::new(),
        }
    }

    /// Load from the covers directory. Returns an empty manifest if the file
    /// doesn't exist, can't be parsed, has another version, or belongs to a
    /// different library.
    pub fn load(covers_dir: &Path, library_root: &Path) -> Self {
        let path = covers_dir.join(MANIFEST_FILENAME);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return Self::empty(library_root),
        };
        let manifest: Self = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(e) => {
                debug!("Ignoring unreadable cache manifest {}: {}", path.display(), e);
                return Self::empty(library_root);
            }
        };
        if manifest.version != MANIFEST_VERSION {
            debug!("Ignoring cache manifest version {}", manifest.version);
            return Self::empty(library_root);
        }
        let library = library_identity(library_root);
        if manifest.library != library {
            debug!(
                "Ignoring cache manifest built for {} (current library {})",
                manifest.library, library
            );
            return Self::empty(library_root);
        }
        manifest
    }

    /// Save to the covers directory, replacing the old manifest atomically.
    pub fn save(&self, covers_dir: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(&manifest_path(covers_dir), json.as_bytes())
    }

    /// Delete cover files in `covers_dir` that no entry refers to.
    ///
    /// Only names the exporter produces (`<id>.jpg`, `<id>.avif`) are
    /// considered; anything else in the directory is left alone. Returns
    /// the number of files removed.
    pub fn prune_orphans(&self, covers_dir: &Path) -> io::Result<usize> {
        let referenced: BTreeSet<&str> = self.entries.values().map(|e| e.file.as_str()).collect();
        let mut removed = 0;
        for dir_entry in std::fs::read_dir(covers_dir)? {
            let path = dir_entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !is_cover_file_name(name) || referenced.contains(name) || !path.is_file() {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    debug!("Removed orphaned cover {}", path.display());
                    removed += 1;
                }
                Err(e) => warn!("Cannot remove orphaned cover {}: {}", path.display(), e),
            }
        }
        Ok(removed)
    }

    /// Look up a reusable cover.
    ///
    /// Returns the entry if the book's source and parameter hashes match
    /// **and** the output file is still on disk.
    pub fn find_cached(
        &self,
        book_id: i64,
        source_hash: &str,
        params_hash: &str,
        covers_dir: &Path,
    ) -> Option<&CacheEntry> {
        self.entries
            .get(&book_id.to_string())
            .filter(|e| e.source_hash == source_hash && e.params_hash == params_hash)
            .filter(|e| covers_dir.join(&e.file).exists())
    }

    /// Look up whatever cover was last written for a book, without checking
    /// the source. Used when cover processing is skipped entirely.
    pub fn find_existing(&self, book_id: i64, covers_dir: &Path) -> Option<&CacheEntry> {
        self.entries
            .get(&book_id.to_string())
            .filter(|e| covers_dir.join(&e.file).exists())
    }

    /// Record the cover produced for a book, replacing any older entry.
    pub fn insert(&mut self, book_id: i64, entry: CacheEntry) {
        self.entries.insert(book_id.to_string(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `<id>.<ext>` for a cover format the exporter writes.
fn is_cover_file_name(name: &str) -> bool {
    let Some((stem, ext)) = name.rsplit_once('.') else {
        return false;
    };
    stem.parse::<i64>().is_ok()
        && [CoverFormat::Jpeg, CoverFormat::Avif]
            .iter()
            .any(|f| f.extension() == ext)
}

/// Canonical form of the library root, falling back to the path as given
/// when it can't be resolved.
fn library_identity(library_root: &Path) -> String {
    library_root
        .canonicalize()
        .unwrap_or_else(|_| library_root.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}

/// SHA-256 hash of the cover encoding parameters.
///
/// If any of these change, every previously cached cover is invalid.
pub fn hash_cover_params(max_width: u32, quality: u32, format: CoverFormat) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"cover\0");
    hasher.update(max_width.to_le_bytes());
    hasher.update(quality.to_le_bytes());
    hasher.update(format.extension().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Summary of cover processing for an export run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CoverStats {
    /// Reused from the cache without re-encoding.
    pub cached: u32,
    /// Decoded, resized and written.
    pub encoded: u32,
    /// Book has no cover file in the library.
    pub missing: u32,
    /// Cover exists but could not be processed.
    pub failed: u32,
}

impl CoverStats {
    pub fn total(&self) -> u32 {
        self.cached + self.encoded + self.missing + self.failed
    }
}

impl fmt::Display for CoverStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} encoded, {} cached, {} missing, {} failed ({} total)",
            self.encoded,
            self.cached,
            self.missing,
            self.failed,
            self.total()
        )
    }
}

/// Resolve the cache manifest path for a covers directory.
pub fn manifest_path(covers_dir: &Path) -> PathBuf {
    covers_dir.join(MANIFEST_FILENAME)
}
