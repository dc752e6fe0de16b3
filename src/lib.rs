//! # calibre-shelf
//!
//! Exports a Calibre e-book library to static files and renders a browser
//! viewer over them. The Calibre database is the data source and is only
//! ever read.
//!
//! # Architecture: Export, then View
//!
//! ```text
//! 1. Export    metadata.db + covers  →  site/books.json, languages.json,
//!                                        calibre_books_export.csv, covers/
//! 2. Generate  site/books.json        →  site/index.html
//! ```
//!
//! The two phases only share `books.json`. The page fetches it each time it
//! loads and reads it leniently, so a re-export shows up on reload and a
//! hand-edited or older export still renders.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`library`] | Read-only Calibre database access: books, authors, series, read flag, languages |
//! | [`process`] | Parallel cover hashing, resizing and re-encoding with progress events |
//! | [`cache`] | Content-hash cover cache so unchanged covers are never re-encoded |
//! | [`imaging`] | Pure-Rust image operations behind the `ImageBackend` trait |
//! | [`export`] | Export orchestration and atomic JSON / CSV writers |
//! | [`viewer`] | Lenient record loading, author → series grouping, hue order, the page shell |
//! | [`generate`] | Writes `index.html` from the exported records |
//! | [`mosaic`] | Optional 16:9 wallpaper tiled from exported covers |
//! | [`color`] | RGB → HSL hue behind the color sort |
//! | [`config`] | `calibre-shelf.toml` loading, validation and CSS generation |
//! | [`types`] | `BookRecord`, the row type shared by both phases |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Content Hashes, Not Timestamps
//!
//! A cover is re-encoded only when the SHA-256 of its source bytes or the
//! encoding settings change. Copying or syncing a library keeps every
//! cached cover valid. See [`cache`].
//!
//! ## One Self-Contained Page
//!
//! The viewer is a single `index.html` with inline CSS and a small script.
//! The script fetches `books.json` from the same origin at load time and
//! builds all three presentations from it, so the page is served next to
//! the export by any static file server and never goes stale.
//!
//! ## Failures Stay Local
//!
//! A broken cover costs that book its cover, nothing more. Only a missing
//! library, an invalid config or an unwritable output directory stop a run.

pub mod cache;
pub mod color;
pub mod config;
pub mod export;
pub mod generate;
pub mod imaging;
pub mod library;
pub mod mosaic;
pub mod output;
pub mod process;
pub mod types;
pub mod viewer;

#[cfg(test)]
pub(crate) mod test_helpers;
