//! CLI output formatting for all commands.
//!
//! # Information-First Display
//!
//! Each book is shown by its identity (id, title, author) with what
//! happened to it as secondary context. File paths appear only where the
//! user needs to find something on disk.
//!
//! # Output Format
//!
//! ## Export (cover progress)
//!
//! ```text
//! Covers (3 books)
//!     001 The Hobbit (J.R.R. Tolkien): encoded 400x600
//!     002 Emma (Jane Austen): cached
//!     003 Pamphlet (Unknown Author): no cover
//! ```
//!
//! ## Export (summary)
//!
//! ```text
//! Exported 3 books, 2 languages
//! Covers: 1 encoded, 1 cached, 1 missing, 0 failed (3 total)
//!     books.json
//!     languages.json
//!     calibre_books_export.csv
//! ```
//!
//! ## Generate
//!
//! ```text
//! Shelf: 2 authors, 3 series, 3 books (1 read)
//! Generated index.html
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::export::ExportSummary;
use crate::generate::GenerateSummary;
use crate::mosaic::MosaicSummary;
use crate::process::{CoverStatus, ProcessEvent};
use std::path::Path;

/// Format a book id as 3-digit zero-padded.
fn format_id(id: i64) -> String {
    format!("{:0>3}", id)
}

/// Path relative to `base` when it lies inside it.
fn display_path(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}

// ============================================================================
// Export
// ============================================================================

/// Format a single cover progress event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::Started { total } => vec![format!("Covers ({} books)", total)],
        ProcessEvent::CoverProcessed {
            book_id,
            title,
            author,
            status,
        } => {
            let status = match status {
                CoverStatus::Cached => "cached".to_string(),
                CoverStatus::Encoded { width, height } => format!("encoded {}x{}", width, height),
                CoverStatus::Missing => "no cover".to_string(),
                CoverStatus::Failed(reason) => format!("failed: {}", reason),
            };
            vec![format!(
                "    {} {} ({}): {}",
                format_id(*book_id),
                title,
                author,
                status
            )]
        }
    }
}

/// Format the end-of-export summary.
pub fn format_export_summary(summary: &ExportSummary, output_dir: &Path) -> Vec<String> {
    let mut lines = vec![format!(
        "Exported {} books, {} languages",
        summary.books, summary.languages
    )];
    if summary.covers_skipped {
        lines.push(format!(
            "Covers: skipped ({} reused from cache)",
            summary.covers.cached
        ));
    } else {
        lines.push(format!("Covers: {}", summary.covers));
    }
    for file in &summary.files {
        lines.push(format!("    {}", display_path(file, output_dir)));
    }
    lines
}

pub fn print_process_event(event: &ProcessEvent) {
    for line in format_process_event(event) {
        println!("{}", line);
    }
}

pub fn print_export_summary(summary: &ExportSummary, output_dir: &Path) {
    for line in format_export_summary(summary, output_dir) {
        println!("{}", line);
    }
}

// ============================================================================
// Generate
// ============================================================================

pub fn format_generate_output(summary: &GenerateSummary, output_dir: &Path) -> Vec<String> {
    vec![
        format!(
            "Shelf: {} authors, {} series, {} books ({} read)",
            summary.authors, summary.series, summary.books, summary.read
        ),
        format!("Generated {}", display_path(&summary.page, output_dir)),
    ]
}

pub fn print_generate_output(summary: &GenerateSummary, output_dir: &Path) {
    for line in format_generate_output(summary, output_dir) {
        println!("{}", line);
    }
}

// ============================================================================
// Mosaic
// ============================================================================

pub fn format_mosaic_output(summary: &MosaicSummary) -> Vec<String> {
    let mode = match summary.mode {
        crate::config::MosaicMode::Flat => "flat",
        crate::config::MosaicMode::Colorful => "colorful",
    };
    let mut lines = vec![
        format!(
            "Mosaic ({}): {}x{} grid of {}x{} tiles (avg cover ratio {:.3})",
            mode,
            summary.cols,
            summary.rows,
            summary.tile_width,
            summary.tile_height,
            summary.average_ratio
        ),
        format!(
            "    {} covers placed, {} failed",
            summary.placed, summary.failed
        ),
    ];
    lines.push(format!(
        "Wrote {} ({}x{})",
        summary.path.display(),
        summary.width(),
        summary.height()
    ));
    lines
}

pub fn print_mosaic_output(summary: &MosaicSummary) {
    for line in format_mosaic_output(summary) {
        println!("{}", line);
    }
}
