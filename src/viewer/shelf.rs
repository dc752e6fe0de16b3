//! The author → series → book hierarchy.
//!
//! Built from the flat record list for the generate summary and the mosaic's
//! traversal order; the page script groups the same way when it loads the
//! records. Ordering:
//!
//! - authors ascending by name
//! - series ascending by name, books without a series grouped under
//!   `"No Series"` and sorted with the rest
//! - books by series index (absent = 0), ties broken by title

use crate::types::{BookRecord, NO_SERIES};
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Shelf {
    pub authors: Vec<AuthorGroup>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthorGroup {
    pub name: String,
    pub series: Vec<SeriesGroup>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesGroup {
    /// Series name, or `"No Series"` for the unnamed group.
    pub name: String,
    pub books: Vec<BookRecord>,
}

impl AuthorGroup {
    pub fn book_count(&self) -> usize {
        self.series.iter().map(|s| s.books.len()).sum()
    }
}

impl Shelf {
    pub fn build(books: Vec<BookRecord>) -> Self {
        let mut by_author: BTreeMap<String, BTreeMap<String, Vec<BookRecord>>> = BTreeMap::new();
        for book in books {
            let series = book.series.clone().unwrap_or_else(|| NO_SERIES.to_string());
            by_author
                .entry(book.author.clone())
                .or_default()
                .entry(series)
                .or_default()
                .push(book);
        }

        let authors = by_author
            .into_iter()
            .map(|(name, series)| AuthorGroup {
                name,
                series: series
                    .into_iter()
                    .map(|(name, mut books)| {
                        books.sort_by(compare_in_series);
                        SeriesGroup { name, books }
                    })
                    .collect(),
            })
            .collect();

        Self { authors }
    }

    /// Every book in traversal order: author, then series, then position.
    pub fn flatten(&self) -> Vec<&BookRecord> {
        self.authors
            .iter()
            .flat_map(|a| a.series.iter())
            .flat_map(|s| s.books.iter())
            .collect()
    }

    pub fn book_count(&self) -> usize {
        self.authors.iter().map(AuthorGroup::book_count).sum()
    }
}

fn compare_in_series(a: &BookRecord, b: &BookRecord) -> Ordering {
    let ia = a.series_index.unwrap_or(0.0);
    let ib = b.series_index.unwrap_or(0.0);
    ia.total_cmp(&ib).then_with(|| a.title.cmp(&b.title))
}
