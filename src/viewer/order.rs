//! Hue ordering of the flattened shelf, used by the colorful mosaic. The
//! page script sorts its flat grid with the same key and tie-break.

use crate::color::hue_of;
use crate::types::BookRecord;

/// Books sorted ascending by cover hue. Stable: equal hues (including
/// every book without a color, which counts as hue 0) keep their order.
pub fn sort_by_hue<'a>(books: &[&'a BookRecord]) -> Vec<&'a BookRecord> {
    let mut keyed: Vec<(f64, &BookRecord)> =
        books.iter().map(|b| (hue_of(b.cover_color), *b)).collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    keyed.into_iter().map(|(_, b)| b).collect()
}
