//! Pure calculation functions for cover dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate the output size of a cover bounded by `max_width`.
///
/// Covers at or below the limit keep their size (never upscaled). Wider
/// covers are scaled proportionally so the width equals `max_width`; the
/// height is rounded and never drops below one pixel.
///
/// # Examples
/// ```
/// # use calibre_shelf::imaging::calculate_cover_dimensions;
/// assert_eq!(calculate_cover_dimensions((800, 1200), 400), (400, 600));
/// assert_eq!(calculate_cover_dimensions((300, 450), 400), (300, 450));
/// ```
pub fn calculate_cover_dimensions(original: (u32, u32), max_width: u32) -> (u32, u32) {
    let (orig_w, orig_h) = original;
    if orig_w <= max_width || orig_w == 0 {
        return original;
    }
    let ratio = max_width as f64 / orig_w as f64;
    let h = ((orig_h as f64 * ratio).round() as u32).max(1);
    (max_width, h.min(orig_h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_cover_scales_to_max_width() {
        assert_eq!(calculate_cover_dimensions((1000, 1500), 400), (400, 600));
    }

    #[test]
    fn narrow_cover_is_not_upscaled() {
        assert_eq!(calculate_cover_dimensions((250, 400), 400), (250, 400));
    }

    #[test]
    fn exact_width_is_untouched() {
        assert_eq!(calculate_cover_dimensions((400, 640), 400), (400, 640));
    }

    #[test]
    fn rounding_keeps_aspect() {
        // 1234x1851 → 400 x 599.99 → 600
        assert_eq!(calculate_cover_dimensions((1234, 1851), 400), (400, 600));
    }

    #[test]
    fn extreme_landscape_keeps_one_pixel_height() {
        assert_eq!(calculate_cover_dimensions((10_000, 1), 400), (400, 1));
    }

    #[test]
    fn never_exceeds_source_or_limit() {
        for &(w, h) in &[(1, 1), (399, 10), (401, 3000), (5000, 5000), (4000, 20)] {
            for &max in &[1u32, 100, 400, 1024] {
                let (out_w, out_h) = calculate_cover_dimensions((w, h), max);
                assert!(out_w <= w && out_h <= h, "{w}x{h} max {max} → {out_w}x{out_h}");
                assert!(out_w <= max, "{w}x{h} max {max} → {out_w}x{out_h}");
            }
        }
    }
}
