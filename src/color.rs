//! Cover colors and the RGB → HSL conversion behind the color sort.
//!
//! The exporter stores one average color per cover as a plain `[r, g, b]`
//! array. Only the hue of that color is used; it orders the colorful mosaic
//! (and, in the page script, the flattened grid) from reds through greens
//! and blues back to magentas.

use serde::{Deserialize, Serialize};

/// An 8-bit RGB triple, serialized as a 3-element array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    pub fn r(self) -> u8 {
        self.0[0]
    }

    pub fn g(self) -> u8 {
        self.0[1]
    }

    pub fn b(self) -> u8 {
        self.0[2]
    }

    /// Convert to HSL: hue in degrees `[0, 360)`, saturation and lightness in `[0, 1]`.
    ///
    /// Achromatic colors (`r == g == b`) have hue 0 and saturation 0.
    pub fn to_hsl(self) -> (f64, f64, f64) {
        let r = self.r() as f64 / 255.0;
        let g = self.g() as f64 / 255.0;
        let b = self.b() as f64 / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let lightness = (max + min) / 2.0;
        let delta = max - min;

        if delta == 0.0 {
            return (0.0, 0.0, lightness);
        }

        let saturation = if lightness > 0.5 {
            delta / (2.0 - max - min)
        } else {
            delta / (max + min)
        };

        let sector = if max == r {
            (g - b) / delta + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / delta + 2.0
        } else {
            (r - g) / delta + 4.0
        };

        (sector * 60.0, saturation, lightness)
    }

    /// Hue in degrees, the only component the color sort uses.
    pub fn hue(self) -> f64 {
        self.to_hsl().0
    }
}

/// Hue of an optional color; books without a cover color sort as hue 0.
pub fn hue_of(color: Option<Rgb>) -> f64 {
    color.map(Rgb::hue).unwrap_or(0.0)
}
