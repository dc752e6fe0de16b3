//! The three presentations of the shelf.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// Author and series sections with cover grids.
    #[default]
    Structured,
    /// One grid of every book in traversal order.
    Flat,
    /// Author and series sections listing titles only.
    Text,
}

impl ViewMode {
    pub const ALL: [ViewMode; 3] = [ViewMode::Structured, ViewMode::Flat, ViewMode::Text];

    pub fn as_str(self) -> &'static str {
        match self {
            ViewMode::Structured => "structured",
            ViewMode::Flat => "flat",
            ViewMode::Text => "text",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ViewMode::Structured => "By author",
            ViewMode::Flat => "All covers",
            ViewMode::Text => "List",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
