//! HTML rendering of the viewer page.
//!
//! The page is a shell: toolbar, one empty container per presentation, the
//! tooltip and the embedded script. The script fetches the book-records file
//! named on `<body>` at load time and fills the containers, so the page
//! always shows whatever the last export wrote.
//!
//! | Attribute | On | Meaning |
//! |---|---|---|
//! | `data-books` | body | URL of the book-records file, relative to the page |
//! | `data-view` | body, view section | active / this presentation |
//! | `data-tooltip-margin` | body | viewport margin for the tooltip, px |
//! | `data-state` | body | `loading`, then `ready` or `error` (set by the script) |

use super::mode::ViewMode;
use crate::config::ViewerConfig;
use maud::{DOCTYPE, Markup, PreEscaped, html};

/// Renders the complete viewer page.
pub fn render_page(viewer: &ViewerConfig, books_url: &str, css: &str, js: &str) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (viewer.title) }
                style { (PreEscaped(css)) }
            }
            body data-view=(ViewMode::Structured.as_str())
                data-books=(books_url)
                data-tooltip-margin=(viewer.tooltip_margin)
                data-state="loading"
                style={ "--cover-size: " (viewer.cover_size) "px" } {
                (toolbar(viewer))
                main {
                    p.status id="status" { "Loading books…" }
                    noscript {
                        p.status { "The shelf needs JavaScript to show its books." }
                    }
                    @for mode in ViewMode::ALL {
                        section class={ "view view-" (mode.as_str()) }
                            data-view=(mode.as_str())
                            hidden[mode != ViewMode::Structured] {
                            @if mode == ViewMode::Flat {
                                div.grid #flat-grid {}
                            }
                        }
                    }
                }
                div #tooltip role="tooltip" hidden {}
                script { (PreEscaped(js)) }
            }
        }
    }
}

fn toolbar(viewer: &ViewerConfig) -> Markup {
    html! {
        header.toolbar {
            h1 { (viewer.title) }
            input #search type="search" placeholder="Search title, author or series"
                autocomplete="off" aria-label="Search";
            nav.view-switch {
                @for mode in ViewMode::ALL {
                    button type="button" data-view-button=(mode.as_str())
                        aria-pressed=(if mode == ViewMode::Structured { "true" } else { "false" }) {
                        (mode.label())
                    }
                }
            }
            button #color-sort type="button" aria-pressed="false" disabled {
                "Sort by color"
            }
            label.size-control {
                "Cover size "
                input #cover-size type="range" min="60" max="320" step="10"
                    value=(viewer.cover_size);
            }
            span.count aria-live="polite" {}
        }
    }
}
