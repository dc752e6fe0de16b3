//! Tool configuration.
//!
//! Settings come from three layers, later layers winning:
//!
//! 1. stock defaults ([`ShelfConfig::default`]),
//! 2. a TOML file: `calibre-shelf.toml` in the working directory, or the
//!    file passed with `--config`,
//! 3. command-line flags (`--library`, `--quality`, `--max-width`, ...),
//!    applied by `main` after loading.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! library_root = "Calibre Library"   # Directory holding metadata.db
//!
//! [covers]
//! max_width = 400           # Covers wider than this are scaled down
//! quality = 85              # Lossy encoding quality (1-100)
//! format = "jpeg"           # "jpeg" or "avif"
//!
//! [export]
//! books_file = "books.json"
//! languages_file = "languages.json"
//! csv_file = "calibre_books_export.csv"
//! covers_dir = "covers"
//! read_column = "read"      # Label of the Calibre yes/no column marking read books
//!
//! [viewer]
//! title = "Library"
//! cover_size = 120          # Initial thumbnail width in pixels
//! tooltip_margin = 12       # Minimum distance between tooltip and viewport edge
//!
//! [colors.light]
//! background = "#ffffff"
//! text = "#111111"
//! text_muted = "#666666"
//! border = "#e0e0e0"
//! accent = "#2e7d32"        # Read badge
//!
//! [colors.dark]
//! background = "#121212"
//! text = "#eeeeee"
//! text_muted = "#999999"
//! border = "#333333"
//! accent = "#66bb6a"
//!
//! [mosaic]
//! tile_width = 100
//! mode = "flat"             # "flat" (library order) or "colorful" (hue order)
//! file = "mosaic_wallpaper.jpg"
//! quality = 95
//!
//! [processing]
//! max_processes = 4         # Max parallel cover workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "calibre-shelf.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Complete tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShelfConfig {
    /// Calibre library directory (the one containing `metadata.db`).
    pub library_root: PathBuf,
    /// Cover resize/encode settings.
    pub covers: CoversConfig,
    /// Output file names and database conventions.
    pub export: ExportConfig,
    /// Viewer page settings.
    pub viewer: ViewerConfig,
    /// Viewer color schemes.
    pub colors: ColorConfig,
    /// Wallpaper mosaic settings.
    pub mosaic: MosaicConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for ShelfConfig {
    fn default() -> Self {
        Self {
            library_root: PathBuf::from("Calibre Library"),
            covers: CoversConfig::default(),
            export: ExportConfig::default(),
            viewer: ViewerConfig::default(),
            colors: ColorConfig::default(),
            mosaic: MosaicConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl ShelfConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.covers.quality) {
            return Err(ConfigError::Validation(
                "covers.quality must be 1-100".into(),
            ));
        }
        if self.covers.max_width == 0 {
            return Err(ConfigError::Validation(
                "covers.max_width must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.mosaic.quality) {
            return Err(ConfigError::Validation(
                "mosaic.quality must be 1-100".into(),
            ));
        }
        if self.mosaic.tile_width == 0 {
            return Err(ConfigError::Validation(
                "mosaic.tile_width must be non-zero".into(),
            ));
        }
        if self.viewer.cover_size == 0 {
            return Err(ConfigError::Validation(
                "viewer.cover_size must be non-zero".into(),
            ));
        }
        for (key, name) in [
            ("export.books_file", &self.export.books_file),
            ("export.languages_file", &self.export.languages_file),
            ("export.csv_file", &self.export.csv_file),
            ("export.covers_dir", &self.export.covers_dir),
        ] {
            if name.is_empty() || name.contains(['/', '\\']) {
                return Err(ConfigError::Validation(format!(
                    "{key} must be a plain file name"
                )));
            }
        }
        Ok(())
    }
}

/// Output encoding for re-encoded covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverFormat {
    Jpeg,
    Avif,
}

impl CoverFormat {
    pub fn extension(self) -> &'static str {
        match self {
            CoverFormat::Jpeg => "jpg",
            CoverFormat::Avif => "avif",
        }
    }
}

/// Cover resize/encode settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoversConfig {
    /// Maximum output width in pixels. Narrower covers are never upscaled.
    pub max_width: u32,
    /// Lossy encoding quality (1 = worst, 100 = best).
    pub quality: u32,
    pub format: CoverFormat,
}

impl Default for CoversConfig {
    fn default() -> Self {
        Self {
            max_width: 400,
            quality: 85,
            format: CoverFormat::Jpeg,
        }
    }
}

/// Output file names, all relative to the output directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub books_file: String,
    pub languages_file: String,
    pub csv_file: String,
    pub covers_dir: String,
    /// Label of the Calibre custom yes/no column that marks a book as read.
    pub read_column: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            books_file: "books.json".to_string(),
            languages_file: "languages.json".to_string(),
            csv_file: "calibre_books_export.csv".to_string(),
            covers_dir: "covers".to_string(),
            read_column: "read".to_string(),
        }
    }
}

/// Viewer page settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerConfig {
    /// Page `<title>` and heading.
    pub title: String,
    /// Initial thumbnail width in pixels (adjustable with the size slider).
    pub cover_size: u32,
    /// Minimum gap in pixels kept between the tooltip and the viewport edge.
    pub tooltip_margin: u32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "Library".to_string(),
            cover_size: 120,
            tooltip_margin: 12,
        }
    }
}

/// Ordering of tiles in the mosaic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MosaicMode {
    /// Library order: author, series, series index.
    Flat,
    /// Ascending cover hue, for a gradient.
    Colorful,
}

/// Wallpaper mosaic settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MosaicConfig {
    /// Width of one cover tile; the height follows the average cover aspect.
    pub tile_width: u32,
    pub mode: MosaicMode,
    /// Output file name, relative to the output directory.
    pub file: String,
    pub quality: u32,
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            tile_width: 100,
            mode: MosaicMode::Flat,
            file: "mosaic_wallpaper.jpg".to_string(),
            quality: 95,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel cover workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Color configuration for light and dark modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorConfig {
    pub light: ColorScheme,
    pub dark: ColorScheme,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            light: ColorScheme::default_light(),
            dark: ColorScheme::default_dark(),
        }
    }
}

/// Individual color scheme (light or dark).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorScheme {
    pub background: String,
    pub text: String,
    /// Section headings, tooltip secondary lines.
    pub text_muted: String,
    pub border: String,
    /// Read badge and active toggle buttons.
    pub accent: String,
}

impl ColorScheme {
    pub fn default_light() -> Self {
        Self {
            background: "#ffffff".to_string(),
            text: "#111111".to_string(),
            text_muted: "#666666".to_string(),
            border: "#e0e0e0".to_string(),
            accent: "#2e7d32".to_string(),
        }
    }

    pub fn default_dark() -> Self {
        Self {
            background: "#121212".to_string(),
            text: "#eeeeee".to_string(),
            text_muted: "#999999".to_string(),
            border: "#333333".to_string(),
            accent: "#66bb6a".to_string(),
        }
    }
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::default_light()
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ShelfConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ShelfConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ShelfConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load configuration.
///
/// An explicit path must exist. Without one, `calibre-shelf.toml` in
/// `working_dir` is used when present and stock defaults otherwise.
pub fn load_config(
    explicit: Option<&Path>,
    working_dir: &Path,
) -> Result<ShelfConfig, ConfigError> {
    let overlay = match explicit {
        Some(path) => {
            Some(load_raw_config(path)?.ok_or_else(|| ConfigError::NotFound(path.to_path_buf()))?)
        }
        None => load_raw_config(&working_dir.join(DEFAULT_CONFIG_FILE))?,
    };
    resolve_config(stock_defaults_value(), overlay)
}

/// Returns a fully-commented stock config file with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# calibre-shelf configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Save as calibre-shelf.toml in the directory you run calibre-shelf from,
# or pass the path with --config. Command-line flags override these values.
# Unknown keys will cause an error.

# Calibre library directory (the one that contains metadata.db).
library_root = "Calibre Library"

# ---------------------------------------------------------------------------
# Cover processing
# ---------------------------------------------------------------------------
[covers]
# Covers wider than this are scaled down proportionally. Never upscaled.
max_width = 400

# Lossy encoding quality (1 = worst, 100 = best).
quality = 85

# Output format: "jpeg" or "avif".
format = "jpeg"

# ---------------------------------------------------------------------------
# Export files (relative to --output)
# ---------------------------------------------------------------------------
[export]
books_file = "books.json"
languages_file = "languages.json"
csv_file = "calibre_books_export.csv"
covers_dir = "covers"

# Label of the Calibre yes/no custom column that marks a book as read.
read_column = "read"

# ---------------------------------------------------------------------------
# Viewer page
# ---------------------------------------------------------------------------
[viewer]
title = "Library"

# Initial thumbnail width in pixels (the page has a slider to change it).
cover_size = 120

# Minimum gap in pixels between the hover tooltip and the viewport edge.
tooltip_margin = 12

# ---------------------------------------------------------------------------
# Colors - Light mode (prefers-color-scheme: light)
# ---------------------------------------------------------------------------
[colors.light]
background = "#ffffff"
text = "#111111"
text_muted = "#666666"    # Section headings, tooltip details
border = "#e0e0e0"
accent = "#2e7d32"        # Read badge, active buttons

# ---------------------------------------------------------------------------
# Colors - Dark mode (prefers-color-scheme: dark)
# ---------------------------------------------------------------------------
[colors.dark]
background = "#121212"
text = "#eeeeee"
text_muted = "#999999"
border = "#333333"
accent = "#66bb6a"

# ---------------------------------------------------------------------------
# Wallpaper mosaic
# ---------------------------------------------------------------------------
[mosaic]
# Width of each cover tile; the height follows the average cover aspect ratio.
tile_width = 100

# "flat" keeps library order, "colorful" sorts covers by hue.
mode = "flat"

file = "mosaic_wallpaper.jpg"
quality = 95

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel cover workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

/// Generate CSS custom properties from color config.
pub fn generate_color_css(colors: &ColorConfig) -> String {
    format!(
        r#":root {{
    --color-bg: {light_bg};
    --color-text: {light_text};
    --color-text-muted: {light_text_muted};
    --color-border: {light_border};
    --color-accent: {light_accent};
}}

@media (prefers-color-scheme: dark) {{
    :root {{
        --color-bg: {dark_bg};
        --color-text: {dark_text};
        --color-text-muted: {dark_text_muted};
        --color-border: {dark_border};
        --color-accent: {dark_accent};
    }}
}}"#,
        light_bg = colors.light.background,
        light_text = colors.light.text,
        light_text_muted = colors.light.text_muted,
        light_border = colors.light.border,
        light_accent = colors.light.accent,
        dark_bg = colors.dark.background,
        dark_text = colors.dark.text,
        dark_text_muted = colors.dark.text_muted,
        dark_border = colors.dark.border,
        dark_accent = colors.dark.accent,
    )
}
