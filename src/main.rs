use clap::{Parser, Subcommand, ValueEnum};
use calibre_shelf::config::{self, MosaicMode, ShelfConfig};
use calibre_shelf::export::{self, ExportOptions};
use calibre_shelf::{generate, mosaic, output};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Shared flags for commands that export.
#[derive(clap::Args, Clone, Default)]
struct ExportArgs {
    /// Don't hash or re-encode covers; reuse covers already in the cache
    #[arg(long)]
    skip_covers: bool,

    /// Don't write the CSV export
    #[arg(long)]
    skip_csv: bool,

    /// Cover encoding quality (overrides config)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=100))]
    quality: Option<u32>,

    /// Maximum cover width in pixels (overrides config)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    max_width: Option<u32>,

    /// Ignore the cover cache and re-encode every cover
    #[arg(long)]
    force: bool,
}

impl ExportArgs {
    fn options(&self) -> ExportOptions {
        ExportOptions {
            skip_covers: self.skip_covers,
            skip_csv: self.skip_csv,
            force: self.force,
        }
    }

    fn apply(&self, config: &mut ShelfConfig) {
        if let Some(quality) = self.quality {
            config.covers.quality = quality;
        }
        if let Some(max_width) = self.max_width {
            config.covers.max_width = max_width;
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Library order
    Flat,
    /// Sorted by cover hue
    Colorful,
}

impl From<ModeArg> for MosaicMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Flat => MosaicMode::Flat,
            ModeArg::Colorful => MosaicMode::Colorful,
        }
    }
}

#[derive(clap::Args, Clone)]
struct MosaicArgs {
    /// Tile order (overrides config)
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Width of one cover tile in pixels (overrides config)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    tile_width: Option<u32>,

    /// Output image (default: <output>/mosaic_wallpaper.jpg)
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser)]
#[command(name = "calibre-shelf")]
#[command(about = "Export a Calibre library and browse it as a static cover shelf")]
#[command(long_about = "\
Export a Calibre library and browse it as a static cover shelf

Reads metadata.db from a Calibre library (never modifying it), writes
books.json, languages.json and a CSV export, resizes every cover, and
writes a single index.html that loads books.json when opened. Serve the
output directory with any static file server to browse it.

Output structure:

  site/
  ├── books.json                  # One record per book
  ├── languages.json              # Language codes in use
  ├── calibre_books_export.csv    # Same records as a spreadsheet
  ├── covers/                     # <id>.jpg, resized to max width
  │   └── .cache-manifest.json    # Skips unchanged covers next run
  └── index.html                  # The viewer (fetches books.json)

Run 'calibre-shelf gen-config' to generate a documented calibre-shelf.toml.")]
#[command(version)]
struct Cli {
    /// Calibre library directory (overrides config)
    #[arg(long, global = true)]
    library: Option<PathBuf>,

    /// Output directory
    #[arg(long, default_value = "site", global = true)]
    output: PathBuf,

    /// Config file (default: ./calibre-shelf.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Export books, languages, CSV and covers from the library
    Export(ExportArgs),
    /// Render index.html from an existing export
    Generate,
    /// Run the full pipeline: export → generate
    Build(ExportArgs),
    /// Tile exported covers into a 16:9 wallpaper
    Mosaic(MosaicArgs),
    /// Print a stock calibre-shelf.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let mut config = config::load_config(cli.config.as_deref(), &std::env::current_dir()?)?;
    if let Some(library) = &cli.library {
        config.library_root = library.clone();
    }

    match &cli.command {
        Command::Export(args) => {
            args.apply(&mut config);
            config.validate()?;
            run_export(&config, &cli.output, args)?;
        }
        Command::Generate => {
            run_generate(&config, &cli.output)?;
        }
        Command::Build(args) => {
            args.apply(&mut config);
            config.validate()?;
            println!("==> Stage 1: Exporting {}", config.library_root.display());
            run_export(&config, &cli.output, args)?;
            println!("==> Stage 2: Generating viewer → {}", cli.output.display());
            run_generate(&config, &cli.output)?;
            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Mosaic(args) => {
            if let Some(mode) = args.mode {
                config.mosaic.mode = mode.into();
            }
            if let Some(tile_width) = args.tile_width {
                config.mosaic.tile_width = tile_width;
            }
            let out = args
                .out
                .clone()
                .unwrap_or_else(|| cli.output.join(&config.mosaic.file));
            let summary = mosaic::create_mosaic(
                &cli.output.join(&config.export.books_file),
                &cli.output,
                &out,
                &config.mosaic,
            )?;
            output::print_mosaic_output(&summary);
        }
        Command::GenConfig => unreachable!("handled before config loading"),
    }

    Ok(())
}

fn run_export(
    config: &ShelfConfig,
    output_dir: &Path,
    args: &ExportArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    init_thread_pool(&config.processing);
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            output::print_process_event(&event);
        }
    });
    let result = export::export(config, output_dir, args.options(), Some(tx));
    printer
        .join()
        .map_err(|_| "progress printer thread panicked")?;
    output::print_export_summary(&result?, output_dir);
    Ok(())
}

fn run_generate(config: &ShelfConfig, output_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let books_path = output_dir.join(&config.export.books_file);
    let summary = generate::generate(&books_path, output_dir, config)?;
    output::print_generate_output(&summary, output_dir);
    Ok(())
}

/// Log to stderr. `RUST_LOG` wins; otherwise warn, raised by `-v`.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the config can only lower it.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
