//! trackview - Terminal Annotation Track Viewer
//!
//! A terminal-based viewer for annotation tracks (motifs, modules, numeric
//! signals) laid out along DNA sequences.
//!
//! ## Usage
//!
//! ```bash
//! trackview <session.yaml>
//! trackview --settings my_settings.yaml --expanded <session.yaml>
//! trackview -o - --width 120 <session.yaml>  # Print the layout, no TUI
//! ```
//!
//! ## Navigation (Vim-style)
//!
//! - `h/l`: Scroll left/right
//! - `j/k`: Next/previous sequence
//! - `+/-`: Zoom in/out
//! - `:q`: Quit
//! - `?`: Help

// Use jemalloc for better memory management (returns memory to OS)
#[cfg(not(windows))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use rand::Rng;

use trackview::controller::run_app_with_loading;
use trackview::loader::SessionLoader;
use trackview::model::{AppState, DataStore};
use trackview::report::write_layout_report;
use trackview::session::load_session;
use trackview::settings::{default_settings_path, load_settings, Settings};
use trackview::view::TrackView;

/// Window width used before the terminal size is known.
const DEFAULT_WIDTH: u16 = 100;

/// trackview - A Vim-style terminal viewer for genomic annotation tracks
///
/// When run without -o/--output, opens an interactive TUI viewer.
/// With -o/--output, runs in CLI mode and writes the layout to a file (or stdout with "-").
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Session file listing sequences and tracks (YAML)
    session: PathBuf,

    /// Settings file (default: the user config directory)
    #[arg(short = 's', long = "settings")]
    settings: Option<PathBuf>,

    /// Start with every region track expanded into rows
    #[arg(short = 'e', long = "expanded")]
    expanded: bool,

    /// Sequence to select first
    #[arg(long = "sequence")]
    sequence: Option<String>,

    /// Output file (enables CLI mode). Use "-" for stdout.
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Window width in columns for CLI mode
    #[arg(short = 'w', long = "width", default_value_t = DEFAULT_WIDTH)]
    width: u16,
}

/// Sends log output to a file in the temp directory, the terminal being
/// owned by the TUI. `RUST_LOG` selects the level.
fn init_logging() -> Option<PathBuf> {
    let suffix: u32 = rand::rng().random();
    let path = std::env::temp_dir().join(format!("trackview-{:08x}.log", suffix));
    let file = File::create(&path).ok()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Some(path)
}

fn read_settings(path: Option<&Path>, expanded: bool) -> (Settings, PathBuf) {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_settings_path);
    let mut settings = load_settings(&path);
    if expanded {
        settings.display.expanded = true;
    }
    (settings, path)
}

/// Runs CLI mode: load the session and write its layout to `output`.
fn run_cli_mode(args: &Args, settings: Settings) -> Result<()> {
    let store = load_session(&args.session)
        .with_context(|| format!("Failed to load session {:?}", args.session))?;
    let mut view = TrackView::new(store, settings, f64::from(args.width.max(1)));

    if args.output.as_deref() == Some("-") {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        write_layout_report(&mut view, &mut handle)?;
    } else if let Some(output) = &args.output {
        let mut file = File::create(output).with_context(|| format!("Failed to create {}", output))?;
        write_layout_report(&mut view, &mut file)?;
        file.flush()?;
        eprintln!("Wrote layout of {} sequences to {}", view.store().sequences().len(), output);
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(log_path) = init_logging() {
        log::info!("trackview {} logging to {:?}", env!("CARGO_PKG_VERSION"), log_path);
    }

    let (settings, settings_path) = read_settings(args.settings.as_deref(), args.expanded);

    // CLI mode: output to file/stdout
    if args.output.is_some() {
        return run_cli_mode(&args, settings);
    }

    // TUI mode: the session loads in the background while the UI starts
    let loader = SessionLoader::spawn(args.session.clone())
        .context("Failed to start the session loader")?;
    let view = TrackView::new(DataStore::new(), settings, f64::from(DEFAULT_WIDTH));
    let mut state = AppState::new(view);
    state.settings_path = Some(settings_path);
    state.initial_sequence = args.sequence;

    run_app_with_loading(state, loader)
}
