//! mdvis - a terminal markdown visualizer.
//!
//! # Usage
//!
//! ```bash
//! mdvis README.md
//! mdvis --font-size 18 --theme light README.md
//! mdvis --debug --debug-log frames.log README.md
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tracing_subscriber::EnvFilter;

use mdvis::app::App;
use mdvis::config::{
    ConfigFlags, ThemeMode, clear_config_flags, global_config_path, load_config_flags,
    local_override_path, parse_flag_tokens, save_config_flags,
};
use mdvis::perf;
use mdvis::ui::style::{
    BASE_FONT_SIZE, Palette, Theme, parse_osc11_reply, supports_truecolor, theme_from_rgb,
};

/// A terminal markdown visualizer with flexbox layout and inline images
#[derive(Parser, Debug)]
#[command(name = "mdvis", version, about, long_about = None, disable_version_flag = true)]
struct Cli {
    /// Markdown file to view
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Show the debug overlay (toggle with Backspace)
    #[arg(long)]
    debug: bool,

    /// Color theme; auto queries the terminal background
    #[arg(long, value_enum)]
    theme: Option<ThemeMode>,

    /// Base font size used to size lines and headings
    #[arg(long, value_name = "N")]
    font_size: Option<u16>,

    /// Disable inline images (show placeholders only)
    #[arg(long)]
    no_images: bool,

    /// Force image rendering to use half-cell fallback mode
    #[arg(long)]
    force_half_cell: bool,

    /// Log timing scopes
    #[arg(long)]
    perf: bool,

    /// Write debug-level logs to a file
    #[arg(long, value_name = "PATH")]
    debug_log: Option<PathBuf>,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,

    /// Print version
    #[arg(short = 'v', long, action = clap::ArgAction::Version)]
    version: Option<bool>,
}

// Query the terminal background using OSC 11.
// We talk to /dev/tty so the terminal responds even when stdout is piped.
// Non-Unix platforms skip the query: the stdin fallback leaves a reader
// thread blocking console input.
#[cfg(not(unix))]
fn query_terminal_background() -> std::io::Result<Option<(u8, u8, u8)>> {
    Ok(None)
}

#[cfg(unix)]
fn query_terminal_background() -> std::io::Result<Option<(u8, u8, u8)>> {
    use std::io::{Read, Write};
    use std::sync::mpsc;

    let (tx, rx) = mpsc::channel();

    let mut io = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/tty")?;
    let mut reader = io.try_clone()?;

    // OSC 11 query: ESC ] 11 ; ? BEL
    io.write_all(b"\x1b]11;?\x07")?;
    io.flush()?;

    std::thread::spawn(move || {
        let mut buf = [0u8; 256];
        let mut collected = Vec::new();
        while let Ok(n) = reader.read(&mut buf) {
            if n == 0 {
                continue;
            }
            collected.extend_from_slice(&buf[..n]);
            if collected.contains(&b'\x07') || collected.windows(2).any(|w| w == b"\x1b\\") {
                let _ = tx.send(collected);
                break;
            }
        }
    });

    Ok(rx
        .recv_timeout(Duration::from_millis(75))
        .ok()
        .and_then(|bytes| parse_osc11_reply(&String::from_utf8_lossy(&bytes))))
}

fn detect_theme() -> Option<Theme> {
    let _raw = enable_raw_mode();
    let result = query_terminal_background();
    let _ = disable_raw_mode();
    result.ok().flatten().map(|(r, g, b)| theme_from_rgb(r, g, b))
}

fn resolve_palette(mode: ThemeMode) -> Palette {
    let theme = match mode {
        ThemeMode::Light => Theme::Light,
        ThemeMode::Dark => Theme::Dark,
        ThemeMode::Auto => detect_theme().unwrap_or(Theme::Dark),
    };
    tracing::debug!(?mode, ?theme, "theme resolved");
    Palette::for_theme(theme)
}

/// Route logs to `debug_log` at debug level, or to stderr at warn level.
fn init_logging(debug_log: Option<&Path>, perf: bool) -> Result<()> {
    let level = if debug_log.is_some() {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    if perf {
        filter = filter.add_directive("mdvis::perf=info".parse()?);
    }

    match debug_log {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create debug log {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}

fn run(cli: Cli, raw_args: &[String]) -> Result<()> {
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(raw_args.get(1..).unwrap_or_default());

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    perf::set_enabled(effective.perf);
    let debug_log = effective
        .debug_log
        .clone()
        .or_else(|| std::env::var_os("MDVIS_DEBUG_LOG").map(PathBuf::from));
    init_logging(debug_log.as_deref(), effective.perf)?;
    tracing::debug!(?effective, "effective flags");

    // Verify file exists
    if !cli.file.is_file() {
        anyhow::bail!("File not found: {}", cli.file.display());
    }

    let palette = resolve_palette(effective.theme.unwrap_or(ThemeMode::Auto));
    let mut app = App::new(cli.file)
        .with_palette(palette)
        .with_font_size(effective.font_size.unwrap_or(BASE_FONT_SIZE))
        .with_debug(effective.debug)
        .with_images_enabled(!effective.no_images)
        .with_force_half_cell(effective.force_half_cell)
        .with_truecolor(supports_truecolor());

    app.run().context("Application error")
}

fn main() -> ExitCode {
    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = match Cli::try_parse_from(&raw_args) {
        Ok(cli) => cli,
        Err(err) => {
            // Help and version print to stdout and are not failures.
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(cli, &raw_args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
