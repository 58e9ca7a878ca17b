//! Saved default flags.
//!
//! Defaults live in a global rc file and an optional `.mdvisrc` in the
//! working directory. Both hold command-line flags, one or more per line,
//! with `#` comments.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

const APP_DIR: &str = "mdvis";
const LOCAL_FILE: &str = ".mdvisrc";

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeMode {
    Auto,
    Light,
    Dark,
}

impl ThemeMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "auto" => Some(Self::Auto),
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }
}

/// Flags that can be saved as defaults.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub debug: bool,
    pub no_images: bool,
    pub force_half_cell: bool,
    pub perf: bool,
    pub theme: Option<ThemeMode>,
    pub font_size: Option<u16>,
    pub debug_log: Option<PathBuf>,
}

impl ConfigFlags {
    /// Merge `other` over `self`: switches are or-ed, valued options from
    /// `other` win.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            debug: self.debug || other.debug,
            no_images: self.no_images || other.no_images,
            force_half_cell: self.force_half_cell || other.force_half_cell,
            perf: self.perf || other.perf,
            theme: other.theme.or(self.theme),
            font_size: other.font_size.or(self.font_size),
            debug_log: other.debug_log.clone().or_else(|| self.debug_log.clone()),
        }
    }

    /// The flags as command-line tokens, in a stable order.
    pub fn to_tokens(&self) -> Vec<String> {
        let mut tokens = Vec::new();
        let switches = [
            (self.debug, "--debug"),
            (self.no_images, "--no-images"),
            (self.force_half_cell, "--force-half-cell"),
            (self.perf, "--perf"),
        ];
        tokens.extend(
            switches
                .iter()
                .filter(|(on, _)| *on)
                .map(|(_, flag)| (*flag).to_string()),
        );
        if let Some(theme) = self.theme {
            tokens.push(format!("--theme={}", theme.as_str()));
        }
        if let Some(size) = self.font_size {
            tokens.push(format!("--font-size={size}"));
        }
        if let Some(path) = &self.debug_log {
            tokens.push(format!("--debug-log={}", path.display()));
        }
        tokens
    }
}

/// Platform config file: `%APPDATA%`, `~/Library/Application Support` or
/// the XDG config dir.
pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join(APP_DIR).join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join(APP_DIR)
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join(APP_DIR).join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config").join(APP_DIR).join("config");
        }
    }

    PathBuf::from(LOCAL_FILE)
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(LOCAL_FILE)
}

/// Read saved flags; a missing file yields the defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(str::split_whitespace)
        .map(ToOwned::to_owned)
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

/// Write `flags` to `path`, creating parent directories.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut content = String::from("# mdvis defaults (saved with --save)\n");
    for token in flags.to_tokens() {
        let _ = writeln!(content, "{token}");
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write config {}", path.display()))
}

/// Remove saved flags if present.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be removed.
pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick the saveable flags out of a token list.
///
/// Unknown tokens (the file name, `--save`) are skipped. Both `--flag value`
/// and `--flag=value` are accepted for valued options.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut rest = tokens.iter();
    while let Some(token) = rest.next() {
        let (name, inline) = match token.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (token.as_str(), None),
        };
        match name {
            "--debug" => flags.debug = true,
            "--no-images" => flags.no_images = true,
            "--force-half-cell" => flags.force_half_cell = true,
            "--perf" => flags.perf = true,
            "--theme" | "--font-size" | "--debug-log" => {
                let Some(value) = inline.or_else(|| rest.next().map(String::as_str)) else {
                    tracing::warn!(flag = name, "flag is missing its value");
                    continue;
                };
                apply_value(&mut flags, name, value);
            }
            _ => {}
        }
    }
    flags
}

fn apply_value(flags: &mut ConfigFlags, name: &str, value: &str) {
    match name {
        "--theme" => match ThemeMode::parse(value) {
            Some(theme) => flags.theme = Some(theme),
            None => tracing::warn!(value, "ignoring unknown theme"),
        },
        "--font-size" => match value.parse::<u16>() {
            Ok(size) => flags.font_size = Some(size),
            Err(err) => tracing::warn!(value, %err, "ignoring invalid font size"),
        },
        "--debug-log" => flags.debug_log = Some(PathBuf::from(value)),
        _ => {}
    }
}
