//! Config file loading for CLI defaults.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use pudly::download::constants::{MAX_CONCURRENCY, MAX_TIMEOUT_SECS, MIN_CONCURRENCY};

/// Values read from `config.toml`. Every field is optional; CLI flags win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Default directory downloads are written into.
    pub download_dir: Option<PathBuf>,
    /// Default number of parallel downloads.
    pub concurrency: Option<usize>,
    /// Default chunk size in bytes.
    pub chunk_size: Option<usize>,
    /// Default connect/read timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Default log verbosity.
    pub verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Checks values against the ranges the CLI accepts.
    pub fn validate(&self) -> Result<()> {
        if let Some(concurrency) = self.concurrency
            && !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency)
        {
            bail!(
                "Invalid config value for `concurrency`: {concurrency}. Expected range: {MIN_CONCURRENCY}..={MAX_CONCURRENCY}"
            );
        }
        if self.chunk_size == Some(0) {
            bail!("Invalid config value for `chunk_size`: 0. Expected at least 1 byte");
        }
        if let Some(timeout_secs) = self.timeout_secs
            && !(1..=MAX_TIMEOUT_SECS).contains(&timeout_secs)
        {
            bail!(
                "Invalid config value for `timeout_secs`: {timeout_secs}. Expected range: 1..={MAX_TIMEOUT_SECS}"
            );
        }
        Ok(())
    }
}

/// Verbosity labels accepted in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// The `EnvFilter` directive this setting stands for.
    #[must_use]
    pub fn filter_directive(self) -> &'static str {
        match self {
            Self::Default => "info",
            Self::Verbose => "debug",
            Self::Quiet => "error",
            Self::Debug => "trace",
        }
    }
}

impl FromStr for VerbositySetting {
    type Err = anyhow::Error;

    fn from_str(label: &str) -> Result<Self> {
        Ok(match label {
            "default" => Self::Default,
            "verbose" => Self::Verbose,
            "quiet" => Self::Quiet,
            "debug" => Self::Debug,
            other => bail!("unknown verbosity '{other}' (expected default, verbose, quiet or debug)"),
        })
    }
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/pudly/config.toml`
/// 2. `$HOME/.config/pudly/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    let base = match non_empty_env("XDG_CONFIG_HOME") {
        Some(config_home) => PathBuf::from(config_home),
        None => PathBuf::from(non_empty_env("HOME")?).join(".config"),
    };
    Some(base.join("pudly").join("config.toml"))
}

fn non_empty_env(name: &str) -> Option<OsString> {
    env::var_os(name).filter(|value| !value.is_empty())
}

/// Loads `explicit` if given (it must exist), else the default path if it
/// exists. Missing default file means "no overrides".
pub fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    if let Some(path) = explicit {
        return read_file_config(path);
    }
    match resolve_default_config_path() {
        Some(path) if path.exists() => read_file_config(&path),
        _ => Ok(FileConfig::default()),
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_number, raw_line) in (1_usize..).zip(raw.lines()) {
        let line = without_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((key, value)) = line.split_once('=').map(|(k, v)| (k.trim(), v.trim())) else {
            bail!("Invalid config syntax on line {line_number}: expected key = value");
        };
        let invalid = || format!("Invalid `{key}` value on line {line_number}");

        match key {
            "download_dir" => {
                cfg.download_dir = Some(PathBuf::from(unquote(value).with_context(invalid)?));
            }
            "concurrency" => {
                cfg.concurrency = Some(parse_number(value).with_context(invalid)?);
            }
            "chunk_size" => {
                cfg.chunk_size = Some(parse_number(value).with_context(invalid)?);
            }
            "timeout_secs" => {
                cfg.timeout_secs = Some(parse_number(value).with_context(invalid)?);
            }
            "verbosity" => {
                let label = unquote(value).with_context(invalid)?;
                cfg.verbosity = Some(label.parse().with_context(invalid)?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_number}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

/// Cuts a `#` comment off `line`, ignoring `#` inside double quotes.
fn without_comment(line: &str) -> &str {
    let mut quoted = false;
    let comment_start = line.char_indices().find_map(|(index, ch)| {
        match ch {
            '"' => quoted = !quoted,
            '#' if !quoted => return Some(index),
            _ => {}
        }
        None
    });
    comment_start.map_or(line, |index| &line[..index])
}

fn unquote(value: &str) -> Result<&str> {
    value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .with_context(|| format!("expected a double-quoted string, got {value}"))
}

fn parse_number<T>(value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if value.starts_with('-') {
        bail!("expected a non-negative integer, got {value}");
    }
    value
        .parse()
        .with_context(|| format!("expected an integer, got '{value}'"))
}
