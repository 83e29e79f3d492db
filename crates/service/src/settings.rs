//! Settings resolution.
//!
//! Settings come from the first source in an ordered chain that yields a valid
//! result: command-line arguments, then the JSON config file, then built-in
//! defaults. A source with missing or invalid values is skipped, never fatal.

use std::fmt;
use std::path::{Path, PathBuf};

use power_core::config::{DEFAULT_INTERVAL_MINUTES, DEFAULT_OUTPUT_FOLDER};
use power_core::{Error, Result, Settings};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, warn};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "appsettings.json";

/// One strategy in the resolution chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsSource {
    /// Positional `<OUTPUT_FOLDER> <INTERVAL_MINUTES>` arguments, unparsed.
    CommandLine {
        /// Raw output folder argument.
        output_folder: Option<String>,
        /// Raw interval argument.
        interval_minutes: Option<String>,
    },
    /// JSON file with `OutputFolder` and `IntervalMinutes` keys.
    ConfigFile(PathBuf),
    /// `<base>/reports` every 15 minutes; the folder is created if missing.
    Defaults {
        /// Directory the default output folder lives under.
        base_dir: PathBuf,
    },
}

impl fmt::Display for SettingsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsSource::CommandLine { .. } => write!(f, "command line"),
            SettingsSource::ConfigFile(path) => write!(f, "config file {}", path.display()),
            SettingsSource::Defaults { .. } => write!(f, "defaults"),
        }
    }
}

impl SettingsSource {
    /// Settings from this source, or `None` if it has no valid pair.
    pub fn resolve(&self) -> Option<Settings> {
        match self {
            SettingsSource::CommandLine {
                output_folder,
                interval_minutes,
            } => resolve_args(output_folder.as_deref(), interval_minutes.as_deref()),
            SettingsSource::ConfigFile(path) => resolve_file(path),
            SettingsSource::Defaults { base_dir } => resolve_defaults(base_dir),
        }
    }
}

/// Settings together with the source that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSettings {
    /// The winning settings.
    pub settings: Settings,
    /// Where they came from.
    pub source: SettingsSource,
}

/// Ordered list of settings sources; the first valid one wins.
#[derive(Debug, Clone)]
pub struct SettingsChain {
    sources: Vec<SettingsSource>,
}

impl SettingsChain {
    /// Create a chain from explicit sources.
    pub fn new(sources: Vec<SettingsSource>) -> Self {
        Self { sources }
    }

    /// Command line, then `config_file`, then defaults under `base_dir`.
    pub fn standard(
        output_folder: Option<String>,
        interval_minutes: Option<String>,
        config_file: impl Into<PathBuf>,
        base_dir: impl Into<PathBuf>,
    ) -> Self {
        Self::new(vec![
            SettingsSource::CommandLine {
                output_folder,
                interval_minutes,
            },
            SettingsSource::ConfigFile(config_file.into()),
            SettingsSource::Defaults {
                base_dir: base_dir.into(),
            },
        ])
    }

    /// Walk the chain and return the first valid settings.
    pub fn resolve(&self) -> Result<ResolvedSettings> {
        self.sources
            .iter()
            .find_map(|source| {
                source.resolve().map(|settings| ResolvedSettings {
                    settings,
                    source: source.clone(),
                })
            })
            .ok_or_else(|| Error::config("no settings source produced a valid output folder and interval"))
    }
}

/// Raw contents of the config file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ConfigFile {
    output_folder: Option<String>,
    interval_minutes: Option<Value>,
}

fn resolve_args(folder: Option<&str>, interval: Option<&str>) -> Option<Settings> {
    let (folder, interval) = match (folder, interval) {
        (Some(folder), Some(interval)) => (folder, interval),
        (None, None) => return None,
        _ => {
            warn!("Both <OUTPUT_FOLDER> and <INTERVAL_MINUTES> are required; ignoring command-line settings");
            return None;
        }
    };

    let settings = parse_interval_str(interval).and_then(|minutes| validate(folder, minutes));
    if settings.is_none() {
        warn!(
            "Ignoring command-line settings: folder \"{}\" must exist and interval \"{}\" must be a positive integer",
            folder, interval
        );
    }
    settings
}

fn resolve_file(path: &Path) -> Option<Settings> {
    if !path.is_file() {
        debug!("Config file {} not found", path.display());
        return None;
    }

    let parsed = std::fs::read_to_string(path)
        .map_err(Error::from)
        .and_then(|text| serde_json::from_str::<ConfigFile>(&text).map_err(Error::from));
    let file = match parsed {
        Ok(file) => file,
        Err(e) => {
            warn!("Ignoring config file {}: {}", path.display(), e);
            return None;
        }
    };

    let settings = match (file.output_folder.as_deref(), file.interval_minutes.as_ref()) {
        (Some(folder), Some(interval)) => {
            parse_interval_value(interval).and_then(|minutes| validate(folder, minutes))
        }
        _ => None,
    };
    if settings.is_none() {
        warn!(
            "Ignoring config file {}: OutputFolder must be an existing directory and IntervalMinutes a positive integer",
            path.display()
        );
    }
    settings
}

fn resolve_defaults(base_dir: &Path) -> Option<Settings> {
    let folder = base_dir.join(DEFAULT_OUTPUT_FOLDER);
    if let Err(e) = std::fs::create_dir_all(&folder) {
        error!("Could not create default output folder {}: {}", folder.display(), e);
        return None;
    }
    Some(Settings::new(folder, DEFAULT_INTERVAL_MINUTES))
}

fn validate(folder: &str, interval_minutes: u32) -> Option<Settings> {
    if folder.trim().is_empty() || interval_minutes == 0 {
        return None;
    }
    let path = PathBuf::from(folder);
    path.is_dir().then(|| Settings::new(path, interval_minutes))
}

fn parse_interval_str(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|&minutes| minutes > 0)
}

fn parse_interval_value(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .and_then(|minutes| u32::try_from(minutes).ok())
            .filter(|&minutes| minutes > 0),
        Value::String(s) => parse_interval_str(s),
        _ => None,
    }
}
