use super::ui::ColorChoice;
use clap::ValueEnum;
use serde::Deserialize;
use snapclean::clean::RetainerSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Default)]
pub struct CliConfig {
    path: Option<PathBuf>,
    data: RawConfig,
    color: Option<ColorChoice>,
}

impl CliConfig {
    /// Loads `explicit`, or the default config file when it exists. An
    /// explicit path that cannot be read is an error; a missing default file
    /// just means defaults.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let (path, data) = match explicit {
            Some(path) => {
                let data = read_file(&path)?;
                (Some(path), data)
            }
            None => match default_config_path() {
                Some(path) if path.is_file() => {
                    let data = read_file(&path)?;
                    (Some(path), data)
                }
                _ => (None, RawConfig::default()),
            },
        };
        Self::from_raw(path, data)
    }

    fn from_raw(path: Option<PathBuf>, data: RawConfig) -> Result<Self, ConfigError> {
        let color = data
            .color
            .as_deref()
            .map(|value| {
                ColorChoice::from_str(value, true).map_err(|_| ConfigError::InvalidColor {
                    value: value.to_string(),
                })
            })
            .transpose()?;
        if data.output.suffix.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::EmptySuffix);
        }
        Ok(Self { path, data, color })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn color(&self) -> Option<ColorChoice> {
        self.color
    }

    pub fn suffix(&self) -> Option<&str> {
        self.data.output.suffix.as_deref()
    }

    /// `retainers.names` replaces the built-in set; `retainers.extra` adds to
    /// whichever set is in effect.
    pub fn retainers(&self) -> RetainerSet {
        let section = &self.data.retainers;
        let mut set = match &section.names {
            Some(names) => RetainerSet::new(names.iter().cloned()),
            None => RetainerSet::default(),
        };
        set.extend(section.extra.iter().cloned());
        set
    }
}

fn read_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    retainers: RetainerSection,
    #[serde(default)]
    output: OutputSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RetainerSection {
    names: Option<Vec<String>>,
    #[serde(default)]
    extra: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct OutputSection {
    suffix: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("color value '{value}' is invalid (expected auto, always or never)")]
    InvalidColor { value: String },
    #[error("output.suffix must not be empty")]
    EmptySuffix,
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("snapclean").join("config.toml"))
}
