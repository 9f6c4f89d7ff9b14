//! Daybook configuration.

use std::path::{Path, PathBuf};

use chrono::Weekday;
use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{DaybookError, DaybookResult};
use crate::event::EventTimezone;
use crate::timezone::TimeZoneConverter;

static DEFAULT_DATA_DIR: &str = "~/.local/share/daybook";

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn is_default_data_dir(p: &PathBuf) -> bool {
    *p == default_data_dir()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl WeekStart {
    pub fn weekday(&self) -> Weekday {
        match self {
            WeekStart::Sunday => Weekday::Sun,
            WeekStart::Monday => Weekday::Mon,
        }
    }
}

/// Configuration at ~/.config/daybook/config.toml
///
/// Every key can be overridden with a `DAYBOOK_`-prefixed environment
/// variable, e.g. `DAYBOOK_DATA_DIR`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaybookConfig {
    #[serde(default = "default_data_dir", skip_serializing_if = "is_default_data_dir")]
    pub data_dir: PathBuf,

    /// IANA zone name used as "local" instead of the system zone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_timezone: Option<String>,

    /// Zone preselected for new events
    #[serde(default)]
    pub default_timezone: EventTimezone,

    #[serde(default)]
    pub week_start: WeekStart,
}

impl Default for DaybookConfig {
    fn default() -> Self {
        DaybookConfig {
            data_dir: default_data_dir(),
            local_timezone: None,
            default_timezone: EventTimezone::default(),
            week_start: WeekStart::default(),
        }
    }
}

impl DaybookConfig {
    pub fn config_path() -> DaybookResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| DaybookError::Config("Could not determine config directory".into()))?
            .join("daybook");

        Ok(config_dir.join("config.toml"))
    }

    /// Load the config file, creating a commented default on first use.
    pub fn load() -> DaybookResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    /// Load from a specific file (missing is fine), then apply environment
    /// overrides.
    pub fn load_from(path: &Path) -> DaybookResult<Self> {
        tracing::debug!(path = %path.display(), "loading config");

        Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(Environment::with_prefix("DAYBOOK"))
            .build()
            .map_err(|e| DaybookError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| DaybookError::Config(e.to_string()))
    }

    pub fn save_to(&self, path: &Path) -> DaybookResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| DaybookError::Config(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
            .map_err(|e| DaybookError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> DaybookResult<()> {
        let contents = format!(
            "\
# daybook configuration

# Where events are stored:
# data_dir = \"{}\"

# Zone treated as \"local\" (defaults to the system zone):
# local_timezone = \"Europe/Berlin\"

# Zone for new events, \"local\" or \"JST\":
# default_timezone = \"local\"

# First day of the week in month and week grids, \"sunday\" or \"monday\":
# week_start = \"sunday\"
",
            DEFAULT_DATA_DIR
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DaybookError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| DaybookError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    /// Data directory with `~` expanded.
    pub fn data_path(&self) -> PathBuf {
        let full_path_str = shellexpand::tilde(&self.data_dir.to_string_lossy()).into_owned();

        PathBuf::from(full_path_str)
    }

    pub fn events_path(&self) -> PathBuf {
        self.data_path().join("events.json")
    }

    /// Converter for the configured local zone, or the system zone.
    pub fn converter(&self) -> DaybookResult<TimeZoneConverter> {
        match &self.local_timezone {
            Some(name) => name
                .parse::<Tz>()
                .map(TimeZoneConverter::new)
                .map_err(|_| DaybookError::Config(format!("Unknown timezone '{name}'"))),
            None => Ok(TimeZoneConverter::system()),
        }
    }
}
