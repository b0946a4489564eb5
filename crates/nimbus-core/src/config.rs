use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    pub config_dir: PathBuf,

    /// Weather widget settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Durable store settings
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Display unit as typed by the user ("celsius" or "fahrenheit").
    ///
    /// Kept as text so an unknown value degrades the temperature display
    /// instead of failing the whole config parse.
    #[serde(default = "default_temperature_unit")]
    pub temperature_unit: String,

    /// Minutes after a fetch before a background refresh is due
    #[serde(default = "default_fresh_minutes")]
    pub fresh_minutes: u32,

    /// Minutes after a fetch before the record stops being shown as current
    #[serde(default = "default_hard_minutes")]
    pub hard_minutes: u32,

    /// Minutes after a fetch that sunrise/sunset stay usable
    #[serde(default = "default_sun_minutes")]
    pub sun_minutes: u32,

    /// Whether the environment may use location access for refreshes
    #[serde(default = "default_location_enabled")]
    pub location_enabled: bool,
}

fn default_temperature_unit() -> String {
    "celsius".to_string()
}

fn default_fresh_minutes() -> u32 {
    15
}

fn default_hard_minutes() -> u32 {
    120
}

fn default_sun_minutes() -> u32 {
    24 * 60
}

fn default_location_enabled() -> bool {
    true
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            temperature_unit: default_temperature_unit(),
            fresh_minutes: default_fresh_minutes(),
            hard_minutes: default_hard_minutes(),
            sun_minutes: default_sun_minutes(),
            location_enabled: default_location_enabled(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file name, relative to the config directory
    #[serde(default = "default_database_file")]
    pub database_file: String,
}

fn default_database_file() -> String {
    "weather.db".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_file: default_database_file(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("nimbus");

        Self {
            config_dir,
            weather: WeatherConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, creating default if it doesn't exist
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(config_path)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration from the default location and validate it
    ///
    /// Fails on validation errors; warnings are logged.
    pub fn load_validated() -> std::result::Result<(Self, ValidationResult), ConfigError> {
        let path = Self::config_path().map_err(|e| ConfigError::NotFound(e.to_string()))?;
        Self::load_validated_from(&path)
    }

    /// Load configuration from an explicit path and validate it
    pub fn load_validated_from(
        config_path: &Path,
    ) -> std::result::Result<(Self, ValidationResult), ConfigError> {
        let config = Self::load_from(config_path)
            .map_err(|e| ConfigError::ParseError(format!("{:#}", e)))?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()));
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();
        let weather = &self.weather;

        match weather.temperature_unit.to_ascii_lowercase().as_str() {
            "celsius" | "fahrenheit" => {}
            other => result.add_warning(
                "weather.temperature_unit",
                format!("Unknown unit '{}', temperature will not be shown", other),
            ),
        }

        if weather.fresh_minutes == 0 {
            result.add_warning(
                "weather.fresh_minutes",
                "Every read will request a background refresh (0 minutes)",
            );
        }

        if weather.hard_minutes == 0 {
            result.add_error("weather.hard_minutes", "Hard expiration must be greater than 0");
        } else if weather.fresh_minutes > weather.hard_minutes {
            result.add_error(
                "weather.fresh_minutes",
                "Refresh horizon must not be later than the hard expiration",
            );
        }

        if weather.sun_minutes > 7 * 24 * 60 {
            result.add_warning(
                "weather.sun_minutes",
                "Sunrise/sunset kept for more than a week will drift noticeably",
            );
        }

        if self.storage.database_file.trim().is_empty() {
            result.add_error("storage.database_file", "Database file name is empty");
        }

        result
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Full path of the weather database
    pub fn database_path(&self) -> PathBuf {
        self.config_dir.join(&self.storage.database_file)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("nimbus");

        Ok(config_dir.join("config.toml"))
    }
}
