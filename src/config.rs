//! Configuration management for the `meteoprofiles` application
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::MeteoError;
use crate::models::Station;
use crate::plot::ImageFormat;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for the `meteoprofiles` application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeteoConfig {
    /// Retrieval command configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Chart output configuration
    #[serde(default)]
    pub output: OutputConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Default application settings
    #[serde(default)]
    pub defaults: DefaultsConfig,
    /// Stations in addition to the built-in table
    #[serde(default)]
    pub stations: Vec<Station>,
}

/// Retrieval command settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Executable invoked to retrieve observations
    #[serde(default = "default_retrieval_command")]
    pub command: String,
    /// Time allowed for one retrieval before the process is killed
    #[serde(default = "default_retrieval_timeout")]
    pub timeout_seconds: u64,
    /// Arguments appended to every invocation
    #[serde(default)]
    pub extra_args: Vec<String>,
}

/// Chart output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory charts are written to
    #[serde(default = "default_output_directory")]
    pub directory: String,
    /// Image format (png or svg)
    #[serde(default = "default_output_format")]
    pub format: String,
    /// Image width in pixels
    #[serde(default = "default_output_width")]
    pub width: u32,
    /// Image height in pixels
    #[serde(default = "default_output_height")]
    pub height: u32,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Default application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Station used when none is given on the command line
    #[serde(default = "default_station")]
    pub station: String,
    /// Lower altitude bound in m a.s.l.
    #[serde(default)]
    pub lower_altitude_m: Option<f64>,
    /// Upper altitude bound in m a.s.l.
    #[serde(default)]
    pub upper_altitude_m: Option<f64>,
}

// Default value functions
fn default_retrieval_command() -> String {
    "dwh_retrieve".to_string()
}

fn default_retrieval_timeout() -> u64 {
    120
}

fn default_output_directory() -> String {
    "plots".to_string()
}

fn default_output_format() -> String {
    "png".to_string()
}

fn default_output_width() -> u32 {
    1200
}

fn default_output_height() -> u32 {
    800
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_station() -> String {
    "PAY".to_string()
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            command: default_retrieval_command(),
            timeout_seconds: default_retrieval_timeout(),
            extra_args: Vec::new(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            format: default_output_format(),
            width: default_output_width(),
            height: default_output_height(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            station: default_station(),
            lower_altitude_m: None,
            upper_altitude_m: None,
        }
    }
}

impl Default for MeteoConfig {
    fn default() -> Self {
        Self {
            retrieval: RetrievalConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
            defaults: DefaultsConfig::default(),
            stations: Vec::new(),
        }
    }
}

impl MeteoConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // An explicitly given file must exist, the default location is optional
        let explicit = config_path.is_some();
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if explicit && !config_file.exists() {
            return Err(MeteoError::config(format!(
                "config file {} does not exist",
                config_file.display()
            ))
            .into());
        }

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Add environment variable overrides with METEOPROFILES_ prefix
        builder = builder.add_source(
            Environment::with_prefix("METEOPROFILES")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: MeteoConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        // Apply defaults for missing values
        config.apply_defaults();

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("meteoprofiles").join("config.toml"))
    }

    /// Apply default values to empty configuration fields
    pub fn apply_defaults(&mut self) {
        if self.retrieval.command.is_empty() {
            self.retrieval.command = default_retrieval_command();
        }
        if self.retrieval.timeout_seconds == 0 {
            self.retrieval.timeout_seconds = default_retrieval_timeout();
        }
        if self.output.directory.is_empty() {
            self.output.directory = default_output_directory();
        }
        if self.output.format.is_empty() {
            self.output.format = default_output_format();
        }
        if self.output.width == 0 {
            self.output.width = default_output_width();
        }
        if self.output.height == 0 {
            self.output.height = default_output_height();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.defaults.station.is_empty() {
            self.defaults.station = default_station();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.retrieval.timeout_seconds > 600 {
            return Err(MeteoError::config("Retrieval timeout cannot exceed 600 seconds").into());
        }

        if !(200..=10_000).contains(&self.output.width) || !(200..=10_000).contains(&self.output.height) {
            return Err(MeteoError::config(
                "Output width and height must be between 200 and 10000 pixels",
            )
            .into());
        }

        if let (Some(lower), Some(upper)) = (self.defaults.lower_altitude_m, self.defaults.upper_altitude_m) {
            if lower > upper {
                return Err(MeteoError::config(format!(
                    "Default lower altitude {lower} m is above upper altitude {upper} m"
                ))
                .into());
            }
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(MeteoError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "compact"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(MeteoError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        self.image_format()?;

        if self.retrieval.command.trim().is_empty() {
            return Err(MeteoError::config("Retrieval command cannot be blank").into());
        }

        Ok(())
    }

    /// Configured image format
    pub fn image_format(&self) -> Result<ImageFormat> {
        self.output
            .format
            .parse::<ImageFormat>()
            .map_err(|e| MeteoError::config(e.to_string()).into())
    }
}
