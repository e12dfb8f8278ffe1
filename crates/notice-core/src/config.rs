use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Environment variable holding the weather provider API key.
pub const WEATHER_API_KEY_ENV: &str = "NOTICE_WEATHER_API_KEY";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
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

/// Unit system requested from the weather provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    /// Query-string value understood by the provider.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
        }
    }

    /// Temperature suffix used in notification text.
    pub fn temperature_suffix(&self) -> &'static str {
        match self {
            Self::Metric => "°C",
            Self::Imperial => "°F",
        }
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Weather polling settings
    #[serde(default)]
    pub weather: WeatherSettings,

    /// Notification store settings
    #[serde(default)]
    pub store: StoreSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSettings {
    /// Start polling on launch
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Location name passed to the provider (e.g. "London")
    pub location: String,

    #[serde(default)]
    pub units: UnitSystem,

    /// Minutes between polls
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u32,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Read from the environment only; never written to disk.
    #[serde(skip)]
    pub api_key: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_interval_minutes() -> u32 {
    60
}

fn default_api_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            location: "London".to_string(),
            units: UnitSystem::Metric,
            interval_minutes: default_interval_minutes(),
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            api_key: None,
        }
    }
}

impl WeatherSettings {
    /// Check the API key is present and not a placeholder
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty() && !k.starts_with("YOUR_"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Base URL of the notifications REST resource
    #[serde(default = "default_store_url")]
    pub api_url: String,

    /// Recipient recorded on created notifications
    #[serde(default = "default_recipient")]
    pub recipient: String,

    /// Forward emitted notifications to the store
    #[serde(default)]
    pub persist: bool,
}

fn default_store_url() -> String {
    "http://localhost:5000/api/notifications".to_string()
}

fn default_recipient() -> String {
    "user".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            api_url: default_store_url(),
            recipient: default_recipient(),
            persist: false,
        }
    }
}

impl Config {
    /// Load configuration from the default path, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, writing defaults there if it doesn't exist.
    /// The API key is always taken from the environment.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str::<Config>(&contents).context("Failed to parse config file")?
        } else {
            let config = Self::default();
            config.save_to(path)?;
            tracing::info!("Wrote default configuration to {}", path.display());
            config
        };

        config.weather.api_key = std::env::var(WEATHER_API_KEY_ENV).ok();
        Ok(config)
    }

    /// Load configuration from the default path and validate it.
    ///
    /// Warnings are logged; errors fail the load.
    pub fn load_validated() -> std::result::Result<(Self, ValidationResult), ConfigError> {
        let path = Self::config_path().map_err(|e| ConfigError::Load(format!("{:#}", e)))?;
        Self::load_validated_from(&path)
    }

    /// [`Config::load_from`] followed by [`Config::validate`].
    pub fn load_validated_from(
        path: &Path,
    ) -> std::result::Result<(Self, ValidationResult), ConfigError> {
        let config = Self::load_from(path).map_err(load_error)?;
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

        if self.weather.location.trim().is_empty() {
            result.add_error("weather.location", "Location must not be empty");
        }

        if self.weather.interval_minutes == 0 {
            result.add_error(
                "weather.interval_minutes",
                "Interval must be at least 1 minute",
            );
        } else if self.weather.interval_minutes > 1440 {
            result.add_warning(
                "weather.interval_minutes",
                "Polling interval is more than 24 hours",
            );
        }

        if self.weather.request_timeout_secs == 0 {
            result.add_error(
                "weather.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        }

        validate_url(&self.weather.api_base_url, "weather.api_base_url", &mut result);
        validate_url(&self.store.api_url, "store.api_url", &mut result);

        if !self.weather.has_api_key() {
            result.add_warning(
                "weather.api_key",
                format!("{} is not set - weather requests will be rejected", WEATHER_API_KEY_ENV),
            );
        }

        if self.store.persist && self.store.recipient.trim().is_empty() {
            result.add_warning("store.recipient", "Recipient is empty");
        }

        result
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents).context("Failed to write config file")?;
        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("notice");

        Ok(config_dir.join("config.toml"))
    }
}

fn load_error(e: anyhow::Error) -> ConfigError {
    if e.downcast_ref::<toml::de::Error>().is_some() {
        ConfigError::ParseError(format!("{:#}", e))
    } else {
        ConfigError::Load(format!("{:#}", e))
    }
}

fn validate_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
    match Url::parse(url_str) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                result.add_error(
                    field_name,
                    format!("URL must use http or https scheme, got: {}", url.scheme()),
                );
            }

            if url.host().is_none() {
                result.add_error(field_name, "URL must have a host");
            }
        }
        Err(e) => {
            result.add_error(field_name, format!("Invalid URL: {}", e));
        }
    }
}
