//! Configuration management for the BodaSafe Shield quote server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with BODASAFE_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

/// Open-Meteo forecast endpoint
pub const DEFAULT_WEATHER_ENDPOINT: &str = "https://api.open-meteo.com/v1/forecast";

/// Model artifact expected in the working directory
pub const DEFAULT_MODEL_PATH: &str = "python_gbm_model.json";

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Risk model configuration
    pub model: ModelConfig,

    /// Weather API configuration
    pub weather: WeatherConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// Path to the XGBoost JSON model artifact
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherConfig {
    /// Forecast API endpoint
    pub api_endpoint: String,

    /// Network timeout for the forecast request, in seconds
    pub timeout_secs: u64,
}

impl WeatherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("BODASAFE_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 8501)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("model.path", DEFAULT_MODEL_PATH)?
            .set_default("weather.api_endpoint", DEFAULT_WEATHER_ENDPOINT)?
            .set_default("weather.timeout_secs", 10)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (BODASAFE_ prefix)
            .add_source(
                Environment::with_prefix("BODASAFE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8501,
            host: "0.0.0.0".to_string(),
        }
    }
}
