//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,

    // --- WhatsApp ---
    pub verify_token: String,
    pub access_token: String,
    pub phone_number_id: String,
    pub graph_api_version: String,
    pub app_secret: Option<String>,

    // --- Reading sources ---
    pub reading_files_dir: PathBuf,
    pub reflections_filename: String,
    pub jft_url: String,
    pub spad_url: String,
    pub zen_quotes_url: String,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub request_timeout: Duration,
    pub scrape_interval: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingVar(name.to_string()))
        };

        // --- Load Server and Database Settings ---
        let bind_address = parse_var("BIND_ADDRESS", &var_or("BIND_ADDRESS", "0.0.0.0:5000"))?;
        let database_url = var_or("DATABASE_URL", "sqlite://./files/daily_reading.db");

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load WhatsApp Settings ---
        let verify_token = required("VERIFY_TOKEN")?;
        let access_token = required("ACCESS_TOKEN")?;
        let phone_number_id = required("PHONE_NUMBER_ID")?;
        let graph_api_version = var_or("GRAPH_API_VERSION", "v22.0");
        let app_secret = lookup("APP_SECRET").filter(|v| !v.is_empty());

        // --- Load Reading Source Settings ---
        let reading_files_dir = PathBuf::from(var_or("READING_FILES_DIR", "./files"));
        let reflections_filename = var_or("REFLECTIONS_FILENAME", "daily_reflections.txt");
        let jft_url = var_or("JFT_URL", "https://www.jftna.org/jft/");
        let spad_url = var_or("SPAD_URL", "https://www.spadna.org/");
        let zen_quotes_url = var_or("ZEN_QUOTES_URL", "https://zenquotes.io/api/random");

        let retry_attempts: u32 =
            parse_var("READING_RETRY_ATTEMPTS", &var_or("READING_RETRY_ATTEMPTS", "3"))?;
        let retry_delay_secs: u64 =
            parse_var("READING_RETRY_DELAY", &var_or("READING_RETRY_DELAY", "5"))?;
        let timeout_secs: u64 = parse_var("READING_TIMEOUT", &var_or("READING_TIMEOUT", "10"))?;
        let interval_hours: u64 =
            parse_var("SCRAPE_INTERVAL_HOURS", &var_or("SCRAPE_INTERVAL_HOURS", "3"))?;
        if retry_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "READING_RETRY_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        if interval_hours == 0 {
            return Err(ConfigError::InvalidValue(
                "SCRAPE_INTERVAL_HOURS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            verify_token,
            access_token,
            phone_number_id,
            graph_api_version,
            app_secret,
            reading_files_dir,
            reflections_filename,
            jft_url,
            spad_url,
            zen_quotes_url,
            retry_attempts,
            retry_delay: Duration::from_secs(retry_delay_secs),
            request_timeout: Duration::from_secs(timeout_secs),
            scrape_interval: Duration::from_secs(interval_hours * 60 * 60),
        })
    }

    pub fn reflections_path(&self) -> PathBuf {
        self.reading_files_dir.join(&self.reflections_filename)
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("VERIFY_TOKEN", "verify"),
        ("ACCESS_TOKEN", "token"),
        ("PHONE_NUMBER_ID", "12345"),
    ];

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:5000".parse().unwrap());
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.graph_api_version, "v22.0");
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.scrape_interval, Duration::from_secs(3 * 60 * 60));
        assert_eq!(config.app_secret, None);
        assert_eq!(
            config.reflections_path(),
            PathBuf::from("./files/daily_reflections.txt")
        );
    }

    #[test]
    fn missing_verify_token_is_reported() {
        let err = Config::from_lookup(lookup(&[("ACCESS_TOKEN", "t"), ("PHONE_NUMBER_ID", "1")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(name) if name == "VERIFY_TOKEN"));
    }

    #[test]
    fn non_numeric_retry_count_is_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("READING_RETRY_ATTEMPTS", "many"));
        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(name, _) if name == "READING_RETRY_ATTEMPTS"));
    }

    #[test]
    fn bad_log_level_is_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("RUST_LOG", "chatty"));
        assert!(Config::from_lookup(lookup(&vars)).is_err());
    }
}
