use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::board::DEFAULT_REQUEST_TIMEOUT;

/// Distinguishes runtime behavior for different stages of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub storage: StorageConfig,
    pub api: ApiConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let backend = match env::var("JOB_BOARD_STORAGE") {
            Ok(raw) => StorageBackend::parse(&raw)?,
            Err(_) => StorageBackend::File,
        };
        let data_dir = env::var("JOB_BOARD_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".job-board"));

        let simulate_latency = match env::var("JOB_BOARD_SIMULATE_LATENCY") {
            Ok(raw) => parse_flag("JOB_BOARD_SIMULATE_LATENCY", &raw)?,
            Err(_) => environment != AppEnvironment::Test,
        };

        let request_timeout = match env::var("JOB_BOARD_REQUEST_TIMEOUT_MS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(0) => None,
                Ok(millis) => Some(Duration::from_millis(millis)),
                Err(_) => return Err(ConfigError::InvalidTimeout(raw)),
            },
            Err(_) => Some(DEFAULT_REQUEST_TIMEOUT),
        };

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            storage: StorageConfig { backend, data_dir },
            api: ApiConfig {
                simulate_latency,
                request_timeout,
            },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

fn parse_flag(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            name,
            value: raw.to_string(),
        }),
    }
}

/// Where the application blob lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    File,
    Memory,
}

impl StorageBackend {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "file" | "disk" => Ok(Self::File),
            "memory" | "mem" => Ok(Self::Memory),
            _ => Err(ConfigError::InvalidStorage(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_dir: PathBuf,
}

/// Mock backend behavior.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub simulate_latency: bool,
    /// `None` lets operations run without a deadline.
    pub request_timeout: Option<Duration>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            simulate_latency: true,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidStorage(String),
    InvalidTimeout(String),
    InvalidFlag { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidStorage(value) => write!(
                f,
                "JOB_BOARD_STORAGE must be 'file' or 'memory' (got '{}')",
                value
            ),
            ConfigError::InvalidTimeout(value) => write!(
                f,
                "JOB_BOARD_REQUEST_TIMEOUT_MS must be a whole number of milliseconds (got '{}')",
                value
            ),
            ConfigError::InvalidFlag { name, value } => {
                write!(f, "{} must be a boolean flag (got '{}')", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("JOB_BOARD_STORAGE");
        env::remove_var("JOB_BOARD_DATA_DIR");
        env::remove_var("JOB_BOARD_SIMULATE_LATENCY");
        env::remove_var("JOB_BOARD_REQUEST_TIMEOUT_MS");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.storage.data_dir, PathBuf::from(".job-board"));
        assert!(config.api.simulate_latency);
        assert_eq!(config.api.request_timeout, Some(DEFAULT_REQUEST_TIMEOUT));
        assert_eq!(
            config.api.request_timeout,
            ApiConfig::default().request_timeout
        );
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn test_environment_disables_latency_by_default() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "ci");
        env::set_var("JOB_BOARD_STORAGE", "memory");
        env::set_var("JOB_BOARD_REQUEST_TIMEOUT_MS", "0");
        let config = AppConfig::load().expect("config loads");
        reset_env();
        assert_eq!(config.environment, AppEnvironment::Test);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert!(!config.api.simulate_latency);
        assert_eq!(config.api.request_timeout, None);
    }

    #[test]
    fn rejects_malformed_values() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("JOB_BOARD_REQUEST_TIMEOUT_MS", "soon");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidTimeout(value)) if value == "soon"
        ));

        reset_env();
        env::set_var("JOB_BOARD_SIMULATE_LATENCY", "sometimes");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidFlag { name: "JOB_BOARD_SIMULATE_LATENCY", .. })
        ));

        reset_env();
        env::set_var("JOB_BOARD_STORAGE", "cloud");
        let err = AppConfig::load().expect_err("unknown backend rejected");
        reset_env();
        assert!(err.to_string().contains("cloud"));
    }
}
