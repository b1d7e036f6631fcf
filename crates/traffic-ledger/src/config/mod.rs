use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use crate::ledger::DEFAULT_MIN_CONFIDENCE;
use crate::statistics::DEFAULT_TOP_VIOLATORS;

/// Distinguishes runtime behavior for different stages of the service.
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
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub storage: StorageConfig,
    pub ledger: LedgerSettings,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_var("APP_PORT", 3000u16)?;
        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let data_dir = env::var("APP_DATA_DIR").unwrap_or_else(|_| "data".to_string());

        let defaults = LedgerSettings::default();
        let ledger = LedgerSettings {
            warning_threshold: parse_var("LEDGER_WARNING_THRESHOLD", defaults.warning_threshold)?,
            danger_threshold: parse_var("LEDGER_DANGER_THRESHOLD", defaults.danger_threshold)?,
            top_violators: parse_var("LEDGER_TOP_VIOLATORS", defaults.top_violators)?,
            min_confidence: parse_var("LEDGER_MIN_CONFIDENCE", defaults.min_confidence)?,
        };
        ledger.validate()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            storage: StorageConfig {
                data_dir: PathBuf::from(data_dir),
            },
            ledger,
        })
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where the JSON document store keeps its collection files.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

/// Tunables for classification, recognition, and reporting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerSettings {
    pub warning_threshold: u32,
    pub danger_threshold: u32,
    pub top_violators: usize,
    pub min_confidence: f32,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            warning_threshold: 3,
            danger_threshold: 5,
            top_violators: DEFAULT_TOP_VIOLATORS,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

impl LedgerSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.danger_threshold <= self.warning_threshold {
            return Err(ConfigError::ThresholdOrder {
                warning: self.warning_threshold,
                danger: self.danger_threshold,
            });
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ConfigError::InvalidValue {
                name: "LEDGER_MIN_CONFIDENCE",
                value: self.min_confidence.to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}'")]
    InvalidValue { name: &'static str, value: String },
    #[error("APP_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost {
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("danger threshold {danger} must exceed warning threshold {warning}")]
    ThresholdOrder { warning: u32, danger: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_DATA_DIR",
            "LEDGER_WARNING_THRESHOLD",
            "LEDGER_DANGER_THRESHOLD",
            "LEDGER_TOP_VIOLATORS",
            "LEDGER_MIN_CONFIDENCE",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.storage.data_dir, PathBuf::from("data"));
        assert_eq!(config.ledger, LedgerSettings::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("LEDGER_WARNING_THRESHOLD", "5");
        env::set_var("LEDGER_DANGER_THRESHOLD", "5");
        let error = AppConfig::load().expect_err("thresholds must be ordered");
        assert!(matches!(
            error,
            ConfigError::ThresholdOrder {
                warning: 5,
                danger: 5
            }
        ));
        reset_env();
    }

    #[test]
    fn rejects_unparseable_numbers() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("LEDGER_MIN_CONFIDENCE", "high");
        let error = AppConfig::load().expect_err("confidence must be numeric");
        assert!(matches!(
            error,
            ConfigError::InvalidValue {
                name: "LEDGER_MIN_CONFIDENCE",
                ..
            }
        ));

        env::set_var("LEDGER_MIN_CONFIDENCE", "1.5");
        assert!(AppConfig::load().is_err());
        reset_env();
    }
}
