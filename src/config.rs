use std::{env::var, fmt, str::FromStr, time::Duration};

use dotenvy::dotenv;
use thiserror::Error;

use crate::infrastructure::messaging::jetstream::JetstreamConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    pub graceful_shutdown: Duration,
    pub request_timeout: Duration,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: String,
    pub env: String,
    pub log_format: LogFormat,
    pub http: HttpConfig,
    pub database: Option<DatabaseConfig>,
    pub nats: Option<JetstreamConfig>,
}

impl Config {
    pub fn try_parse() -> Result<Config, ConfigError> {
        let _ = dotenv();
        Self::from_lookup(|key| var(key).ok())
    }

    /// Builds the configuration from `lookup`, falling back to in-code
    /// defaults for every absent key.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
        let env = lookup("APP_ENV").unwrap_or_else(|| "prod".to_string());
        let default_format = if env == "prod" {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        };

        let database = match lookup("DATABASE_URL") {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            }),
            None => None,
        };

        let nats = match lookup("NATS_URL") {
            Some(url) => Some(JetstreamConfig {
                url,
                stream: lookup("NATS_STREAM").unwrap_or_else(|| "IDENTITY".to_string()),
                subject: lookup("NATS_SUBJECT").unwrap_or_else(|| "identity.created".to_string()),
                durable: lookup("NATS_DURABLE")
                    .unwrap_or_else(|| "user-service-identity-created".to_string()),
                pull_batch: parse_or(&lookup, "NATS_PULL_BATCH", 10)?,
                ack_wait_seconds: parse_or(&lookup, "NATS_ACK_WAIT_SECS", 30)?,
                max_deliver: parse_or(&lookup, "NATS_MAX_DELIVER", 5)?,
            }),
            None => None,
        };

        Ok(Config {
            app_name: lookup("APP_NAME").unwrap_or_else(|| "user-service".to_string()),
            log_format: parse_or(&lookup, "LOG_FORMAT", default_format)?,
            env,
            http: HttpConfig {
                host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&lookup, "PORT", 8080)?,
                graceful_shutdown: Duration::from_secs(parse_or(
                    &lookup,
                    "HTTP_GRACEFUL_SHUTDOWN_SECS",
                    1,
                )?),
                request_timeout: Duration::from_secs(parse_or(
                    &lookup,
                    "HTTP_REQUEST_TIMEOUT_SECS",
                    3,
                )?),
            },
            database,
            nats,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}
