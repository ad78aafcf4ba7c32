//! Configuration, read from the environment at startup.

use std::path::PathBuf;

use crate::error::ConfigError;

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen port.
    pub port: u16,
    /// Path to the libSQL database file.
    pub db_path: PathBuf,
    /// Path to the service-account JSON key file.
    pub service_account_path: PathBuf,
    /// Push-delivery endpoint URL.
    pub push_endpoint: String,
    /// Flag deliveries as sandbox traffic.
    pub sandbox: bool,
    /// Optional JSON file of tips to load when the collection is empty.
    pub seed_path: Option<PathBuf>,
}

impl Config {
    /// Read configuration from `TIPCAST_*` environment variables.
    /// `TIPCAST_SERVICE_ACCOUNT` is required; everything else has a
    /// default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match std::env::var("TIPCAST_PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "TIPCAST_PORT".to_string(),
                message: format!("not a port number: {raw}"),
            })?,
            Err(_) => 8080,
        };

        let service_account_path = std::env::var("TIPCAST_SERVICE_ACCOUNT")
            .map(PathBuf::from)
            .map_err(|_| ConfigError::MissingEnvVar("TIPCAST_SERVICE_ACCOUNT".to_string()))?;

        Ok(Self {
            port,
            db_path: std::env::var("TIPCAST_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data/tipcast.db")),
            service_account_path,
            push_endpoint: std::env::var("TIPCAST_PUSH_ENDPOINT").unwrap_or_else(|_| {
                crate::dispatch::dispatcher::DEFAULT_PUSH_ENDPOINT.to_string()
            }),
            sandbox: std::env::var("TIPCAST_SANDBOX")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            seed_path: std::env::var("TIPCAST_SEED_PATH").map(PathBuf::from).ok(),
        })
    }
}
