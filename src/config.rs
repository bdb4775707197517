//! Configuration management for the secret manager.
//!
//! Configuration can be set via environment variables:
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `3000`.
//! - `DATA_DIR` - Optional. Directory for persistent storage. Defaults to `./data`.
//! - `SECRET_STORE` - Optional. Storage backend, `sqlite` or `memory`. Defaults to `sqlite`.
//! - `MAX_UPLOAD_BYTES` - Optional. Request body cap for file uploads. Defaults to 10 MB.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Directory for persistent storage
    pub data_dir: PathBuf,

    /// Storage backend selector (`sqlite` or `memory`)
    pub store_backend: String,

    /// Upper bound on request bodies, which caps file uploads
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = match std::env::var("PORT") {
            Ok(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PORT".to_string(), value))?,
            Err(_) => 3000,
        };

        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let store_backend =
            std::env::var("SECRET_STORE").unwrap_or_else(|_| "sqlite".to_string());

        let max_upload_bytes = match std::env::var("MAX_UPLOAD_BYTES") {
            Ok(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidValue("MAX_UPLOAD_BYTES".to_string(), value))?,
            Err(_) => 10 * 1024 * 1024,
        };

        Ok(Self {
            host,
            port,
            data_dir,
            store_backend,
            max_upload_bytes,
        })
    }
}
