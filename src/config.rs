//! Configuration management for the Tidepost server

use serde::Deserialize;
use std::env;
use std::path::PathBuf;

/// Default request body limit for upload routes: 16MB
pub const DEFAULT_UPLOAD_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    /// Root of merged assets; chunks live under `<dir>/chunks`
    pub dir: PathBuf,
    /// URL path merged assets are served under
    pub public_prefix: String,
    pub max_body_bytes: usize,
}

/// Malformed environment value
#[derive(Debug, thiserror::Error)]
#[error("Invalid value for {key}: {value:?}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: "sqlite:./tidepost.db".to_string(),
            },
            media: MediaConfig {
                dir: PathBuf::from("./media"),
                public_prefix: "/media".to_string(),
                max_body_bytes: DEFAULT_UPLOAD_MAX_BODY_BYTES,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("SERVER_PORT", defaults.server.port)?,
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or(defaults.database.url),
            },
            media: MediaConfig {
                dir: env::var("MEDIA_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.media.dir),
                public_prefix: env::var("MEDIA_PUBLIC_PREFIX")
                    .unwrap_or(defaults.media.public_prefix),
                max_body_bytes: parse_var("UPLOAD_MAX_BODY_BYTES", defaults.media.max_body_bytes)?,
            },
        })
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError { key, value }),
        Err(_) => Ok(default),
    }
}
