//! Directory service configuration.

use std::env;
use std::path::PathBuf;

use common::{DatabaseConfig, ServiceConfig};

/// Directory service configuration.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    /// Prefix under which the user routes are mounted
    pub web_base: String,
    /// Optional JSON or YAML user definition
    pub schema_path: Option<PathBuf>,
}

impl DirectoryConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            service: ServiceConfig {
                host: env::var("DIRECTORY_HOST").unwrap_or(defaults.service.host),
                port: env::var("DIRECTORY_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(defaults.service.port),
                log_level: env::var("LOG_LEVEL").unwrap_or(defaults.service.log_level),
                ..defaults.service
            },
            database: DatabaseConfig {
                url: env::var("DIRECTORY_DATABASE_URL")
                    .or_else(|_| env::var("DATABASE_URL"))
                    .unwrap_or(defaults.database.url),
                max_connections: env::var("DIRECTORY_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|n| n.parse().ok())
                    .unwrap_or(defaults.database.max_connections),
                timeout_ms: env::var("DIRECTORY_STORE_TIMEOUT_MS")
                    .ok()
                    .and_then(|ms| ms.parse().ok())
                    .unwrap_or(defaults.database.timeout_ms),
                ..defaults.database
            },
            web_base: env::var("DIRECTORY_WEB_BASE")
                .map(|base| normalize_web_base(&base))
                .unwrap_or(defaults.web_base),
            schema_path: env::var("DIRECTORY_SCHEMA_PATH").ok().map(PathBuf::from),
        }
    }
}

impl DirectoryConfig {
    /// Replace the bind address parts given on the command line.
    pub fn with_bind(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.service.host = host;
        }
        if let Some(port) = port {
            self.service.port = port;
        }
        self
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            database: DatabaseConfig::default(),
            web_base: "/api/v1".to_string(),
            schema_path: None,
        }
    }
}

/// Force a leading slash and strip trailing ones; the root becomes "".
pub fn normalize_web_base(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
