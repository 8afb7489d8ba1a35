//! Configuration management for wordday
//!
//! This module handles loading and validating configuration from environment variables,
//! files, and command-line arguments. Every section defaults, so a TOML file only
//! needs the keys it changes.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::cache::CacheConfig;
use crate::resolver::ResolverConfig;
use crate::scheduler::SchedulerConfig;
use crate::storage::StoreConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Answer resolution
    pub resolver: ResolverConfig,

    /// Content store
    pub store: StoreConfig,

    /// Background jobs
    pub scheduler: SchedulerConfig,

    /// Redis snapshot mirror
    pub cache: CacheConfig,

    /// HTTP server
    pub server: ServerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Directory with `{category}.hbs` files overriding the bundled templates
    pub template_dir: Option<PathBuf>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,

    /// Bind port
    pub port: u16,

    /// Enable permissive CORS
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: 8080,
            cors: true,
        }
    }
}

impl ServerConfig {
    /// Socket address to bind
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.host, self.port))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let server_defaults = ServerConfig::default();

        let host = std::env::var("WORDDAY_HOST").unwrap_or(server_defaults.host);

        let port = std::env::var("WORDDAY_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(server_defaults.port);

        let cors = std::env::var("WORDDAY_CORS")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(server_defaults.cors);

        let log_level = std::env::var("WORDDAY_LOG_LEVEL").unwrap_or_else(|_| String::from("info"));

        let log_format =
            std::env::var("WORDDAY_LOG_FORMAT").unwrap_or_else(|_| String::from("text"));

        let template_dir = std::env::var("WORDDAY_TEMPLATE_DIR").ok().map(PathBuf::from);

        Ok(Self {
            resolver: ResolverConfig::from_env(),
            store: StoreConfig::from_env(),
            scheduler: SchedulerConfig::from_env(),
            cache: CacheConfig::from_env(),
            server: ServerConfig { host, port, cors },
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
            },
            template_dir,
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load from `path` when given, otherwise from the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.resolver.validate().context("Invalid [resolver] section")?;
        self.store.validate().context("Invalid [store] section")?;
        self.scheduler
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid [scheduler] section: {e}"))?;

        if self.cache.enabled && self.cache.pool_size == 0 {
            anyhow::bail!("cache.pool_size must be greater than 0");
        }

        if self.server.port == 0 {
            anyhow::bail!("server.port must be greater than 0");
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("logging.format must be 'text' or 'json'");
        }

        Ok(())
    }
}
