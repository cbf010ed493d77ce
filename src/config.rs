//! Connection settings and pool construction.

use serde::Deserialize;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::postgres::PgPoolOptions;
use sqlx::{MySqlPool, PgPool};
use std::time::Duration;
use tracing::info;

use crate::{ConnectionFactory, Dialect, Executor};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Database settings, usually embedded in a larger application config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DaoConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Session character set. Falls back to the dialect default
    /// (`utf8mb4` for MySQL, `UTF8` for PostgreSQL).
    #[serde(default)]
    pub charset: Option<String>,
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

impl DaoConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            charset: None,
        }
    }

    /// Reads `DATABASE_URL` plus the optional `DATABASE_MAX_CONNECTIONS`,
    /// `DATABASE_CONNECT_TIMEOUT_SECS` and `DATABASE_CHARSET`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let mut config = Self::new(url);

        if let Some(value) = lookup("DATABASE_MAX_CONNECTIONS") {
            config.max_connections = value.parse().map_err(|_| ConfigError::Invalid {
                name: "DATABASE_MAX_CONNECTIONS",
                value,
            })?;
        }
        if let Some(value) = lookup("DATABASE_CONNECT_TIMEOUT_SECS") {
            config.connect_timeout_secs = value.parse().map_err(|_| ConfigError::Invalid {
                name: "DATABASE_CONNECT_TIMEOUT_SECS",
                value,
            })?;
        }
        config.charset = lookup("DATABASE_CHARSET");
        Ok(config)
    }

    pub fn dialect(&self) -> Option<Dialect> {
        Dialect::from_url(&self.url)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Wraps `factory` in an executor applying this config's charset.
    pub fn executor<F: ConnectionFactory>(&self, factory: F) -> Executor<F> {
        match &self.charset {
            Some(charset) => Executor::new(factory).with_charset(charset.clone()),
            None => Executor::new(factory),
        }
    }

    pub async fn connect_postgres(&self) -> Result<PgPool, sqlx::Error> {
        info!(max_connections = self.max_connections, "connecting to postgres");
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.connect_timeout())
            .connect(&self.url)
            .await
    }

    pub async fn connect_mysql(&self) -> Result<MySqlPool, sqlx::Error> {
        info!(max_connections = self.max_connections, "connecting to mysql");
        MySqlPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.connect_timeout())
            .connect(&self.url)
            .await
    }
}
