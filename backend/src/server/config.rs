//! Application settings and the HTTP server configuration object.

use std::net::SocketAddr;
use std::time::Duration;

use careplan::inbound::http::session_config::SessionSettings;
use careplan::outbound::persistence::{DbPool, PoolConfig};
use ortho_config::OrthoConfig;
use serde::Deserialize;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Settings loaded from CLI flags, `CAREPLAN_*` variables and config files.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "CAREPLAN")]
pub struct AppSettings {
    /// Listen address; defaults to `0.0.0.0:8080`.
    pub bind_addr: Option<String>,
    /// PostgreSQL connection string.
    pub database_url: Option<String>,
    /// Pool size cap.
    #[ortho_config(default = 10)]
    pub db_max_connections: u32,
    /// Idle connections kept open.
    #[ortho_config(default = 2)]
    pub db_min_idle: u32,
    /// Checkout timeout.
    #[ortho_config(default = 30)]
    pub db_connect_timeout_secs: u64,
    /// Apply pending migrations before serving.
    #[ortho_config(default = true)]
    pub run_migrations: bool,
}

/// Settings that cannot be turned into a running server.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("CAREPLAN_DATABASE_URL is required")]
    MissingDatabaseUrl,
    #[error("invalid bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

impl AppSettings {
    /// Parsed listen address.
    ///
    /// # Errors
    /// Returns [`SettingsError::InvalidBindAddr`] for malformed addresses.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let value = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        value
            .parse()
            .map_err(|source| SettingsError::InvalidBindAddr {
                value: value.to_owned(),
                source,
            })
    }

    /// Pool configuration for the configured database.
    ///
    /// # Errors
    /// Returns [`SettingsError::MissingDatabaseUrl`] when no URL is set.
    pub fn pool_config(&self) -> Result<PoolConfig, SettingsError> {
        let url = self
            .database_url
            .as_deref()
            .ok_or(SettingsError::MissingDatabaseUrl)?;
        Ok(PoolConfig::new(url)
            .with_max_size(self.db_max_connections)
            .with_min_idle(Some(self.db_min_idle))
            .with_checkout_timeout(Duration::from_secs(self.db_connect_timeout_secs)))
    }
}

/// Everything the server needs once settings are validated.
pub struct ServerConfig {
    pub(crate) session: SessionSettings,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) db_pool: DbPool,
}

impl ServerConfig {
    /// Combine session settings with the listen address and pool.
    #[must_use]
    pub const fn new(session: SessionSettings, bind_addr: SocketAddr, db_pool: DbPool) -> Self {
        Self {
            session,
            bind_addr,
            db_pool,
        }
    }
}
