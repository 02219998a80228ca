//! PostgreSQL connection pool shared by every Diesel repository.
//!
//! Each repository call checks out one connection. Checkout is bounded by a
//! timeout, so an exhausted pool becomes [`RepositoryError::Connection`] and
//! then a 503 rather than a request that never returns.

use std::time::Duration;

use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use tracing::info;

use crate::domain::ports::{RepositoryError, define_port_error};

const DEFAULT_MAX_SIZE: u32 = 10;
const DEFAULT_MIN_IDLE: u32 = 2;
const DEFAULT_CHECKOUT_TIMEOUT: Duration = Duration::from_secs(30);

define_port_error! {
    /// Pool construction and checkout failures.
    pub enum PoolError {
        /// The pool could not open its initial connections.
        Build => "failed to build connection pool",
        /// No connection freed up before the checkout timeout.
        Checkout => "no pooled connection available",
    }
}

impl From<PoolError> for RepositoryError {
    fn from(value: PoolError) -> Self {
        Self::connection(value.to_string())
    }
}

/// Where to connect and how many connections to hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    database_url: String,
    max_size: u32,
    min_idle: Option<u32>,
    checkout_timeout: Duration,
}

impl PoolConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_size: DEFAULT_MAX_SIZE,
            min_idle: Some(DEFAULT_MIN_IDLE),
            checkout_timeout: DEFAULT_CHECKOUT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    /// `None` lets the pool drain to zero idle connections.
    #[must_use]
    pub fn with_min_idle(mut self, min_idle: Option<u32>) -> Self {
        self.min_idle = min_idle;
        self
    }

    #[must_use]
    pub fn with_checkout_timeout(mut self, timeout: Duration) -> Self {
        self.checkout_timeout = timeout;
        self
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}

/// Cheaply cloneable pool handle.
#[derive(Clone)]
pub struct DbPool {
    inner: Pool<AsyncPgConnection>,
}

impl DbPool {
    /// Open the pool and its idle connections.
    ///
    /// # Errors
    /// [`PoolError::Build`] when the URL is malformed or the server refuses
    /// the initial connections.
    pub async fn new(config: PoolConfig) -> Result<Self, PoolError> {
        let PoolConfig {
            database_url,
            max_size,
            min_idle,
            checkout_timeout,
        } = config;
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let inner = Pool::builder()
            .max_size(max_size)
            .min_idle(min_idle)
            .connection_timeout(checkout_timeout)
            .build(manager)
            .await
            .map_err(|err| PoolError::build(err.to_string()))?;
        info!(max_size, ?min_idle, "database pool ready");
        Ok(Self { inner })
    }

    /// Borrow a connection until the guard drops.
    ///
    /// # Errors
    /// [`PoolError::Checkout`] once the checkout timeout elapses.
    pub async fn get(&self) -> Result<PooledConnection<'_, AsyncPgConnection>, PoolError> {
        self.inner
            .get()
            .await
            .map_err(|err| PoolError::checkout(err.to_string()))
    }
}
