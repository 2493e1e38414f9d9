// src/health/probe.rs
//! Capabilities the health checker probes. Each backend the service depends
//! on is reached through one of these traits so that tests can substitute
//! fakes for the real clients in `crate::backends`.
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("{0}")]
    Database(String),

    #[error("{0}")]
    Storage(String),

    #[error("{0}")]
    Cache(String),

    #[error("sentinel object '{key}' not found on disk '{disk}'")]
    SentinelMissing { disk: String, key: String },

    #[error("cache read-back mismatch for key '{0}'")]
    CacheMismatch(String),

    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
}

/// Hands out a live database connection, or fails.
#[async_trait]
pub trait ConnectionChecker: Send + Sync {
    async fn check_connection(&self) -> Result<(), ProbeError>;
}

/// Object storage disk.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool, ProbeError>;
}

#[async_trait]
pub trait Cache: Send + Sync {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), ProbeError>;

    async fn get(&self, key: &str) -> Result<Option<String>, ProbeError>;

    /// Returns whether the key was present.
    async fn forget(&self, key: &str) -> Result<bool, ProbeError>;
}
