// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use healthcheck_service::backends::ArrayCache;
use healthcheck_service::config::Config;
use healthcheck_service::csrf::CsrfLayer;
use healthcheck_service::health::{
    Cache, ConnectionChecker, HealthChecker, ObjectStore, ProbeError, ProbeSettings,
};
use healthcheck_service::server::{AppState, RequestHandler, ServerBuilder};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::Layer;

#[derive(Default)]
pub struct FakeDatabase {
    pub fault: Mutex<Option<String>>,
}

impl FakeDatabase {
    pub fn failing(fault: &str) -> Self {
        Self {
            fault: Mutex::new(Some(fault.to_string())),
        }
    }
}

#[async_trait]
impl ConnectionChecker for FakeDatabase {
    async fn check_connection(&self) -> Result<(), ProbeError> {
        match self.fault.lock().unwrap().clone() {
            Some(fault) => Err(ProbeError::Database(fault)),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct FakeStore {
    pub fault: Option<String>,
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn exists(&self, _key: &str) -> Result<bool, ProbeError> {
        match &self.fault {
            Some(fault) => Err(ProbeError::Storage(fault.clone())),
            None => Ok(false),
        }
    }
}

/// `ArrayCache` whose delete can be made to fail.
#[derive(Default)]
pub struct FlakyCache {
    pub inner: ArrayCache,
    pub fail_forget: bool,
}

#[async_trait]
impl Cache for FlakyCache {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), ProbeError> {
        self.inner.put(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, ProbeError> {
        self.inner.get(key).await
    }

    async fn forget(&self, key: &str) -> Result<bool, ProbeError> {
        if self.fail_forget {
            return Err(ProbeError::Cache("connection reset by peer".to_string()));
        }
        self.inner.forget(key).await
    }
}

pub fn checker(
    config: &Config,
    database: Arc<FakeDatabase>,
    storage: Arc<FakeStore>,
    cache: Arc<FlakyCache>,
) -> HealthChecker {
    HealthChecker::new(ProbeSettings::from_config(config), database, storage, cache)
}

/// Serve the CSRF-wrapped router on an ephemeral port.
pub async fn spawn_server(checker: HealthChecker, config: &Config) -> SocketAddr {
    let handler = RequestHandler::new(AppState::new(checker, config));
    let service = CsrfLayer::from_config(&config.csrf).layer(handler);

    let listening = ServerBuilder::new(SocketAddr::from(([127, 0, 0, 1], 0)))
        .with_handler(service)
        .bind()
        .await
        .unwrap();
    let addr = listening.local_addr().unwrap();

    tokio::spawn(listening.run_until(std::future::pending()));
    addr
}
