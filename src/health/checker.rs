// src/health/checker.rs
use crate::config::Config;
use crate::health::probe::{Cache, ConnectionChecker, ObjectStore, ProbeError};
use crate::health::status::{HealthReport, ServiceResult, Services};
use crate::metrics::{MetricsCollector, Timer};
use chrono::{SecondsFormat, Utc};
use hyper::StatusCode;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

const CACHE_PROBE_VALUE: &str = "true";

/// Knobs for a single health check run, resolved from `Config` at startup.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub version: String,
    /// Reported as `disk` on the storage result.
    pub storage_disk: String,
    pub probe_disk: String,
    pub sentinel_key: String,
    /// Reported as `driver` on the cache result.
    pub cache_driver: String,
    pub cache_ttl: Duration,
    pub cache_key_prefix: String,
    pub probe_timeout: Option<Duration>,
    pub concurrent: bool,
    pub require_sentinel: bool,
    pub verify_cache_read: bool,
}

impl ProbeSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            version: config.app.version.clone(),
            storage_disk: config.storage.default.clone(),
            probe_disk: config.storage.probe_disk.clone(),
            sentinel_key: config.storage.sentinel_key.clone(),
            cache_driver: config.cache.default.clone(),
            cache_ttl: config.health.cache_ttl(),
            cache_key_prefix: config.health.cache_key_prefix.clone(),
            probe_timeout: config.health.probe_timeout(),
            concurrent: config.health.concurrent_probes,
            require_sentinel: config.health.require_sentinel,
            verify_cache_read: config.health.verify_cache_read,
        }
    }
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

pub struct HealthChecker {
    settings: ProbeSettings,
    database: Arc<dyn ConnectionChecker>,
    storage: Arc<dyn ObjectStore>,
    cache: Arc<dyn Cache>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl HealthChecker {
    pub fn new(
        settings: ProbeSettings,
        database: Arc<dyn ConnectionChecker>,
        storage: Arc<dyn ObjectStore>,
        cache: Arc<dyn Cache>,
    ) -> Self {
        Self {
            settings,
            database,
            storage,
            cache,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn settings(&self) -> &ProbeSettings {
        &self.settings
    }

    /// Run every probe once and fold the results into a report.
    ///
    /// Probe faults never escape: each one becomes an unhealthy
    /// `ServiceResult`, and the status code is 503 when any probe failed.
    pub async fn check(&self) -> (HealthReport, StatusCode) {
        let timer = Timer::new();

        let services = if self.settings.concurrent {
            let (database, storage, cache) = tokio::join!(
                self.check_database(),
                self.check_storage(),
                self.check_cache(),
            );
            Services {
                database,
                storage,
                cache,
            }
        } else {
            Services {
                database: self.check_database().await,
                storage: self.check_storage().await,
                cache: self.check_cache().await,
            }
        };

        let report = HealthReport::new(
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, false),
            services,
            self.settings.version.clone(),
        );
        let elapsed = timer.elapsed();

        if let Some(metrics) = &self.metrics {
            metrics.record_health_check(report.status, elapsed);
        }

        if report.status.is_healthy() {
            debug!("Health check passed in {:?}", elapsed);
        } else {
            let failing: Vec<&str> = report
                .services
                .iter()
                .filter(|(_, result)| !result.status.is_healthy())
                .map(|(name, _)| name)
                .collect();
            info!(?failing, "Health check failed in {:?}", elapsed);
        }

        let code = report.status_code();
        (report, code)
    }

    async fn check_database(&self) -> ServiceResult {
        let timer = Timer::new();
        let result = match self.bounded(self.database.check_connection()).await {
            Ok(()) => ServiceResult::healthy("Database connection successful"),
            Err(e) => ServiceResult::unhealthy("Database connection failed", e.to_string()),
        };
        self.observe("database", &result, timer.elapsed());
        result
    }

    async fn check_storage(&self) -> ServiceResult {
        let timer = Timer::new();
        let result = match self.bounded(self.probe_storage()).await {
            Ok(()) => ServiceResult::healthy("S3 storage accessible")
                .with_disk(self.settings.storage_disk.clone()),
            Err(e) => ServiceResult::unhealthy("S3 storage check failed", e.to_string()),
        };
        self.observe("storage", &result, timer.elapsed());
        result
    }

    async fn check_cache(&self) -> ServiceResult {
        let timer = Timer::new();
        let result = match self.bounded(self.probe_cache()).await {
            Ok(()) => ServiceResult::healthy("Cache system operational")
                .with_driver(self.settings.cache_driver.clone()),
            Err(e) => ServiceResult::unhealthy("Cache system check failed", e.to_string()),
        };
        self.observe("cache", &result, timer.elapsed());
        result
    }

    // A successful existence call means the disk is reachable, whatever it
    // answered, unless `require_sentinel` is set.
    async fn probe_storage(&self) -> Result<(), ProbeError> {
        let key = &self.settings.sentinel_key;
        if self.storage.exists(key).await? {
            return Ok(());
        }

        if self.settings.require_sentinel {
            return Err(ProbeError::SentinelMissing {
                disk: self.settings.probe_disk.clone(),
                key: key.clone(),
            });
        }

        debug!(
            "Sentinel {} absent on disk {}, treating storage as reachable",
            key, self.settings.probe_disk
        );
        Ok(())
    }

    // Real round trip against the live store: put, get, forget.
    // Keys are unique per run so overlapping checks never forget each other's key.
    async fn probe_cache(&self) -> Result<(), ProbeError> {
        let key = format!(
            "{}{}-{}",
            self.settings.cache_key_prefix,
            Utc::now().timestamp(),
            Uuid::new_v4().simple()
        );

        self.cache
            .put(&key, CACHE_PROBE_VALUE, self.settings.cache_ttl)
            .await?;
        let value = self.cache.get(&key).await?;
        self.cache.forget(&key).await?;

        if self.settings.verify_cache_read && value.as_deref() != Some(CACHE_PROBE_VALUE) {
            return Err(ProbeError::CacheMismatch(key));
        }

        Ok(())
    }

    async fn bounded<T, F>(&self, probe: F) -> Result<T, ProbeError>
    where
        F: Future<Output = Result<T, ProbeError>>,
    {
        match self.settings.probe_timeout {
            Some(limit) => timeout(limit, probe)
                .await
                .unwrap_or_else(|_| Err(ProbeError::Timeout(limit))),
            None => probe.await,
        }
    }

    fn observe(&self, service: &str, result: &ServiceResult, elapsed: Duration) {
        let healthy = result.status.is_healthy();

        if let Some(metrics) = &self.metrics {
            metrics.record_probe(service, healthy, elapsed);
        }

        if healthy {
            debug!("Probe {} healthy in {:?}", service, elapsed);
        } else {
            warn!(
                "Probe {} unhealthy: {}",
                service,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}
