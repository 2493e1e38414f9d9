// src/config/models.rs
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    pub health: HealthConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub cache: CacheConfig,
    pub csrf: CsrfConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub name: String,
    /// Reported as `version` in every health report.
    pub version: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "healthcheck-service".to_string(),
            version: "2.2.3".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub path: String,
    pub concurrent_probes: bool,
    pub probe_timeout_secs: Option<u64>,
    /// Treat a missing sentinel object as a storage failure.
    pub require_sentinel: bool,
    /// Treat a cache read-back that differs from the written value as a failure.
    pub verify_cache_read: bool,
    pub cache_ttl_secs: u64,
    pub cache_key_prefix: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            path: "/health".to_string(),
            concurrent_probes: false,
            probe_timeout_secs: None,
            require_sentinel: false,
            verify_cache_read: false,
            cache_ttl_secs: 30,
            cache_key_prefix: "health-check-".to_string(),
        }
    }
}

impl HealthConfig {
    pub fn probe_timeout(&self) -> Option<Duration> {
        self.probe_timeout_secs.map(Duration::from_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost:5432/app".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 5,
        }
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Default disk name, reported in the storage probe result.
    pub default: String,
    /// Disk the sentinel existence check runs against.
    pub probe_disk: String,
    pub sentinel_key: String,
    pub disks: BTreeMap<String, DiskConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let mut disks = BTreeMap::new();
        disks.insert(
            "local".to_string(),
            DiskConfig::Local {
                root: PathBuf::from("storage/app"),
            },
        );
        disks.insert(
            "s3".to_string(),
            DiskConfig::S3 {
                bucket: String::new(),
                region: None,
                endpoint: None,
                use_path_style_endpoint: false,
            },
        );

        Self {
            default: "s3".to_string(),
            probe_disk: "s3".to_string(),
            sentinel_key: "health-check.txt".to_string(),
            disks,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "driver", rename_all = "lowercase")]
pub enum DiskConfig {
    S3 {
        bucket: String,
        #[serde(default)]
        region: Option<String>,
        #[serde(default)]
        endpoint: Option<Url>,
        #[serde(default)]
        use_path_style_endpoint: bool,
    },
    Local {
        root: PathBuf,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Default store name, reported as the cache driver.
    pub default: String,
    pub stores: BTreeMap<String, CacheStoreConfig>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let mut stores = BTreeMap::new();
        stores.insert("array".to_string(), CacheStoreConfig::Array);
        stores.insert(
            "redis".to_string(),
            CacheStoreConfig::Redis {
                url: "redis://127.0.0.1:6379".to_string(),
            },
        );

        Self {
            default: "redis".to_string(),
            stores,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "driver", rename_all = "lowercase")]
pub enum CacheStoreConfig {
    Redis { url: String },
    Array,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CsrfConfig {
    /// URI patterns excluded from CSRF verification.
    pub except: Vec<String>,
    pub cookie_name: String,
    pub cookie_route: String,
    pub cookie_lifetime_minutes: u64,
    pub cookie_secure: bool,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            except: vec!["sanctum/csrf-cookie".to_string()],
            cookie_name: "XSRF-TOKEN".to_string(),
            cookie_route: "/sanctum/csrf-cookie".to_string(),
            cookie_lifetime_minutes: 120,
            cookie_secure: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 9090,
            path: "/metrics".to_string(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if !self.health.path.starts_with('/') {
            bail!("health.path must start with '/': {}", self.health.path);
        }
        if !self.csrf.cookie_route.starts_with('/') {
            bail!(
                "csrf.cookie_route must start with '/': {}",
                self.csrf.cookie_route
            );
        }
        if self.health.path == self.csrf.cookie_route {
            bail!("health.path and csrf.cookie_route must differ");
        }
        if self.health.probe_timeout_secs == Some(0) {
            bail!("health.probe_timeout_secs must be greater than zero");
        }
        if self.csrf.cookie_name.is_empty() {
            bail!("csrf.cookie_name must not be empty");
        }
        if let Some(pattern) = self.csrf.except.iter().find(|p| p.trim().is_empty()) {
            bail!("csrf.except contains an empty pattern: {:?}", pattern);
        }

        if self.database.url.is_empty() {
            bail!("database.url must be set");
        }
        if self.database.max_connections == 0 {
            bail!("database.max_connections must be greater than zero");
        }

        match self.storage.disks.get(&self.storage.probe_disk) {
            None => bail!(
                "storage.probe_disk '{}' is not a configured disk",
                self.storage.probe_disk
            ),
            Some(DiskConfig::S3 { bucket, .. }) if bucket.is_empty() => bail!(
                "storage disk '{}' needs a bucket",
                self.storage.probe_disk
            ),
            Some(_) => {}
        }
        if self.storage.sentinel_key.is_empty() {
            bail!("storage.sentinel_key must not be empty");
        }

        if !self.cache.stores.contains_key(&self.cache.default) {
            bail!(
                "cache.default '{}' is not a configured store",
                self.cache.default
            );
        }

        if self.metrics.enabled {
            if self.metrics.port == self.server.listen.port() {
                bail!("metrics.port collides with server.listen");
            }
            if !self.metrics.path.starts_with('/') {
                bail!("metrics.path must start with '/': {}", self.metrics.path);
            }
        }

        Ok(())
    }
}
