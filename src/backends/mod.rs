// src/backends/mod.rs
//! Real clients behind the health probes, built from configuration.
mod cache;
mod database;
mod storage;

pub use cache::{ArrayCache, RedisCache};
pub use database::{redact, PgConnectionChecker};
pub use storage::{LocalObjectStore, S3ObjectStore};

use crate::config::{CacheConfig, CacheStoreConfig, DatabaseConfig, DiskConfig, StorageConfig};
use crate::health::{Cache, ConnectionChecker, ObjectStore};
use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use tracing::info;

pub fn database_checker(config: &DatabaseConfig) -> Result<Arc<dyn ConnectionChecker>> {
    Ok(Arc::new(PgConnectionChecker::connect_lazy(config)?))
}

/// The disk the sentinel check runs against (`storage.probe_disk`).
pub async fn object_store(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>> {
    let disk = config
        .disks
        .get(&config.probe_disk)
        .ok_or_else(|| anyhow!("Unknown storage disk: {}", config.probe_disk))?;

    let store: Arc<dyn ObjectStore> = match disk {
        DiskConfig::S3 {
            bucket,
            region,
            endpoint,
            use_path_style_endpoint,
        } => {
            info!("Storage probe uses S3 bucket {}", bucket);
            Arc::new(
                S3ObjectStore::from_env(
                    bucket.clone(),
                    region.clone(),
                    endpoint.as_ref(),
                    *use_path_style_endpoint,
                )
                .await,
            )
        }
        DiskConfig::Local { root } => {
            info!("Storage probe uses local disk at {}", root.display());
            Arc::new(LocalObjectStore::new(root.clone()))
        }
    };

    Ok(store)
}

/// The store named by `cache.default`.
pub fn cache_store(config: &CacheConfig) -> Result<Arc<dyn Cache>> {
    let store = config
        .stores
        .get(&config.default)
        .ok_or_else(|| anyhow!("Unknown cache store: {}", config.default))?;

    let cache: Arc<dyn Cache> = match store {
        CacheStoreConfig::Redis { url } => {
            Arc::new(RedisCache::open(url).context("Invalid redis URL")?)
        }
        CacheStoreConfig::Array => Arc::new(ArrayCache::new()),
    };

    info!("Cache probe uses store {}", config.default);
    Ok(cache)
}
