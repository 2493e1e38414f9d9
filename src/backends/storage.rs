// src/backends/storage.rs
use crate::health::{ObjectStore, ProbeError};
use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use std::path::PathBuf;
use url::Url;

pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Credentials come from the standard AWS provider chain.
    pub async fn from_env(
        bucket: String,
        region: Option<String>,
        endpoint: Option<&Url>,
        path_style: bool,
    ) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(r) = region {
            loader = loader.region(aws_config::Region::new(r));
        }
        if let Some(ep) = endpoint {
            loader = loader.endpoint_url(ep.as_str());
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(path_style)
            .build();

        Self::new(aws_sdk_s3::Client::from_conf(s3_config), bucket)
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn exists(&self, key: &str) -> Result<bool, ProbeError> {
        let outcome = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match outcome {
            Ok(_) => Ok(true),
            Err(err) => {
                if err.as_service_error().is_some_and(|e| e.is_not_found()) {
                    return Ok(false);
                }
                Err(ProbeError::Storage(DisplayErrorContext(err).to_string()))
            }
        }
    }
}

/// Disk backed by a directory on the local filesystem.
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn exists(&self, key: &str) -> Result<bool, ProbeError> {
        let meta = tokio::fs::metadata(&self.root).await.map_err(|e| {
            ProbeError::Storage(format!("disk root {} unavailable: {}", self.root.display(), e))
        })?;
        if !meta.is_dir() {
            return Err(ProbeError::Storage(format!(
                "disk root {} is not a directory",
                self.root.display()
            )));
        }

        tokio::fs::try_exists(self.root.join(key.trim_start_matches('/')))
            .await
            .map_err(|e| ProbeError::Storage(e.to_string()))
    }
}
