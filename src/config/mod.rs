// src/config/mod.rs
mod models;

pub use models::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Prefix for environment overrides, e.g. `HEALTHCHECK__APP__VERSION=2.3.0`.
pub const ENV_PREFIX: &str = "HEALTHCHECK";

/// Load configuration from a file (YAML or JSON), overlaid by the environment.
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .context("Failed to read config file")?;

    let format = match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => ::config::FileFormat::Yaml,
        _ => ::config::FileFormat::Json,
    };

    let config = parse_config(&contents, format)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration text and apply `HEALTHCHECK__*` environment overrides.
pub fn parse_config(contents: &str, format: ::config::FileFormat) -> Result<Config> {
    let layered = ::config::Config::builder()
        .add_source(::config::File::from_str(contents, format))
        .add_source(::config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .context("Failed to assemble configuration")?;

    layered
        .try_deserialize()
        .context("Failed to parse configuration")
}

/// One-line startup summary, safe to log.
pub fn redacted_summary(config: &Config) -> String {
    format!(
        "{} {} (database={}, probe_disk={}, cache={}, csrf_except={:?})",
        config.app.name,
        config.app.version,
        crate::backends::redact(&config.database.url),
        config.storage.probe_disk,
        config.cache.default,
        config.csrf.except,
    )
}
