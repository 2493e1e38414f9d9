// src/health/status.rs
use hyper::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(self) -> bool {
        self == HealthStatus::Healthy
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }
}

/// Outcome of a single probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceResult {
    pub status: HealthStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
}

impl ServiceResult {
    pub fn healthy(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Healthy,
            message: message.into(),
            error: None,
            disk: None,
            driver: None,
        }
    }

    pub fn unhealthy(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            message: message.into(),
            error: Some(error.into()),
            disk: None,
            driver: None,
        }
    }

    pub fn with_disk(mut self, disk: impl Into<String>) -> Self {
        self.disk = Some(disk.into());
        self
    }

    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = Some(driver.into());
        self
    }
}

/// One entry per probed backend. Serialized in field order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Services {
    pub database: ServiceResult,
    pub storage: ServiceResult,
    pub cache: ServiceResult,
}

impl Services {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ServiceResult)> {
        [
            ("database", &self.database),
            ("storage", &self.storage),
            ("cache", &self.cache),
        ]
        .into_iter()
    }

    /// Healthy only when every service is.
    pub fn aggregate(&self) -> HealthStatus {
        if self.iter().all(|(_, result)| result.status.is_healthy()) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: String,
    pub services: Services,
    pub version: String,
}

impl HealthReport {
    pub fn new(timestamp: String, services: Services, version: String) -> Self {
        Self {
            status: services.aggregate(),
            timestamp,
            services,
            version,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.status {
            HealthStatus::Healthy => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn result(healthy: bool) -> ServiceResult {
        if healthy {
            ServiceResult::healthy("ok")
        } else {
            ServiceResult::unhealthy("failed", "boom")
        }
    }

    proptest! {
        #[test]
        fn aggregate_is_unhealthy_iff_any_probe_fails(
            db in any::<bool>(),
            storage in any::<bool>(),
            cache in any::<bool>(),
        ) {
            let services = Services {
                database: result(db),
                storage: result(storage),
                cache: result(cache),
            };
            let report = HealthReport::new(String::new(), services, "1".to_string());

            let all_ok = db && storage && cache;
            prop_assert_eq!(report.status.is_healthy(), all_ok);
            prop_assert_eq!(
                report.status_code(),
                if all_ok { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE }
            );
        }
    }

    #[test]
    fn test_json_shape() {
        let services = Services {
            database: ServiceResult::healthy("Database connection successful"),
            storage: ServiceResult::healthy("S3 storage accessible").with_disk("s3"),
            cache: ServiceResult::healthy("Cache system operational").with_driver("redis"),
        };
        let report = HealthReport::new(
            "2024-01-01T00:00:00+00:00".to_string(),
            services,
            "2.2.3".to_string(),
        );

        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(
            json,
            concat!(
                r#"{"status":"healthy","timestamp":"2024-01-01T00:00:00+00:00","services":{"#,
                r#""database":{"status":"healthy","message":"Database connection successful"},"#,
                r#""storage":{"status":"healthy","message":"S3 storage accessible","disk":"s3"},"#,
                r#""cache":{"status":"healthy","message":"Cache system operational","driver":"redis"}},"#,
                r#""version":"2.2.3"}"#
            )
        );
    }

    #[test]
    fn test_unhealthy_result_carries_error() {
        let value = serde_json::to_value(ServiceResult::unhealthy(
            "Database connection failed",
            "connection refused",
        ))
        .unwrap();

        assert_eq!(value["status"], "unhealthy");
        assert_eq!(value["error"], "connection refused");
        assert!(value.get("disk").is_none());
    }
}
