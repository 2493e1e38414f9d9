// src/health/mod.rs
mod checker;
mod probe;
mod status;

pub use checker::{HealthChecker, ProbeSettings};
pub use probe::{Cache, ConnectionChecker, ObjectStore, ProbeError};
pub use status::{HealthReport, HealthStatus, ServiceResult, Services};
