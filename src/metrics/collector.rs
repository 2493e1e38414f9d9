// src/metrics/collector.rs
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use anyhow::Result;

use crate::health::HealthStatus;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    /// Text exposition of everything registered.
    pub fn gather(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

pub struct MetricsCollector {
    // Aggregate health
    pub health_checks_total: IntCounterVec,
    pub health_check_duration_seconds: HistogramVec,

    // Per-probe
    pub probe_status: IntGaugeVec,
    pub probe_duration_seconds: HistogramVec,

    // HTTP surface
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
    pub csrf_rejections_total: IntCounter,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let health_checks_total = IntCounterVec::new(
            Opts::new("health_checks_total", "Total health checks by outcome"),
            &["status"],
        )?;
        registry.register(Box::new(health_checks_total.clone()))?;

        let health_check_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "health_check_duration_seconds",
                "Time to run all probes in seconds",
            ),
            &["status"],
        )?;
        registry.register(Box::new(health_check_duration_seconds.clone()))?;

        let probe_status = IntGaugeVec::new(
            Opts::new(
                "health_probe_status",
                "Last probe outcome (1=healthy, 0=unhealthy)",
            ),
            &["service"],
        )?;
        registry.register(Box::new(probe_status.clone()))?;

        let probe_duration_seconds = HistogramVec::new(
            HistogramOpts::new("health_probe_duration_seconds", "Probe duration in seconds"),
            &["service"],
        )?;
        registry.register(Box::new(probe_duration_seconds.clone()))?;

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests"),
            &["method", "status_code"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "Request duration in seconds",
            ),
            &["method"],
        )?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        let csrf_rejections_total = IntCounter::new(
            "csrf_rejections_total",
            "Requests rejected for a missing or mismatched CSRF token",
        )?;
        registry.register(Box::new(csrf_rejections_total.clone()))?;

        Ok(Self {
            health_checks_total,
            health_check_duration_seconds,
            probe_status,
            probe_duration_seconds,
            http_requests_total,
            http_request_duration_seconds,
            csrf_rejections_total,
        })
    }

    pub fn record_health_check(&self, status: HealthStatus, duration: Duration) {
        self.health_checks_total
            .with_label_values(&[status.as_str()])
            .inc();

        self.health_check_duration_seconds
            .with_label_values(&[status.as_str()])
            .observe(duration.as_secs_f64());
    }

    pub fn record_probe(&self, service: &str, healthy: bool, duration: Duration) {
        let value = if healthy { 1 } else { 0 };
        self.probe_status.with_label_values(&[service]).set(value);

        self.probe_duration_seconds
            .with_label_values(&[service])
            .observe(duration.as_secs_f64());
    }

    pub fn record_request(&self, method: &str, status_code: u16, duration: Duration) {
        let status = status_code.to_string();
        self.http_requests_total
            .with_label_values(&[method, &status])
            .inc();

        self.http_request_duration_seconds
            .with_label_values(&[method])
            .observe(duration.as_secs_f64());
    }

    pub fn record_csrf_rejection(&self) {
        self.csrf_rejections_total.inc();
    }
}

// Helper for timing operations
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
