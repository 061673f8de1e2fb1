//! Health Check System
//!
//! Probes attachment storage, the count cache, and the translation catalogs.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use bytes::Bytes;
use deck_attachments::{Cache, Storage};
use deck_l10n::Catalogs;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

const PROBE_KEY: &str = "health-probe";

/// Health check status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// The worse of two statuses
    fn worst(self, other: Self) -> Self {
        match (self, other) {
            (Self::Unhealthy, _) | (_, Self::Unhealthy) => Self::Unhealthy,
            (Self::Degraded, _) | (_, Self::Degraded) => Self::Degraded,
            _ => Self::Healthy,
        }
    }
}

/// Individual component health
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ComponentHealth {
    fn new(name: &str, status: HealthStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: Some(message.into()),
            response_time_ms: start.elapsed().as_millis() as u64,
            details: None,
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Overall health report
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: Vec<ComponentHealth>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl HealthReport {
    pub fn http_status(&self) -> StatusCode {
        match self.status {
            HealthStatus::Healthy => StatusCode::OK,
            HealthStatus::Degraded => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Health checker configuration
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Timeout for individual health checks
    pub check_timeout: Duration,
    /// Cache duration for health results
    pub cache_duration: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_timeout: Duration::from_secs(5),
            cache_duration: Duration::from_secs(10),
        }
    }
}

/// Cached health result
struct CachedHealth {
    report: HealthReport,
    cached_at: Instant,
}

/// Health checker service
pub struct HealthChecker {
    config: HealthConfig,
    start_time: Instant,
    cache: RwLock<Option<CachedHealth>>,
    storage: Arc<dyn Storage>,
    count_cache: Arc<dyn Cache>,
}

impl HealthChecker {
    pub fn new(config: HealthConfig, storage: Arc<dyn Storage>, count_cache: Arc<dyn Cache>) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            cache: RwLock::new(None),
            storage,
            count_cache,
        }
    }

    /// Get cached health or perform checks
    pub async fn check(&self) -> HealthReport {
        {
            let cache = self.cache.read().await;
            if let Some(ref cached) = *cache {
                if cached.cached_at.elapsed() < self.config.cache_duration {
                    debug!("Returning cached health report");
                    return cached.report.clone();
                }
            }
        }

        let report = self.perform_checks().await;

        let mut cache = self.cache.write().await;
        *cache = Some(CachedHealth {
            report: report.clone(),
            cached_at: Instant::now(),
        });

        report
    }

    async fn perform_checks(&self) -> HealthReport {
        let components = vec![
            self.timed("storage", self.check_storage()).await,
            self.timed("cache", self.check_cache()).await,
            self.check_translations(),
        ];
        let status = components
            .iter()
            .fold(HealthStatus::Healthy, |acc, c| acc.worst(c.status));

        HealthReport {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            components,
            timestamp: chrono::Utc::now(),
        }
    }

    async fn timed(
        &self,
        name: &str,
        check: impl std::future::Future<Output = ComponentHealth>,
    ) -> ComponentHealth {
        let start = Instant::now();
        match tokio::time::timeout(self.config.check_timeout, check).await {
            Ok(health) => health,
            Err(_) => {
                warn!(component = name, "Health check timed out");
                ComponentHealth::new(name, HealthStatus::Unhealthy, "Timed out", start)
            }
        }
    }

    /// Round-trip a small file through attachment storage
    async fn check_storage(&self) -> ComponentHealth {
        let start = Instant::now();
        let probe = Bytes::from_static(b"ok");

        let result = async {
            self.storage.put(PROBE_KEY, probe.clone()).await?;
            let read = self.storage.get(PROBE_KEY).await?;
            self.storage.delete(PROBE_KEY).await?;
            Ok::<_, deck_attachments::StorageError>(read == probe)
        }
        .await;

        let details = serde_json::json!({ "backend": self.storage.name() });
        let health = match result {
            Ok(true) => ComponentHealth::new("storage", HealthStatus::Healthy, "Writable", start),
            Ok(false) => ComponentHealth::new(
                "storage",
                HealthStatus::Unhealthy,
                "Read back different content",
                start,
            ),
            Err(e) => {
                warn!(error = %e, "Storage health check failed");
                ComponentHealth::new("storage", HealthStatus::Unhealthy, e.to_string(), start)
            }
        };
        health.with_details(details)
    }

    /// A failing cache only degrades the report
    async fn check_cache(&self) -> ComponentHealth {
        let start = Instant::now();
        let value = serde_json::Value::from(1);

        self.count_cache
            .set(PROBE_KEY, value.clone(), Some(Duration::from_secs(5)))
            .await;
        let ok = self.count_cache.get(PROBE_KEY).await == Some(value);
        self.count_cache.remove(PROBE_KEY).await;

        if ok {
            ComponentHealth::new("cache", HealthStatus::Healthy, "Responding", start)
        } else {
            ComponentHealth::new("cache", HealthStatus::Degraded, "Probe value not returned", start)
        }
    }

    fn check_translations(&self) -> ComponentHealth {
        let start = Instant::now();
        let locales = Catalogs::bundled().locales();
        let status = if locales.is_empty() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        ComponentHealth::new("l10n", status, format!("{} catalogs", locales.len()), start)
            .with_details(serde_json::json!({ "locales": locales }))
    }
}

/// Simple liveness check (Kubernetes)
pub async fn liveness() -> &'static str {
    "OK"
}

/// Full health check
pub async fn health(State(health): State<Arc<HealthChecker>>) -> (StatusCode, Json<HealthReport>) {
    let report = health.check().await;
    let status = report.http_status();
    (status, Json(report))
}
