//! Prometheus metrics for the notification service.
//!
//! Metrics live in a per-instance [`Registry`] rather than the process-global
//! one, so several routers (as in tests) can coexist in one process.

use async_trait::async_trait;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;
use std::time::Duration;
use video_notifier_core::auth::{BearerToken, CredentialRenewer};
use video_notifier_core::AuthError;

/// Notification path label for `/notify`
pub const PUSH_PATH: &str = "push";

/// Notification path label for `/force-notify/{id}`
pub const FORCE_PATH: &str = "force";

/// Service metrics for observability
#[derive(Debug, Clone)]
pub struct NotifierMetrics {
    registry: Registry,

    /// Handled notifications by path and outcome
    pub notifications_total: IntCounterVec,

    /// Failed notifications by path and failed stage
    pub notification_failures_total: IntCounterVec,

    /// Credential renewals by result
    pub credential_renewals_total: IntCounterVec,

    /// End-to-end handling time by path
    pub notification_duration_seconds: HistogramVec,
}

impl NotifierMetrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new_custom(Some("video_notifier".to_string()), None)?;

        let notifications_total = IntCounterVec::new(
            Opts::new("notifications_total", "Notifications handled by outcome"),
            &["path", "outcome"],
        )?;
        let notification_failures_total = IntCounterVec::new(
            Opts::new(
                "notification_failures_total",
                "Failed notifications by pipeline stage",
            ),
            &["path", "stage"],
        )?;
        let credential_renewals_total = IntCounterVec::new(
            Opts::new("credential_renewals_total", "Access token renewals"),
            &["result"],
        )?;
        let notification_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "notification_duration_seconds",
                "Notification processing time distribution",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["path"],
        )?;

        registry.register(Box::new(notifications_total.clone()))?;
        registry.register(Box::new(notification_failures_total.clone()))?;
        registry.register(Box::new(credential_renewals_total.clone()))?;
        registry.register(Box::new(notification_duration_seconds.clone()))?;

        Ok(Arc::new(Self {
            registry,
            notifications_total,
            notification_failures_total,
            credential_renewals_total,
            notification_duration_seconds,
        }))
    }

    pub fn record_outcome(&self, path: &str, outcome: &str, duration: Duration) {
        self.notifications_total
            .with_label_values(&[path, outcome])
            .inc();
        self.notification_duration_seconds
            .with_label_values(&[path])
            .observe(duration.as_secs_f64());
    }

    pub fn record_failure(&self, path: &str, stage: &str, duration: Duration) {
        self.record_outcome(path, "failed", duration);
        self.notification_failures_total
            .with_label_values(&[path, stage])
            .inc();
    }

    pub fn record_renewal(&self, success: bool) {
        let result = if success { "success" } else { "failure" };
        self.credential_renewals_total
            .with_label_values(&[result])
            .inc();
    }

    /// Prometheus text exposition of every registered metric
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

/// [`CredentialRenewer`] decorator counting renewals.
pub struct MeteredRenewer {
    inner: Arc<dyn CredentialRenewer>,
    metrics: Arc<NotifierMetrics>,
}

impl MeteredRenewer {
    pub fn new(inner: Arc<dyn CredentialRenewer>, metrics: Arc<NotifierMetrics>) -> Self {
        Self { inner, metrics }
    }
}

#[async_trait]
impl CredentialRenewer for MeteredRenewer {
    fn bearer_token(&self) -> BearerToken {
        self.inner.bearer_token()
    }

    async fn renew(&self) -> Result<(), AuthError> {
        let result = self.inner.renew().await;
        self.metrics.record_renewal(result.is_ok());
        result
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
