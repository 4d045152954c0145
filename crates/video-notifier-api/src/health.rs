//! Health and readiness reporting for `/__health` and `/__gtg`.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use video_notifier_core::auth::CredentialRenewer;

/// Health check result for individual components
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct HealthCheckResult {
    pub healthy: bool,
    pub message: String,
    pub duration_ms: u64,
}

/// Overall health status
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub is_healthy: bool,
    pub checks: HashMap<String, HealthCheckResult>,
}

/// Interface for system health monitoring
#[async_trait::async_trait]
pub trait HealthChecker: Send + Sync {
    /// Component checks backing `/__health`
    async fn check_health(&self) -> HealthStatus;

    /// Whether the service should receive traffic, backing `/__gtg`
    async fn check_readiness(&self) -> bool;
}

/// Health checker reporting on configuration and credential state.
///
/// The bearer token is obtained lazily on the first 401, so a missing token
/// is reported but never makes the service unhealthy.
pub struct DefaultHealthChecker {
    account_id: String,
    credentials: Option<Arc<dyn CredentialRenewer>>,
}

impl DefaultHealthChecker {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            credentials: None,
        }
    }

    /// Include the bearer token state in the report
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialRenewer>) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

#[async_trait::async_trait]
impl HealthChecker for DefaultHealthChecker {
    async fn check_health(&self) -> HealthStatus {
        let start = std::time::Instant::now();
        let mut checks = HashMap::new();

        checks.insert(
            "service".to_string(),
            HealthCheckResult {
                healthy: true,
                message: "Service is running".to_string(),
                duration_ms: start.elapsed().as_millis() as u64,
            },
        );

        let configured = !self.account_id.trim().is_empty();
        checks.insert(
            "configuration".to_string(),
            HealthCheckResult {
                healthy: configured,
                message: if configured {
                    format!("Handling notifications for account {}", self.account_id)
                } else {
                    "No account id configured".to_string()
                },
                duration_ms: start.elapsed().as_millis() as u64,
            },
        );

        if let Some(credentials) = &self.credentials {
            let has_token = !credentials.bearer_token().is_empty();
            checks.insert(
                "credentials".to_string(),
                HealthCheckResult {
                    healthy: true,
                    message: if has_token {
                        "Access token obtained".to_string()
                    } else {
                        "No access token yet, renewed on first use".to_string()
                    },
                    duration_ms: start.elapsed().as_millis() as u64,
                },
            );
        }

        HealthStatus {
            is_healthy: checks.values().all(|c| c.healthy),
            checks,
        }
    }

    async fn check_readiness(&self) -> bool {
        self.check_health().await.is_healthy
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
