//! Application-layer contracts consumed by outer layers (HTTP, CLI, workers).
//!
//! Nothing here performs IO. Handlers typically load an aggregate through an
//! [`AggregateRepository`](crate::ports::AggregateRepository), invoke a domain method and
//! save it back.

use async_trait::async_trait;
use serde::Serialize;

/// Handles one command type.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    type Command: Send + 'static;
    type Output: Send;
    type Error: std::error::Error + Send + Sync + 'static;

    async fn handle(&self, command: Self::Command) -> Result<Self::Output, Self::Error>;
}

/// Handles one query type against a read model.
#[async_trait]
pub trait QueryHandler: Send + Sync {
    type Query: Send + 'static;
    type Output: Send;
    type Error: std::error::Error + Send + Sync + 'static;

    async fn handle(&self, query: Self::Query) -> Result<Self::Output, Self::Error>;
}

/// Result of a [`HealthCheck`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// Liveness check for an adapter.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    fn name(&self) -> &str;

    async fn check(&self) -> HealthStatus;
}

/// Run every check and collect `(name, status)` pairs in input order.
pub async fn check_all(checks: &[&dyn HealthCheck]) -> Vec<(String, HealthStatus)> {
    let mut report = Vec::with_capacity(checks.len());
    for check in checks {
        report.push((check.name().to_string(), check.check().await));
    }
    report
}
