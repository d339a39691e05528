//! Subsystem health reporting

use std::sync::Arc;

use serde::Serialize;

use super::events::Event;
use super::logger::Logger;

/// "Is this subsystem OK" capability
pub trait HealthCheck: Send + Sync {
    fn name(&self) -> &str;
    fn is_healthy(&self) -> bool;
}

/// One component's entry in a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub healthy: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub version: String,
    pub components: Vec<ComponentHealth>,
}

impl HealthReport {
    pub fn unhealthy_components(&self) -> impl Iterator<Item = &ComponentHealth> {
        self.components.iter().filter(|c| !c.healthy)
    }
}

/// Aggregates registered checks, in registration order
#[derive(Default)]
pub struct HealthCoordinator {
    checks: Vec<Arc<dyn HealthCheck>>,
}

impl HealthCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, check: Arc<dyn HealthCheck>) {
        self.checks.push(check);
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Poll every check. Unhealthy components are logged as `HEALTH_DEGRADED`.
    pub fn report(&self) -> HealthReport {
        let components: Vec<ComponentHealth> = self
            .checks
            .iter()
            .map(|check| ComponentHealth {
                name: check.name().to_string(),
                healthy: check.is_healthy(),
            })
            .collect();

        for component in components.iter().filter(|c| !c.healthy) {
            Logger::log(
                Event::HealthDegraded.severity(),
                Event::HealthDegraded.as_str(),
                &[("component", &component.name)],
            );
        }

        HealthReport {
            healthy: components.iter().all(|c| c.healthy),
            version: env!("CARGO_PKG_VERSION").to_string(),
            components,
        }
    }
}
