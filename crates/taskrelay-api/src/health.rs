//! `GET /health`: aggregate status across Scheduler, Runtime, Dispatcher,
//! and every registered notifier.

use std::collections::HashMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ComponentHealth {
    pub fn running(is_running: bool) -> Self {
        Self {
            status: if is_running { HealthStatus::Healthy } else { HealthStatus::Unhealthy },
            details: if is_running { None } else { Some("not running".to_string()) },
        }
    }

    pub fn healthy() -> Self {
        Self { status: HealthStatus::Healthy, details: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub uptime_secs: u64,
    pub components: HashMap<String, ComponentHealth>,
}

pub struct HealthEndpoint {
    start_time: Instant,
}

impl HealthEndpoint {
    pub fn new() -> Self {
        Self { start_time: Instant::now() }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn check(&self, components: HashMap<String, ComponentHealth>) -> HealthResponse {
        let status = components.values().map(|c| c.status).fold(HealthStatus::Healthy, |acc, s| {
            if s == HealthStatus::Unhealthy || acc == HealthStatus::Unhealthy {
                HealthStatus::Unhealthy
            } else if s == HealthStatus::Degraded || acc == HealthStatus::Degraded {
                HealthStatus::Degraded
            } else {
                HealthStatus::Healthy
            }
        });

        HealthResponse { status, uptime_secs: self.uptime_secs(), components }
    }
}

impl Default for HealthEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_healthy_components_yield_healthy_overall() {
        let endpoint = HealthEndpoint::new();
        let mut components = HashMap::new();
        components.insert("scheduler".to_string(), ComponentHealth::healthy());
        let response = endpoint.check(components);
        assert_eq!(response.status, HealthStatus::Healthy);
    }

    #[test]
    fn one_unhealthy_component_makes_overall_unhealthy() {
        let endpoint = HealthEndpoint::new();
        let mut components = HashMap::new();
        components.insert("scheduler".to_string(), ComponentHealth::healthy());
        components.insert("runtime".to_string(), ComponentHealth::running(false));
        let response = endpoint.check(components);
        assert_eq!(response.status, HealthStatus::Unhealthy);
    }
}
