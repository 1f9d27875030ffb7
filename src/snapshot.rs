//! Read-only snapshots of per-resource state for observers.
//!
//! Health checks and dashboards need to see circuit states and failure
//! counts without holding any resource lock. Everything here is a copy
//! taken under the lock for the briefest possible moment and then owned
//! outright by the observer.

use crate::circuit_breaker::CircuitState;
use crate::core::ResourceName;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point-in-time copy of one resource's resilience state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    /// The resource this snapshot describes.
    pub resource: ResourceName,

    /// Current circuit state.
    pub circuit_state: CircuitState,

    /// Consecutive failures while closed; zero in other states.
    pub consecutive_failures: u32,

    /// Failures required to open the circuit.
    pub failure_threshold: u32,

    /// How many times the circuit has opened since process start.
    pub times_opened: u64,

    /// When the last failure was recorded, if any.
    pub last_failure_at: Option<DateTime<Utc>>,

    /// When the circuit last changed state, if ever.
    pub last_transition_at: Option<DateTime<Utc>>,

    /// Admissions currently inside the rate window; `None` when the
    /// resource is not rate limited.
    pub calls_in_window: Option<u32>,

    /// The rate window's capacity; `None` when the resource is not rate
    /// limited.
    pub window_capacity: Option<u32>,
}

impl ResourceSnapshot {
    /// Returns `true` if the circuit is closed.
    pub fn is_healthy(&self) -> bool {
        self.circuit_state == CircuitState::Closed
    }

    /// Returns `true` if the rate window is at capacity.
    pub fn is_saturated(&self) -> bool {
        match (self.calls_in_window, self.window_capacity) {
            (Some(used), Some(capacity)) => used >= capacity,
            _ => false,
        }
    }
}

/// A report over every resource the registry has seen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,

    /// Per-resource snapshots, sorted by resource name.
    pub resources: Vec<ResourceSnapshot>,

    /// `true` when every circuit is closed.
    pub all_ok: bool,
}

impl HealthReport {
    /// Builds a report from snapshots, computing the summary flag.
    pub fn new(mut resources: Vec<ResourceSnapshot>) -> Self {
        resources.sort_by(|a, b| a.resource.cmp(&b.resource));
        let all_ok = resources.iter().all(ResourceSnapshot::is_healthy);
        Self {
            generated_at: Utc::now(),
            resources,
            all_ok,
        }
    }

    /// Returns the snapshot for a resource, if present.
    pub fn resource(&self, name: &str) -> Option<&ResourceSnapshot> {
        self.resources.iter().find(|s| s.resource.as_str() == name)
    }

    /// Renders the report as pretty-printed JSON, the format consumed by
    /// file-based dashboards.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
