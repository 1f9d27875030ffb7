//! Per-resource state registry.

use crate::caller::policy::ResourcePolicy;
use crate::circuit_breaker::CircuitBreaker;
use crate::core::ResourceName;
use crate::limiter::RateLimiter;
use crate::snapshot::{HealthReport, ResourceSnapshot};

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// The live resilience state for one resource.
#[derive(Debug)]
pub(crate) struct ResourceEntry {
    pub(crate) policy: ResourcePolicy,
    pub(crate) breaker: CircuitBreaker,
    pub(crate) limiter: RateLimiter,
}

impl ResourceEntry {
    fn new(resource: ResourceName, policy: ResourcePolicy) -> Self {
        let limiter = match policy.rate_limit {
            Some(config) => RateLimiter::new(config),
            None => RateLimiter::unlimited(),
        };
        let breaker = CircuitBreaker::new(resource, policy.breaker);
        Self {
            policy,
            breaker,
            limiter,
        }
    }

    fn snapshot(&self, resource: &ResourceName) -> ResourceSnapshot {
        let state = self.breaker.state();
        let metrics = self.breaker.metrics();
        let window_capacity = self.limiter.config().map(|c| c.max_calls);
        ResourceSnapshot {
            resource: resource.clone(),
            circuit_state: state.tag(),
            consecutive_failures: state.consecutive_failures().unwrap_or(0),
            failure_threshold: self.breaker.config().failure_threshold,
            times_opened: metrics.times_opened,
            last_failure_at: metrics.last_failure_at,
            last_transition_at: metrics.last_transition_at,
            calls_in_window: window_capacity.map(|_| self.limiter.in_window() as u32),
            window_capacity,
        }
    }
}

/// Owns the breaker and limiter state for every named resource.
///
/// The registry is an explicit object created by the composition root and
/// passed by reference to whoever needs it; there are no process-wide
/// singletons. Entries are created lazily the first time a resource name
/// is seen (named resources get their configured policy, unknown ones the
/// default policy) and live for the lifetime of the process. A restarted
/// process starts every resource closed with an empty rate window.
///
/// The registry map is read-mostly and guarded by its own lock; each
/// entry's mutable state is guarded by that resource's locks, so calls on
/// different resources never block each other.
#[derive(Debug)]
pub struct ResourceRegistry {
    default_policy: ResourcePolicy,
    policies: HashMap<ResourceName, ResourcePolicy>,
    entries: RwLock<HashMap<ResourceName, Arc<ResourceEntry>>>,
}

impl ResourceRegistry {
    /// Creates a registry. Policies must already be validated; the public
    /// construction path is [`ResilientCaller::builder`](crate::caller::ResilientCaller::builder).
    pub(crate) fn new(
        default_policy: ResourcePolicy,
        policies: HashMap<ResourceName, ResourcePolicy>,
    ) -> Self {
        Self {
            default_policy,
            policies,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the entry for a resource, creating it on first sight.
    pub(crate) fn entry(&self, resource: &ResourceName) -> Arc<ResourceEntry> {
        {
            let entries = self
                .entries
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(entry) = entries.get(resource) {
                return Arc::clone(entry);
            }
        }

        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Double-checked: another caller may have created it meanwhile
        if let Some(entry) = entries.get(resource) {
            return Arc::clone(entry);
        }

        let policy = self
            .policies
            .get(resource)
            .cloned()
            .unwrap_or_else(|| self.default_policy.clone());
        let entry = Arc::new(ResourceEntry::new(resource.clone(), policy));
        entries.insert(resource.clone(), Arc::clone(&entry));
        entry
    }

    /// Returns the names of every resource seen so far.
    pub fn resources(&self) -> Vec<ResourceName> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    /// Returns a snapshot of one resource, or `None` if it has not been
    /// seen yet.
    pub fn snapshot(&self, resource: &str) -> Option<ResourceSnapshot> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries
            .get_key_value(resource)
            .map(|(name, entry)| entry.snapshot(name))
    }

    /// Builds a health report over every resource seen so far.
    pub fn health_report(&self) -> HealthReport {
        let snapshots: Vec<ResourceSnapshot> = {
            let entries = self
                .entries
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            entries
                .iter()
                .map(|(name, entry)| entry.snapshot(name))
                .collect()
        };
        HealthReport::new(snapshots)
    }
}
