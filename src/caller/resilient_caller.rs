//! The resilient caller: rate limiter, circuit breaker, and retry policy
//! composed behind one call contract.

use crate::caller::policy::ResourcePolicy;
use crate::caller::registry::ResourceRegistry;
use crate::core::{ConfigError, ResourceName};
use crate::snapshot::{HealthReport, ResourceSnapshot};

use std::collections::HashMap;
use std::sync::Arc;

#[cfg(feature = "tokio-runtime")]
use crate::core::{CallError, Retryable};
#[cfg(feature = "tokio-runtime")]
use crate::events;
#[cfg(feature = "tokio-runtime")]
use crate::limiter::Admission;
#[cfg(feature = "tokio-runtime")]
use std::future::Future;
#[cfg(feature = "tokio-runtime")]
use std::time::{Duration, Instant};
#[cfg(feature = "tokio-runtime")]
use uuid::Uuid;

/// Builder for creating a [`ResilientCaller`].
pub struct ResilientCallerBuilder {
    default_policy: ResourcePolicy,
    policies: HashMap<ResourceName, ResourcePolicy>,
}

impl ResilientCallerBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            default_policy: ResourcePolicy::default(),
            policies: HashMap::new(),
        }
    }

    /// Sets the policy applied to resources not named explicitly.
    pub fn default_policy(mut self, policy: ResourcePolicy) -> Self {
        self.default_policy = policy;
        self
    }

    /// Sets the policy for one named resource.
    pub fn resource(mut self, name: impl Into<ResourceName>, policy: ResourcePolicy) -> Self {
        self.policies.insert(name.into(), policy);
        self
    }

    /// Builds the caller, validating every policy.
    pub fn build(self) -> Result<ResilientCaller, ConfigError> {
        self.default_policy.validate()?;
        for policy in self.policies.values() {
            policy.validate()?;
        }
        Ok(ResilientCaller {
            registry: Arc::new(ResourceRegistry::new(self.default_policy, self.policies)),
        })
    }
}

impl Default for ResilientCallerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs fallible operations against named resources under that resource's
/// rate limit, circuit breaker, and retry policy.
///
/// The call sequence is:
///
/// 1. Ask the rate limiter for admission; a denial fails with
///    [`CallError::RateLimited`] (or waits out the window when the policy
///    says to queue).
/// 2. Ask the circuit breaker; an open circuit fails with
///    [`CallError::CircuitOpen`] without invoking the operation.
/// 3. Run the operation under the retry policy, reporting every attempt's
///    outcome to the breaker as it resolves, so the circuit opens on real
///    attempt failures, not only on policy-level give-ups. The breaker is
///    re-consulted before each attempt; a circuit that opened mid-call
///    stops further attempts.
///
/// The caller is cheap to clone and safe to share across tasks; state for
/// different resources never contends.
///
/// # Example
///
/// ```rust,ignore
/// use callguard::{ResilientCaller, ResourcePolicy, RateLimitConfig};
///
/// let caller = ResilientCaller::builder()
///     .resource(
///         "gemini",
///         ResourcePolicy::new().with_rate_limit(RateLimitConfig::per_minute(60)),
///     )
///     .build()?;
///
/// let summary = caller
///     .call("gemini", || client.summarize(&articles))
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct ResilientCaller {
    registry: Arc<ResourceRegistry>,
}

impl ResilientCaller {
    /// Creates a new builder.
    pub fn builder() -> ResilientCallerBuilder {
        ResilientCallerBuilder::new()
    }

    /// Returns a shared handle to the underlying registry, for
    /// observability collaborators.
    pub fn registry(&self) -> Arc<ResourceRegistry> {
        Arc::clone(&self.registry)
    }

    /// Returns a snapshot of one resource, or `None` if it has not been
    /// seen yet.
    pub fn snapshot(&self, resource: &str) -> Option<ResourceSnapshot> {
        self.registry.snapshot(resource)
    }

    /// Builds a health report over every resource seen so far.
    pub fn health_report(&self) -> HealthReport {
        self.registry.health_report()
    }

    /// Runs `operation` against `resource` with no deadline.
    #[cfg(feature = "tokio-runtime")]
    pub async fn call<T, E, F, Fut>(
        &self,
        resource: impl Into<ResourceName>,
        operation: F,
    ) -> Result<T, CallError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + std::error::Error,
    {
        self.call_inner(resource.into(), None, operation).await
    }

    /// Runs `operation` against `resource`, failing with
    /// [`CallError::Timeout`] once `deadline` passes.
    ///
    /// No attempt starts after the deadline, a backoff that would cross it
    /// is abandoned, and an in-flight attempt is cancelled when it is
    /// reached.
    #[cfg(feature = "tokio-runtime")]
    pub async fn call_with_deadline<T, E, F, Fut>(
        &self,
        resource: impl Into<ResourceName>,
        deadline: Instant,
        operation: F,
    ) -> Result<T, CallError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + std::error::Error,
    {
        self.call_inner(resource.into(), Some(deadline), operation)
            .await
    }

    /// Runs `operation` against `resource` with a deadline of now plus
    /// `timeout`.
    #[cfg(feature = "tokio-runtime")]
    pub async fn call_with_timeout<T, E, F, Fut>(
        &self,
        resource: impl Into<ResourceName>,
        timeout: Duration,
        operation: F,
    ) -> Result<T, CallError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + std::error::Error,
    {
        self.call_with_deadline(resource, Instant::now() + timeout, operation)
            .await
    }

    #[cfg(feature = "tokio-runtime")]
    async fn call_inner<T, E, F, Fut>(
        &self,
        resource: ResourceName,
        deadline: Option<Instant>,
        mut operation: F,
    ) -> Result<T, CallError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + std::error::Error,
    {
        let entry = self.registry.entry(&resource);
        let call_id = Uuid::new_v4();
        let started = Instant::now();

        tracing::debug!(
            call_id = %call_id,
            resource = %resource,
            "starting guarded call"
        );

        // Stage 1: rate limiter. The limiter is charged once per call;
        // retries below do not re-enter it.
        let mut admission = entry.limiter.acquire_one();
        if !admission.is_granted() && entry.policy.queue_on_rate_limit {
            let budget = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                // Without a deadline, one window span is the worst case
                // for a slot to free up.
                None => entry
                    .limiter
                    .config()
                    .map(|c| c.window)
                    .unwrap_or(Duration::ZERO),
            };
            admission = entry.limiter.acquire_blocking(1, budget).await;
        }
        if let Admission::Denied { wait_hint } = admission {
            let deadline_hit = deadline.is_some_and(|d| Instant::now() >= d);
            let error = if deadline_hit {
                CallError::Timeout {
                    resource: resource.clone(),
                    elapsed: started.elapsed(),
                }
            } else {
                tracing::warn!(
                    call_id = %call_id,
                    resource = %resource,
                    wait_hint = ?wait_hint,
                    "rate limit denied admission"
                );
                CallError::RateLimited {
                    resource: resource.clone(),
                    wait_hint,
                }
            };
            events::emit_call_completed(call_id, &resource, error.stage(), 0, started.elapsed());
            return Err(error);
        }

        // Stages 2 and 3: breaker admission and the retried operation.
        let retry = entry.policy.retry;
        let mut attempt = 0u32;
        loop {
            // Never start an attempt past the deadline
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    let error = CallError::Timeout {
                        resource: resource.clone(),
                        elapsed: started.elapsed(),
                    };
                    events::emit_call_completed(
                        call_id,
                        &resource,
                        error.stage(),
                        attempt,
                        started.elapsed(),
                    );
                    return Err(error);
                }
            }

            if let Err(rejection) = entry.breaker.try_acquire() {
                let error = CallError::CircuitOpen {
                    resource: resource.clone(),
                    retry_in: rejection.retry_in,
                };
                events::emit_call_completed(
                    call_id,
                    &resource,
                    error.stage(),
                    attempt,
                    started.elapsed(),
                );
                return Err(error);
            }

            attempt += 1;
            let result = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    match tokio::time::timeout(remaining, operation()).await {
                        Ok(result) => result,
                        Err(_) => {
                            // The attempt consumed the dependency's time
                            // without an answer; count it against the
                            // breaker and fail the call.
                            entry.breaker.record_failure();
                            let error = CallError::Timeout {
                                resource: resource.clone(),
                                elapsed: started.elapsed(),
                            };
                            events::emit_call_completed(
                                call_id,
                                &resource,
                                error.stage(),
                                attempt,
                                started.elapsed(),
                            );
                            return Err(error);
                        }
                    }
                }
                None => operation().await,
            };

            match result {
                Ok(value) => {
                    entry.breaker.record_success();
                    tracing::debug!(
                        call_id = %call_id,
                        resource = %resource,
                        attempt,
                        "call succeeded"
                    );
                    events::emit_call_completed(
                        call_id,
                        &resource,
                        "ok",
                        attempt,
                        started.elapsed(),
                    );
                    return Ok(value);
                }
                Err(error) => {
                    entry.breaker.record_failure();
                    let retryable = error.is_retryable();
                    tracing::warn!(
                        call_id = %call_id,
                        resource = %resource,
                        attempt,
                        retryable,
                        error = %error,
                        "attempt failed"
                    );

                    if !retryable {
                        let error = CallError::NonRetryable {
                            resource: resource.clone(),
                            source: error,
                        };
                        events::emit_call_completed(
                            call_id,
                            &resource,
                            error.stage(),
                            attempt,
                            started.elapsed(),
                        );
                        return Err(error);
                    }
                    if attempt >= retry.max_attempts {
                        let error = CallError::RetriesExhausted {
                            resource: resource.clone(),
                            attempts: attempt,
                            source: error,
                        };
                        events::emit_call_completed(
                            call_id,
                            &resource,
                            error.stage(),
                            attempt,
                            started.elapsed(),
                        );
                        return Err(error);
                    }

                    let delay = retry.jittered(retry.backoff_delay(attempt));
                    if let Some(deadline) = deadline {
                        if Instant::now() + delay >= deadline {
                            let error = CallError::Timeout {
                                resource: resource.clone(),
                                elapsed: started.elapsed(),
                            };
                            events::emit_call_completed(
                                call_id,
                                &resource,
                                error.stage(),
                                attempt,
                                started.elapsed(),
                            );
                            return Err(error);
                        }
                    }
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(all(test, feature = "tokio-runtime"))]
mod tests {
    use super::*;
    use crate::circuit_breaker::{BreakerConfig, CircuitState};
    use crate::limiter::RateLimitConfig;
    use crate::mock::{MockError, MockOutcome, MockService};
    use crate::retry::RetryPolicy;
    use std::time::Duration;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new()
            .with_max_attempts(3)
            .with_base_delay(Duration::from_millis(2))
            .with_max_delay(Duration::from_millis(10))
            .with_jitter(false)
    }

    fn caller_with(policy: ResourcePolicy) -> ResilientCaller {
        ResilientCaller::builder()
            .default_policy(policy)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_call_passes_through() {
        let caller = caller_with(ResourcePolicy::new().with_retry(fast_retry()));
        let service = MockService::new("gemini");

        let result = caller.call("gemini", || service.invoke()).await.unwrap();
        assert_eq!(result, 1);
        assert!(caller.snapshot("gemini").unwrap().is_healthy());
    }

    #[tokio::test]
    async fn test_rate_limit_denies_sixth_call() {
        let caller = caller_with(
            ResourcePolicy::new()
                .with_rate_limit(RateLimitConfig::new(5, Duration::from_secs(10)))
                .with_retry(fast_retry()),
        );
        let service = MockService::new("newsapi");

        for _ in 0..5 {
            assert!(caller.call("newsapi", || service.invoke()).await.is_ok());
        }

        let error = caller
            .call("newsapi", || service.invoke())
            .await
            .unwrap_err();
        assert!(error.is_rate_limited());
        // The operation never ran for the denied call
        assert_eq!(service.invocations(), 5);
    }

    #[tokio::test]
    async fn test_rate_limit_queue_waits_for_slot() {
        let caller = caller_with(
            ResourcePolicy::new()
                .with_rate_limit(RateLimitConfig::new(1, Duration::from_millis(30)))
                .with_retry(fast_retry())
                .with_queue_on_rate_limit(true),
        );
        let service = MockService::new("newsapi");

        assert!(caller.call("newsapi", || service.invoke()).await.is_ok());

        let start = Instant::now();
        assert!(caller.call("newsapi", || service.invoke()).await.is_ok());
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    #[tokio::test]
    async fn test_circuit_opens_and_short_circuits() {
        let caller = caller_with(
            ResourcePolicy::new()
                .with_breaker(
                    BreakerConfig::new()
                        .with_failure_threshold(3)
                        .with_open_duration(Duration::from_secs(60)),
                )
                .with_retry(RetryPolicy::no_retry()),
        );
        let service = MockService::always_failing("gemini");

        for _ in 0..3 {
            let error = caller.call("gemini", || service.invoke()).await.unwrap_err();
            assert!(matches!(error, CallError::RetriesExhausted { .. }));
        }
        assert_eq!(service.invocations(), 3);

        // Circuit is now open: rejected without invoking the operation
        let error = caller.call("gemini", || service.invoke()).await.unwrap_err();
        assert!(error.is_circuit_open());
        assert_eq!(service.invocations(), 3);

        let snapshot = caller.snapshot("gemini").unwrap();
        assert_eq!(snapshot.circuit_state, CircuitState::Open);
        assert_eq!(snapshot.times_opened, 1);
    }

    #[tokio::test]
    async fn test_probe_admitted_after_open_duration() {
        let caller = caller_with(
            ResourcePolicy::new()
                .with_breaker(
                    BreakerConfig::new()
                        .with_failure_threshold(1)
                        .with_open_duration(Duration::from_millis(30)),
                )
                .with_retry(RetryPolicy::no_retry()),
        );
        // One failure trips the circuit; the service recovers afterwards
        let service = MockService::new("gemini").fail_times(1);

        assert!(caller.call("gemini", || service.invoke()).await.is_err());
        assert!(caller
            .call("gemini", || service.invoke())
            .await
            .unwrap_err()
            .is_circuit_open());

        tokio::time::sleep(Duration::from_millis(40)).await;

        // Admitted as the probe; success closes the circuit
        assert!(caller.call("gemini", || service.invoke()).await.is_ok());
        let snapshot = caller.snapshot("gemini").unwrap();
        assert_eq!(snapshot.circuit_state, CircuitState::Closed);
        assert_eq!(snapshot.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn test_retries_exhausted_counts_attempts() {
        let caller = caller_with(
            ResourcePolicy::new()
                .with_breaker(BreakerConfig::new().with_failure_threshold(10))
                .with_retry(fast_retry()),
        );
        let service = MockService::always_failing("gemini");

        let error = caller.call("gemini", || service.invoke()).await.unwrap_err();
        match error {
            CallError::RetriesExhausted { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(service.invocations(), 3);

        // Every real attempt fed the breaker, not just the give-up
        let snapshot = caller.snapshot("gemini").unwrap();
        assert_eq!(snapshot.consecutive_failures, 3);
    }

    #[tokio::test]
    async fn test_non_retryable_stops_after_one_attempt() {
        let caller = caller_with(ResourcePolicy::new().with_retry(fast_retry()));
        let service =
            MockService::new("gemini").with_default_outcome(MockOutcome::FailFatal);

        let error = caller.call("gemini", || service.invoke()).await.unwrap_err();
        assert!(matches!(error, CallError::NonRetryable { .. }));
        assert_eq!(service.invocations(), 1);
    }

    #[tokio::test]
    async fn test_circuit_opened_mid_call_stops_retries() {
        // Threshold below max_attempts: the circuit opens while the retry
        // loop is still willing to try
        let caller = caller_with(
            ResourcePolicy::new()
                .with_breaker(
                    BreakerConfig::new()
                        .with_failure_threshold(2)
                        .with_open_duration(Duration::from_secs(60)),
                )
                .with_retry(fast_retry().with_max_attempts(5)),
        );
        let service = MockService::always_failing("gemini");

        let error = caller.call("gemini", || service.invoke()).await.unwrap_err();
        assert!(error.is_circuit_open());
        assert_eq!(service.invocations(), 2);
    }

    #[tokio::test]
    async fn test_deadline_cancels_hanging_operation() {
        let caller = caller_with(ResourcePolicy::new().with_retry(fast_retry()));
        let service = MockService::new("whatsapp").with_default_outcome(MockOutcome::Hang);

        let start = Instant::now();
        let error = caller
            .call_with_timeout("whatsapp", Duration::from_millis(40), || service.invoke())
            .await
            .unwrap_err();

        assert!(error.is_timeout());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_deadline_bounds_backoff() {
        let caller = caller_with(
            ResourcePolicy::new()
                .with_breaker(BreakerConfig::new().with_failure_threshold(100))
                .with_retry(
                    RetryPolicy::new()
                        .with_max_attempts(50)
                        .with_base_delay(Duration::from_millis(30))
                        .with_jitter(false),
                ),
        );
        let service = MockService::always_failing("gemini");

        let error = caller
            .call_with_timeout("gemini", Duration::from_millis(50), || service.invoke())
            .await
            .unwrap_err();

        assert!(error.is_timeout());
        // Only a couple of 30ms backoffs fit under a 50ms deadline
        assert!(service.invocations() <= 3);
    }

    #[tokio::test]
    async fn test_unconfigured_resource_is_unlimited() {
        let caller = caller_with(ResourcePolicy::new().with_retry(fast_retry()));
        let service = MockService::new("anything");

        for _ in 0..50 {
            assert!(caller.call("anything", || service.invoke()).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_resources_do_not_interfere() {
        let caller = ResilientCaller::builder()
            .resource(
                "gemini",
                ResourcePolicy::new()
                    .with_breaker(BreakerConfig::new().with_failure_threshold(1))
                    .with_retry(RetryPolicy::no_retry()),
            )
            .build()
            .unwrap();

        let broken = MockService::always_failing("gemini");
        let healthy = MockService::new("newsapi");

        let _ = caller.call("gemini", || broken.invoke()).await;
        assert!(caller
            .call("gemini", || broken.invoke())
            .await
            .unwrap_err()
            .is_circuit_open());

        // The other resource is unaffected
        assert!(caller.call("newsapi", || healthy.invoke()).await.is_ok());

        let report = caller.health_report();
        assert!(!report.all_ok);
        assert!(report.resource("newsapi").unwrap().is_healthy());
        assert!(!report.resource("gemini").unwrap().is_healthy());
    }

    #[tokio::test]
    async fn test_concurrent_calls_share_rate_window() {
        use futures::future::join_all;

        let caller = caller_with(
            ResourcePolicy::new()
                .with_rate_limit(RateLimitConfig::new(10, Duration::from_secs(60)))
                .with_retry(RetryPolicy::no_retry()),
        );
        let service = std::sync::Arc::new(MockService::new("gemini"));

        let futures: Vec<_> = (0..40)
            .map(|_| {
                let caller = caller.clone();
                let service = std::sync::Arc::clone(&service);
                async move { caller.call("gemini", || service.invoke()).await }
            })
            .collect();

        let results: Vec<Result<u64, CallError<MockError>>> = join_all(futures).await;
        let granted = results.iter().filter(|r| r.is_ok()).count();
        let denied = results
            .iter()
            .filter(|r| matches!(r, Err(e) if e.is_rate_limited()))
            .count();

        assert_eq!(granted, 10);
        assert_eq!(denied, 30);
        assert_eq!(service.invocations(), 10);
    }

    #[test]
    fn test_builder_rejects_invalid_policy() {
        let result = ResilientCaller::builder()
            .resource(
                "gemini",
                ResourcePolicy::new()
                    .with_breaker(BreakerConfig::new().with_failure_threshold(0)),
            )
            .build();
        assert!(result.is_err());
    }
}
