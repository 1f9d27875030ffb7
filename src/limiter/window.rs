//! Sliding-window rate limiter implementation.

use crate::limiter::config::RateLimitConfig;

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// The result of asking the limiter for admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The call may proceed; its timestamp has been recorded.
    Granted,
    /// The window is full; nothing was recorded.
    Denied {
        /// Time until the oldest in-window entry expires. `None` when the
        /// request can never be granted (more permits than the window
        /// holds).
        wait_hint: Option<Duration>,
    },
}

impl Admission {
    /// Returns `true` if admission was granted.
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }

    /// Returns the wait hint of a denial, if any.
    pub fn wait_hint(&self) -> Option<Duration> {
        match self {
            Self::Granted => None,
            Self::Denied { wait_hint } => *wait_hint,
        }
    }
}

/// A sliding-window rate limiter for one resource.
///
/// The window is a deque of admission timestamps guarded by a mutex;
/// entries older than the window are purged lazily on each check, never by
/// a background task. Admission decisions are linearized by the mutex, so
/// no concurrent interleaving can admit more than `max_calls` calls within
/// any window of the configured duration.
///
/// A limiter built with [`RateLimiter::unlimited`] always grants and
/// records nothing.
#[derive(Debug)]
pub struct RateLimiter {
    config: Option<RateLimitConfig>,
    window: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter enforcing the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config: Some(config),
            window: Mutex::new(VecDeque::new()),
        }
    }

    /// Creates a limiter that always grants admission.
    pub fn unlimited() -> Self {
        Self {
            config: None,
            window: Mutex::new(VecDeque::new()),
        }
    }

    /// Returns the configuration, or `None` for an unlimited limiter.
    pub fn config(&self) -> Option<&RateLimitConfig> {
        self.config.as_ref()
    }

    /// Requests admission for `permits` calls.
    ///
    /// Granted admissions record one timestamp per permit for future window
    /// calculations; denied admissions record nothing.
    pub fn acquire(&self, permits: u32) -> Admission {
        let Some(config) = &self.config else {
            return Admission::Granted;
        };
        if permits == 0 {
            return Admission::Granted;
        }
        if permits > config.max_calls {
            // Unsatisfiable at any point in time
            return Admission::Denied { wait_hint: None };
        }

        let mut window = self
            .window
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Instant::now();
        Self::purge(&mut window, now, config.window);

        if window.len() + permits as usize <= config.max_calls as usize {
            for _ in 0..permits {
                window.push_back(now);
            }
            Admission::Granted
        } else {
            let wait_hint = window
                .front()
                .map(|oldest| config.window.saturating_sub(now.duration_since(*oldest)));
            Admission::Denied { wait_hint }
        }
    }

    /// Requests admission for a single call.
    pub fn acquire_one(&self) -> Admission {
        self.acquire(1)
    }

    /// Waits until admission is granted or `timeout` elapses.
    ///
    /// Suspends only the calling task, re-checking as the window drains.
    /// Returns the last denial if the timeout elapses first, or immediately
    /// if the request can never be granted.
    #[cfg(feature = "tokio-runtime")]
    pub async fn acquire_blocking(&self, permits: u32, timeout: Duration) -> Admission {
        let deadline = Instant::now() + timeout;
        loop {
            match self.acquire(permits) {
                Admission::Granted => return Admission::Granted,
                denied @ Admission::Denied { wait_hint: None } => return denied,
                denied @ Admission::Denied {
                    wait_hint: Some(hint),
                } => {
                    let now = Instant::now();
                    if now >= deadline {
                        return denied;
                    }
                    // Sleep until the oldest entry expires, but never past
                    // the deadline, and always make forward progress.
                    let nap = hint.max(Duration::from_millis(1)).min(deadline - now);
                    tokio::time::sleep(nap).await;
                }
            }
        }
    }

    /// Returns the number of admissions currently inside the window.
    ///
    /// Expired entries are purged first, so the count reflects the window
    /// as of now.
    pub fn in_window(&self) -> usize {
        let Some(config) = &self.config else {
            return 0;
        };
        let mut window = self
            .window
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Self::purge(&mut window, Instant::now(), config.window);
        window.len()
    }

    fn purge(window: &mut VecDeque<Instant>, now: Instant, span: Duration) {
        while let Some(oldest) = window.front() {
            if now.duration_since(*oldest) > span {
                window.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_unlimited_always_grants() {
        let limiter = RateLimiter::unlimited();
        for _ in 0..10_000 {
            assert!(limiter.acquire_one().is_granted());
        }
        assert_eq!(limiter.in_window(), 0);
    }

    #[test]
    fn test_denies_past_limit() {
        let limiter = RateLimiter::new(RateLimitConfig::new(5, Duration::from_secs(10)));

        for _ in 0..5 {
            assert!(limiter.acquire_one().is_granted());
        }

        let denied = limiter.acquire_one();
        assert!(!denied.is_granted());
        assert!(denied.wait_hint().is_some());
        // Denied acquisitions record nothing
        assert_eq!(limiter.in_window(), 5);
    }

    #[test]
    fn test_window_drains() {
        let limiter = RateLimiter::new(RateLimitConfig::new(2, Duration::from_millis(50)));

        assert!(limiter.acquire_one().is_granted());
        assert!(limiter.acquire_one().is_granted());
        assert!(!limiter.acquire_one().is_granted());

        std::thread::sleep(Duration::from_millis(60));
        assert!(limiter.acquire_one().is_granted());
    }

    #[test]
    fn test_multi_permit_acquire() {
        let limiter = RateLimiter::new(RateLimitConfig::new(4, Duration::from_secs(10)));

        assert!(limiter.acquire(3).is_granted());
        assert!(!limiter.acquire(2).is_granted());
        assert!(limiter.acquire(1).is_granted());
        assert_eq!(limiter.in_window(), 4);
    }

    #[test]
    fn test_oversized_request_unsatisfiable() {
        let limiter = RateLimiter::new(RateLimitConfig::new(3, Duration::from_secs(10)));
        let denied = limiter.acquire(4);
        assert!(!denied.is_granted());
        assert_eq!(denied.wait_hint(), None);
    }

    #[test]
    fn test_concurrent_admissions_never_exceed_limit() {
        let limiter = Arc::new(RateLimiter::new(RateLimitConfig::new(
            10,
            Duration::from_secs(60),
        )));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || {
                    let mut granted = 0u32;
                    for _ in 0..100 {
                        if limiter.acquire_one().is_granted() {
                            granted += 1;
                        }
                    }
                    granted
                })
            })
            .collect();

        let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 10);
    }

    #[cfg(feature = "tokio-runtime")]
    #[tokio::test]
    async fn test_acquire_blocking_waits_out_window() {
        let limiter = RateLimiter::new(RateLimitConfig::new(1, Duration::from_millis(30)));

        assert!(limiter.acquire_one().is_granted());

        let start = Instant::now();
        let admission = limiter
            .acquire_blocking(1, Duration::from_millis(500))
            .await;
        assert!(admission.is_granted());
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    #[cfg(feature = "tokio-runtime")]
    #[tokio::test]
    async fn test_acquire_blocking_times_out() {
        let limiter = RateLimiter::new(RateLimitConfig::new(1, Duration::from_secs(60)));

        assert!(limiter.acquire_one().is_granted());

        let admission = limiter
            .acquire_blocking(1, Duration::from_millis(20))
            .await;
        assert!(!admission.is_granted());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Admissions under an arbitrary concurrent arrival pattern
            // never exceed max_calls within one window span.
            #[test]
            fn admitted_never_exceeds_limit(
                max_calls in 1u32..20,
                threads in 1usize..8,
                attempts_per_thread in 1usize..50,
            ) {
                let limiter = Arc::new(RateLimiter::new(RateLimitConfig::new(
                    max_calls,
                    Duration::from_secs(60),
                )));

                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let limiter = Arc::clone(&limiter);
                        std::thread::spawn(move || {
                            (0..attempts_per_thread)
                                .filter(|_| limiter.acquire_one().is_granted())
                                .count()
                        })
                    })
                    .collect();

                let granted: usize =
                    handles.into_iter().map(|h| h.join().unwrap()).sum();
                prop_assert!(granted <= max_calls as usize);
                prop_assert_eq!(limiter.in_window(), granted);
            }
        }
    }
}
