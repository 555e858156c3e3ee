#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! # Multi-key sliding-window rate limiter
//!
//! Admits callers at a rate no greater than `R` requests per `W` per key,
//! across a pool of `K` keys, from any number of concurrent callers, with
//! minimum wait (`spec.md` §4.1).
//!
//! The admission algorithm: for each key, maintain a bounded queue of the
//! last `R` admission timestamps (a monotonic [`Instant`]). A key is
//! *immediately available* if its queue has fewer than `R` entries or its
//! oldest entry is older than `W`. `acquire` scans keys under a single
//! mutex held only for the O(K) scan; if nothing is available it computes
//! the minimum wait across all keys, releases the mutex, sleeps
//! `min_wait + epsilon`, and retries. Sleeping outside the lock lets other
//! callers observe state changes while this one waits.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Small buffer added to the computed wait so two callers racing through
/// the same wakeup don't spin against each other.
const WAIT_EPSILON: Duration = Duration::from_millis(10);

#[derive(Debug)]
struct KeyHistory {
    key: String,
    admissions: VecDeque<Instant>,
}

/// A thread-safe, multi-key sliding-window rate limiter.
///
/// A panic inside `acquire` (e.g. a poisoned mutex) is fatal and is not
/// caught — there is no recoverable failure mode for this component
/// (`spec.md` §4.1).
#[derive(Debug)]
pub struct KeyRateLimiter {
    rate_limit: usize,
    window: Duration,
    state: Mutex<Vec<KeyHistory>>,
}

impl KeyRateLimiter {
    /// Builds a limiter over `keys`, each individually budgeted for
    /// `rate_limit` admissions per `window`.
    ///
    /// # Panics
    /// Panics if `keys` is empty or `rate_limit` is zero — both indicate a
    /// misconfigured caller, not a recoverable runtime condition.
    pub fn new(keys: Vec<String>, rate_limit: usize, window: Duration) -> Self {
        assert!(!keys.is_empty(), "KeyRateLimiter requires at least one key");
        assert!(rate_limit > 0, "KeyRateLimiter requires rate_limit > 0");

        let state = keys
            .into_iter()
            .map(|key| KeyHistory {
                key,
                admissions: VecDeque::with_capacity(rate_limit),
            })
            .collect();

        Self {
            rate_limit,
            window,
            state: Mutex::new(state),
        }
    }

    /// Tries to admit a call immediately. On success, returns the admitted
    /// key and records `now` in its history. On failure, returns the
    /// minimum duration the caller must wait before retrying.
    fn try_acquire(&self) -> Result<String, Duration> {
        let now = Instant::now();
        let mut state = self.state.lock();

        for entry in state.iter_mut() {
            if entry.admissions.len() < self.rate_limit {
                entry.admissions.push_back(now);
                return Ok(entry.key.clone());
            }
            if let Some(&oldest) = entry.admissions.front() {
                if now.duration_since(oldest) > self.window {
                    entry.admissions.pop_front();
                    entry.admissions.push_back(now);
                    return Ok(entry.key.clone());
                }
            }
        }

        let min_wait = state
            .iter()
            .filter_map(|entry| entry.admissions.front())
            .map(|&oldest| {
                let elapsed = now.duration_since(oldest);
                self.window.saturating_sub(elapsed)
            })
            .min()
            .unwrap_or(WAIT_EPSILON);

        Err(min_wait)
    }

    /// Blocks the current OS thread until a key is available, returning it.
    /// Intended for callers outside the async runtime.
    pub fn acquire_blocking(&self) -> String {
        loop {
            match self.try_acquire() {
                Ok(key) => return key,
                Err(wait) => {
                    tracing::trace!(?wait, "all keys cooling down, blocking thread");
                    std::thread::sleep(wait + WAIT_EPSILON);
                }
            }
        }
    }

    /// Awaits until a key is available, returning it. The returned future
    /// only ever awaits a `tokio::time::sleep`, so callers may race it
    /// against a cancellation signal (e.g. `tokio::select!` with a
    /// `CancellationToken`) to make the wait abortable, per `spec.md` §5.
    pub async fn acquire(&self) -> String {
        loop {
            match self.try_acquire() {
                Ok(key) => return key,
                Err(wait) => {
                    tracing::trace!(?wait, "all keys cooling down, awaiting");
                    tokio::time::sleep(wait + WAIT_EPSILON).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_rate_limit_per_key_immediately() {
        let limiter = KeyRateLimiter::new(
            vec!["k1".to_string(), "k2".to_string()],
            2,
            Duration::from_secs(60),
        );

        // S1 from spec.md §8: keys = [k1, k2], R=2, W=60s.
        // First four acquires must return k1, k2, k1, k2 without blocking.
        assert_eq!(limiter.acquire_blocking(), "k1");
        assert_eq!(limiter.acquire_blocking(), "k2");
        assert_eq!(limiter.acquire_blocking(), "k1");
        assert_eq!(limiter.acquire_blocking(), "k2");
    }

    #[test]
    fn blocks_once_both_keys_are_exhausted() {
        let limiter = KeyRateLimiter::new(vec!["k1".to_string()], 1, Duration::from_millis(50));

        let first = limiter.acquire_blocking();
        assert_eq!(first, "k1");

        let start = Instant::now();
        let second = limiter.acquire_blocking();
        assert_eq!(second, "k1");
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn async_acquire_admits_immediately_under_budget() {
        let limiter = KeyRateLimiter::new(vec!["k1".to_string()], 3, Duration::from_secs(60));
        let start = Instant::now();
        for _ in 0..3 {
            assert_eq!(limiter.acquire().await, "k1");
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn async_acquire_waits_for_window_to_expire() {
        let limiter = KeyRateLimiter::new(vec!["k1".to_string()], 1, Duration::from_millis(80));
        assert_eq!(limiter.acquire().await, "k1");

        let start = Instant::now();
        assert_eq!(limiter.acquire().await, "k1");
        assert!(start.elapsed() >= Duration::from_millis(70));
    }

    #[test]
    #[should_panic(expected = "at least one key")]
    fn rejects_empty_key_pool() {
        KeyRateLimiter::new(vec![], 1, Duration::from_secs(1));
    }
}
