//! Rate governance
//!
//! Combines header-driven request spacing, exponential error backoff and a
//! hard token-bucket ceiling (governor crate).

use chrono::{DateTime, TimeZone, Utc};
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use rand::Rng;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

const HEADER_LIMIT: &str = "x-ratelimit-limit";
const HEADER_REMAINING: &str = "x-ratelimit-remaining";
const HEADER_RESET: &str = "x-ratelimit-reset";
const HEADER_RETRY_AFTER: &str = "retry-after";

/// Reset values below this are deltas in seconds, not unix timestamps
const RESET_EPOCH_THRESHOLD: i64 = 1_000_000_000;

/// Configuration for the rate governor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateGovernorConfig {
    /// Minimum spacing between consecutive requests
    pub min_interval_ms: u64,
    /// Upper bound on a single pacing wait
    pub max_interval_ms: u64,
    /// Backoff after the first consecutive error
    pub base_backoff_ms: u64,
    /// Upper bound on a single backoff wait
    pub max_backoff_ms: u64,
    /// Maximum jitter as a fraction of the backoff
    pub jitter_ratio: f64,
    /// Turn jitter off even when callers request it
    pub disable_jitter: bool,
    /// Hard request ceiling (0 disables it)
    pub max_requests_per_second: u32,
}

impl Default for RateGovernorConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 1_000,
            max_interval_ms: 60_000,
            base_backoff_ms: 1_000,
            max_backoff_ms: 300_000,
            jitter_ratio: 0.5,
            disable_jitter: false,
            max_requests_per_second: 10,
        }
    }
}

impl RateGovernorConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Config with every wait collapsed to zero
    pub fn unthrottled() -> Self {
        Self {
            min_interval_ms: 0,
            max_interval_ms: 0,
            base_backoff_ms: 0,
            max_backoff_ms: 0,
            jitter_ratio: 0.0,
            disable_jitter: true,
            max_requests_per_second: 0,
        }
    }

    /// Set the minimum spacing
    #[must_use]
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set backoff bounds
    #[must_use]
    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.base_backoff_ms = base.as_millis() as u64;
        self.max_backoff_ms = max.as_millis() as u64;
        self
    }

    /// Disable jitter globally
    #[must_use]
    pub fn without_jitter(mut self) -> Self {
        self.disable_jitter = true;
        self
    }

    /// Set the hard request ceiling
    #[must_use]
    pub fn with_ceiling(mut self, requests_per_second: u32) -> Self {
        self.max_requests_per_second = requests_per_second;
        self
    }
}

/// Last observed server limits plus the local error streak
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateState {
    /// Advertised request budget per window
    pub limit: Option<u32>,
    /// Requests left in the current window
    pub remaining: Option<u32>,
    /// When the current window resets
    pub reset_at: Option<DateTime<Utc>>,
    /// One-shot server-requested delay
    pub retry_after: Option<Duration>,
    /// Errors since the last success
    pub consecutive_errors: u32,
    last_request: Option<Instant>,
}

type Ceiling = Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Paces requests and backs off after failures.
///
/// Cheap to clone; clones share state, so one governor may pace several
/// pipelines talking to the same service.
#[derive(Clone)]
pub struct RateGovernor {
    config: Arc<RateGovernorConfig>,
    state: Arc<Mutex<RateState>>,
    ceiling: Option<Arc<Ceiling>>,
}

impl RateGovernor {
    /// Create a new governor with the given config
    pub fn new(config: RateGovernorConfig) -> Self {
        let ceiling = NonZeroU32::new(config.max_requests_per_second)
            .map(|rps| Arc::new(Governor::direct(Quota::per_second(rps).allow_burst(rps))));

        Self {
            config: Arc::new(config),
            state: Arc::new(Mutex::new(RateState::default())),
            ceiling,
        }
    }

    /// Governor that never waits
    pub fn unthrottled() -> Self {
        Self::new(RateGovernorConfig::unthrottled())
    }

    /// Config in use
    pub fn config(&self) -> &RateGovernorConfig {
        &self.config
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> RateState {
        self.lock().clone()
    }

    /// Suspend the caller until the next request may be sent.
    ///
    /// Normal calls enforce spacing since the previous request. Retry calls
    /// bump the error streak and back off exponentially, optionally with
    /// jitter.
    pub async fn wait(&self, is_retry: bool, use_jitter: bool) {
        let delay = self.next_delay(is_retry, use_jitter);

        if !delay.is_zero() {
            debug!(
                "Waiting {:?} before next request{}",
                delay,
                if is_retry { " (backoff)" } else { "" }
            );
            tokio::time::sleep(delay).await;
        }

        if let Some(ref ceiling) = self.ceiling {
            ceiling.until_ready().await;
        }

        self.lock().last_request = Some(Instant::now());
    }

    /// Compute the wait for the next request from a consistent snapshot.
    ///
    /// Retry calls count as an error; the streak is part of the result.
    pub fn next_delay(&self, is_retry: bool, use_jitter: bool) -> Duration {
        let mut state = self.lock();

        if is_retry {
            state.consecutive_errors = state.consecutive_errors.saturating_add(1);
            let backoff = self.backoff(state.consecutive_errors);
            let ceiling = Duration::from_millis(self.config.max_backoff_ms);
            let backoff = match state.retry_after.take() {
                Some(retry_after) => backoff.max(retry_after.min(ceiling)),
                None => backoff,
            };
            if use_jitter && !self.config.disable_jitter {
                backoff.saturating_add(self.jitter(backoff))
            } else {
                backoff
            }
        } else {
            let interval = self.pacing_interval(&mut state, Utc::now());
            match state.last_request {
                Some(last) => interval.saturating_sub(last.elapsed()),
                None => Duration::ZERO,
            }
        }
    }

    /// Update state from response headers; unknown or malformed values are ignored
    pub fn observe(&self, headers: &HeaderMap) {
        let limit = header_value::<u32>(headers, HEADER_LIMIT);
        let remaining = header_value::<u32>(headers, HEADER_REMAINING);
        let reset = header_value::<i64>(headers, HEADER_RESET).and_then(reset_instant);
        let retry_after = header_value::<u64>(headers, HEADER_RETRY_AFTER).map(Duration::from_secs);

        let mut state = self.lock();
        if limit.is_some() {
            state.limit = limit;
        }
        if remaining.is_some() {
            state.remaining = remaining;
        }
        if reset.is_some() {
            state.reset_at = reset;
        }
        if retry_after.is_some() {
            state.retry_after = retry_after;
        }
    }

    /// Clear the error streak after a successful request
    pub fn reset_errors(&self) {
        self.lock().consecutive_errors = 0;
    }

    fn backoff(&self, errors: u32) -> Duration {
        let factor = 2u64.saturating_pow(errors.saturating_sub(1));
        let ms = self.config.base_backoff_ms.saturating_mul(factor);
        Duration::from_millis(ms.min(self.config.max_backoff_ms))
    }

    fn jitter(&self, backoff: Duration) -> Duration {
        let max_ms = (backoff.as_millis() as f64 * self.config.jitter_ratio.max(0.0)) as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=max_ms))
    }

    fn pacing_interval(&self, state: &mut RateState, now: DateTime<Utc>) -> Duration {
        let mut interval = Duration::from_millis(self.config.min_interval_ms);

        if let Some(retry_after) = state.retry_after.take() {
            interval = interval.max(retry_after);
        }

        if let (Some(remaining), Some(reset_at)) = (state.remaining, state.reset_at) {
            let until_reset = (reset_at - now).to_std().unwrap_or(Duration::ZERO);
            let spacing = if remaining == 0 {
                until_reset
            } else {
                until_reset / remaining
            };
            interval = interval.max(spacing);
        }

        interval.min(Duration::from_millis(
            self.config.max_interval_ms.max(self.config.min_interval_ms),
        ))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RateGovernor {
    fn default() -> Self {
        Self::new(RateGovernorConfig::default())
    }
}

impl std::fmt::Debug for RateGovernor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateGovernor")
            .field("config", &self.config)
            .field("has_ceiling", &self.ceiling.is_some())
            .finish_non_exhaustive()
    }
}

fn header_value<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

fn reset_instant(value: i64) -> Option<DateTime<Utc>> {
    if value >= RESET_EPOCH_THRESHOLD {
        Utc.timestamp_opt(value, 0).single()
    } else {
        Some(Utc::now() + chrono::Duration::seconds(value.max(0)))
    }
}

#[cfg(test)]
mod rate_limit_tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    fn quiet_config() -> RateGovernorConfig {
        RateGovernorConfig::new()
            .with_min_interval(Duration::from_millis(100))
            .with_backoff(Duration::from_millis(100), Duration::from_secs(1))
            .without_jitter()
            .with_ceiling(0)
    }

    #[test]
    fn test_config_default() {
        let config = RateGovernorConfig::default();
        assert_eq!(config.min_interval_ms, 1_000);
        assert_eq!(config.base_backoff_ms, 1_000);
        assert!(!config.disable_jitter);
        assert_eq!(config.max_requests_per_second, 10);
    }

    #[test]
    fn test_first_request_does_not_wait() {
        let governor = RateGovernor::new(quiet_config());
        assert_eq!(governor.next_delay(false, false), Duration::ZERO);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let governor = RateGovernor::new(quiet_config());
        let delays: Vec<_> = (0..6).map(|_| governor.next_delay(true, false)).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(800),
                Duration::from_secs(1),
                Duration::from_secs(1),
            ]
        );
        assert_eq!(governor.snapshot().consecutive_errors, 6);
    }

    #[test]
    fn test_reset_errors_restarts_backoff() {
        let governor = RateGovernor::new(quiet_config());
        governor.next_delay(true, false);
        governor.next_delay(true, false);
        governor.reset_errors();
        assert_eq!(governor.snapshot().consecutive_errors, 0);
        assert_eq!(governor.next_delay(true, false), Duration::from_millis(100));
    }

    #[test]
    fn test_jitter_stays_within_ratio() {
        let mut config = quiet_config();
        config.disable_jitter = false;
        config.jitter_ratio = 0.5;
        let governor = RateGovernor::new(config);

        for _ in 0..20 {
            governor.reset_errors();
            let delay = governor.next_delay(true, true);
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(150));
        }
    }

    #[test]
    fn test_disabled_jitter_wins() {
        let governor = RateGovernor::new(quiet_config());
        assert_eq!(governor.next_delay(true, true), Duration::from_millis(100));
    }

    #[test]
    fn test_observe_updates_state() {
        let governor = RateGovernor::new(quiet_config());
        governor.observe(&headers(&[
            (HEADER_LIMIT, "100"),
            (HEADER_REMAINING, "42"),
            (HEADER_RESET, "1700000000"),
        ]));

        let state = governor.snapshot();
        assert_eq!(state.limit, Some(100));
        assert_eq!(state.remaining, Some(42));
        assert_eq!(state.reset_at.unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_observe_ignores_missing_and_malformed() {
        let governor = RateGovernor::new(quiet_config());
        governor.observe(&headers(&[(HEADER_LIMIT, "100"), (HEADER_REMAINING, "7")]));
        governor.observe(&headers(&[
            (HEADER_REMAINING, "lots"),
            ("x-unrelated", "1"),
        ]));

        let state = governor.snapshot();
        assert_eq!(state.limit, Some(100));
        assert_eq!(state.remaining, Some(7));
        assert!(state.reset_at.is_none());
    }

    #[test]
    fn test_exhausted_budget_waits_for_reset() {
        let governor = RateGovernor::new(quiet_config());
        let mut state = RateState {
            remaining: Some(0),
            reset_at: Some(Utc::now() + chrono::Duration::milliseconds(800)),
            ..RateState::default()
        };
        let interval = governor.pacing_interval(&mut state, Utc::now());
        assert!(interval > Duration::from_millis(500));
        assert!(interval <= Duration::from_millis(800));
    }

    #[test]
    fn test_budget_spreads_over_window() {
        let governor = RateGovernor::new(quiet_config());
        let now = Utc::now();
        let mut state = RateState {
            remaining: Some(10),
            reset_at: Some(now + chrono::Duration::seconds(5)),
            ..RateState::default()
        };
        assert_eq!(
            governor.pacing_interval(&mut state, now),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn test_pacing_is_capped() {
        let mut config = quiet_config();
        config.max_interval_ms = 2_000;
        let governor = RateGovernor::new(config);
        let now = Utc::now();
        let mut state = RateState {
            remaining: Some(0),
            reset_at: Some(now + chrono::Duration::hours(1)),
            ..RateState::default()
        };
        assert_eq!(
            governor.pacing_interval(&mut state, now),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn test_retry_after_is_consumed_once() {
        let config =
            quiet_config().with_backoff(Duration::from_millis(100), Duration::from_secs(10));
        let governor = RateGovernor::new(config);
        governor.observe(&headers(&[(HEADER_RETRY_AFTER, "3")]));
        assert_eq!(governor.next_delay(true, false), Duration::from_secs(3));
        assert_eq!(governor.next_delay(true, false), Duration::from_millis(200));
    }

    #[test]
    fn test_retry_after_is_capped_by_max_backoff() {
        let governor = RateGovernor::new(quiet_config());
        governor.observe(&headers(&[(HEADER_RETRY_AFTER, "86400")]));
        assert_eq!(governor.next_delay(true, false), Duration::from_secs(1));
    }

    #[test]
    fn test_huge_retry_after_with_jitter_does_not_overflow() {
        let mut config = quiet_config();
        config.disable_jitter = false;
        config.jitter_ratio = 0.5;
        let governor = RateGovernor::new(config);

        governor.observe(&headers(&[(HEADER_RETRY_AFTER, "18446744073709551615")]));
        let delay = governor.next_delay(true, true);
        assert!(delay >= Duration::from_secs(1));
        assert!(delay <= Duration::from_millis(1_500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_enforces_spacing() {
        let governor = RateGovernor::new(quiet_config());
        governor.wait(false, false).await;

        let start = Instant::now();
        governor.wait(false, false).await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_shared_governor_is_consistent_across_tasks() {
        let governor = RateGovernor::unthrottled();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let governor = governor.clone();
            handles.push(tokio::spawn(async move {
                governor.wait(true, true).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(governor.snapshot().consecutive_errors, 8);
    }
}
