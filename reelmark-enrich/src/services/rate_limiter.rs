//! Adaptive request-rate limiter
//!
//! Spaces outbound calls `1 / current_rate` seconds apart. The rate is not a
//! fixed ceiling: throttling responses (HTTP 429) step it down towards
//! `min_rate`, successful responses step it back up towards `max_rate`, so
//! throughput settles at what the server tolerates.

use std::sync::{Mutex as StdMutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Rate limiter tuning (requests/second)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitConfig {
    pub initial_rate: f64,
    pub min_rate: f64,
    pub max_rate: f64,
    pub increase_step: f64,
    pub decrease_step: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            initial_rate: 4.0,
            min_rate: 1.0,
            max_rate: 10.0,
            increase_step: 0.5,
            decrease_step: 1.0,
        }
    }
}

/// Current rate and its bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateState {
    pub current_rate: f64,
    pub min_rate: f64,
    pub max_rate: f64,
}

impl RateState {
    /// Minimum spacing between two calls at the current rate
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.current_rate)
    }
}

/// Rate limiter owned by a single API client instance
pub struct AdaptiveRateLimiter {
    last_request: Mutex<Option<Instant>>,
    state: StdMutex<RateState>,
    increase_step: f64,
    decrease_step: f64,
}

impl AdaptiveRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        // Rates must stay positive so the interval is finite
        let min_rate = config.min_rate.max(0.01);
        let max_rate = config.max_rate.max(min_rate);
        let current_rate = config.initial_rate.clamp(min_rate, max_rate);

        Self {
            last_request: Mutex::new(None),
            state: StdMutex::new(RateState {
                current_rate,
                min_rate,
                max_rate,
            }),
            increase_step: config.increase_step.abs(),
            decrease_step: config.decrease_step.abs(),
        }
    }

    /// Wait if necessary to respect the current rate, then record the call time
    ///
    /// Concurrent callers queue on the internal lock, so calls are spaced
    /// even when several tasks share the client.
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let interval = self.state().interval();
            let elapsed = last_time.elapsed();
            if elapsed < interval {
                let wait_time = interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }

    /// Server signalled "too many requests": step the rate down
    pub fn on_throttled(&self) {
        let mut state = self.lock_state();
        let previous = state.current_rate;
        state.current_rate = (state.current_rate - self.decrease_step).max(state.min_rate);
        tracing::warn!(
            previous_rate = previous,
            current_rate = state.current_rate,
            "Throttled by remote API, lowering request rate"
        );
    }

    /// Successful response: step the rate up
    pub fn on_success(&self) {
        let mut state = self.lock_state();
        state.current_rate = (state.current_rate + self.increase_step).min(state.max_rate);
    }

    /// Snapshot of the current rate state
    pub fn state(&self) -> RateState {
        *self.lock_state()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, RateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for AdaptiveRateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}
