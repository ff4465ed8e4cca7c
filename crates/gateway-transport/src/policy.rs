//! Retry and circuit breaker policies.

use gateway_config::TransportConfig;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Exponential backoff for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Retries after the first attempt.
	pub max_retries: u32,
	/// Retry `n` (1-based) waits `base_delay_seconds^n` seconds.
	pub base_delay_seconds: u64,
}

impl RetryPolicy {
	pub fn new(max_retries: u32, base_delay_seconds: u64) -> Self {
		Self {
			max_retries,
			base_delay_seconds,
		}
	}

	/// A policy that never retries.
	pub fn none() -> Self {
		Self::new(0, 0)
	}

	/// Delay before the given retry, counted from 1.
	pub fn delay_for(&self, retry: u32) -> Duration {
		Duration::from_secs(self.base_delay_seconds.saturating_pow(retry))
	}
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self::new(3, 2)
	}
}

/// Thresholds of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
	/// Consecutive transient failures that open the circuit.
	pub failure_threshold: u32,
	/// How long the circuit stays open before a trial call.
	pub open_duration: Duration,
}

impl Default for CircuitBreakerConfig {
	fn default() -> Self {
		Self {
			failure_threshold: 5,
			open_duration: Duration::from_secs(30),
		}
	}
}

/// Timeout and policies applied by the transport service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportPolicies {
	/// Budget of a single attempt.
	pub timeout: Duration,
	pub retry: RetryPolicy,
	pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for TransportPolicies {
	fn default() -> Self {
		Self {
			timeout: Duration::from_secs(10),
			retry: RetryPolicy::default(),
			circuit_breaker: CircuitBreakerConfig::default(),
		}
	}
}

impl From<&TransportConfig> for TransportPolicies {
	fn from(config: &TransportConfig) -> Self {
		Self {
			timeout: config.timeout(),
			retry: RetryPolicy::new(config.retry.max_retries, config.retry.base_delay_seconds),
			circuit_breaker: CircuitBreakerConfig {
				failure_threshold: config.circuit_breaker.failure_threshold,
				open_duration: Duration::from_secs(config.circuit_breaker.open_seconds),
			},
		}
	}
}

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
	/// Calls flow; consecutive transient failures are counted.
	Closed,
	/// Calls fail fast until the open period elapses.
	Open,
	/// One trial call is allowed through.
	HalfOpen,
}

impl fmt::Display for CircuitState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CircuitState::Closed => write!(f, "closed"),
			CircuitState::Open => write!(f, "open"),
			CircuitState::HalfOpen => write!(f, "half-open"),
		}
	}
}

#[derive(Debug)]
enum BreakerState {
	Closed { failures: u32 },
	Open { until: Instant },
	HalfOpen { trial_in_flight: bool },
}

/// Consecutive-failure circuit breaker.
///
/// The breaker only sees transient failures and successes. Cancelled attempts
/// and non-transient errors release a half-open trial without changing the
/// failure count.
#[derive(Debug)]
pub struct CircuitBreaker {
	config: CircuitBreakerConfig,
	state: Mutex<BreakerState>,
}

impl CircuitBreaker {
	pub fn new(config: CircuitBreakerConfig) -> Self {
		Self {
			config,
			state: Mutex::new(BreakerState::Closed { failures: 0 }),
		}
	}

	fn lock(&self) -> MutexGuard<'_, BreakerState> {
		self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	/// Current state, with an elapsed open period reported as half-open.
	pub fn state(&self) -> CircuitState {
		match *self.lock() {
			BreakerState::Closed { .. } => CircuitState::Closed,
			BreakerState::Open { until } if Instant::now() >= until => CircuitState::HalfOpen,
			BreakerState::Open { .. } => CircuitState::Open,
			BreakerState::HalfOpen { .. } => CircuitState::HalfOpen,
		}
	}

	/// Consecutive transient failures counted while closed.
	pub fn consecutive_failures(&self) -> u32 {
		match *self.lock() {
			BreakerState::Closed { failures } => failures,
			_ => self.config.failure_threshold,
		}
	}

	/// Asks permission for one attempt.
	///
	/// Returns the remaining open time when the call must fail fast. The
	/// permit gives the half-open trial slot back if it is dropped before a
	/// verdict is recorded on it.
	pub fn try_acquire(&self) -> Result<BreakerPermit<'_>, Duration> {
		let mut state = self.lock();
		match *state {
			BreakerState::Closed { .. } => {},
			BreakerState::Open { until } => {
				let now = Instant::now();
				if now < until {
					return Err(until - now);
				}
				tracing::info!("Circuit half-open, letting a trial call through");
				*state = BreakerState::HalfOpen { trial_in_flight: true };
			},
			BreakerState::HalfOpen { trial_in_flight: true } => return Err(Duration::ZERO),
			BreakerState::HalfOpen { trial_in_flight: false } => {
				*state = BreakerState::HalfOpen { trial_in_flight: true };
			},
		}
		Ok(BreakerPermit {
			breaker: self,
			settled: false,
		})
	}

	pub fn record_success(&self) {
		let mut state = self.lock();
		if matches!(*state, BreakerState::HalfOpen { .. }) {
			tracing::info!("Trial call succeeded, circuit closed");
		}
		*state = BreakerState::Closed { failures: 0 };
	}

	pub fn record_failure(&self) {
		let mut state = self.lock();
		let open_until = Instant::now() + self.config.open_duration;
		match *state {
			BreakerState::Closed { failures } => {
				let failures = failures + 1;
				if failures >= self.config.failure_threshold {
					tracing::warn!(
						failures,
						open_seconds = self.config.open_duration.as_secs(),
						"Circuit opened"
					);
					*state = BreakerState::Open { until: open_until };
				} else {
					*state = BreakerState::Closed { failures };
				}
			},
			BreakerState::HalfOpen { .. } => {
				tracing::warn!("Trial call failed, circuit re-opened");
				*state = BreakerState::Open { until: open_until };
			},
			BreakerState::Open { .. } => {},
		}
	}

	/// Gives back a half-open trial slot that ended without a verdict.
	pub fn release(&self) {
		let mut state = self.lock();
		if let BreakerState::HalfOpen { trial_in_flight: true } = *state {
			*state = BreakerState::HalfOpen { trial_in_flight: false };
		}
	}
}

/// Permission for one attempt through a [`CircuitBreaker`].
///
/// Dropping an unsettled permit releases the half-open trial slot, which
/// covers attempts whose future is dropped mid-flight.
#[derive(Debug)]
#[must_use = "dropping the permit releases it without a verdict"]
pub struct BreakerPermit<'a> {
	breaker: &'a CircuitBreaker,
	settled: bool,
}

impl BreakerPermit<'_> {
	pub fn success(mut self) {
		self.settled = true;
		self.breaker.record_success();
	}

	pub fn failure(mut self) {
		self.settled = true;
		self.breaker.record_failure();
	}
}

impl Drop for BreakerPermit<'_> {
	fn drop(&mut self) {
		if !self.settled {
			self.breaker.release();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn breaker() -> CircuitBreaker {
		CircuitBreaker::new(CircuitBreakerConfig {
			failure_threshold: 2,
			open_duration: Duration::from_secs(30),
		})
	}

	#[test]
	fn test_backoff_is_exponential() {
		let policy = RetryPolicy::default();
		assert_eq!(policy.delay_for(1), Duration::from_secs(2));
		assert_eq!(policy.delay_for(2), Duration::from_secs(4));
		assert_eq!(policy.delay_for(3), Duration::from_secs(8));
	}

	#[tokio::test(start_paused = true)]
	async fn test_opens_after_threshold_and_half_opens() {
		let breaker = breaker();
		breaker.record_failure();
		assert_eq!(breaker.state(), CircuitState::Closed);
		assert_eq!(breaker.consecutive_failures(), 1);

		breaker.record_failure();
		assert_eq!(breaker.state(), CircuitState::Open);
		assert_eq!(breaker.try_acquire().err(), Some(Duration::from_secs(30)));

		tokio::time::advance(Duration::from_secs(30)).await;
		assert_eq!(breaker.state(), CircuitState::HalfOpen);
		let trial = breaker.try_acquire().unwrap();
		// Only one trial at a time
		assert_eq!(breaker.try_acquire().err(), Some(Duration::ZERO));

		trial.success();
		assert_eq!(breaker.state(), CircuitState::Closed);
		assert_eq!(breaker.consecutive_failures(), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn test_failed_trial_reopens() {
		let breaker = breaker();
		breaker.record_failure();
		breaker.record_failure();
		tokio::time::advance(Duration::from_secs(30)).await;

		breaker.try_acquire().unwrap().failure();
		assert_eq!(breaker.state(), CircuitState::Open);
		assert!(breaker.try_acquire().is_err());
	}

	#[tokio::test(start_paused = true)]
	async fn test_dropped_trial_permit_is_released() {
		let breaker = breaker();
		breaker.record_failure();
		breaker.record_failure();
		tokio::time::advance(Duration::from_secs(30)).await;

		let trial = breaker.try_acquire().unwrap();
		drop(trial);
		assert_eq!(breaker.state(), CircuitState::HalfOpen);

		let retaken = breaker.try_acquire().unwrap();
		retaken.success();
		assert_eq!(breaker.state(), CircuitState::Closed);
	}

	#[test]
	fn test_closed_permits_are_independent() {
		let breaker = breaker();
		let first = breaker.try_acquire().unwrap();
		let second = breaker.try_acquire().unwrap();
		first.failure();
		drop(second);
		assert_eq!(breaker.consecutive_failures(), 1);
	}

	#[test]
	fn test_success_resets_count() {
		let breaker = breaker();
		breaker.record_failure();
		breaker.record_success();
		breaker.record_failure();
		assert_eq!(breaker.state(), CircuitState::Closed);
	}
}
