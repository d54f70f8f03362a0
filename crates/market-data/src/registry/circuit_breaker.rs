//! Per-adapter circuit breaker.
//!
//! - **Closed**: calls go through; consecutive transient failures are counted.
//! - **Open**: calls are skipped until the recovery timeout has passed.
//! - **HalfOpen**: one trial call is let through at a time; success closes
//!   the circuit, failure opens it again. A trial call that ends without a
//!   verdict (rate limited, or never sent) frees the slot for the next
//!   caller. A trial call that never reports back is presumed lost after the
//!   recovery timeout.
//!
//! Only `TransientError` outcomes count as failures. A confirmed "no data"
//! answer proves the provider is healthy, and rate limiting is handled by
//! the cache TTL instead.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::models::Outcome;

const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
const DEFAULT_RECOVERY_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "Closed"),
            Self::Open => write!(f, "Open"),
            Self::HalfOpen => write!(f, "HalfOpen"),
        }
    }
}

#[derive(Debug)]
struct Circuit {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_started: Option<Instant>,
}

impl Default for Circuit {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            trial_started: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CircuitBreakerConfig {
    /// Consecutive transient failures that open the circuit.
    pub failure_threshold: u32,
    /// How long an open circuit stays open before a trial call.
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            recovery_timeout: DEFAULT_RECOVERY_TIMEOUT,
        }
    }
}

/// In-memory breaker state for every adapter; resets on restart.
#[derive(Default)]
pub struct CircuitBreaker {
    circuits: Mutex<HashMap<String, Circuit>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CircuitBreakerConfig) -> Self {
        Self {
            circuits: Mutex::new(HashMap::new()),
            config,
        }
    }

    fn lock_circuits(&self) -> MutexGuard<'_, HashMap<String, Circuit>> {
        self.circuits.lock().unwrap_or_else(|poisoned| {
            warn!("Circuit breaker mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Whether a call to `provider` may go out now. Moves an expired Open
    /// circuit to HalfOpen and hands out its single trial slot.
    pub fn is_allowed(&self, provider: &str) -> bool {
        let mut circuits = self.lock_circuits();
        let circuit = circuits.entry(provider.to_string()).or_default();
        let recovery = self.config.recovery_timeout;

        match circuit.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => {
                let lost = circuit
                    .trial_started
                    .map_or(true, |t| t.elapsed() >= recovery);
                if lost {
                    circuit.trial_started = Some(Instant::now());
                }
                lost
            }
            CircuitState::Open => {
                let elapsed = circuit.opened_at.map(|t| t.elapsed());
                if elapsed.is_some_and(|e| e >= recovery) {
                    info!("Circuit for '{}' half-open, probing", provider);
                    circuit.state = CircuitState::HalfOpen;
                    circuit.trial_started = Some(Instant::now());
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Feeds the outcome of one call into the breaker.
    pub fn record(&self, provider: &str, outcome: Outcome) {
        match outcome {
            Outcome::Success | Outcome::ConfirmedNoData => self.record_success(provider),
            Outcome::TransientError => self.record_failure(provider),
            Outcome::RateLimited => self.release_trial(provider),
        }
    }

    /// Frees the HalfOpen trial slot without a verdict. No-op otherwise.
    pub fn release_trial(&self, provider: &str) {
        if let Some(circuit) = self.lock_circuits().get_mut(provider) {
            if circuit.state == CircuitState::HalfOpen && circuit.trial_started.take().is_some() {
                debug!("Trial call for '{}' released without a verdict", provider);
            }
        }
    }

    pub fn record_success(&self, provider: &str) {
        let mut circuits = self.lock_circuits();
        let circuit = circuits.entry(provider.to_string()).or_default();
        if circuit.state != CircuitState::Closed {
            info!("Circuit for '{}' closed", provider);
        }
        *circuit = Circuit::default();
    }

    pub fn record_failure(&self, provider: &str) {
        let mut circuits = self.lock_circuits();
        let circuit = circuits.entry(provider.to_string()).or_default();
        circuit.consecutive_failures += 1;

        let trip = match circuit.state {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => circuit.consecutive_failures >= self.config.failure_threshold,
            CircuitState::Open => false,
        };
        if trip {
            info!(
                "Circuit for '{}' opened after {} consecutive failures",
                provider, circuit.consecutive_failures
            );
            circuit.state = CircuitState::Open;
            circuit.opened_at = Some(Instant::now());
            circuit.trial_started = None;
        } else {
            debug!(
                "Failure for '{}' ({}/{})",
                provider, circuit.consecutive_failures, self.config.failure_threshold
            );
        }
    }

    pub fn state(&self, provider: &str) -> CircuitState {
        self.lock_circuits()
            .get(provider)
            .map(|c| c.state)
            .unwrap_or(CircuitState::Closed)
    }

    pub fn reset(&self, provider: &str) {
        self.lock_circuits().remove(provider);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, recovery: Duration) -> CircuitBreaker {
        CircuitBreaker::with_config(CircuitBreakerConfig {
            failure_threshold: threshold,
            recovery_timeout: recovery,
        })
    }

    #[test]
    fn test_opens_after_threshold() {
        let cb = breaker(3, Duration::from_secs(60));
        for _ in 0..2 {
            cb.record("A", Outcome::TransientError);
        }
        assert!(cb.is_allowed("A"));
        cb.record("A", Outcome::TransientError);
        assert_eq!(cb.state("A"), CircuitState::Open);
        assert!(!cb.is_allowed("A"));
    }

    #[test]
    fn test_no_data_and_rate_limits_do_not_trip() {
        let cb = breaker(1, Duration::from_secs(60));
        cb.record("A", Outcome::ConfirmedNoData);
        cb.record("A", Outcome::RateLimited);
        assert_eq!(cb.state("A"), CircuitState::Closed);
    }

    #[test]
    fn test_success_resets_failure_count() {
        let cb = breaker(2, Duration::from_secs(60));
        cb.record("A", Outcome::TransientError);
        cb.record("A", Outcome::Success);
        cb.record("A", Outcome::TransientError);
        assert!(cb.is_allowed("A"));
    }

    #[test]
    fn test_half_open_trial() {
        let cb = breaker(1, Duration::ZERO);
        cb.record("A", Outcome::TransientError);
        assert_eq!(cb.state("A"), CircuitState::Open);

        // recovery timeout of zero: next check is a trial
        assert!(cb.is_allowed("A"));
        assert_eq!(cb.state("A"), CircuitState::HalfOpen);

        cb.record("A", Outcome::TransientError);
        assert_eq!(cb.state("A"), CircuitState::Open);

        assert!(cb.is_allowed("A"));
        cb.record("A", Outcome::Success);
        assert_eq!(cb.state("A"), CircuitState::Closed);
    }

    fn half_open(cb: &CircuitBreaker, recovery: Duration) {
        cb.record("A", Outcome::TransientError);
        std::thread::sleep(recovery + Duration::from_millis(50));
        assert!(cb.is_allowed("A"));
        assert_eq!(cb.state("A"), CircuitState::HalfOpen);
    }

    #[test]
    fn test_half_open_lets_one_trial_through() {
        let recovery = Duration::from_millis(300);
        let cb = breaker(1, recovery);
        half_open(&cb, recovery);

        // trial still in flight
        assert!(!cb.is_allowed("A"));
        assert!(!cb.is_allowed("A"));

        cb.record("A", Outcome::Success);
        assert_eq!(cb.state("A"), CircuitState::Closed);
        assert!(cb.is_allowed("A"));
    }

    #[test]
    fn test_rate_limited_trial_frees_the_slot() {
        let recovery = Duration::from_millis(300);
        let cb = breaker(1, recovery);
        half_open(&cb, recovery);

        cb.record("A", Outcome::RateLimited);
        assert_eq!(cb.state("A"), CircuitState::HalfOpen);
        assert!(cb.is_allowed("A"));
        assert!(!cb.is_allowed("A"));

        cb.release_trial("A");
        assert!(cb.is_allowed("A"));
        cb.record("A", Outcome::TransientError);
        assert_eq!(cb.state("A"), CircuitState::Open);
        assert!(!cb.is_allowed("A"));
    }

    #[test]
    fn test_lost_trial_is_replaced_after_recovery_timeout() {
        let recovery = Duration::from_millis(200);
        let cb = breaker(1, recovery);
        half_open(&cb, recovery);
        assert!(!cb.is_allowed("A"));

        std::thread::sleep(recovery + Duration::from_millis(50));
        assert!(cb.is_allowed("A"));
    }

    #[test]
    fn test_reset() {
        let cb = breaker(1, Duration::from_secs(60));
        cb.record("A", Outcome::TransientError);
        cb.reset("A");
        assert!(cb.is_allowed("A"));
    }
}
