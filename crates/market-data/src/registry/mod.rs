//! Provider orchestration.
//!
//! This module resolves logical queries across the registered adapters:
//! - Preference ordering, with per-call preferred and excluded providers
//! - Local rate limiting per provider
//! - Circuit breaking for fault tolerance
//! - Per-resolution diagnostics and aggregate failures

mod circuit_breaker;
mod diagnostics;
mod orchestrator;
mod rate_limiter;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use diagnostics::{
    AggregateFailure, AttemptStatus, ProviderAttempt, ResolveDiagnostics, SkipReason,
};
pub use orchestrator::{Freshness, ProviderOrchestrator, ResolveOptions};
pub use rate_limiter::RateLimiter;
