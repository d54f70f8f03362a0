//! Provider orchestration.
//!
//! Resolves a [`LogicalQuery`] against an ordered list of adapters:
//! - Adapter selection by query kind, per-adapter support and preference order
//! - Outcome-aware caching of every answer, negative ones included
//! - Local rate limiting and circuit breaking, both as skips, never waits
//! - An optional overall deadline and static fallback
//! - Diagnostic tracking of every adapter considered

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use tokio::time::Instant;

use super::{AggregateFailure, CircuitBreaker, RateLimiter, ResolveDiagnostics, SkipReason};
use crate::cache::OutcomeCache;
use crate::errors::MarketDataError;
use crate::models::{LogicalQuery, MarketSizeResult, NormalizedResult, Outcome, ProviderId};
use crate::provider::{ProviderAdapter, StaticFallback};

/// Per-call adjustments to adapter selection.
#[derive(Clone, Debug, Default)]
pub struct ResolveOptions {
    /// Adapter tried first, ahead of the preference order.
    pub preferred_provider: Option<String>,
    /// Adapters not consulted at all.
    pub excluded_providers: Vec<String>,
}

impl ResolveOptions {
    pub fn prefer(provider: impl Into<String>) -> Self {
        Self {
            preferred_provider: Some(provider.into()),
            ..Default::default()
        }
    }

    pub fn excluding(providers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            excluded_providers: providers.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    fn is_excluded(&self, provider: &str) -> bool {
        self.excluded_providers
            .iter()
            .any(|p| p.eq_ignore_ascii_case(provider))
    }
}

/// Cached state of one adapter for a query, read without fetching.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Freshness {
    pub provider: ProviderId,
    pub cache_key: String,
    /// `None` when nothing live is cached
    pub outcome: Option<Outcome>,
    pub stored_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Resolves logical queries through adapters and the outcome cache.
///
/// Adapters are consulted strictly one after another; the first non-null
/// `Success` wins and the rest are never called.
pub struct ProviderOrchestrator {
    adapters: Vec<Arc<dyn ProviderAdapter>>,
    cache: Arc<dyn OutcomeCache<NormalizedResult>>,
    rate_limiter: RateLimiter,
    circuit_breaker: CircuitBreaker,
    fallback: Option<StaticFallback>,
    deadline: Option<Duration>,
    /// User-configured priorities (adapter id -> priority). Lower values
    /// are tried first; unset adapters use their own `priority()`.
    custom_priorities: HashMap<String, i32>,
}

impl ProviderOrchestrator {
    /// Creates an orchestrator. Local rate limits are configured from each
    /// adapter's declared `rate_limit()`.
    pub fn new(
        adapters: Vec<Arc<dyn ProviderAdapter>>,
        cache: Arc<dyn OutcomeCache<NormalizedResult>>,
    ) -> Self {
        let rate_limiter = RateLimiter::new();
        for adapter in &adapters {
            rate_limiter.configure(adapter.id(), adapter.rate_limit());
        }

        Self {
            adapters,
            cache,
            rate_limiter,
            circuit_breaker: CircuitBreaker::new(),
            fallback: None,
            deadline: None,
            custom_priorities: HashMap::new(),
        }
    }

    pub fn with_priorities(mut self, custom_priorities: HashMap<String, i32>) -> Self {
        self.custom_priorities = custom_priorities;
        self
    }

    /// Enables the static fallback for query kinds it covers.
    pub fn with_fallback(mut self, fallback: StaticFallback) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Bounds a whole resolution. Adapters left once it passes are skipped,
    /// and an in-flight call is cut off at the deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_circuit_breaker(mut self, circuit_breaker: CircuitBreaker) -> Self {
        self.circuit_breaker = circuit_breaker;
        self
    }

    pub fn adapters(&self) -> &[Arc<dyn ProviderAdapter>] {
        &self.adapters
    }

    pub fn cache(&self) -> &Arc<dyn OutcomeCache<NormalizedResult>> {
        &self.cache
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    /// Adapters declaring `query`'s kind, in preference order.
    fn candidates(
        &self,
        query: &LogicalQuery,
        options: &ResolveOptions,
    ) -> Vec<&Arc<dyn ProviderAdapter>> {
        let kind = query.kind();
        let mut adapters: Vec<_> = self
            .adapters
            .iter()
            .filter(|a| a.capabilities().serves(kind))
            .collect();

        adapters.sort_by_key(|a| {
            if let Some(preferred) = &options.preferred_provider {
                if a.id().eq_ignore_ascii_case(preferred) {
                    return i32::MIN;
                }
            }
            self.custom_priorities
                .get(a.id())
                .copied()
                .unwrap_or_else(|| a.priority() as i32)
        });
        adapters
    }

    /// Resolves `query` with the default adapter order.
    pub async fn resolve(&self, query: &LogicalQuery) -> Result<MarketSizeResult, MarketDataError> {
        self.resolve_with(query, &ResolveOptions::default()).await
    }

    pub async fn resolve_with(
        &self,
        query: &LogicalQuery,
        options: &ResolveOptions,
    ) -> Result<MarketSizeResult, MarketDataError> {
        let (result, diagnostics) = self.resolve_with_diagnostics(query, options).await;
        debug!("Resolved {}: {}", query, diagnostics.summary());
        result
    }

    /// Resolves `query` and returns the trail of every adapter considered.
    pub async fn resolve_with_diagnostics(
        &self,
        query: &LogicalQuery,
        options: &ResolveOptions,
    ) -> (Result<MarketSizeResult, MarketDataError>, ResolveDiagnostics) {
        let mut diagnostics = ResolveDiagnostics::new();
        let started = Instant::now();
        let candidates = self.candidates(query, options);

        for adapter in &candidates {
            let provider_id: ProviderId = Cow::Borrowed(adapter.id());

            if options.is_excluded(adapter.id()) {
                diagnostics.record_skip(provider_id, SkipReason::Excluded);
                continue;
            }
            if !adapter.supports(query) {
                diagnostics.record_skip(provider_id, SkipReason::Unsupported);
                continue;
            }

            let key = query.cache_key(adapter.id());
            if let Some(entry) = self.cache.get_entry(&key).await {
                match (entry.outcome, entry.value) {
                    (Outcome::Success, Some(value)) if value.value.is_finite() => {
                        debug!("Cache hit for {} from '{}'", query, provider_id);
                        diagnostics.record_outcome(provider_id, Outcome::Success, None, true);
                        return (Ok(MarketSizeResult::from_normalized(value, true)), diagnostics);
                    }
                    (outcome @ (Outcome::ConfirmedNoData | Outcome::RateLimited), _) => {
                        debug!(
                            "'{}' has a live {} entry for {}, not calling it",
                            provider_id, outcome, query
                        );
                        diagnostics.record_outcome(provider_id, outcome, None, true);
                        continue;
                    }
                    _ => {}
                }
            }

            let remaining = match self.deadline {
                Some(deadline) => match deadline.checked_sub(started.elapsed()) {
                    Some(left) if !left.is_zero() => Some(left),
                    _ => {
                        diagnostics.record_skip(provider_id, SkipReason::DeadlineExceeded);
                        continue;
                    }
                },
                None => None,
            };

            if !adapter.is_available() {
                debug!("'{}' unavailable, skipping", provider_id);
                diagnostics.record_skip(provider_id, SkipReason::Unavailable);
                continue;
            }
            if !self.circuit_breaker.is_allowed(adapter.id()) {
                debug!("Circuit breaker open for '{}', skipping", provider_id);
                diagnostics.record_skip(provider_id, SkipReason::CircuitOpen);
                continue;
            }
            if !self.rate_limiter.try_acquire(adapter.id()) {
                self.circuit_breaker.release_trial(adapter.id());
                diagnostics.record_skip(provider_id, SkipReason::LocalRateLimit);
                continue;
            }

            debug!("Fetching {} from '{}'", query, provider_id);
            let fetched = match remaining {
                Some(left) => match tokio::time::timeout(left, adapter.fetch(query)).await {
                    Ok(result) => result,
                    Err(_) => Err(MarketDataError::Timeout {
                        provider: adapter.id().to_string(),
                    }),
                },
                None => adapter.fetch(query).await,
            };

            let fetched = fetched.and_then(|result| {
                if result.value.is_finite() {
                    Ok(result)
                } else {
                    Err(MarketDataError::no_data(adapter.id(), "non-finite value"))
                }
            });

            match fetched {
                Ok(result) => {
                    self.circuit_breaker.record(adapter.id(), Outcome::Success);
                    self.cache
                        .set(&key, Some(result.clone()), Outcome::Success)
                        .await;
                    diagnostics.record_outcome(provider_id.clone(), Outcome::Success, None, false);
                    info!("Resolved {} from '{}'", query, provider_id);
                    return (Ok(MarketSizeResult::from_normalized(result, false)), diagnostics);
                }
                Err(e) => {
                    let outcome = e.outcome();
                    self.circuit_breaker.record(adapter.id(), outcome);
                    self.cache.set(&key, None, outcome).await;
                    debug!("'{}' gave {} for {}: {}", provider_id, outcome, query, e);
                    diagnostics.record_outcome(provider_id, outcome, Some(e.to_string()), false);
                }
            }
        }

        let failure = AggregateFailure::new(query.to_string(), &diagnostics);

        if let Some(fallback) = &self.fallback {
            if let Some(result) = fallback.lookup(query, &failure.to_string()) {
                warn!("{}; answering from static fallback", failure);
                diagnostics.used_fallback = true;
                return (Ok(MarketSizeResult::from_normalized(result, false)), diagnostics);
            }
        }

        if candidates.is_empty() {
            warn!("No providers available for {}", query.kind());
            return (
                Err(MarketDataError::NoProvidersAvailable(query.kind())),
                diagnostics,
            );
        }

        warn!("{}", failure);
        (Err(MarketDataError::AllProvidersFailed(failure)), diagnostics)
    }

    /// Cached state of every adapter declaring `query`'s kind. Makes no calls.
    pub async fn freshness(&self, query: &LogicalQuery) -> Vec<Freshness> {
        let mut report = Vec::new();
        for adapter in self.candidates(query, &ResolveOptions::default()) {
            let cache_key = query.cache_key(adapter.id());
            let entry = self.cache.get_entry(&cache_key).await;
            report.push(Freshness {
                provider: Cow::Borrowed(adapter.id()),
                outcome: entry.as_ref().map(|e| e.outcome),
                stored_at: entry.as_ref().map(|e| e.stored_at),
                expires_at: entry.as_ref().map(|e| e.expires_at()),
                cache_key,
            });
        }
        report
    }

    /// Drops everything cached for one adapter. Returns the number of
    /// local entries removed.
    pub async fn invalidate_provider(&self, provider: &str) -> usize {
        let removed = self
            .cache
            .invalidate(&format!("{}:", provider.to_lowercase()))
            .await;
        info!("Invalidated {} cache entries for '{}'", removed, provider);
        removed
    }
}
