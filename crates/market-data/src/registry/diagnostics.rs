//! Per-resolution attempt tracking.

use std::fmt;

use serde::Serialize;

use crate::models::{Outcome, ProviderId};

/// Why an adapter was passed over without being called.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    /// Adapter serves the query kind but not these parameters.
    Unsupported,
    /// `is_available()` was false, usually a missing credential.
    Unavailable,
    /// Caller excluded the adapter.
    Excluded,
    /// Local token bucket was empty.
    LocalRateLimit,
    /// Circuit breaker is open.
    CircuitOpen,
    /// The overall resolve deadline had passed.
    DeadlineExceeded,
}

impl SkipReason {
    fn describe(&self) -> &'static str {
        match self {
            Self::Unsupported => "does not support this query",
            Self::Unavailable => "unavailable (credential missing)",
            Self::Excluded => "excluded by caller",
            Self::LocalRateLimit => "local rate limit reached",
            Self::CircuitOpen => "circuit open after repeated failures",
            Self::DeadlineExceeded => "resolve deadline exceeded",
        }
    }
}

/// What happened to one adapter during a resolution.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum AttemptStatus {
    /// Called, or answered from a live cache entry.
    Completed(Outcome),
    Skipped(SkipReason),
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderAttempt {
    pub provider: ProviderId,
    pub status: AttemptStatus,
    /// Error text for failures
    pub message: Option<String>,
    /// True when the outcome came from the cache, not a call
    pub from_cache: bool,
}

impl ProviderAttempt {
    pub fn outcome(&self) -> Option<Outcome> {
        match self.status {
            AttemptStatus::Completed(outcome) => Some(outcome),
            AttemptStatus::Skipped(_) => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome() == Some(Outcome::Success)
    }
}

impl fmt::Display for ProviderAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.provider)?;
        match &self.status {
            AttemptStatus::Completed(Outcome::Success) => write!(f, "success")?,
            AttemptStatus::Completed(Outcome::ConfirmedNoData) => write!(f, "no data")?,
            AttemptStatus::Completed(Outcome::RateLimited) => write!(f, "rate limited")?,
            AttemptStatus::Completed(Outcome::TransientError) => write!(f, "error")?,
            AttemptStatus::Skipped(reason) => write!(f, "skipped, {}", reason.describe())?,
        }
        if self.from_cache {
            write!(f, " (cached)")?;
        }
        if let Some(message) = &self.message {
            write!(f, " ({})", message)?;
        }
        Ok(())
    }
}

/// Ordered trail of every adapter considered for one query.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveDiagnostics {
    pub attempts: Vec<ProviderAttempt>,
    /// True when the static fallback produced the answer
    pub used_fallback: bool,
}

impl ResolveDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_skip(&mut self, provider: ProviderId, reason: SkipReason) {
        self.attempts.push(ProviderAttempt {
            provider,
            status: AttemptStatus::Skipped(reason),
            message: None,
            from_cache: false,
        });
    }

    pub fn record_outcome(
        &mut self,
        provider: ProviderId,
        outcome: Outcome,
        message: Option<String>,
        from_cache: bool,
    ) {
        self.attempts.push(ProviderAttempt {
            provider,
            status: AttemptStatus::Completed(outcome),
            message,
            from_cache,
        });
    }

    /// One-line trail, e.g. `CENSUS: RATE_LIMITED -> WORLD_BANK: SUCCESS`.
    pub fn summary(&self) -> String {
        let mut steps: Vec<String> = self
            .attempts
            .iter()
            .map(|a| match &a.status {
                AttemptStatus::Completed(outcome) if a.from_cache => {
                    format!("{}: {} (cached)", a.provider, outcome)
                }
                AttemptStatus::Completed(outcome) => format!("{}: {}", a.provider, outcome),
                AttemptStatus::Skipped(reason) => format!("{}: SKIPPED ({:?})", a.provider, reason),
            })
            .collect();
        if self.used_fallback {
            steps.push("mock: FALLBACK".to_string());
        }
        steps.join(" -> ")
    }

    pub fn has_success(&self) -> bool {
        self.attempts.iter().any(|a| a.is_success())
    }

    /// Adapters that were actually called (not cached, not skipped).
    pub fn calls_made(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| a.outcome().is_some() && !a.from_cache)
            .count()
    }

    pub fn skip_reasons(&self) -> Vec<(&ProviderId, &SkipReason)> {
        self.attempts
            .iter()
            .filter_map(|a| match &a.status {
                AttemptStatus::Skipped(reason) => Some((&a.provider, reason)),
                AttemptStatus::Completed(_) => None,
            })
            .collect()
    }
}

/// Terminal failure of a resolution: no adapter produced a value.
///
/// Lists every adapter considered, in order, with its outcome or skip
/// reason.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateFailure {
    pub query: String,
    pub attempts: Vec<ProviderAttempt>,
}

impl AggregateFailure {
    pub fn new(query: impl Into<String>, diagnostics: &ResolveDiagnostics) -> Self {
        Self {
            query: query.into(),
            attempts: diagnostics.attempts.clone(),
        }
    }

    pub fn outcome_of(&self, provider: &str) -> Option<&AttemptStatus> {
        self.attempts
            .iter()
            .find(|a| a.provider == provider)
            .map(|a| &a.status)
    }
}

impl fmt::Display for AggregateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no source could answer {}: ", self.query)?;
        if self.attempts.is_empty() {
            return write!(f, "no eligible sources");
        }
        let reasons = self
            .attempts
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&reasons)
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;

    fn sample() -> ResolveDiagnostics {
        let mut diag = ResolveDiagnostics::new();
        diag.record_outcome(Cow::Borrowed("CENSUS"), Outcome::RateLimited, None, false);
        diag.record_skip(Cow::Borrowed("ALPHA"), SkipReason::Unavailable);
        diag.record_outcome(Cow::Borrowed("WORLD_BANK"), Outcome::Success, None, true);
        diag
    }

    #[test]
    fn test_summary() {
        assert_eq!(
            sample().summary(),
            "CENSUS: RATE_LIMITED -> ALPHA: SKIPPED (Unavailable) -> WORLD_BANK: SUCCESS (cached)"
        );
    }

    #[test]
    fn test_has_success_and_calls_made() {
        let diag = sample();
        assert!(diag.has_success());
        assert_eq!(diag.calls_made(), 1);
        assert_eq!(diag.skip_reasons().len(), 1);
    }

    #[test]
    fn test_aggregate_failure_display() {
        let mut diag = ResolveDiagnostics::new();
        diag.record_outcome(Cow::Borrowed("A"), Outcome::RateLimited, None, false);
        diag.record_outcome(
            Cow::Borrowed("B"),
            Outcome::ConfirmedNoData,
            Some("series does not exist".to_string()),
            false,
        );
        diag.record_skip(Cow::Borrowed("C"), SkipReason::Unavailable);

        let failure = AggregateFailure::new("economic_series(series_id=gdp)", &diag);
        assert_eq!(
            failure.to_string(),
            "no source could answer economic_series(series_id=gdp): A: rate limited; \
             B: no data (series does not exist); C: skipped, unavailable (credential missing)"
        );
        assert_eq!(
            failure.outcome_of("A"),
            Some(&AttemptStatus::Completed(Outcome::RateLimited))
        );
    }

    #[test]
    fn test_empty_failure_display() {
        let failure = AggregateFailure::new("q", &ResolveDiagnostics::new());
        assert_eq!(failure.to_string(), "no source could answer q: no eligible sources");
    }
}
