//! Resolution contract of `ProviderOrchestrator` across real cache backends.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use httpmock::MockServer;
use serde_json::json;

use marketlens_market_data::cache::{CachePolicy, MemoryCache, PersistentCache, SystemClock};
use marketlens_market_data::registry::AttemptStatus;
use marketlens_market_data::{
    AdapterConfig, CensusAdapter, LogicalQuery, MarketDataError, NormalizedResult, Outcome,
    OutcomeCache, ProviderAdapter, ProviderCapabilities, ProviderOrchestrator, QueryKind,
    ResolveOptions, StaticFallback, WorldBankAdapter,
};

#[derive(Clone, Copy)]
enum Script {
    Value(f64),
    NoData,
    RateLimited,
    Error,
}

struct ScriptedAdapter {
    id: &'static str,
    priority: u8,
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedAdapter {
    fn new(id: &'static str, priority: u8, script: Script) -> Arc<Self> {
        Arc::new(Self {
            id,
            priority,
            script,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    fn id(&self) -> &'static str {
        self.id
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            query_kinds: &[QueryKind::MarketSize],
            requires_credential: false,
            confidence: 0.9,
        }
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn fetch(&self, _query: &LogicalQuery) -> Result<NormalizedResult, MarketDataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script {
            Script::Value(v) => Ok(NormalizedResult::new(
                v,
                self.id,
                json!({"scripted": true}),
                0.9,
            )),
            Script::NoData => Err(MarketDataError::NoData {
                provider: self.id.to_string(),
                message: "nothing for this industry".to_string(),
            }),
            Script::RateLimited => Err(MarketDataError::RateLimited {
                provider: self.id.to_string(),
            }),
            Script::Error => Err(MarketDataError::ProviderError {
                provider: self.id.to_string(),
                message: "HTTP 502".to_string(),
            }),
        }
    }
}

fn dyn_adapters(adapters: &[Arc<ScriptedAdapter>]) -> Vec<Arc<dyn ProviderAdapter>> {
    adapters
        .iter()
        .map(|a| a.clone() as Arc<dyn ProviderAdapter>)
        .collect()
}

fn query() -> LogicalQuery {
    LogicalQuery::market_size("software", "us")
}

#[tokio::test]
async fn first_success_wins_and_every_outcome_is_cached_by_class() {
    let adapters = [
        ScriptedAdapter::new("adapter1", 1, Script::RateLimited),
        ScriptedAdapter::new("adapter2", 2, Script::NoData),
        ScriptedAdapter::new("adapter3", 3, Script::Value(42.0)),
    ];
    let cache = Arc::new(MemoryCache::<NormalizedResult>::new(CachePolicy::default()));
    let orchestrator = ProviderOrchestrator::new(dyn_adapters(&adapters), cache.clone());

    let result = orchestrator.resolve(&query()).await.unwrap();
    assert_eq!(result.value, 42.0);
    assert_eq!(result.source, "adapter3");
    assert!(!result.cached);

    let expected = [
        ("adapter1", Outcome::RateLimited, 60_000),
        ("adapter2", Outcome::ConfirmedNoData, 300_000),
        ("adapter3", Outcome::Success, 3_600_000),
    ];
    for (id, outcome, ttl_ms) in expected {
        let entry = cache.get_entry(&query().cache_key(id)).await.unwrap();
        assert_eq!(entry.outcome, outcome, "{}", id);
        assert_eq!(entry.ttl_ms, ttl_ms, "{}", id);
    }
}

#[tokio::test]
async fn repeated_resolve_makes_no_new_calls() {
    let adapters = [
        ScriptedAdapter::new("adapter1", 1, Script::RateLimited),
        ScriptedAdapter::new("adapter2", 2, Script::NoData),
        ScriptedAdapter::new("adapter3", 3, Script::Value(42.0)),
    ];
    let cache = Arc::new(MemoryCache::<NormalizedResult>::new(CachePolicy::default()));
    let orchestrator = ProviderOrchestrator::new(dyn_adapters(&adapters), cache);

    let first = orchestrator.resolve(&query()).await.unwrap();
    let (second, diagnostics) = orchestrator
        .resolve_with_diagnostics(&query(), &ResolveOptions::default())
        .await;
    let second = second.unwrap();

    assert_eq!(first.value, second.value);
    assert_eq!(first.source, second.source);
    assert!(second.cached);
    assert_eq!(diagnostics.calls_made(), 0);
    for adapter in &adapters {
        assert_eq!(adapter.calls(), 1, "{}", adapter.id);
    }
}

#[tokio::test]
async fn all_failing_lists_every_adapter() {
    let adapters = [
        ScriptedAdapter::new("adapter1", 1, Script::RateLimited),
        ScriptedAdapter::new("adapter2", 2, Script::NoData),
        ScriptedAdapter::new("adapter3", 3, Script::Error),
    ];
    let cache = Arc::new(MemoryCache::<NormalizedResult>::new(CachePolicy::default()));
    let orchestrator = ProviderOrchestrator::new(dyn_adapters(&adapters), cache);

    let err = orchestrator.resolve(&query()).await.unwrap_err();
    let MarketDataError::AllProvidersFailed(failure) = &err else {
        panic!("expected AllProvidersFailed, got {:?}", err);
    };

    assert_eq!(failure.attempts.len(), 3);
    assert_eq!(
        failure.outcome_of("adapter1"),
        Some(&AttemptStatus::Completed(Outcome::RateLimited))
    );
    assert_eq!(
        failure.outcome_of("adapter2"),
        Some(&AttemptStatus::Completed(Outcome::ConfirmedNoData))
    );
    assert_eq!(
        failure.outcome_of("adapter3"),
        Some(&AttemptStatus::Completed(Outcome::TransientError))
    );
    let text = err.to_string();
    for id in ["adapter1", "adapter2", "adapter3"] {
        assert!(text.contains(id), "{} missing from '{}'", id, text);
    }
}

#[tokio::test]
async fn fallback_answer_is_labelled_mock() {
    let adapters = [ScriptedAdapter::new("adapter1", 1, Script::Error)];
    let cache = Arc::new(MemoryCache::<NormalizedResult>::new(CachePolicy::default()));
    let orchestrator = ProviderOrchestrator::new(dyn_adapters(&adapters), cache.clone())
        .with_fallback(StaticFallback::new());

    let result = orchestrator.resolve(&query()).await.unwrap();
    assert_eq!(result.source, "mock");
    assert!(result.is_mock());
    assert!(result.details["fallback_reason"]
        .as_str()
        .unwrap()
        .contains("adapter1"));
    // fallback answers are never cached as provider data
    assert_eq!(cache.stats().success, 0);
}

#[tokio::test]
async fn persisted_answers_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");
    let clock = Arc::new(SystemClock);

    let adapters = [ScriptedAdapter::new("adapter1", 1, Script::Value(7.0))];
    let cache = Arc::new(
        PersistentCache::<NormalizedResult>::open(
            path.clone(),
            CachePolicy::default(),
            clock.clone(),
        )
        .await,
    );
    let orchestrator = ProviderOrchestrator::new(dyn_adapters(&adapters), cache);
    orchestrator.resolve(&query()).await.unwrap();

    let restarted = [ScriptedAdapter::new("adapter1", 1, Script::Value(99.0))];
    let cache = Arc::new(
        PersistentCache::<NormalizedResult>::open(path, CachePolicy::default(), clock).await,
    );
    let orchestrator = ProviderOrchestrator::new(dyn_adapters(&restarted), cache);

    let result = orchestrator.resolve(&query()).await.unwrap();
    assert_eq!(result.value, 7.0);
    assert!(result.cached);
    assert_eq!(restarted[0].calls(), 0);
}

#[tokio::test]
async fn real_adapters_fall_through_to_world_bank() {
    let server = MockServer::start_async().await;
    let world_bank = server
        .mock_async(|when, then| {
            when.method("GET").path("/country/US/indicator/NV.IND.MANF.CD");
            then.status(200).body(
                r#"[{"page":1,"pages":1,"per_page":50,"total":1},
                    [{"indicator":{"id":"NV.IND.MANF.CD","value":"Manufacturing, value added (current US$)"},
                      "country":{"id":"US","value":"United States"},"countryiso3code":"USA",
                      "date":"2022","value":2497131000000.0,"unit":"","obs_status":"","decimal":0}]]"#,
            );
        })
        .await;

    // No Census key, so Census is skipped without a request
    let adapters: Vec<Arc<dyn ProviderAdapter>> = vec![
        Arc::new(CensusAdapter::new(AdapterConfig::new(server.base_url()))),
        Arc::new(WorldBankAdapter::new(AdapterConfig::new(server.base_url()))),
    ];
    let cache = Arc::new(MemoryCache::<NormalizedResult>::new(CachePolicy::default()));
    let orchestrator = ProviderOrchestrator::new(adapters, cache);
    let query = LogicalQuery::market_size("manufacturing", "us");

    let (result, diagnostics) = orchestrator
        .resolve_with_diagnostics(&query, &ResolveOptions::default())
        .await;
    assert_eq!(result.unwrap().source, "WORLD_BANK");
    assert_eq!(
        diagnostics.summary(),
        "CENSUS: SKIPPED (Unavailable) -> WORLD_BANK: SUCCESS"
    );

    let again = orchestrator.resolve(&query).await.unwrap();
    assert!(again.cached);
    world_bank.assert_hits_async(1).await;
}
