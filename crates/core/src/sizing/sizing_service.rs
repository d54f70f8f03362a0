use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};

use marketlens_market_data::{
    build_cache, default_adapters, LogicalQuery, MarketSizeResult, NormalizedResult,
    ProviderOrchestrator, ResolveDiagnostics, ResolveOptions, StaticFallback,
};

use super::*;
use crate::config::Config;
use crate::constants::DEFAULT_VALIDATION_THRESHOLD;
use crate::errors::{Error, Result};

/// Consumer-facing operations: data resolution plus the derived metrics.
#[async_trait]
pub trait MarketSizingServiceTrait: Send + Sync {
    /// Resolves a logical query through the provider orchestrator.
    async fn resolve(&self, query: &LogicalQuery) -> Result<MarketSizeResult>;

    async fn resolve_with_diagnostics(
        &self,
        query: &LogicalQuery,
        options: &ResolveOptions,
    ) -> (Result<MarketSizeResult>, ResolveDiagnostics);

    fn calculate_tam(&self, params: &TamParams) -> Result<TamResult>;

    fn calculate_sam(&self, params: &SamParams) -> Result<SamResult>;

    fn forecast(&self, params: &ForecastParams) -> Result<ForecastResult>;

    /// Compares a candidate against an independently obtained reference.
    fn validate(&self, candidate: f64, reference: f64) -> Result<ValidationResult>;

    fn validate_many(&self, estimates: &[Estimate]) -> Result<ConsensusReport>;

    /// Resolves the base market size, then runs TAM and SAM on it.
    async fn size_market(&self, request: &SizeMarketRequest) -> Result<MarketSizingReport>;

    /// Resolves `query`, resolves it again without the source that
    /// answered first, and validates the first answer against the second.
    async fn cross_validate(&self, query: &LogicalQuery) -> Result<CrossValidation>;
}

pub struct MarketSizingService {
    orchestrator: Arc<ProviderOrchestrator>,
    sam_factors: SamFactors,
    scenario_rates: ScenarioRates,
    validation_threshold: f64,
}

impl MarketSizingService {
    pub fn new(orchestrator: Arc<ProviderOrchestrator>) -> Self {
        Self {
            orchestrator,
            sam_factors: SamFactors::default(),
            scenario_rates: ScenarioRates::default(),
            validation_threshold: DEFAULT_VALIDATION_THRESHOLD,
        }
    }

    /// Builds the cache, the default adapters and the orchestrator from
    /// `config`.
    pub async fn from_config(config: &Config) -> Result<Self> {
        config.sam_factors.validate()?;

        let cache = build_cache::<NormalizedResult>(&config.cache).await?;
        let adapters = default_adapters(&config.credentials, config.request_timeout);
        let available = adapters.iter().filter(|a| a.is_available()).count();
        info!(
            "Market sizing service: {} of {} adapters available",
            available,
            adapters.len()
        );

        let mut orchestrator = ProviderOrchestrator::new(adapters, cache);
        if config.mock_fallback {
            orchestrator = orchestrator.with_fallback(StaticFallback::new());
        }
        if let Some(deadline) = config.resolve_deadline {
            orchestrator = orchestrator.with_deadline(deadline);
        }

        Ok(Self::new(Arc::new(orchestrator))
            .with_sam_factors(config.sam_factors)
            .with_scenario_rates(config.scenario_rates)
            .with_validation_threshold(config.validation_threshold))
    }

    pub fn with_sam_factors(mut self, sam_factors: SamFactors) -> Self {
        self.sam_factors = sam_factors;
        self
    }

    pub fn with_scenario_rates(mut self, scenario_rates: ScenarioRates) -> Self {
        self.scenario_rates = scenario_rates;
        self
    }

    pub fn with_validation_threshold(mut self, threshold: f64) -> Self {
        self.validation_threshold = threshold;
        self
    }

    pub fn orchestrator(&self) -> &Arc<ProviderOrchestrator> {
        &self.orchestrator
    }
}

#[async_trait]
impl MarketSizingServiceTrait for MarketSizingService {
    async fn resolve(&self, query: &LogicalQuery) -> Result<MarketSizeResult> {
        Ok(self.orchestrator.resolve(query).await?)
    }

    async fn resolve_with_diagnostics(
        &self,
        query: &LogicalQuery,
        options: &ResolveOptions,
    ) -> (Result<MarketSizeResult>, ResolveDiagnostics) {
        let (result, diagnostics) = self
            .orchestrator
            .resolve_with_diagnostics(query, options)
            .await;
        (result.map_err(Error::from), diagnostics)
    }

    fn calculate_tam(&self, params: &TamParams) -> Result<TamResult> {
        calculate_tam(params)
    }

    fn calculate_sam(&self, params: &SamParams) -> Result<SamResult> {
        calculate_sam(params, &self.sam_factors)
    }

    fn forecast(&self, params: &ForecastParams) -> Result<ForecastResult> {
        forecast(params, &self.scenario_rates)
    }

    fn validate(&self, candidate: f64, reference: f64) -> Result<ValidationResult> {
        validate_estimate(candidate, reference, self.validation_threshold)
    }

    fn validate_many(&self, estimates: &[Estimate]) -> Result<ConsensusReport> {
        validate_many(estimates, self.validation_threshold)
    }

    async fn size_market(&self, request: &SizeMarketRequest) -> Result<MarketSizingReport> {
        let query = LogicalQuery::market_size(&request.industry, &request.region);
        let market = self.resolve(&query).await?;
        if market.is_mock() {
            warn!(
                "Sizing {} from the static fallback table, not provider data",
                query
            );
        }

        let tam = self.calculate_tam(&TamParams {
            base_market_size: Some(market.value),
            annual_growth_rate: request.annual_growth_rate,
            projection_years: request.projection_years,
            segmentation_adjustment: request.segmentation_adjustment.clone(),
        })?;
        let sam = self.calculate_sam(&SamParams {
            tam: Some(tam.final_tam),
            constraints: request.constraints.clone(),
        })?;

        Ok(MarketSizingReport { market, tam, sam })
    }

    async fn cross_validate(&self, query: &LogicalQuery) -> Result<CrossValidation> {
        let primary = self.resolve(query).await?;
        if primary.is_mock() {
            return Err(Error::CrossValidation(format!(
                "no live source answered {}",
                query
            )));
        }

        let options = ResolveOptions::excluding([primary.source.clone()]);
        let reference = self.orchestrator.resolve_with(query, &options).await?;
        if reference.is_mock() {
            return Err(Error::CrossValidation(format!(
                "only '{}' could answer {}",
                primary.source, query
            )));
        }

        let validation = self.validate(primary.value, reference.value)?;
        info!(
            "Cross-validated {}: {} vs {} (variance {:.3})",
            query, primary.source, reference.source, validation.variance
        );
        Ok(CrossValidation {
            primary,
            reference,
            validation,
        })
    }
}
