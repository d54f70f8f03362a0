/// Share of TAM kept by a geographic constraint
pub const DEFAULT_GEOGRAPHIC_FACTOR: f64 = 0.6;

/// Share of TAM kept by a regulatory constraint
pub const DEFAULT_REGULATORY_FACTOR: f64 = 0.8;

/// Share of TAM kept after excluding entrenched competitors
pub const DEFAULT_COMPETITIVE_FACTOR: f64 = 0.7;

/// SOM as a fraction of SAM
pub const DEFAULT_SOM_FRACTION: f64 = 0.1;

/// Annual growth rates per forecast scenario
pub const CONSERVATIVE_GROWTH_RATE: f64 = 0.05;
pub const OPTIMISTIC_GROWTH_RATE: f64 = 0.12;
pub const PESSIMISTIC_GROWTH_RATE: f64 = 0.02;

/// Half-width of the forecast confidence band, as a fraction of the value
pub const FORECAST_BAND: f64 = 0.1;

/// Relative variance below which two estimates agree
pub const DEFAULT_VALIDATION_THRESHOLD: f64 = 0.2;

/// Longest projection accepted by the TAM and forecast calculators
pub const MAX_PROJECTION_YEARS: u32 = 50;
