//! Derived market metrics: TAM, SAM/SOM, scenario forecasts and
//! cross-source validation, plus the service tying them to data resolution.

pub mod forecast_calculator;
pub mod sam_calculator;
pub mod sizing_model;
pub mod sizing_service;
pub mod tam_calculator;
pub mod validation_calculator;


pub use forecast_calculator::forecast;
pub use sam_calculator::calculate_sam;
pub use sizing_model::*;
pub use sizing_service::{MarketSizingService, MarketSizingServiceTrait};
pub use tam_calculator::calculate_tam;
pub use validation_calculator::{validate_estimate, validate_many};
