//! Business data models
//!
//! - `types` - Type aliases for common identifiers (ProviderId)
//! - `query` - Logical queries and their kinds (LogicalQuery, QueryKind)
//! - `outcome` - Classification of adapter calls (Outcome)
//! - `result` - Normalized adapter results and orchestrator answers

mod outcome;
mod query;
mod result;
mod types;

pub use outcome::Outcome;
pub use query::{LogicalQuery, QueryKind};
pub use result::{MarketSizeResult, NormalizedResult};
pub use types::{ProviderId, MOCK_SOURCE};
