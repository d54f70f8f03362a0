use std::borrow::Cow;

/// Provider identifier - mostly static constants ("FRED", "CENSUS", ...)
pub type ProviderId = Cow<'static, str>;

/// Source name reported for values served by the static fallback table
pub const MOCK_SOURCE: &str = "mock";
