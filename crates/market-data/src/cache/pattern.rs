//! Key patterns for cache invalidation.

use regex::Regex;

/// A parsed invalidation pattern.
///
/// A pattern without `*` is a key prefix (`"fred:"` drops every FRED key).
/// A pattern with `*` is a glob matched against the whole key
/// (`"*:market_size:*"`).
#[derive(Clone, Debug)]
pub enum KeyPattern {
    Prefix(String),
    Glob { raw: String, regex: Regex },
}

impl KeyPattern {
    pub fn parse(pattern: &str) -> Self {
        if !pattern.contains('*') {
            return Self::Prefix(pattern.to_string());
        }

        let body = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        match Regex::new(&format!("^{}$", body)) {
            Ok(regex) => Self::Glob {
                raw: pattern.to_string(),
                regex,
            },
            // Escaped input always compiles; keep a prefix match as a floor.
            Err(_) => Self::Prefix(pattern.replace('*', "")),
        }
    }

    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::Prefix(prefix) => key.starts_with(prefix.as_str()),
            Self::Glob { regex, .. } => regex.is_match(key),
        }
    }

    /// Pattern in the glob syntax understood by Redis `KEYS`/`SCAN`.
    pub fn as_glob(&self) -> String {
        match self {
            Self::Prefix(prefix) => format!("{}*", prefix),
            Self::Glob { raw, .. } => raw.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_pattern() {
        let p = KeyPattern::parse("fred:");
        assert!(p.matches("fred:economic_series:abc"));
        assert!(!p.matches("census:market_size:abc"));
        assert_eq!(p.as_glob(), "fred:*");
    }

    #[test]
    fn test_glob_pattern_matches_whole_key() {
        let p = KeyPattern::parse("*:market_size:*");
        assert!(p.matches("census:market_size:abc"));
        assert!(p.matches("world_bank:market_size:def"));
        assert!(!p.matches("fred:economic_series:abc"));
    }

    #[test]
    fn test_glob_escapes_regex_metacharacters() {
        let p = KeyPattern::parse("a.b*");
        assert!(p.matches("a.bcd"));
        assert!(!p.matches("axbcd"));
    }
}
