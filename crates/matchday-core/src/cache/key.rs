//! Cache key construction and matching.
//!
//! Keys are plain strings of the form `<kind>:<param>:<value>...`. The store
//! sees them with the `cache_` namespace prefix. Wildcards are deliberately
//! narrow: a single trailing `*` means "every key starting with this prefix";
//! a `*` anywhere else is an ordinary character.

use std::fmt;

/// Prefix separating cache entries from other data in the store
pub const NAMESPACE: &str = "cache_";

/// Reserved store key holding the last-seen app version (not namespaced)
pub const VERSION_KEY: &str = "app_version";

const WILDCARD: char = '*';

/// Map a cache key to the key used in the store.
pub fn namespaced(key: &str) -> String {
    format!("{}{}", NAMESPACE, key)
}

/// Whether a raw store key belongs to the cache namespace.
pub fn is_namespaced(store_key: &str) -> bool {
    store_key.starts_with(NAMESPACE)
}

/// Builder for `<kind>:<param>:<value>` keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(kind: &str) -> Self {
        Self(kind.to_string())
    }

    /// Append a `:<name>:<value>` pair
    pub fn param(mut self, name: &str, value: impl fmt::Display) -> Self {
        self.0.push(':');
        self.0.push_str(name);
        self.0.push(':');
        self.0.push_str(&value.to_string());
        self
    }

    /// Append a bare `:<segment>`
    pub fn segment(mut self, segment: &str) -> Self {
        self.0.push(':');
        self.0.push_str(segment);
        self
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Pattern matching this key and every key extending it
    pub fn wildcard(&self) -> String {
        format!("{}{}", self.0, WILDCARD)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

/// An invalidation target: one exact key, or every key under a prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPattern {
    Exact(String),
    Prefix(String),
}

impl KeyPattern {
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix(WILDCARD) {
            Some(prefix) => KeyPattern::Prefix(prefix.to_string()),
            None => KeyPattern::Exact(pattern.to_string()),
        }
    }

    /// Whether a raw store key is selected by this pattern.
    pub fn matches_store_key(&self, store_key: &str) -> bool {
        let Some(key) = store_key.strip_prefix(NAMESPACE) else {
            return false;
        };
        match self {
            KeyPattern::Exact(exact) => key == exact,
            KeyPattern::Prefix(prefix) => key.starts_with(prefix.as_str()),
        }
    }
}
