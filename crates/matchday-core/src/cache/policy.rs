//! Per-resource freshness rules.
//!
//! TTLs reflect how often the backend data actually changes: reference data
//! (teams, seasons, competitions) barely moves, finished results get
//! corrected shortly after full time, fixtures shift occasionally.

use std::time::Duration;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(60 * 60);

/// Near-static reference data and competition metadata
pub const REFERENCE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Completed-match results
pub const RESULTS_TTL: Duration = Duration::from_secs(10 * 60);

/// Fixtures not yet played
pub const CALENDAR_TTL: Duration = Duration::from_secs(15 * 60);

/// Standings, rosters and player detail
pub const STANDINGS_TTL: Duration = Duration::from_secs(30 * 60);

/// Fallback for keys no rule matches
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMatch {
    Prefix(String),
    Contains(String),
}

impl KeyMatch {
    fn matches(&self, key: &str) -> bool {
        match self {
            KeyMatch::Prefix(p) => key.starts_with(p.as_str()),
            KeyMatch::Contains(s) => key.contains(s.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlRule {
    pub matcher: KeyMatch,
    pub ttl: Duration,
}

/// Ordered rule table; the first matching rule wins.
#[derive(Debug, Clone)]
pub struct TtlPolicy {
    rules: Vec<TtlRule>,
    default_ttl: Duration,
}

impl TtlPolicy {
    pub fn builder() -> TtlPolicyBuilder {
        TtlPolicyBuilder {
            rules: Vec::new(),
            default_ttl: DEFAULT_TTL,
        }
    }

    pub fn ttl_for(&self, key: &str) -> Duration {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(key))
            .map(|rule| rule.ttl)
            .unwrap_or(self.default_ttl)
    }

    pub fn rules(&self) -> &[TtlRule] {
        &self.rules
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        // Results and calendar are matched by substring before the kind
        // prefixes, since match keys carry the team/competition first.
        Self::builder()
            .prefix("teams:", REFERENCE_TTL)
            .prefix("seasons:", REFERENCE_TTL)
            .prefix("competitions:", REFERENCE_TTL)
            .contains(":results", RESULTS_TTL)
            .contains(":calendar", CALENDAR_TTL)
            .prefix("standings:", STANDINGS_TTL)
            .prefix("roster:", STANDINGS_TTL)
            .prefix("player:", STANDINGS_TTL)
            .build()
    }
}

pub struct TtlPolicyBuilder {
    rules: Vec<TtlRule>,
    default_ttl: Duration,
}

impl TtlPolicyBuilder {
    pub fn prefix(mut self, prefix: &str, ttl: Duration) -> Self {
        self.rules.push(TtlRule {
            matcher: KeyMatch::Prefix(prefix.to_string()),
            ttl,
        });
        self
    }

    pub fn contains(mut self, fragment: &str, ttl: Duration) -> Self {
        self.rules.push(TtlRule {
            matcher: KeyMatch::Contains(fragment.to_string()),
            ttl,
        });
        self
    }

    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn build(self) -> TtlPolicy {
        TtlPolicy {
            rules: self.rules,
            default_ttl: self.default_ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let policy = TtlPolicy::default();
        assert_eq!(policy.ttl_for("teams:all"), 24 * HOUR);
        assert_eq!(policy.ttl_for("seasons:all"), 24 * HOUR);
        assert_eq!(policy.ttl_for("competitions:season:2024"), 24 * HOUR);
        assert_eq!(policy.ttl_for("matches:team:12:calendar"), 15 * MINUTE);
        assert_eq!(policy.ttl_for("matches:team:12:results"), 10 * MINUTE);
        assert_eq!(policy.ttl_for("standings:competition:3"), 30 * MINUTE);
        assert_eq!(policy.ttl_for("roster:team:12"), 30 * MINUTE);
        assert_eq!(policy.ttl_for("player:99"), 30 * MINUTE);
    }

    #[test]
    fn test_unmatched_key_uses_default() {
        let policy = TtlPolicy::default();
        assert_eq!(policy.ttl_for("news:latest"), DEFAULT_TTL);
        // Prefix rules need the separator
        assert_eq!(policy.ttl_for("standingsx"), DEFAULT_TTL);
    }

    #[test]
    fn test_first_rule_wins() {
        let policy = TtlPolicy::builder()
            .contains(":live", MINUTE)
            .prefix("matches:", HOUR)
            .default_ttl(2 * HOUR)
            .build();
        assert_eq!(policy.ttl_for("matches:live"), MINUTE);
        assert_eq!(policy.ttl_for("matches:team:1"), HOUR);
        assert_eq!(policy.ttl_for("other"), 2 * HOUR);
        assert_eq!(policy.rules().len(), 2);
    }
}
