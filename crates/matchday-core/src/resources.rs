//! Club backend resources and where they live in the cache.
//!
//! Each resource kind has exactly one key shape; TTLs for those shapes are
//! registered in `cache::policy`.

use std::fmt;

use serde_json::Value;
use tracing::debug;

use crate::cache::{CacheKey, CacheManager};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Teams,
    Seasons,
    Competitions { season: u32 },
    /// Fixtures not yet played
    Calendar { team_id: u64 },
    /// Completed matches
    Results { team_id: u64 },
    Standings { competition_id: u64 },
    Roster { team_id: u64 },
    Player { player_id: u64 },
}

impl Resource {
    pub fn cache_key(&self) -> CacheKey {
        match *self {
            Resource::Teams => CacheKey::new("teams").segment("all"),
            Resource::Seasons => CacheKey::new("seasons").segment("all"),
            Resource::Competitions { season } => {
                CacheKey::new("competitions").param("season", season)
            }
            Resource::Calendar { team_id } => matches_key(team_id).segment("calendar"),
            Resource::Results { team_id } => matches_key(team_id).segment("results"),
            Resource::Standings { competition_id } => {
                CacheKey::new("standings").param("competition", competition_id)
            }
            Resource::Roster { team_id } => CacheKey::new("roster").param("team", team_id),
            Resource::Player { player_id } => {
                CacheKey::new("player").segment(&player_id.to_string())
            }
        }
    }

    /// Endpoint path relative to the API base URL
    pub fn path(&self) -> String {
        match *self {
            Resource::Teams => "/teams".to_string(),
            Resource::Seasons => "/seasons".to_string(),
            Resource::Competitions { season } => format!("/seasons/{}/competitions", season),
            Resource::Calendar { team_id } => {
                format!("/teams/{}/matches?status=scheduled", team_id)
            }
            Resource::Results { team_id } => format!("/teams/{}/matches?status=finished", team_id),
            Resource::Standings { competition_id } => {
                format!("/competitions/{}/standings", competition_id)
            }
            Resource::Roster { team_id } => format!("/teams/{}/players", team_id),
            Resource::Player { player_id } => format!("/players/{}", player_id),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cache_key().as_str())
    }
}

fn matches_key(team_id: u64) -> CacheKey {
    CacheKey::new("matches").param("team", team_id)
}

/// Every cached match list for a team, for wildcard invalidation.
pub fn team_matches_pattern(team_id: u64) -> String {
    format!("{}:*", matches_key(team_id))
}

/// Apply a single-match update pushed by the backend to the team's cached
/// calendar and results lists, avoiding a full refetch.
///
/// Returns how many lists contained the match.
pub async fn apply_match_update(cache: &CacheManager, team_id: u64, updated: &Value) -> usize {
    let Some(id) = updated.get("id") else {
        debug!("Match update without id, ignoring");
        return 0;
    };

    let mut patched = 0;
    for resource in [Resource::Calendar { team_id }, Resource::Results { team_id }] {
        if cache
            .patch_list_item(resource.cache_key().as_str(), id, updated)
            .await
        {
            patched += 1;
        }
    }
    debug!(team_id, id = %id, patched, "Applied match update to cache");
    patched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TtlPolicy;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_cache_keys() {
        assert_eq!(Resource::Teams.cache_key().as_str(), "teams:all");
        assert_eq!(
            Resource::Competitions { season: 2024 }.cache_key().as_str(),
            "competitions:season:2024"
        );
        assert_eq!(
            Resource::Calendar { team_id: 12 }.cache_key().as_str(),
            "matches:team:12:calendar"
        );
        assert_eq!(
            Resource::Results { team_id: 12 }.to_string(),
            "matches:team:12:results"
        );
        assert_eq!(
            Resource::Standings { competition_id: 3 }.cache_key().as_str(),
            "standings:competition:3"
        );
        assert_eq!(Resource::Player { player_id: 9 }.cache_key().as_str(), "player:9");
        assert_eq!(team_matches_pattern(12), "matches:team:12:*");
    }

    #[test]
    fn test_every_kind_has_a_policy_row() {
        let policy = TtlPolicy::default();
        let minutes = |r: Resource| policy.ttl_for(r.cache_key().as_str()).as_secs() / 60;

        assert_eq!(minutes(Resource::Teams), 24 * 60);
        assert_eq!(minutes(Resource::Seasons), 24 * 60);
        assert_eq!(minutes(Resource::Competitions { season: 2024 }), 24 * 60);
        assert_eq!(minutes(Resource::Calendar { team_id: 1 }), 15);
        assert_eq!(minutes(Resource::Results { team_id: 1 }), 10);
        assert_eq!(minutes(Resource::Standings { competition_id: 1 }), 30);
        assert_eq!(minutes(Resource::Roster { team_id: 1 }), 30);
        assert_eq!(minutes(Resource::Player { player_id: 1 }), 30);
    }

    #[test]
    fn test_paths() {
        assert_eq!(
            Resource::Calendar { team_id: 4 }.path(),
            "/teams/4/matches?status=scheduled"
        );
        assert_eq!(Resource::Roster { team_id: 4 }.path(), "/teams/4/players");
    }

    #[tokio::test]
    async fn test_match_update_patches_lists_holding_it() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = CacheManager::new(Arc::new(MemoryStore::new()), TtlPolicy::default(), clock.clone());
        let calendar = Resource::Calendar { team_id: 7 }.cache_key();
        let results = Resource::Results { team_id: 7 }.cache_key();

        cache
            .save(calendar.as_str(), &json!([
                {"id": 1, "status": "scheduled"},
                {"id": 2, "status": "scheduled"}
            ]))
            .await;
        cache.save(results.as_str(), &json!([{"id": 0, "status": "finished"}])).await;
        clock.advance(Duration::from_secs(120));

        let update = json!({"id": 1, "status": "live", "score": "1-0"});
        assert_eq!(apply_match_update(&cache, 7, &update).await, 1);

        let list: Vec<Value> = cache.load_strict(calendar.as_str()).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0], update);
        assert_eq!(list[1]["status"], "scheduled");
        assert_eq!(cache.age(calendar.as_str()).await, Some(0));
        assert_eq!(cache.age(results.as_str()).await, Some(120_000));

        assert_eq!(apply_match_update(&cache, 7, &json!({"status": "x"})).await, 0);
    }
}
