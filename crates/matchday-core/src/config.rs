//! Application configuration management.
//!
//! Configuration is stored at `~/.config/matchday/config.json`; cached data
//! lives in `~/.cache/matchday/storage.json`. A few fields can be overridden
//! from the environment (`MATCHDAY_API_URL`, `MATCHDAY_API_KEY`,
//! `MATCHDAY_OFFLINE`).

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::context::CRATE_VERSION;
use crate::resources::Resource;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "matchday";

const CONFIG_FILE: &str = "config.json";

const STORAGE_FILE: &str = "storage.json";

const DEFAULT_API_URL: &str = "https://api.matchday.app/v1";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub api_key: Option<String>,
    /// The club's own team
    pub team_id: Option<u64>,
    pub season: Option<u32>,
    /// League the team plays in, for standings
    pub competition_id: Option<u64>,
    /// Treat the network as unreachable
    #[serde(default)]
    pub offline: bool,
    /// Overrides the version used for the upgrade flush
    pub app_version: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Apply environment overrides on top of the file values.
    pub fn with_env(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("MATCHDAY_API_URL").filter(|v| !v.is_empty()) {
            self.api_base_url = Some(url);
        }
        if let Some(key) = lookup("MATCHDAY_API_KEY").filter(|v| !v.is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(flag) = lookup("MATCHDAY_OFFLINE") {
            self.offline = matches!(flag.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        self
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn storage_path(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME).join(STORAGE_FILE))
    }

    pub fn api_base_url(&self) -> &str {
        self.api_base_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    pub fn app_version(&self) -> &str {
        self.app_version.as_deref().unwrap_or(CRATE_VERSION)
    }

    /// Resources fetched at start-up so the app can render offline.
    ///
    /// Team-scoped and competition-scoped resources are only included when
    /// the corresponding id is configured.
    pub fn startup_resources(&self) -> Vec<Resource> {
        let mut resources = vec![Resource::Teams, Resource::Seasons];
        if let Some(season) = self.season {
            resources.push(Resource::Competitions { season });
        }
        if let Some(team_id) = self.team_id {
            resources.push(Resource::Calendar { team_id });
            resources.push(Resource::Results { team_id });
            resources.push(Resource::Roster { team_id });
        }
        if let Some(competition_id) = self.competition_id {
            resources.push(Resource::Standings { competition_id });
        }
        resources
    }
}
