//! Harvest configuration.
//!
//! Settings come from an optional YAML file; every field has a default, so a
//! partial file (or none at all) is fine. The `--delay` flag overrides
//! `delay_secs` from the file.
//!
//! ```yaml
//! base_url: https://www.allsides.com
//! roundup_path: /headline-roundups
//! user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/116.0"
//! request_timeout_secs: 30
//! delay_secs: 0.1
//! ```

use crate::error::HarvestError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/116.0";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarvestConfig {
    /// Scheme and host of the source site; story paths resolve against it.
    pub base_url: String,
    /// Path of the paginated roundup listing.
    pub roundup_path: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    /// Minimum pause between two requests, in seconds.
    pub delay_secs: f64,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.allsides.com".to_string(),
            roundup_path: "/headline-roundups".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 30,
            delay_secs: 0.1,
        }
    }
}

impl HarvestConfig {
    /// Load a YAML config file.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, HarvestError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| HarvestError::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_yaml(&raw)?;
        info!(base_url = %config.base_url, delay_secs = config.delay_secs, "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, HarvestError> {
        let config: Self =
            serde_yaml::from_str(raw).map_err(|e| HarvestError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that would otherwise fail deep inside a run.
    pub fn validate(&self) -> Result<(), HarvestError> {
        Url::parse(&self.base_url)
            .map_err(|e| HarvestError::Config(format!("base_url {:?}: {e}", self.base_url)))?;
        if !self.delay_secs.is_finite() || self.delay_secs < 0.0 {
            return Err(HarvestError::Config(format!(
                "delay_secs must be a non-negative number, got {}",
                self.delay_secs
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(HarvestError::Config("request_timeout_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs_f64(self.delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// URL of one roundup listing page.
    pub fn roundup_url(&self, page: u32) -> String {
        format!(
            "{}{}?page={page}",
            self.base_url.trim_end_matches('/'),
            self.roundup_path
        )
    }

    /// Absolute URL of a story given its site-relative path.
    pub fn story_url(&self, path: &str) -> Option<String> {
        Url::parse(&self.base_url)
            .and_then(|base| base.join(path))
            .ok()
            .map(|u| u.to_string())
    }
}
