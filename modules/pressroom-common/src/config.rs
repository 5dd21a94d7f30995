use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::info;
use typed_builder::TypedBuilder;

use crate::error::PressroomError;

pub const DEFAULT_CLAUDE_MODEL: &str = "claude-haiku-4-5-20251001";

/// Site-search vocabulary, tried in order.
pub const DEFAULT_SITE_SEARCH_TERMS: &[&str] =
    &["news", "press releases", "press", "newsroom", "media"];

/// Whether exhausted discoveries are memoized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NegativeCache {
    /// Failed domains are re-attempted in full on every run.
    #[default]
    Disabled,
    /// Failed domains are skipped until the entry is older than `ttl`.
    Enabled { ttl: Duration },
}

/// Tunables for a discovery run.
#[derive(Debug, Clone, TypedBuilder)]
pub struct DiscoveryConfig {
    /// Ceiling on candidates verified per strategy attempt.
    #[builder(default = 5)]
    pub max_candidates_to_check: usize,
    #[builder(default = 10)]
    pub max_search_results: usize,
    /// Article links mined for root URLs per strategy attempt.
    #[builder(default = 3)]
    pub max_article_roots: usize,
    #[builder(default = Duration::from_secs(30))]
    pub navigation_timeout: Duration,
    #[builder(default = Duration::from_secs(60))]
    pub classify_timeout: Duration,
    /// Pause inserted after each automation action.
    #[builder(default = Duration::from_secs(1))]
    pub action_delay: Duration,
    /// Pause between consecutive targets in a sequential batch.
    #[builder(default = Duration::from_secs(3))]
    pub inter_target_delay: Duration,
    #[builder(default = DEFAULT_SITE_SEARCH_TERMS.iter().map(|s| s.to_string()).collect::<Vec<String>>())]
    pub site_search_terms: Vec<String>,
    /// Attempts to reacquire the site-search box for a single term.
    #[builder(default = 2)]
    pub site_search_attempts: usize,
    #[builder(default = true)]
    pub rank_candidates: bool,
    #[builder(default)]
    pub negative_cache: NegativeCache,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Process configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub claude_model: String,
    pub serper_api_key: String,
    pub browserless_url: String,
    pub browserless_token: Option<String>,
    pub data_dir: PathBuf,
    pub discovery: DiscoveryConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, PressroomError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. `from_env` passes `std::env::var`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PressroomError> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| PressroomError::Config(format!("{key} environment variable is required")))
        };

        let mut discovery = DiscoveryConfig::default();
        if let Some(raw) = lookup("MAX_CANDIDATES") {
            discovery.max_candidates_to_check = raw
                .parse()
                .map_err(|_| PressroomError::Config(format!("MAX_CANDIDATES must be a number, got {raw:?}")))?;
        }
        if let Some(raw) = lookup("NEGATIVE_CACHE_TTL_HOURS") {
            let hours: u64 = raw.parse().map_err(|_| {
                PressroomError::Config(format!("NEGATIVE_CACHE_TTL_HOURS must be a number, got {raw:?}"))
            })?;
            discovery.negative_cache = if hours == 0 {
                NegativeCache::Disabled
            } else {
                let secs = hours.checked_mul(3600).ok_or_else(|| {
                    PressroomError::Config(format!("NEGATIVE_CACHE_TTL_HOURS is out of range, got {raw:?}"))
                })?;
                NegativeCache::Enabled {
                    ttl: Duration::from_secs(secs),
                }
            };
        }

        Ok(Self {
            anthropic_api_key: required("ANTHROPIC_API_KEY")?,
            claude_model: lookup("CLAUDE_MODEL").unwrap_or_else(|| DEFAULT_CLAUDE_MODEL.to_string()),
            serper_api_key: required("SERPER_API_KEY")?,
            browserless_url: lookup("BROWSERLESS_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            browserless_token: lookup("BROWSERLESS_TOKEN").filter(|t| !t.is_empty()),
            data_dir: PathBuf::from(lookup("DATA_DIR").unwrap_or_else(|| "data".to_string())),
            discovery,
        })
    }

    /// Log the effective configuration with secrets masked.
    pub fn log_redacted(&self) {
        info!(
            anthropic_api_key = %redact(&self.anthropic_api_key),
            serper_api_key = %redact(&self.serper_api_key),
            browserless_url = self.browserless_url.as_str(),
            browserless_token = %self.browserless_token.as_deref().map(redact).unwrap_or_default(),
            claude_model = self.claude_model.as_str(),
            data_dir = %self.data_dir.display(),
            max_candidates = self.discovery.max_candidates_to_check,
            negative_cache = ?self.discovery.negative_cache,
            "Loaded configuration"
        );
    }
}

fn redact(secret: &str) -> String {
    if secret.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = secret.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    format!("****{tail}")
}
