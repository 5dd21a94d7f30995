//! Per-domain memoization of discovery outcomes on top of a `CacheStore`.
//!
//! Keyed by normalized domain only, so two targets sharing a domain share an
//! entry. Writes are whole-entry overwrites; the last writer wins.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use pressroom_common::{CacheEntry, DiscoveryResult, NegativeCache, Strategy};

use crate::error::ScoutError;
use crate::traits::CacheStore;

const KEY_PREFIX: &str = "discovery/";

pub struct ResultCache {
    store: Arc<dyn CacheStore>,
    negative: NegativeCache,
}

impl ResultCache {
    pub fn new(store: Arc<dyn CacheStore>, negative: NegativeCache) -> Self {
        Self { store, negative }
    }

    pub fn key(domain: &str) -> String {
        format!("{KEY_PREFIX}{domain}")
    }

    /// A usable entry for `domain`, if any. Store failures and corrupt entries
    /// read as a miss so discovery still runs.
    pub async fn lookup(&self, domain: &str) -> Option<CacheEntry> {
        let entry = match self.read(domain).await {
            Ok(entry) => entry?,
            Err(e) => {
                warn!(domain, error = %e, "Cache lookup failed, treating as miss");
                return None;
            }
        };

        if entry.success {
            return Some(entry);
        }

        match self.negative {
            NegativeCache::Disabled => {
                debug!(domain, "Ignoring negative cache entry, negative caching disabled");
                None
            }
            NegativeCache::Enabled { ttl } => {
                let ttl = ChronoDuration::from_std(ttl).unwrap_or_else(|_| ChronoDuration::days(36_500));
                let age = Utc::now().signed_duration_since(entry.discovered_at);
                if age < ttl {
                    Some(entry)
                } else {
                    debug!(domain, age_hours = age.num_hours(), "Negative cache entry expired");
                    None
                }
            }
        }
    }

    /// Persist `result` if it qualifies: always for a success, for an
    /// exhausted run only when negative caching is enabled. Returns whether an
    /// entry was written. Cached and malformed results are never written back.
    pub async fn store(&self, result: &DiscoveryResult, provenance_id: Uuid) -> Result<bool, ScoutError> {
        if result.strategy_used == Some(Strategy::Cached) {
            return Ok(false);
        }
        if !result.success && (self.negative == NegativeCache::Disabled || result.steps.is_empty()) {
            return Ok(false);
        }

        let entry = CacheEntry {
            domain: result.target.domain.clone(),
            success: result.success,
            matched_url: result.matched_url.clone(),
            extracted_date: result.extracted_date.clone(),
            strategy_used: result.strategy_used,
            discovered_at: Utc::now(),
            provenance_id,
        };
        let json = serde_json::to_string(&entry).map_err(|e| ScoutError::Cache(e.to_string()))?;
        self.store
            .put(&Self::key(&entry.domain), &json)
            .await
            .map_err(|e| ScoutError::Cache(format!("{e:#}")))?;

        info!(
            domain = entry.domain.as_str(),
            success = entry.success,
            url = entry.matched_url.as_deref().unwrap_or(""),
            "Cached discovery result"
        );
        Ok(true)
    }

    /// Every readable entry in the store, sorted by domain.
    pub async fn entries(&self) -> Result<Vec<CacheEntry>, ScoutError> {
        let keys = self
            .store
            .list(KEY_PREFIX)
            .await
            .map_err(|e| ScoutError::Cache(format!("{e:#}")))?;

        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            let domain = key.trim_start_matches(KEY_PREFIX);
            match self.read(domain).await {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(e) => warn!(key = key.as_str(), error = %e, "Skipping unreadable cache entry"),
            }
        }
        entries.sort_by(|a, b| a.domain.cmp(&b.domain));
        Ok(entries)
    }

    async fn read(&self, domain: &str) -> Result<Option<CacheEntry>, ScoutError> {
        let Some(raw) = self
            .store
            .get(&Self::key(domain))
            .await
            .map_err(|e| ScoutError::Cache(format!("{e:#}")))?
        else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| ScoutError::Cache(format!("corrupt entry for {domain}: {e}")))
    }
}
