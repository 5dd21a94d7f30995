use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};
use uuid::Uuid;

use pressroom_common::{DiscoveryConfig, DiscoveryResult, Target, TargetSpec};

use crate::cache::ResultCache;
use crate::discovery::Discovery;
use crate::infra::util::pace;
use crate::traits::{CacheStore, PageSession, SearchEngine, SemanticClassifier};

/// Entry point for discovery runs: cache check, orchestrator, cache write.
///
/// One `Scout` serves a whole batch. Page sessions are supplied per call
/// because a session holds mutable page state and must not be shared between
/// targets that run at the same time.
pub struct Scout {
    search: Arc<dyn SearchEngine>,
    classifier: Arc<dyn SemanticClassifier>,
    cache: ResultCache,
    config: DiscoveryConfig,
    run_id: Uuid,
}

impl Scout {
    pub fn new(
        search: Arc<dyn SearchEngine>,
        classifier: Arc<dyn SemanticClassifier>,
        store: Arc<dyn CacheStore>,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            search,
            classifier,
            cache: ResultCache::new(store, config.negative_cache),
            config,
            run_id: Uuid::new_v4(),
        }
    }

    /// Provenance id stamped on every cache entry this scout writes.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Discover the newsroom of one target. A cache hit returns without any
    /// search, navigation or classification call.
    pub async fn discover(&self, session: &dyn PageSession, target: &Target) -> DiscoveryResult {
        if let Some(entry) = self.cache.lookup(&target.domain).await {
            info!(
                domain = target.domain.as_str(),
                url = entry.matched_url.as_deref().unwrap_or(""),
                success = entry.success,
                "Cache hit"
            );
            return DiscoveryResult::from_cache(target.clone(), &entry);
        }

        let discovery = Discovery::new(
            self.search.as_ref(),
            session,
            self.classifier.as_ref(),
            &self.config,
        );
        let result = discovery.run(target).await;

        if let Err(e) = self.cache.store(&result, self.run_id).await {
            warn!(domain = target.domain.as_str(), error = %e, "Failed to cache discovery result");
        }
        result
    }

    /// Parse and discover. A malformed domain yields an error result and no
    /// strategy runs.
    pub async fn discover_spec(&self, session: &dyn PageSession, spec: &TargetSpec) -> DiscoveryResult {
        match Target::try_from(spec) {
            Ok(target) => self.discover(session, &target).await,
            Err(e) => {
                warn!(name = spec.name.as_str(), domain = spec.domain.as_str(), error = %e, "Skipping malformed target");
                DiscoveryResult::malformed(spec, &e)
            }
        }
    }

    /// Sequential batch over one session, pausing `inter_target_delay`
    /// between targets. Results are in input order.
    pub async fn run_batch(&self, session: &dyn PageSession, specs: &[TargetSpec]) -> Vec<DiscoveryResult> {
        let mut results = Vec::with_capacity(specs.len());
        for (i, spec) in specs.iter().enumerate() {
            if i > 0 {
                pace(self.config.inter_target_delay).await;
            }
            info!(index = i + 1, total = specs.len(), name = spec.name.as_str(), "Processing target");
            results.push(self.discover_spec(session, spec).await);
        }
        results
    }

    /// Up to `limit` targets at once, each on its own session from
    /// `make_session`. Results are in input order.
    pub async fn run_concurrent<F>(&self, specs: &[TargetSpec], limit: usize, make_session: F) -> Vec<DiscoveryResult>
    where
        F: Fn() -> anyhow::Result<Box<dyn PageSession>>,
    {
        let make_session = &make_session;
        let mut indexed: Vec<(usize, DiscoveryResult)> = stream::iter(specs.iter().enumerate())
            .map(|(i, spec)| async move {
                let target = match Target::try_from(spec) {
                    Ok(t) => t,
                    Err(e) => {
                        warn!(name = spec.name.as_str(), error = %e, "Skipping malformed target");
                        return (i, DiscoveryResult::malformed(spec, &e));
                    }
                };
                let result = match make_session() {
                    Ok(session) => self.discover(session.as_ref(), &target).await,
                    Err(e) => {
                        warn!(domain = target.domain.as_str(), error = %e, "Could not open page session");
                        DiscoveryResult::unattempted(target, format!("page session unavailable: {e:#}"))
                    }
                };
                (i, result)
            })
            .buffer_unordered(limit.max(1))
            .collect()
            .await;

        indexed.sort_by_key(|(i, _)| *i);
        indexed.into_iter().map(|(_, r)| r).collect()
    }
}
