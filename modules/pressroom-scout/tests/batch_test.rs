//! Batch runs and the result cache: input order, malformed targets,
//! concurrent sessions, cache hits across scouts.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use pressroom_common::{CacheEntry, RunSummary, Strategy};
use pressroom_scout::infra::{FileCacheStore, MemoryCacheStore};
use pressroom_scout::scout::Scout;
use pressroom_scout::testing::{fast_config, link, spec, target, MockClassifier, MockSearch, MockSession};
use pressroom_scout::traits::{CacheStore, PageSession};

fn entry(domain: &str, url: &str) -> CacheEntry {
    CacheEntry {
        domain: domain.to_string(),
        success: true,
        matched_url: Some(url.to_string()),
        extracted_date: Some("2024-04-04".to_string()),
        strategy_used: Some(Strategy::Homepage),
        discovered_at: Utc::now(),
        provenance_id: Uuid::new_v4(),
    }
}

#[tokio::test]
async fn cache_hit_skips_every_collaborator() {
    let store = Arc::new(MemoryCacheStore::new());
    store
        .put(
            "discovery/bar.com",
            &serde_json::to_string(&entry("bar.com", "https://bar.com/newsroom")).unwrap(),
        )
        .await
        .unwrap();

    let search = Arc::new(MockSearch::new());
    let classifier = Arc::new(MockClassifier::new());
    let session = MockSession::new();
    let scout = Scout::new(search.clone(), classifier.clone(), store, fast_config());

    let first = scout.discover_spec(&session, &spec("Bar Inc", "https://www.bar.com")).await;
    let second = scout.discover_spec(&session, &spec("Bar Inc", "bar.com")).await;

    for result in [&first, &second] {
        assert!(result.success);
        assert_eq!(result.strategy_used, Some(Strategy::Cached));
        assert_eq!(result.matched_url.as_deref(), Some("https://bar.com/newsroom"));
        assert_eq!(result.extracted_date.as_deref(), Some("2024-04-04"));
        assert!(result.steps.is_empty());
        assert_eq!(result.candidates_checked, 0);
    }
    assert_eq!(search.calls(), 0);
    assert_eq!(classifier.calls(), 0);
    assert_eq!(session.navigation_count(), 0);
}

#[tokio::test]
async fn successful_discovery_is_cached_for_the_next_call() {
    let news = "https://acme.com/news";
    let search = Arc::new(MockSearch::new().with_results(vec![link("Acme News", news)]));
    let classifier = Arc::new(MockClassifier::new().matching(news, "2024-06-01"));
    let session = MockSession::new().on_page(news, 200);
    let scout = Scout::new(
        search.clone(),
        classifier.clone(),
        Arc::new(MemoryCacheStore::new()),
        fast_config(),
    );

    let fresh = scout.discover(&session, &target("Acme", "acme.com")).await;
    let replay = scout.discover(&session, &target("Acme", "acme.com")).await;

    assert_eq!(fresh.strategy_used, Some(Strategy::Search));
    assert_eq!(replay.strategy_used, Some(Strategy::Cached));
    assert_eq!(replay.matched_url, fresh.matched_url);
    assert_eq!(search.calls(), 1);

    let entries = scout.cache().entries().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].domain, "acme.com");
    assert_eq!(entries[0].strategy_used, Some(Strategy::Search));
    assert_eq!(entries[0].provenance_id, scout.run_id());
}

#[tokio::test]
async fn file_cache_survives_a_new_scout() {
    let dir = tempfile::tempdir().unwrap();
    let news = "https://acme.com/news";

    {
        let search = Arc::new(MockSearch::new().with_results(vec![link("Acme News", news)]));
        let classifier = Arc::new(MockClassifier::new().matching(news, "2024-06-01"));
        let session = MockSession::new().on_page(news, 200);
        let scout = Scout::new(
            search,
            classifier,
            Arc::new(FileCacheStore::in_data_dir(dir.path())),
            fast_config(),
        );
        let result = scout.discover(&session, &target("Acme", "acme.com")).await;
        assert!(result.success);
    }

    let search = Arc::new(MockSearch::new());
    let scout = Scout::new(
        search.clone(),
        Arc::new(MockClassifier::new()),
        Arc::new(FileCacheStore::in_data_dir(dir.path())),
        fast_config(),
    );
    let result = scout.discover(&MockSession::new(), &target("Acme", "acme.com")).await;

    assert_eq!(result.strategy_used, Some(Strategy::Cached));
    assert_eq!(result.matched_url.as_deref(), Some(news));
    assert_eq!(search.calls(), 0);
}

#[tokio::test]
async fn batch_keeps_input_order_and_reports_malformed_targets() {
    let news = "https://acme.com/news";
    let search = Arc::new(MockSearch::new().on_query(
        "site:acme.com press releases news",
        vec![link("Acme News", news)],
    ));
    let classifier = Arc::new(MockClassifier::new().matching(news, "2024-06-01"));
    let session = MockSession::new().on_page(news, 200);
    let scout = Scout::new(
        search.clone(),
        classifier,
        Arc::new(MemoryCacheStore::new()),
        fast_config(),
    );

    let specs = vec![
        spec("Broken", "not a domain"),
        spec("Acme", "www.acme.com"),
        spec("Empty", "   "),
    ];
    let results = scout.run_batch(&session, &specs).await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].target.name, "Broken");
    assert!(!results[0].success);
    assert!(results[0].error.is_some());
    assert!(results[0].steps.is_empty());

    assert_eq!(results[1].target.domain, "acme.com");
    assert!(results[1].success);

    assert_eq!(results[2].target.name, "Empty");
    assert!(!results[2].success);

    // Only the valid target reached the search engine.
    assert_eq!(search.calls(), 1);

    let summary = RunSummary::from_results(&results);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.by_strategy.get(&Strategy::Search), Some(&1));
}

#[tokio::test]
async fn concurrent_batch_uses_one_session_per_target() {
    let domains = ["alpha.com", "beta.com", "gamma.com", "delta.com"];
    let mut search = MockSearch::new();
    let mut classifier = MockClassifier::new();
    for d in domains {
        let news = format!("https://{d}/news");
        search = search.on_query(&format!("site:{d} press releases news"), vec![link("News", &news)]);
        classifier = classifier.matching(&news, "2024-01-01");
    }
    let search = Arc::new(search);
    let scout = Scout::new(
        search.clone(),
        Arc::new(classifier),
        Arc::new(MemoryCacheStore::new()),
        fast_config(),
    );

    let specs: Vec<_> = domains
        .iter()
        .map(|d| spec(d.trim_end_matches(".com"), d))
        .collect();
    let make_session = || -> anyhow::Result<Box<dyn PageSession>> {
        let mut session = MockSession::new();
        for d in domains {
            session = session.on_page(&format!("https://{d}/news"), 200);
        }
        Ok(Box::new(session))
    };

    let results = scout.run_concurrent(&specs, 3, make_session).await;

    let order: Vec<_> = results.iter().map(|r| r.target.domain.as_str()).collect();
    assert_eq!(order, domains.to_vec());
    assert!(results.iter().all(|r| r.success));
    for r in &results {
        assert_eq!(
            r.matched_url.as_deref(),
            Some(format!("https://{}/news", r.target.domain).as_str())
        );
    }
    assert_eq!(search.calls(), 4);
}

#[tokio::test]
async fn session_factory_failure_is_reported_per_target() {
    let search = Arc::new(MockSearch::new());
    let scout = Scout::new(
        search.clone(),
        Arc::new(MockClassifier::new()),
        Arc::new(MemoryCacheStore::new()),
        fast_config(),
    );

    let specs = vec![spec("Acme", "acme.com"), spec("Bad", "")];
    let results = scout
        .run_concurrent(&specs, 2, || -> anyhow::Result<Box<dyn PageSession>> {
            anyhow::bail!("browser pool exhausted")
        })
        .await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].target.domain, "acme.com");
    assert!(results[0]
        .error
        .as_deref()
        .unwrap_or_default()
        .contains("browser pool exhausted"));
    assert!(!results[1].success);
    assert_eq!(search.calls(), 0);
}
