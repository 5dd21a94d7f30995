//! Discovery scenarios against the in-memory mocks: strategy order,
//! verification protocol, counters and the audit trail.

use std::sync::Arc;
use std::time::Duration;

use pressroom_common::{DiscoveryConfig, DiscoveryResult, NegativeCache, StepOutcome, Strategy};
use pressroom_scout::discovery::EXHAUSTED_ERROR;
use pressroom_scout::infra::MemoryCacheStore;
use pressroom_scout::scout::Scout;
use pressroom_scout::testing::{fast_config, link, target, MockClassifier, MockSearch, MockSession};
use pressroom_scout::traits::{PageAction, SchemaId};

const HOME: &str = "https://example.com/";
const NEWS: &str = "https://example.com/news";
const PRESS: &str = "https://example.com/press";

fn scout(search: &Arc<MockSearch>, classifier: &Arc<MockClassifier>, config: DiscoveryConfig) -> Scout {
    Scout::new(
        search.clone(),
        classifier.clone(),
        Arc::new(MemoryCacheStore::new()),
        config,
    )
}

fn steps_in(result: &DiscoveryResult, phase: &str) -> usize {
    result
        .steps
        .iter()
        .filter(|s| s.phase_id.starts_with(&format!("{phase}-")))
        .count()
}

fn search_results() -> Vec<pressroom_common::RawLink> {
    vec![
        link("Newsroom | Example", NEWS),
        link("Press", PRESS),
        link("Q1 earnings", "https://example.com/news/2024/q1-earnings"),
        link("About us", "https://example.com/about"),
        link("Example news coverage", "https://othersite.com/news"),
    ]
}

#[tokio::test]
async fn search_success_verifies_first_listing_and_stops() {
    let search = Arc::new(MockSearch::new().with_results(search_results()));
    let classifier = Arc::new(MockClassifier::new().matching(NEWS, "2024-06-01"));
    let session = MockSession::new().on_page(NEWS, 200).on_page(PRESS, 200);

    let result = scout(&search, &classifier, fast_config())
        .discover(&session, &target("Example", "example.com"))
        .await;

    assert!(result.success);
    assert_eq!(result.matched_url.as_deref(), Some(NEWS));
    assert_eq!(result.extracted_date.as_deref(), Some("2024-06-01"));
    assert_eq!(result.strategy_used, Some(Strategy::Search));
    assert_eq!(result.candidates_checked, 1);
    assert_eq!(result.raw_result_count, 5);
    assert!(result.error.is_none());

    // Two-phase check: one navigation to classify, one to reconfirm.
    assert_eq!(session.navigations_to(NEWS), 2);
    assert_eq!(session.navigations_to(PRESS), 0);
    assert_eq!(classifier.verified_urls(), vec![NEWS.to_string()]);

    assert_eq!(steps_in(&result, "homepage"), 0);
    assert_eq!(steps_in(&result, "site_search"), 0);
    assert!(steps_in(&result, "search") > 0);
}

#[tokio::test]
async fn step_ids_are_ordered_and_timestamps_monotonic() {
    let search = Arc::new(MockSearch::new().with_results(search_results()));
    let classifier = Arc::new(MockClassifier::new().matching(PRESS, "2024-01-01"));
    let session = MockSession::new().on_page(NEWS, 200).on_page(PRESS, 200);

    let result = scout(&search, &classifier, fast_config())
        .discover(&session, &target("Example", "example.com"))
        .await;

    for (i, step) in result.steps.iter().enumerate() {
        assert!(step.phase_id.ends_with(&format!("-{}", i + 1)), "{}", step.phase_id);
    }
    assert!(result.steps.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

    let rejected = result
        .steps
        .iter()
        .find(|s| s.url.as_deref() == Some(NEWS) && s.outcome == StepOutcome::Fail)
        .expect("rejection of /news is recorded");
    assert_eq!(rejected.detail, "Not a listing page");
}

#[tokio::test]
async fn dead_candidate_is_skipped_without_classification() {
    let search = Arc::new(MockSearch::new().with_results(vec![link("News", NEWS), link("Press", PRESS)]));
    let classifier = Arc::new(MockClassifier::new().matching(NEWS, "2024-06-01").matching(PRESS, "2024-06-02"));
    let session = MockSession::new().on_page(NEWS, 404).on_page(PRESS, 200);

    let result = scout(&search, &classifier, fast_config())
        .discover(&session, &target("Example", "example.com"))
        .await;

    assert_eq!(result.matched_url.as_deref(), Some(PRESS));
    assert_eq!(result.candidates_checked, 2);
    assert_eq!(classifier.verified_urls(), vec![PRESS.to_string()]);

    let skip = result
        .steps
        .iter()
        .find(|s| s.url.as_deref() == Some(NEWS))
        .expect("404 candidate leaves a step");
    assert_eq!(skip.outcome, StepOutcome::Skip);
    assert_eq!(skip.detail, "HTTP 404");
}

#[tokio::test]
async fn failed_reconfirmation_discards_positive_verdict() {
    let search = Arc::new(MockSearch::new().with_results(vec![link("News", NEWS), link("Press", PRESS)]));
    let classifier = Arc::new(MockClassifier::new().matching(NEWS, "2024-06-01").matching(PRESS, "2024-06-02"));
    let session = MockSession::new()
        .on_page_statuses(NEWS, &[200, 500])
        .on_page(PRESS, 200);

    let result = scout(&search, &classifier, fast_config())
        .discover(&session, &target("Example", "example.com"))
        .await;

    assert_eq!(result.matched_url.as_deref(), Some(PRESS));
    assert_eq!(result.extracted_date.as_deref(), Some("2024-06-02"));
    assert_eq!(result.candidates_checked, 2);

    let failed = result
        .steps
        .iter()
        .find(|s| s.url.as_deref() == Some(NEWS) && s.outcome == StepOutcome::Fail)
        .expect("reconfirmation failure is recorded");
    assert!(failed.detail.starts_with("validation failed"), "{}", failed.detail);
}

#[tokio::test]
async fn classification_errors_skip_the_candidate() {
    let search = Arc::new(MockSearch::new().with_results(vec![link("News", NEWS), link("Press", PRESS)]));
    let classifier = Arc::new(MockClassifier::new().erroring_on(NEWS).matching(PRESS, "2024-06-02"));
    let session = MockSession::new().on_page(NEWS, 200).on_page(PRESS, 200);

    let result = scout(&search, &classifier, fast_config())
        .discover(&session, &target("Example", "example.com"))
        .await;

    assert_eq!(result.matched_url.as_deref(), Some(PRESS));
    let skipped = result
        .steps
        .iter()
        .find(|s| s.url.as_deref() == Some(NEWS) && s.outcome == StepOutcome::Skip)
        .expect("classification error is recorded");
    assert!(skipped.detail.contains("classification error"));
}

#[tokio::test]
async fn mismatched_schema_is_never_trusted() {
    let search = Arc::new(MockSearch::new().with_results(vec![link("News", NEWS)]));
    let classifier = Arc::new(MockClassifier::new().wrong_schema());
    let session = MockSession::new().on_page(NEWS, 200);

    let result = scout(&search, &classifier, fast_config())
        .discover(&session, &target("Example", "example.com"))
        .await;

    assert!(!result.success);
    assert!(result
        .steps
        .iter()
        .any(|s| s.outcome == StepOutcome::Skip && s.detail.contains("page_verification")));
}

#[tokio::test]
async fn empty_search_falls_back_to_homepage() {
    let search = Arc::new(MockSearch::new());
    let classifier = Arc::new(MockClassifier::new().matching("https://example.com/newsroom", "2024-03-03"));
    let session = MockSession::new()
        .on_page(HOME, 200)
        .on_page("https://example.com/newsroom", 200)
        .with_nav_links(HOME, &[("Home", "/"), ("Newsroom", "/newsroom"), ("Careers", "/careers")]);

    let result = scout(&search, &classifier, fast_config())
        .discover(&session, &target("Example", "example.com"))
        .await;

    assert!(result.success);
    assert_eq!(result.strategy_used, Some(Strategy::Homepage));
    assert_eq!(result.matched_url.as_deref(), Some("https://example.com/newsroom"));
    assert_eq!(result.candidates_checked, 1);
    assert_eq!(result.raw_result_count, 3);
    assert!(session.actions().contains(&PageAction::ExpandMenus));
    assert_eq!(steps_in(&result, "site_search"), 0);
    assert!(result
        .steps
        .iter()
        .any(|s| s.phase_id.starts_with("search-") && s.detail.contains("returned 0 results")));
}

#[tokio::test]
async fn search_outage_is_treated_like_no_results() {
    let search = Arc::new(MockSearch::new().failing());
    let classifier = Arc::new(MockClassifier::new().matching("https://example.com/media", "2024-03-03"));
    let session = MockSession::new()
        .on_page(HOME, 200)
        .on_page("https://example.com/media", 200)
        .with_nav_links(HOME, &[("Media", "/media")]);

    let result = scout(&search, &classifier, fast_config())
        .discover(&session, &target("Example", "example.com"))
        .await;

    assert_eq!(result.strategy_used, Some(Strategy::Homepage));
    assert!(result
        .steps
        .iter()
        .any(|s| s.phase_id.starts_with("search-") && s.outcome == StepOutcome::Skip));
}

#[tokio::test]
async fn homepage_candidates_follow_ranking() {
    let media = "https://example.com/media";
    let newsroom = "https://example.com/newsroom";
    let search = Arc::new(MockSearch::new());
    let classifier = Arc::new(
        MockClassifier::new()
            .matching(media, "2024-01-01")
            .matching(newsroom, "2024-02-02")
            .with_rankings(&[(media, 3), (newsroom, 9)]),
    );
    let session = MockSession::new()
        .on_page(HOME, 200)
        .on_page(media, 200)
        .on_page(newsroom, 200)
        .with_nav_links(HOME, &[("Media", "/media"), ("Newsroom", "/newsroom")]);

    let result = scout(&search, &classifier, fast_config())
        .discover(&session, &target("Example", "example.com"))
        .await;

    assert_eq!(result.matched_url.as_deref(), Some(newsroom));
    assert_eq!(classifier.verified_urls(), vec![newsroom.to_string()]);
    assert_eq!(classifier.calls_for(SchemaId::LinkRanking), 1);
}

#[tokio::test]
async fn ranking_failure_keeps_discovery_order() {
    let media = "https://example.com/media";
    let newsroom = "https://example.com/newsroom";
    let search = Arc::new(MockSearch::new());
    let classifier = Arc::new(
        MockClassifier::new()
            .matching(media, "2024-01-01")
            .matching(newsroom, "2024-02-02"),
    );
    let session = MockSession::new()
        .on_page(HOME, 200)
        .on_page(media, 200)
        .on_page(newsroom, 200)
        .with_nav_links(HOME, &[("Media", "/media"), ("Newsroom", "/newsroom")]);

    let result = scout(&search, &classifier, fast_config())
        .discover(&session, &target("Example", "example.com"))
        .await;

    assert_eq!(result.matched_url.as_deref(), Some(media));
    assert!(result
        .steps
        .iter()
        .any(|s| s.action == "rank" && s.outcome == StepOutcome::Skip));
}

#[tokio::test]
async fn homepage_uses_classifier_links_when_navigation_is_opaque() {
    let newsroom = "https://example.com/newsroom";
    let search = Arc::new(MockSearch::new());
    let classifier = Arc::new(
        MockClassifier::new()
            .with_nav_fallback(HOME, vec![link("Newsroom", "/newsroom")])
            .matching(newsroom, "2024-02-02"),
    );
    let session = MockSession::new().on_page(HOME, 200).on_page(newsroom, 200);

    let result = scout(&search, &classifier, fast_config())
        .discover(&session, &target("Example", "example.com"))
        .await;

    assert_eq!(result.strategy_used, Some(Strategy::Homepage));
    assert_eq!(result.matched_url.as_deref(), Some(newsroom));
    assert_eq!(classifier.calls_for(SchemaId::NavigationLinksList), 1);
}

#[tokio::test]
async fn site_search_finds_listing_in_results() {
    let results_page = "https://example.com/search?q=news";
    let releases = "https://example.com/press-releases";
    let search = Arc::new(MockSearch::new());
    let classifier = Arc::new(MockClassifier::new().matching(releases, "2024-05-05"));
    let session = MockSession::new()
        .on_page(HOME, 200)
        .on_page(releases, 200)
        .with_search_box(HOME)
        .on_site_search("news", results_page)
        .with_result_links(
            results_page,
            &[
                ("Press releases", "/press-releases"),
                ("Acme launches new widget line", "/news/2024/05/acme-launches-new-widget-line"),
                ("Partner site", "https://partner.com/news"),
            ],
        );

    let result = scout(&search, &classifier, fast_config())
        .discover(&session, &target("Example", "example.com"))
        .await;

    assert!(result.success);
    assert_eq!(result.strategy_used, Some(Strategy::SiteSearch));
    assert_eq!(result.matched_url.as_deref(), Some(releases));
    assert_eq!(result.raw_result_count, 3);
    assert!(session
        .actions()
        .contains(&PageAction::SubmitSearch { term: "news".to_string() }));
}

#[tokio::test]
async fn unchanged_url_reopens_search_for_next_term() {
    let results_page = "https://example.com/search?q=press+releases";
    let releases = "https://example.com/press-releases";
    let search = Arc::new(MockSearch::new());
    let classifier = Arc::new(MockClassifier::new().matching(releases, "2024-05-05"));
    let session = MockSession::new()
        .on_page(HOME, 200)
        .on_page(releases, 200)
        .with_search_box(HOME)
        .on_site_search("press releases", results_page)
        .with_result_links(results_page, &[("Press releases", "/press-releases")]);
    let config = DiscoveryConfig::builder()
        .action_delay(Duration::ZERO)
        .site_search_terms(vec!["news".to_string(), "press releases".to_string()])
        .site_search_attempts(2)
        .build();

    let result = scout(&search, &classifier, config)
        .discover(&session, &target("Example", "example.com"))
        .await;

    assert_eq!(result.strategy_used, Some(Strategy::SiteSearch));
    let unchanged = result
        .steps
        .iter()
        .filter(|s| s.action == "submit_search" && s.detail.starts_with("URL unchanged"))
        .count();
    assert_eq!(unchanged, 2);
}

#[tokio::test]
async fn exhausted_run_reports_failure_as_data() {
    let search = Arc::new(MockSearch::new());
    let classifier = Arc::new(MockClassifier::new());
    let session = MockSession::new();

    let result = scout(&search, &classifier, fast_config())
        .discover(&session, &target("Example", "example.com"))
        .await;

    assert!(!result.success);
    assert_eq!(result.strategy_used, None);
    assert_eq!(result.matched_url, None);
    assert_eq!(result.error.as_deref(), Some(EXHAUSTED_ERROR));
    assert!(steps_in(&result, "search") > 0);
    assert!(steps_in(&result, "homepage") > 0);
    assert!(steps_in(&result, "site_search") > 0);
}

#[tokio::test]
async fn url_rejected_by_search_is_rejudged_on_homepage() {
    let search = Arc::new(MockSearch::new().with_results(vec![link("News", NEWS)]));
    let classifier = Arc::new(MockClassifier::new().matching(PRESS, "2024-01-01"));
    let session = MockSession::new()
        .on_page(HOME, 200)
        .on_page(NEWS, 200)
        .on_page(PRESS, 200)
        .with_nav_links(HOME, &[("News", "/news"), ("Press", "/press")]);
    let config = DiscoveryConfig::builder()
        .action_delay(Duration::ZERO)
        .rank_candidates(false)
        .build();

    let result = scout(&search, &classifier, config)
        .discover(&session, &target("Example", "example.com"))
        .await;

    assert_eq!(result.strategy_used, Some(Strategy::Homepage));
    assert_eq!(result.matched_url.as_deref(), Some(PRESS));
    assert_eq!(
        classifier.verified_urls(),
        vec![NEWS.to_string(), NEWS.to_string(), PRESS.to_string()]
    );
    assert_eq!(result.candidates_checked, 3);
}

#[tokio::test]
async fn transient_search_failure_is_retried_by_homepage() {
    let search = Arc::new(MockSearch::new().with_results(vec![link("News", NEWS)]));
    let classifier = Arc::new(MockClassifier::new().matching(NEWS, "2024-03-03"));
    let session = MockSession::new()
        .on_page(HOME, 200)
        .on_page_statuses(NEWS, &[503, 200])
        .with_nav_links(HOME, &[("News", "/news")]);

    let result = scout(&search, &classifier, fast_config())
        .discover(&session, &target("Example", "example.com"))
        .await;

    assert!(result.success);
    assert_eq!(result.strategy_used, Some(Strategy::Homepage));
    assert_eq!(result.matched_url.as_deref(), Some(NEWS));
    assert_eq!(result.candidates_checked, 2);
    // 503 during search, then classify and reconfirm on the homepage pass.
    assert_eq!(session.navigations_to(NEWS), 3);
    assert_eq!(classifier.verified_urls(), vec![NEWS.to_string()]);
    assert!(result
        .steps
        .iter()
        .any(|s| s.phase_id.starts_with("search-") && s.outcome == StepOutcome::Skip && s.detail == "HTTP 503"));
}

#[tokio::test]
async fn navigation_error_skips_candidate_before_classification() {
    let search = Arc::new(MockSearch::new().with_results(vec![link("News", NEWS), link("Press", PRESS)]));
    let classifier = Arc::new(MockClassifier::new().matching(NEWS, "2024-01-01").matching(PRESS, "2024-02-02"));
    let session = MockSession::new().failing_navigation(NEWS).on_page(PRESS, 200);

    let result = scout(&search, &classifier, fast_config())
        .discover(&session, &target("Example", "example.com"))
        .await;

    assert_eq!(result.strategy_used, Some(Strategy::Search));
    assert_eq!(result.matched_url.as_deref(), Some(PRESS));
    assert_eq!(classifier.verified_urls(), vec![PRESS.to_string()]);
    let skipped = result
        .steps
        .iter()
        .find(|s| s.url.as_deref() == Some(NEWS) && s.outcome == StepOutcome::Skip)
        .expect("skip step for the unreachable candidate");
    assert_eq!(skipped.action, "navigate");
    assert!(skipped.detail.contains("connection reset"));
}

#[tokio::test]
async fn stalled_navigation_times_out_and_discovery_moves_on() {
    let search = Arc::new(MockSearch::new().with_results(vec![link("News", NEWS), link("Press", PRESS)]));
    let classifier = Arc::new(MockClassifier::new().matching(NEWS, "2024-01-01").matching(PRESS, "2024-02-02"));
    let session = MockSession::new()
        .on_page(NEWS, 200)
        .on_page(PRESS, 200)
        .slow_navigation(NEWS, Duration::from_secs(5));
    let mut config = fast_config();
    config.navigation_timeout = Duration::from_millis(50);

    let result = scout(&search, &classifier, config)
        .discover(&session, &target("Example", "example.com"))
        .await;

    assert!(result.success);
    assert_eq!(result.matched_url.as_deref(), Some(PRESS));
    assert!(result.steps.iter().any(|s| s.url.as_deref() == Some(NEWS)
        && s.outcome == StepOutcome::Skip
        && s.detail.contains("timed out")));
    assert_eq!(classifier.verified_urls(), vec![PRESS.to_string()]);
}

#[tokio::test]
async fn stalled_element_lookup_falls_back_to_classifier_links() {
    let search = Arc::new(MockSearch::new());
    let classifier = Arc::new(
        MockClassifier::new()
            .with_nav_fallback(HOME, vec![link("Newsroom", "/news")])
            .matching(NEWS, "2024-05-05"),
    );
    let session = MockSession::new()
        .on_page(HOME, 200)
        .on_page(NEWS, 200)
        .with_nav_links(HOME, &[("News", "/news")])
        .slow_elements(Duration::from_secs(5));
    let mut config = fast_config();
    config.navigation_timeout = Duration::from_millis(50);

    let result = scout(&search, &classifier, config)
        .discover(&session, &target("Example", "example.com"))
        .await;

    assert_eq!(result.strategy_used, Some(Strategy::Homepage));
    assert_eq!(result.matched_url.as_deref(), Some(NEWS));
    let stalled = result
        .steps
        .iter()
        .find(|s| s.action == "find_elements" && s.outcome == StepOutcome::Skip)
        .expect("timed-out element lookup is recorded");
    assert!(stalled.detail.contains("find_elements timed out after 50ms"));
    assert_eq!(classifier.calls_for(SchemaId::NavigationLinksList), 1);
}

#[tokio::test]
async fn stalled_search_box_lookup_is_skipped_until_exhaustion() {
    let search = Arc::new(MockSearch::new());
    let classifier = Arc::new(MockClassifier::new());
    let session = MockSession::new()
        .on_page(HOME, 200)
        .with_search_box(HOME)
        .slow_elements(Duration::from_secs(5));
    let mut config = fast_config();
    config.navigation_timeout = Duration::from_millis(50);
    config.site_search_terms = vec!["news".to_string()];

    let result = scout(&search, &classifier, config)
        .discover(&session, &target("Example", "example.com"))
        .await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some(EXHAUSTED_ERROR));
    let stalled: Vec<_> = result
        .steps
        .iter()
        .filter(|s| s.action == "find_search" && s.outcome == StepOutcome::Skip)
        .collect();
    assert_eq!(stalled.len(), 2);
    assert!(stalled.iter().all(|s| s.detail.contains("timed out")));
    assert!(!session
        .actions()
        .iter()
        .any(|a| matches!(a, PageAction::SubmitSearch { .. })));
}

#[tokio::test]
async fn negative_results_are_cached_only_when_enabled() {
    let classifier = Arc::new(MockClassifier::new());

    let search = Arc::new(MockSearch::new());
    let scout_off = scout(&search, &classifier, fast_config());
    let t = target("Example", "example.com");
    scout_off.discover(&MockSession::new(), &t).await;
    let again = scout_off.discover(&MockSession::new(), &t).await;
    assert_eq!(search.calls(), 2);
    assert_eq!(again.strategy_used, None);

    let search = Arc::new(MockSearch::new());
    let mut config = fast_config();
    config.negative_cache = NegativeCache::Enabled {
        ttl: Duration::from_secs(3600),
    };
    let scout_on = scout(&search, &classifier, config);
    scout_on.discover(&MockSession::new(), &t).await;
    let cached = scout_on.discover(&MockSession::new(), &t).await;
    assert_eq!(search.calls(), 1);
    assert!(!cached.success);
    assert_eq!(cached.strategy_used, Some(Strategy::Cached));
    assert_eq!(cached.error.as_deref(), Some("cached negative result"));
}
