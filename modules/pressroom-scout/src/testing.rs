// Test mocks for the discovery engine.
//
// One mock per trait boundary:
// - MockSearch (SearchEngine): query → links, with a call counter
// - MockSession (PageSession): scripted pages, statuses, links, site search
// - MockClassifier (SemanticClassifier): URL → verdict, rankings, link lists
// Caches use the real MemoryCacheStore.
//
// Plus helpers for targets and a zero-delay DiscoveryConfig.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use pressroom_common::{DiscoveryConfig, RawLink, Target, TargetSpec, VerificationOutcome};

use crate::traits::{
    ActionOutcome, ClassifierOutput, ElementQuery, LinkInfo, LinkList, LinkRanking, LinkScore, NavigationResponse,
    PageAction, PageContext, PageElement, PageSession, SchemaId, SearchEngine, SemanticClassifier, WaitCondition,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn target(name: &str, domain: &str) -> Target {
    Target::parse(name, domain).expect("test target has a valid domain")
}

pub fn spec(name: &str, domain: &str) -> TargetSpec {
    TargetSpec {
        name: name.to_string(),
        domain: domain.to_string(),
    }
}

/// Defaults with every delay removed and short timeouts.
pub fn fast_config() -> DiscoveryConfig {
    DiscoveryConfig::builder()
        .action_delay(Duration::ZERO)
        .inter_target_delay(Duration::ZERO)
        .navigation_timeout(Duration::from_secs(2))
        .classify_timeout(Duration::from_secs(2))
        .build()
}

pub fn link(text: &str, url: &str) -> RawLink {
    RawLink::new(text, url)
}

// ---------------------------------------------------------------------------
// MockSearch
// ---------------------------------------------------------------------------

/// Query → links. Unregistered queries return the default result set,
/// which is empty unless `.with_results()` was called.
pub struct MockSearch {
    by_query: HashMap<String, Vec<RawLink>>,
    default: Vec<RawLink>,
    fail: bool,
    calls: AtomicUsize,
}

impl MockSearch {
    pub fn new() -> Self {
        Self {
            by_query: HashMap::new(),
            default: Vec::new(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn on_query(mut self, query: &str, links: Vec<RawLink>) -> Self {
        self.by_query.insert(query.to_string(), links);
        self
    }

    pub fn with_results(mut self, links: Vec<RawLink>) -> Self {
        self.default = links;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockSearch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchEngine for MockSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<RawLink>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("MockSearch: search unavailable");
        }
        let links = self.by_query.get(query).unwrap_or(&self.default);
        Ok(links.iter().take(max_results).cloned().collect())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// MockSession
// ---------------------------------------------------------------------------

/// Scripted browser. Unregistered URLs answer 404.
///
/// Builder: `.on_page()`, `.on_page_statuses()`, `.with_nav_links()`,
/// `.with_search_box()`, `.on_site_search()`, `.with_result_links()`,
/// `.failing_navigation()`, `.slow_navigation()`, `.slow_elements()`.
pub struct MockSession {
    statuses: Mutex<HashMap<String, VecDeque<u16>>>,
    nav_links: HashMap<String, Vec<LinkInfo>>,
    result_links: HashMap<String, Vec<LinkInfo>>,
    search_boxes: HashSet<String>,
    site_searches: HashMap<String, String>,
    broken: HashSet<String>,
    slow_pages: HashMap<String, Duration>,
    element_delay: Duration,
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    current: Option<String>,
    handed_out: Vec<LinkInfo>,
    navigations: Vec<String>,
    actions: Vec<PageAction>,
}

impl MockSession {
    pub fn new() -> Self {
        Self {
            statuses: Mutex::new(HashMap::new()),
            nav_links: HashMap::new(),
            result_links: HashMap::new(),
            search_boxes: HashSet::new(),
            site_searches: HashMap::new(),
            broken: HashSet::new(),
            slow_pages: HashMap::new(),
            element_delay: Duration::ZERO,
            state: Mutex::new(MockState::default()),
        }
    }

    pub fn on_page(self, url: &str, status: u16) -> Self {
        self.on_page_statuses(url, &[status])
    }

    /// Successive navigations to `url` answer with successive statuses; the
    /// last one repeats.
    pub fn on_page_statuses(self, url: &str, statuses: &[u16]) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .insert(url.to_string(), statuses.iter().copied().collect());
        self
    }

    pub fn with_nav_links(mut self, page: &str, links: &[(&str, &str)]) -> Self {
        self.nav_links.insert(page.to_string(), to_link_infos(links));
        self
    }

    pub fn with_result_links(mut self, page: &str, links: &[(&str, &str)]) -> Self {
        self.result_links.insert(page.to_string(), to_link_infos(links));
        self
    }

    pub fn with_search_box(mut self, page: &str) -> Self {
        self.search_boxes.insert(page.to_string());
        self
    }

    /// Submitting `term` from a page with a search box lands on `results_url`.
    pub fn on_site_search(mut self, term: &str, results_url: &str) -> Self {
        self.site_searches.insert(term.to_string(), results_url.to_string());
        self
    }

    pub fn failing_navigation(mut self, url: &str) -> Self {
        self.broken.insert(url.to_string());
        self
    }

    /// Navigations to `url` stall for `delay` before answering.
    pub fn slow_navigation(mut self, url: &str, delay: Duration) -> Self {
        self.slow_pages.insert(url.to_string(), delay);
        self
    }

    /// Every element lookup stalls for `delay` before answering.
    pub fn slow_elements(mut self, delay: Duration) -> Self {
        self.element_delay = delay;
        self
    }

    pub fn navigation_count(&self) -> usize {
        self.state.lock().unwrap().navigations.len()
    }

    pub fn navigations_to(&self, url: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .navigations
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }

    pub fn actions(&self) -> Vec<PageAction> {
        self.state.lock().unwrap().actions.clone()
    }

    fn next_status(&self, url: &str) -> Option<u16> {
        let mut statuses = self.statuses.lock().unwrap();
        let queue = statuses.get_mut(url)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().copied()
        }
    }
}

impl Default for MockSession {
    fn default() -> Self {
        Self::new()
    }
}

fn to_link_infos(links: &[(&str, &str)]) -> Vec<LinkInfo> {
    links
        .iter()
        .map(|(text, href)| LinkInfo {
            href: href.to_string(),
            text: text.to_string(),
        })
        .collect()
}

#[async_trait]
impl PageSession for MockSession {
    async fn navigate(&self, url: &str, _wait: WaitCondition, _timeout: Duration) -> Result<NavigationResponse> {
        self.state.lock().unwrap().navigations.push(url.to_string());
        if let Some(delay) = self.slow_pages.get(url) {
            tokio::time::sleep(*delay).await;
        }
        if self.broken.contains(url) {
            bail!("MockSession: connection reset for {url}");
        }
        let status = self.next_status(url).unwrap_or(404);
        let mut state = self.state.lock().unwrap();
        state.current = Some(url.to_string());
        state.handed_out.clear();
        Ok(NavigationResponse {
            status: Some(status),
            final_url: url.to_string(),
        })
    }

    async fn find_elements(&self, query: ElementQuery) -> Result<Vec<PageElement>> {
        if !self.element_delay.is_zero() {
            tokio::time::sleep(self.element_delay).await;
        }
        let mut state = self.state.lock().unwrap();
        let Some(current) = state.current.clone() else {
            bail!("MockSession: no page loaded");
        };

        if query == ElementQuery::SearchAffordance {
            return Ok(if self.search_boxes.contains(&current) {
                vec![PageElement {
                    selector: "search".to_string(),
                    description: "site search".to_string(),
                }]
            } else {
                Vec::new()
            });
        }

        let source = match query {
            ElementQuery::NavigationLinks => &self.nav_links,
            _ => &self.result_links,
        };
        let links = source.get(&current).cloned().unwrap_or_default();
        let elements = links
            .iter()
            .enumerate()
            .map(|(i, l)| PageElement {
                selector: i.to_string(),
                description: l.text.clone(),
            })
            .collect();
        state.handed_out = links;
        Ok(elements)
    }

    async fn read_href_and_text(&self, selector: &str) -> Result<Option<LinkInfo>> {
        let state = self.state.lock().unwrap();
        Ok(selector.parse::<usize>().ok().and_then(|i| state.handed_out.get(i).cloned()))
    }

    async fn perform_action(&self, action: &PageAction) -> Result<ActionOutcome> {
        let mut state = self.state.lock().unwrap();
        state.actions.push(action.clone());
        let current = state.current.clone().unwrap_or_default();

        let outcome = match action {
            PageAction::ExpandMenus => ActionOutcome {
                success: true,
                message: "menus expanded".to_string(),
            },
            PageAction::OpenSearch => ActionOutcome {
                success: self.search_boxes.contains(&current),
                message: "search opened".to_string(),
            },
            PageAction::SubmitSearch { term } => {
                match (self.search_boxes.contains(&current), self.site_searches.get(term)) {
                    (true, Some(results)) => {
                        state.current = Some(results.clone());
                        state.handed_out.clear();
                        ActionOutcome {
                            success: true,
                            message: format!("searched for {term}"),
                        }
                    }
                    _ => ActionOutcome {
                        success: true,
                        message: "submitted, nothing happened".to_string(),
                    },
                }
            }
            PageAction::Instruction(_) => ActionOutcome {
                success: false,
                message: "unsupported".to_string(),
            },
        };
        Ok(outcome)
    }

    async fn page_content(&self) -> Result<String> {
        let state = self.state.lock().unwrap();
        match &state.current {
            Some(url) => Ok(format!("Rendered content of {url}")),
            None => bail!("MockSession: no page loaded"),
        }
    }

    async fn current_url(&self) -> Option<String> {
        self.state.lock().unwrap().current.clone()
    }
}

// ---------------------------------------------------------------------------
// MockClassifier
// ---------------------------------------------------------------------------

/// Verdicts keyed by page URL. Unregistered pages are judged "not a listing".
///
/// Builder: `.matching()`, `.rejecting()`, `.erroring_on()`, `.with_rankings()`,
/// `.with_nav_fallback()`, `.with_search_fallback()`, `.wrong_schema()`.
pub struct MockClassifier {
    verdicts: HashMap<String, VerificationOutcome>,
    erroring: HashSet<String>,
    rankings: Option<Vec<LinkScore>>,
    nav_fallback: HashMap<String, Vec<RawLink>>,
    search_fallback: HashMap<String, Vec<RawLink>>,
    wrong_schema: bool,
    calls: Mutex<Vec<(SchemaId, String)>>,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self {
            verdicts: HashMap::new(),
            erroring: HashSet::new(),
            rankings: None,
            nav_fallback: HashMap::new(),
            search_fallback: HashMap::new(),
            wrong_schema: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn matching(mut self, url: &str, date: &str) -> Self {
        self.verdicts.insert(
            url.to_string(),
            VerificationOutcome {
                is_match: true,
                extracted_date: Some(date.to_string()),
                explanation: "Lists multiple dated press releases".to_string(),
            },
        );
        self
    }

    pub fn rejecting(mut self, url: &str, explanation: &str) -> Self {
        self.verdicts.insert(
            url.to_string(),
            VerificationOutcome {
                is_match: false,
                extracted_date: None,
                explanation: explanation.to_string(),
            },
        );
        self
    }

    pub fn erroring_on(mut self, url: &str) -> Self {
        self.erroring.insert(url.to_string());
        self
    }

    /// `None` (the default) makes ranking requests fail.
    pub fn with_rankings(mut self, scores: &[(&str, u8)]) -> Self {
        self.rankings = Some(
            scores
                .iter()
                .map(|(url, score)| LinkScore {
                    url: url.to_string(),
                    score: *score,
                })
                .collect(),
        );
        self
    }

    pub fn with_nav_fallback(mut self, page: &str, links: Vec<RawLink>) -> Self {
        self.nav_fallback.insert(page.to_string(), links);
        self
    }

    pub fn with_search_fallback(mut self, page: &str, links: Vec<RawLink>) -> Self {
        self.search_fallback.insert(page.to_string(), links);
        self
    }

    /// Answer every request with a link ranking, whatever was asked.
    pub fn wrong_schema(mut self) -> Self {
        self.wrong_schema = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, schema: SchemaId) -> usize {
        self.calls.lock().unwrap().iter().filter(|(s, _)| *s == schema).count()
    }

    /// Pages that received a verification request, in order.
    pub fn verified_urls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == SchemaId::PageVerification)
            .map(|(_, url)| url.clone())
            .collect()
    }
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SemanticClassifier for MockClassifier {
    async fn classify(&self, _instruction: &str, schema: SchemaId, page: &PageContext) -> Result<ClassifierOutput> {
        self.calls.lock().unwrap().push((schema, page.url.clone()));

        if self.wrong_schema {
            return Ok(ClassifierOutput::LinkRanking(LinkRanking { rankings: Vec::new() }));
        }

        match schema {
            SchemaId::PageVerification => {
                if self.erroring.contains(&page.url) {
                    bail!("MockClassifier: model overloaded");
                }
                let verdict = self.verdicts.get(&page.url).cloned().unwrap_or(VerificationOutcome {
                    is_match: false,
                    extracted_date: None,
                    explanation: "Not a listing page".to_string(),
                });
                Ok(ClassifierOutput::PageVerification(verdict))
            }
            SchemaId::LinkRanking => match &self.rankings {
                Some(rankings) => Ok(ClassifierOutput::LinkRanking(LinkRanking {
                    rankings: rankings.clone(),
                })),
                None => bail!("MockClassifier: no rankings configured"),
            },
            SchemaId::NavigationLinksList => Ok(ClassifierOutput::NavigationLinks(LinkList {
                links: self.nav_fallback.get(&page.url).cloned().unwrap_or_default(),
            })),
            SchemaId::SearchResultsList => Ok(ClassifierOutput::SearchResults(LinkList {
                links: self.search_fallback.get(&page.url).cloned().unwrap_or_default(),
            })),
        }
    }
}
