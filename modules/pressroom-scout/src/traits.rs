// Trait seams for every external collaborator of the discovery engine.
//
// - SearchEngine: domain-scoped web search (Serper in production)
// - PageSession: one page-automation session, reused across strategies
// - SemanticClassifier: schema-bound judgments about a page (Claude in production)
// - CacheStore: persistent key/value blobs behind the result cache
//
// Mocks for all four live in `testing`: no network, no browser, no API keys.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use pressroom_common::{RawLink, VerificationOutcome};

use crate::error::ScoutError;

// ---------------------------------------------------------------------------
// SearchEngine
// ---------------------------------------------------------------------------

#[async_trait]
pub trait SearchEngine: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<RawLink>>;
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// PageSession
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    Load,
    DomContentLoaded,
    NetworkIdle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationResponse {
    /// `None` when the automation layer could not observe a status.
    pub status: Option<u16>,
    pub final_url: String,
}

impl NavigationResponse {
    pub fn is_ok(&self) -> bool {
        matches!(self.status, Some(s) if s < 400)
    }
}

/// What to look for on the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementQuery {
    NavigationLinks,
    SearchAffordance,
    ResultLinks,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageElement {
    pub selector: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkInfo {
    pub href: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageAction {
    /// Open every dropdown-like menu so nested links become discoverable.
    ExpandMenus,
    /// Reveal the site-search input.
    OpenSearch,
    /// Type `term` into the site-search input and submit.
    SubmitSearch { term: String },
    /// Free-form instruction for semantically-driven sessions.
    Instruction(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
}

#[async_trait]
pub trait PageSession: Send + Sync {
    async fn navigate(
        &self,
        url: &str,
        wait: WaitCondition,
        timeout: Duration,
    ) -> Result<NavigationResponse>;

    async fn find_elements(&self, query: ElementQuery) -> Result<Vec<PageElement>>;

    async fn read_href_and_text(&self, selector: &str) -> Result<Option<LinkInfo>>;

    async fn perform_action(&self, action: &PageAction) -> Result<ActionOutcome>;

    /// Readable text of the current page, for the classifier.
    async fn page_content(&self) -> Result<String>;

    async fn current_url(&self) -> Option<String>;
}

// ---------------------------------------------------------------------------
// SemanticClassifier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaId {
    SearchResultsList,
    PageVerification,
    LinkRanking,
    NavigationLinksList,
}

impl SchemaId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaId::SearchResultsList => "search_results_list",
            SchemaId::PageVerification => "page_verification",
            SchemaId::LinkRanking => "link_ranking",
            SchemaId::NavigationLinksList => "navigation_links_list",
        }
    }
}

/// The page the classifier is asked about.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub url: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LinkList {
    #[serde(default)]
    pub links: Vec<RawLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LinkScore {
    pub url: String,
    /// 1-10, higher means more likely to be the newsroom listing page
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LinkRanking {
    #[serde(default)]
    pub rankings: Vec<LinkScore>,
}

/// One variant per output schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifierOutput {
    SearchResults(LinkList),
    PageVerification(VerificationOutcome),
    LinkRanking(LinkRanking),
    NavigationLinks(LinkList),
}

impl ClassifierOutput {
    pub fn schema(&self) -> SchemaId {
        match self {
            ClassifierOutput::SearchResults(_) => SchemaId::SearchResultsList,
            ClassifierOutput::PageVerification(_) => SchemaId::PageVerification,
            ClassifierOutput::LinkRanking(_) => SchemaId::LinkRanking,
            ClassifierOutput::NavigationLinks(_) => SchemaId::NavigationLinksList,
        }
    }

    /// Check the output answers `expected` and has a valid shape. Invalid
    /// output is rejected rather than repaired.
    pub fn validate(self, expected: SchemaId) -> std::result::Result<Self, ScoutError> {
        if self.schema() != expected {
            return Err(ScoutError::SchemaMismatch {
                expected: expected.as_str(),
                actual: self.schema().as_str(),
            });
        }
        match &self {
            ClassifierOutput::LinkRanking(ranking) => {
                if let Some(bad) = ranking.rankings.iter().find(|r| !(1..=10).contains(&r.score)) {
                    return Err(ScoutError::Classification(format!(
                        "score {} for {} is outside 1-10",
                        bad.score, bad.url
                    )));
                }
            }
            ClassifierOutput::SearchResults(list) | ClassifierOutput::NavigationLinks(list) => {
                if list.links.iter().any(|l| l.url.trim().is_empty()) {
                    return Err(ScoutError::Classification(
                        "link list contains an entry without a url".to_string(),
                    ));
                }
            }
            ClassifierOutput::PageVerification(_) => {}
        }
        Ok(self)
    }
}

#[async_trait]
pub trait SemanticClassifier: Send + Sync {
    async fn classify(
        &self,
        instruction: &str,
        schema: SchemaId,
        page: &PageContext,
    ) -> Result<ClassifierOutput>;
}

// ---------------------------------------------------------------------------
// CacheStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn put(&self, key: &str, value: &str) -> Result<()>;
    /// Keys starting with `prefix`, sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_variant_is_a_schema_mismatch() {
        let output = ClassifierOutput::LinkRanking(LinkRanking { rankings: vec![] });
        let err = output.validate(SchemaId::PageVerification).unwrap_err();
        assert!(matches!(
            err,
            ScoutError::SchemaMismatch {
                expected: "page_verification",
                actual: "link_ranking"
            }
        ));
    }

    #[test]
    fn out_of_range_score_is_rejected() {
        let output = ClassifierOutput::LinkRanking(LinkRanking {
            rankings: vec![LinkScore {
                url: "https://acme.com/news".into(),
                score: 11,
            }],
        });
        assert!(matches!(
            output.validate(SchemaId::LinkRanking),
            Err(ScoutError::Classification(_))
        ));
    }

    #[test]
    fn link_list_without_url_is_rejected() {
        let output = ClassifierOutput::NavigationLinks(LinkList {
            links: vec![RawLink::new("News", " ")],
        });
        assert!(output.validate(SchemaId::NavigationLinksList).is_err());
    }

    #[test]
    fn navigation_status_threshold() {
        let ok = NavigationResponse {
            status: Some(399),
            final_url: String::new(),
        };
        let gone = NavigationResponse {
            status: Some(404),
            final_url: String::new(),
        };
        let unknown = NavigationResponse {
            status: None,
            final_url: String::new(),
        };
        assert!(ok.is_ok());
        assert!(!gone.is_ok());
        assert!(!unknown.is_ok());
    }
}
