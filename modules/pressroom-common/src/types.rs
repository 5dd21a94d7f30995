use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PressroomError;
use crate::urls::normalize_domain;

// --- Targets ---

/// Raw caller input before domain normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub name: String,
    pub domain: String,
}

/// An organization whose newsroom we want to find. The domain is always the
/// normalized host (lowercase, no scheme, no `www.`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub domain: String,
}

impl Target {
    pub fn parse(name: impl Into<String>, raw_domain: &str) -> Result<Self, PressroomError> {
        Ok(Self {
            name: name.into(),
            domain: normalize_domain(raw_domain)?,
        })
    }

    pub fn homepage_url(&self) -> String {
        format!("https://{}/", self.domain)
    }
}

impl TryFrom<&TargetSpec> for Target {
    type Error = PressroomError;

    fn try_from(spec: &TargetSpec) -> Result<Self, Self::Error> {
        Target::parse(spec.name.clone(), &spec.domain)
    }
}

// --- Links & candidates ---

/// A link as reported by an external source: a search result, a nav link, a
/// site-search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RawLink {
    /// Visible anchor text or result title
    pub display_text: String,
    /// Absolute URL
    pub url: String,
    /// Search snippet or surrounding context, empty when unknown
    #[serde(default)]
    pub snippet: String,
}

impl RawLink {
    pub fn new(display_text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            display_text: display_text.into(),
            url: url.into(),
            snippet: String::new(),
        }
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = snippet.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkCategory {
    Listing,
    Article,
    Irrelevant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedLink {
    #[serde(flatten)]
    pub link: RawLink,
    pub category: LinkCategory,
}

/// A URL selected for verification. `rank` is the 1-based position in the
/// verification order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub url: String,
    pub display_text: String,
    pub rank: usize,
}

// --- Verification ---

/// Verdict on whether the current page is the organization's canonical
/// newsroom listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VerificationOutcome {
    /// True only when every rubric check holds
    pub is_match: bool,
    /// Date of the most recent item on the page (YYYY-MM-DD), if visible
    pub extracted_date: Option<String>,
    /// One or two sentences explaining the verdict
    pub explanation: String,
}

// --- Audit trail ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Success,
    Skip,
    Fail,
    Info,
}

/// Phase label used in step identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Search,
    Homepage,
    SiteSearch,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Search => "search",
            Phase::Homepage => "homepage",
            Phase::SiteSearch => "site_search",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryStep {
    /// `{phase}-{seq}`, e.g. `homepage-7`
    pub phase_id: String,
    pub action: String,
    pub outcome: StepOutcome,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

// --- Results ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Search,
    Homepage,
    SiteSearch,
    Cached,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Search => "search",
            Strategy::Homepage => "homepage",
            Strategy::SiteSearch => "site_search",
            Strategy::Cached => "cached",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub target: Target,
    pub success: bool,
    pub matched_url: Option<String>,
    pub extracted_date: Option<String>,
    /// Strategy that produced the verdict; `None` when every strategy was exhausted
    pub strategy_used: Option<Strategy>,
    pub candidates_checked: usize,
    pub raw_result_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub steps: Vec<DiscoveryStep>,
}

impl DiscoveryResult {
    /// Result for a target whose domain could not be parsed. No strategy runs.
    pub fn malformed(spec: &TargetSpec, error: &PressroomError) -> Self {
        Self {
            target: Target {
                name: spec.name.clone(),
                domain: spec.domain.trim().to_lowercase(),
            },
            success: false,
            matched_url: None,
            extracted_date: None,
            strategy_used: None,
            candidates_checked: 0,
            raw_result_count: 0,
            error: Some(error.to_string()),
            steps: Vec::new(),
        }
    }

    /// Result for a valid target that could not be attempted at all.
    pub fn unattempted(target: Target, error: impl Into<String>) -> Self {
        Self {
            target,
            success: false,
            matched_url: None,
            extracted_date: None,
            strategy_used: None,
            candidates_checked: 0,
            raw_result_count: 0,
            error: Some(error.into()),
            steps: Vec::new(),
        }
    }

    /// Result replayed from a cache entry. Carries no steps.
    pub fn from_cache(target: Target, entry: &CacheEntry) -> Self {
        Self {
            target,
            success: entry.success,
            matched_url: entry.matched_url.clone(),
            extracted_date: entry.extracted_date.clone(),
            strategy_used: Some(Strategy::Cached),
            candidates_checked: 0,
            raw_result_count: 0,
            error: (!entry.success).then(|| "cached negative result".to_string()),
            steps: Vec::new(),
        }
    }
}

// --- Cache ---

/// Memoized discovery outcome for one normalized domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub domain: String,
    pub success: bool,
    pub matched_url: Option<String>,
    pub extracted_date: Option<String>,
    pub strategy_used: Option<Strategy>,
    pub discovered_at: DateTime<Utc>,
    /// Run that produced this entry
    pub provenance_id: Uuid,
}

// --- Summary ---

/// Aggregate view over a batch of results. Derived on demand, never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub by_strategy: BTreeMap<Strategy, usize>,
    pub candidates_checked: usize,
}

impl RunSummary {
    pub fn from_results(results: &[DiscoveryResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };
        for r in results {
            if r.success {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
            if let (true, Some(strategy)) = (r.success, r.strategy_used) {
                *summary.by_strategy.entry(strategy).or_default() += 1;
            }
            summary.candidates_checked += r.candidates_checked;
        }
        summary
    }

    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.succeeded as f64 / self.total as f64
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Newsroom Discovery Complete ===")?;
        writeln!(f, "Targets:            {}", self.total)?;
        writeln!(f, "Found:              {}", self.succeeded)?;
        writeln!(f, "Not found:          {}", self.failed)?;
        writeln!(f, "Candidates checked: {}", self.candidates_checked)?;
        writeln!(f, "Success rate:       {:.0}%", self.success_rate() * 100.0)?;
        writeln!(f, "\nBy strategy:")?;
        for (strategy, count) in &self.by_strategy {
            writeln!(f, "  {:<12} {}", strategy.as_str(), count)?;
        }
        Ok(())
    }
}
