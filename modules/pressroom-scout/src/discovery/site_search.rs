use pressroom_common::{is_same_site, Phase, RawLink, StepOutcome};

use super::context::RunContext;
use super::state::StrategyOutcome;
use super::Discovery;
use crate::infra::util::with_timeout;
use crate::prompts;
use crate::traits::{ElementQuery, PageAction, SchemaId};
use crate::verification::Rubric;

/// Result of trying to use the site's search box for one term.
#[derive(Debug, PartialEq, Eq)]
enum Submission {
    /// The search ran; the session now shows the results page.
    Results(String),
    /// The homepage has no usable search box. No term will do better.
    NoAffordance,
    /// Every attempt left the URL unchanged.
    Failed,
}

impl Discovery<'_> {
    /// Walk the search vocabulary, verifying same-site results of each term
    /// until one verifies.
    pub(super) async fn run_site_search(&self, ctx: &mut RunContext) -> StrategyOutcome {
        let mut saw_results = false;

        for term in &self.config.site_search_terms {
            let results_url = match self.submit_search(ctx, term).await {
                Submission::Results(url) => url,
                Submission::Failed => continue,
                Submission::NoAffordance => break,
            };

            let mut links = self
                .links_from_elements(ctx, Phase::SiteSearch, ElementQuery::ResultLinks)
                .await;
            if links.is_empty() {
                let instruction = prompts::search_results(&ctx.target, term);
                links = self
                    .links_from_classifier(ctx, Phase::SiteSearch, &instruction, SchemaId::SearchResultsList)
                    .await;
            }
            ctx.raw_result_count += links.len();

            let domain = ctx.target.domain.clone();
            let same_site: Vec<RawLink> = links
                .into_iter()
                .filter(|l| is_same_site(&l.url, &domain))
                .collect();
            if same_site.is_empty() {
                ctx.record(
                    Phase::SiteSearch,
                    "collect_links",
                    StepOutcome::Info,
                    format!("no same-site results for {term:?}"),
                    Some(&results_url),
                );
                continue;
            }
            saw_results = true;

            if let found @ StrategyOutcome::Verified(_) = self
                .verify_links(ctx, Phase::SiteSearch, &same_site, Rubric::ListingVsArticle, false)
                .await
            {
                return found;
            }
        }

        if saw_results {
            StrategyOutcome::Exhausted
        } else {
            StrategyOutcome::NoResults
        }
    }

    /// Reacquire the search box from the homepage and submit `term`, retrying
    /// up to `site_search_attempts` times. A submission counts only if the
    /// URL changed.
    async fn submit_search(&self, ctx: &mut RunContext, term: &str) -> Submission {
        let home = ctx.target.homepage_url();
        let attempts = self.config.site_search_attempts.max(1);

        for attempt in 1..=attempts {
            match self.navigate(&home).await {
                Ok(r) if r.is_ok() => {}
                Ok(r) => {
                    ctx.record(
                        Phase::SiteSearch,
                        "navigate",
                        StepOutcome::Fail,
                        format!("homepage returned {:?}", r.status),
                        Some(&home),
                    );
                    return Submission::NoAffordance;
                }
                Err(e) => {
                    ctx.record(Phase::SiteSearch, "navigate", StepOutcome::Skip, e.to_string(), Some(&home));
                    continue;
                }
            }

            let affordances = match with_timeout(
                "find_elements",
                self.config.navigation_timeout,
                self.session.find_elements(ElementQuery::SearchAffordance),
            )
            .await
            {
                Ok(found) => found,
                Err(e) => {
                    ctx.record(
                        Phase::SiteSearch,
                        "find_search",
                        StepOutcome::Skip,
                        format!("element discovery failed: {e}"),
                        Some(&home),
                    );
                    continue;
                }
            };
            if affordances.is_empty() {
                ctx.record(
                    Phase::SiteSearch,
                    "find_search",
                    StepOutcome::Fail,
                    "no search box on homepage",
                    Some(&home),
                );
                return Submission::NoAffordance;
            }

            let before = self.session.current_url().await.unwrap_or_else(|| home.clone());
            self.act(ctx, Phase::SiteSearch, &PageAction::OpenSearch).await;
            let submitted = self
                .act(
                    ctx,
                    Phase::SiteSearch,
                    &PageAction::SubmitSearch {
                        term: term.to_string(),
                    },
                )
                .await;

            let after = self.session.current_url().await;
            match after {
                Some(url) if submitted && url != before => {
                    ctx.record(
                        Phase::SiteSearch,
                        "submit_search",
                        StepOutcome::Success,
                        format!("searched for {term:?}"),
                        Some(&url),
                    );
                    return Submission::Results(url);
                }
                _ => {
                    ctx.record(
                        Phase::SiteSearch,
                        "submit_search",
                        StepOutcome::Fail,
                        format!("URL unchanged after searching {term:?} (attempt {attempt}/{attempts})"),
                        Some(&before),
                    );
                }
            }
        }

        Submission::Failed
    }
}
