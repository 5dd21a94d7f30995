//! The discovery orchestrator: engine search, then homepage exploration, then
//! the site's own search box, stopping at the first verified listing page.

pub mod context;
mod homepage;
mod search;
mod site_search;
pub mod state;

use tracing::{debug, info, warn};

use pressroom_common::{
    resolve_relative, Candidate, DiscoveryConfig, DiscoveryResult, Phase, RawLink, StepOutcome, Strategy, Target,
};

use crate::candidates::{apply_ranking, build_candidates};
use crate::classifier::classify_links;
use crate::error::ScoutError;
use crate::infra::util::{pace, with_timeout};
use crate::prompts;
use crate::traits::{
    ClassifierOutput, ElementQuery, NavigationResponse, PageAction, PageContext, PageSession, SchemaId,
    SearchEngine, SemanticClassifier, WaitCondition,
};
use crate::verification::{Rubric, Verifier, VerifiedMatch};

use self::context::RunContext;
use self::state::{DiscoveryState, StrategyOutcome};

pub const EXHAUSTED_ERROR: &str = "All discovery strategies exhausted without a verified listing page";

/// One orchestrator over one page session. Borrowed collaborators only: the
/// caller owns the session and decides how many discoveries share it.
pub struct Discovery<'a> {
    search: &'a dyn SearchEngine,
    session: &'a dyn PageSession,
    classifier: &'a dyn SemanticClassifier,
    config: &'a DiscoveryConfig,
}

impl<'a> Discovery<'a> {
    pub fn new(
        search: &'a dyn SearchEngine,
        session: &'a dyn PageSession,
        classifier: &'a dyn SemanticClassifier,
        config: &'a DiscoveryConfig,
    ) -> Self {
        Self {
            search,
            session,
            classifier,
            config,
        }
    }

    /// Run the state machine to a terminal state. Never fails: every
    /// collaborator error ends up as a step on the returned result.
    pub async fn run(&self, target: &Target) -> DiscoveryResult {
        let mut ctx = RunContext::new(target.clone());
        let mut state = DiscoveryState::INITIAL;
        let mut winner: Option<(Strategy, VerifiedMatch)> = None;

        info!(domain = target.domain.as_str(), name = target.name.as_str(), "Starting discovery");

        while !state.is_terminal() {
            let (Some(phase), Some(strategy)) = (state.phase(), state.strategy()) else {
                break;
            };
            ctx.record(phase, "enter", StepOutcome::Info, format!("entering {state}"), None);

            let outcome = match state {
                DiscoveryState::Search => self.run_search(&mut ctx).await,
                DiscoveryState::Homepage => self.run_homepage(&mut ctx).await,
                DiscoveryState::SiteSearch => self.run_site_search(&mut ctx).await,
                DiscoveryState::Success | DiscoveryState::Exhausted => break,
            };

            let next = state.next(&outcome);
            ctx.record(
                phase,
                "transition",
                StepOutcome::Info,
                format!("{state} -> {next} ({})", describe(&outcome)),
                None,
            );
            info!(
                domain = target.domain.as_str(),
                from = %state,
                to = %next,
                raw_results = ctx.raw_result_count,
                candidates_checked = ctx.candidates_checked,
                "Discovery transition"
            );

            if let StrategyOutcome::Verified(found) = outcome {
                winner = Some((strategy, found));
            }
            state = next;
        }

        let candidates_checked = ctx.candidates_checked;
        let raw_result_count = ctx.raw_result_count;
        let steps = ctx.into_steps();

        match winner {
            Some((strategy, found)) => DiscoveryResult {
                target: target.clone(),
                success: true,
                matched_url: Some(found.url),
                extracted_date: found.outcome.extracted_date,
                strategy_used: Some(strategy),
                candidates_checked,
                raw_result_count,
                error: None,
                steps,
            },
            None => {
                warn!(
                    domain = target.domain.as_str(),
                    candidates_checked, "No newsroom found"
                );
                DiscoveryResult {
                    target: target.clone(),
                    success: false,
                    matched_url: None,
                    extracted_date: None,
                    strategy_used: None,
                    candidates_checked,
                    raw_result_count,
                    error: Some(EXHAUSTED_ERROR.to_string()),
                    steps,
                }
            }
        }
    }

    // --- shared strategy plumbing ---

    /// Classify raw links, build and optionally rank candidates, verify them.
    async fn verify_links(
        &self,
        ctx: &mut RunContext,
        phase: Phase,
        links: &[RawLink],
        rubric: Rubric,
        rank: bool,
    ) -> StrategyOutcome {
        let domain = ctx.target.domain.clone();
        let classified = classify_links(links, &domain);
        let mut candidates = build_candidates(
            &classified,
            &domain,
            self.config.max_candidates_to_check,
            self.config.max_article_roots,
        );
        ctx.record(
            phase,
            "build_candidates",
            StepOutcome::Info,
            format!("{} links -> {} candidates", links.len(), candidates.len()),
            None,
        );
        if candidates.is_empty() {
            return StrategyOutcome::Exhausted;
        }

        if rank && self.config.rank_candidates && candidates.len() > 1 {
            candidates = self.rank(ctx, phase, candidates).await;
        }

        let verifier = Verifier::new(self.session, self.classifier, self.config);
        match verifier.verify_candidates(ctx, phase, &candidates, rubric).await {
            Some(found) => StrategyOutcome::Verified(found),
            None => StrategyOutcome::Exhausted,
        }
    }

    /// Reorder candidates by classifier score. Any failure keeps the input order.
    async fn rank(
        &self,
        ctx: &mut RunContext,
        phase: Phase,
        candidates: Vec<Candidate>,
    ) -> Vec<Candidate> {
        let instruction = prompts::rank_candidates(&ctx.target, &candidates);
        let page = PageContext {
            url: ctx.target.homepage_url(),
            content: candidates
                .iter()
                .map(|c| c.url.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        };

        match self.classify(&instruction, SchemaId::LinkRanking, &page).await {
            Ok(ClassifierOutput::LinkRanking(ranking)) => {
                let ranked = apply_ranking(candidates, &ranking.rankings);
                ctx.record(
                    phase,
                    "rank",
                    StepOutcome::Info,
                    format!("{} scores applied", ranking.rankings.len()),
                    ranked.first().map(|c| c.url.as_str()),
                );
                ranked
            }
            Ok(_) => candidates,
            Err(e) => {
                ctx.record(
                    phase,
                    "rank",
                    StepOutcome::Skip,
                    format!("ranking failed, keeping discovery order: {e}"),
                    None,
                );
                candidates
            }
        }
    }

    /// Bounded, validated classifier call.
    async fn classify(
        &self,
        instruction: &str,
        schema: SchemaId,
        page: &PageContext,
    ) -> Result<ClassifierOutput, ScoutError> {
        with_timeout(
            "classify",
            self.config.classify_timeout,
            self.classifier.classify(instruction, schema, page),
        )
        .await?
        .validate(schema)
    }

    /// Ask the classifier to list links on the current page, for when element
    /// discovery found nothing.
    async fn links_from_classifier(
        &self,
        ctx: &mut RunContext,
        phase: Phase,
        instruction: &str,
        schema: SchemaId,
    ) -> Vec<RawLink> {
        let base = self
            .session
            .current_url()
            .await
            .unwrap_or_else(|| ctx.target.homepage_url());

        let content = match with_timeout(
            "page_content",
            self.config.navigation_timeout,
            self.session.page_content(),
        )
        .await
        {
            Ok(c) => c,
            Err(e) => {
                ctx.record(phase, "extract_links", StepOutcome::Skip, e.to_string(), Some(&base));
                return Vec::new();
            }
        };

        let page = PageContext {
            url: base.clone(),
            content,
        };
        let links = match self.classify(instruction, schema, &page).await {
            Ok(ClassifierOutput::SearchResults(list)) | Ok(ClassifierOutput::NavigationLinks(list)) => {
                list.links
            }
            Ok(_) => Vec::new(),
            Err(e) => {
                ctx.record(
                    phase,
                    "extract_links",
                    StepOutcome::Skip,
                    format!("classification error: {e}"),
                    Some(&base),
                );
                return Vec::new();
            }
        };

        let resolved: Vec<RawLink> = links
            .into_iter()
            .filter_map(|l| {
                let url = resolve_relative(&l.url, &base)?;
                Some(RawLink { url, ..l })
            })
            .collect();
        ctx.record(
            phase,
            "extract_links",
            StepOutcome::Info,
            format!("classifier listed {} links", resolved.len()),
            Some(&base),
        );
        resolved
    }

    /// Read every element matching `query` as an absolute link.
    async fn links_from_elements(&self, ctx: &mut RunContext, phase: Phase, query: ElementQuery) -> Vec<RawLink> {
        let base = self
            .session
            .current_url()
            .await
            .unwrap_or_else(|| ctx.target.homepage_url());

        let elements = match with_timeout(
            "find_elements",
            self.config.navigation_timeout,
            self.session.find_elements(query),
        )
        .await
        {
            Ok(e) => e,
            Err(e) => {
                ctx.record(
                    phase,
                    "find_elements",
                    StepOutcome::Skip,
                    format!("element discovery failed: {e}"),
                    Some(&base),
                );
                return Vec::new();
            }
        };

        let mut links = Vec::new();
        for element in &elements {
            let read = with_timeout(
                "read_href_and_text",
                self.config.navigation_timeout,
                self.session.read_href_and_text(&element.selector),
            )
            .await;
            match read {
                Ok(Some(info)) => {
                    if let Some(url) = resolve_relative(&info.href, &base) {
                        links.push(RawLink::new(info.text.trim(), url));
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    debug!(selector = element.selector.as_str(), error = %e, "Could not read element");
                }
            }
        }

        ctx.record(
            phase,
            "find_elements",
            StepOutcome::Info,
            format!("{} elements, {} usable links", elements.len(), links.len()),
            Some(&base),
        );
        links
    }

    /// Navigate with the configured timeout and cooperative delay.
    async fn navigate(&self, url: &str) -> Result<NavigationResponse, ScoutError> {
        let response = with_timeout(
            "navigate",
            self.config.navigation_timeout,
            self.session
                .navigate(url, WaitCondition::DomContentLoaded, self.config.navigation_timeout),
        )
        .await;
        pace(self.config.action_delay).await;
        response
    }

    async fn act(&self, ctx: &mut RunContext, phase: Phase, action: &PageAction) -> bool {
        let result = with_timeout(
            "perform_action",
            self.config.navigation_timeout,
            self.session.perform_action(action),
        )
        .await;
        pace(self.config.action_delay).await;

        let name = action_name(action);
        match result {
            Ok(outcome) => {
                let step = if outcome.success {
                    StepOutcome::Info
                } else {
                    StepOutcome::Fail
                };
                ctx.record(phase, name, step, outcome.message, None);
                outcome.success
            }
            Err(e) => {
                ctx.record(phase, name, StepOutcome::Skip, e.to_string(), None);
                false
            }
        }
    }
}

fn action_name(action: &PageAction) -> &'static str {
    match action {
        PageAction::ExpandMenus => "expand_menus",
        PageAction::OpenSearch => "open_search",
        PageAction::SubmitSearch { .. } => "submit_search",
        PageAction::Instruction(_) => "instruction",
    }
}

fn describe(outcome: &StrategyOutcome) -> &'static str {
    match outcome {
        StrategyOutcome::Verified(_) => "verified",
        StrategyOutcome::NoResults => "no results",
        StrategyOutcome::Exhausted => "candidates exhausted",
    }
}
