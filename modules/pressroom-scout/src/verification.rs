//! Two-phase candidate verification.
//!
//! 1. Navigate; dead links (no status, or >= 400) are skipped before any
//!    classifier call is spent on them.
//! 2. Ask the classifier for a verdict bound to the page-verification schema.
//! 3. On a positive verdict, navigate again and require a live status before
//!    accepting it.
//!
//! The first candidate that passes all three ends the loop. Each strategy
//! judges its own candidates afresh, so a URL rejected by one strategy can
//! still be accepted by a later one.

use tracing::info;

use pressroom_common::{Candidate, DiscoveryConfig, Phase, StepOutcome, Target, VerificationOutcome};

use crate::discovery::context::RunContext;
use crate::error::ScoutError;
use crate::infra::util::{pace, with_timeout};
use crate::prompts;
use crate::traits::{PageContext, PageSession, SchemaId, SemanticClassifier, WaitCondition};

/// Which verification instruction to bind to the page-verification schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rubric {
    /// Five-check rubric for engine search candidates.
    Strict,
    /// Listing-vs-article rubric for on-site candidates.
    ListingVsArticle,
}

impl Rubric {
    fn instruction(&self, target: &Target, url: &str) -> String {
        match self {
            Rubric::Strict => prompts::strict_verification(target, url),
            Rubric::ListingVsArticle => prompts::listing_verification(target, url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedMatch {
    pub url: String,
    pub outcome: VerificationOutcome,
}

pub struct Verifier<'a> {
    session: &'a dyn PageSession,
    classifier: &'a dyn SemanticClassifier,
    config: &'a DiscoveryConfig,
}

impl<'a> Verifier<'a> {
    pub fn new(
        session: &'a dyn PageSession,
        classifier: &'a dyn SemanticClassifier,
        config: &'a DiscoveryConfig,
    ) -> Self {
        Self {
            session,
            classifier,
            config,
        }
    }

    /// Verify `candidates` in order, returning the first confirmed match.
    pub async fn verify_candidates(
        &self,
        ctx: &mut RunContext,
        phase: Phase,
        candidates: &[Candidate],
        rubric: Rubric,
    ) -> Option<VerifiedMatch> {
        for candidate in candidates {
            let url = candidate.url.as_str();

            ctx.candidates_checked += 1;

            if let Err(detail) = self.navigate_live(url).await {
                ctx.record(phase, "navigate", StepOutcome::Skip, detail, Some(url));
                continue;
            }

            let verdict = match self.classify(&ctx.target, url, rubric).await {
                Ok(v) => v,
                Err(e) => {
                    ctx.record(
                        phase,
                        "classify",
                        StepOutcome::Skip,
                        format!("classification error: {e}"),
                        Some(url),
                    );
                    continue;
                }
            };

            if !verdict.is_match {
                ctx.record(phase, "classify", StepOutcome::Fail, verdict.explanation, Some(url));
                continue;
            }

            if let Err(detail) = self.navigate_live(url).await {
                ctx.record(
                    phase,
                    "revalidate",
                    StepOutcome::Fail,
                    format!("validation failed: {detail}"),
                    Some(url),
                );
                continue;
            }

            info!(
                domain = ctx.target.domain.as_str(),
                url,
                date = verdict.extracted_date.as_deref().unwrap_or(""),
                "Verified newsroom listing"
            );
            ctx.record(phase, "verify", StepOutcome::Success, verdict.explanation.clone(), Some(url));
            return Some(VerifiedMatch {
                url: url.to_string(),
                outcome: verdict,
            });
        }

        None
    }

    /// Navigate and require a status below 400. The error string is the audit detail.
    async fn navigate_live(&self, url: &str) -> Result<(), String> {
        let response = with_timeout(
            "navigate",
            self.config.navigation_timeout,
            self.session.navigate(
                url,
                WaitCondition::DomContentLoaded,
                self.config.navigation_timeout,
            ),
        )
        .await;
        pace(self.config.action_delay).await;

        match response {
            Ok(r) if r.is_ok() => Ok(()),
            Ok(r) => Err(match r.status {
                Some(status) => format!("HTTP {status}"),
                None => "no response status".to_string(),
            }),
            Err(e) => Err(e.to_string()),
        }
    }

    async fn classify(
        &self,
        target: &Target,
        url: &str,
        rubric: Rubric,
    ) -> Result<VerificationOutcome, ScoutError> {
        let content = with_timeout(
            "page_content",
            self.config.navigation_timeout,
            self.session.page_content(),
        )
        .await?;
        let page = PageContext {
            url: url.to_string(),
            content,
        };
        let instruction = rubric.instruction(target, url);

        let output = with_timeout(
            "classify",
            self.config.classify_timeout,
            self.classifier
                .classify(&instruction, SchemaId::PageVerification, &page),
        )
        .await?
        .validate(SchemaId::PageVerification)?;

        match output {
            crate::traits::ClassifierOutput::PageVerification(v) => Ok(v),
            other => Err(ScoutError::SchemaMismatch {
                expected: SchemaId::PageVerification.as_str(),
                actual: other.schema().as_str(),
            }),
        }
    }
}
