use pressroom_common::{Phase, StepOutcome};

use super::context::RunContext;
use super::state::StrategyOutcome;
use super::Discovery;
use crate::prompts;
use crate::traits::{ElementQuery, PageAction, SchemaId};
use crate::verification::Rubric;

impl Discovery<'_> {
    /// Expand the homepage menus, read navigation/header/footer links, rank
    /// them, verify them with the listing rubric.
    pub(super) async fn run_homepage(&self, ctx: &mut RunContext) -> StrategyOutcome {
        let home = ctx.target.homepage_url();
        match self.navigate(&home).await {
            Ok(r) if r.is_ok() => {
                ctx.record(
                    Phase::Homepage,
                    "navigate",
                    StepOutcome::Info,
                    format!("status {}", r.status.unwrap_or_default()),
                    Some(&home),
                );
            }
            Ok(r) => {
                let detail = match r.status {
                    Some(status) => format!("homepage returned HTTP {status}"),
                    None => "homepage returned no status".to_string(),
                };
                ctx.record(Phase::Homepage, "navigate", StepOutcome::Fail, detail, Some(&home));
                return StrategyOutcome::NoResults;
            }
            Err(e) => {
                ctx.record(Phase::Homepage, "navigate", StepOutcome::Skip, e.to_string(), Some(&home));
                return StrategyOutcome::NoResults;
            }
        }

        // Best effort: menus that fail to open still leave the visible links.
        self.act(ctx, Phase::Homepage, &PageAction::ExpandMenus).await;

        let mut links = self
            .links_from_elements(ctx, Phase::Homepage, ElementQuery::NavigationLinks)
            .await;
        if links.is_empty() {
            let instruction = prompts::navigation_links(&ctx.target);
            links = self
                .links_from_classifier(ctx, Phase::Homepage, &instruction, SchemaId::NavigationLinksList)
                .await;
        }

        ctx.raw_result_count += links.len();
        if links.is_empty() {
            ctx.record(Phase::Homepage, "collect_links", StepOutcome::Info, "no navigation links", Some(&home));
            return StrategyOutcome::NoResults;
        }

        self.verify_links(ctx, Phase::Homepage, &links, Rubric::ListingVsArticle, true)
            .await
    }
}
