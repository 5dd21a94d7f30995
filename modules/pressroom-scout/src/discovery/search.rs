use pressroom_common::{Phase, StepOutcome};

use super::context::RunContext;
use super::state::StrategyOutcome;
use super::Discovery;
use crate::infra::util::with_timeout;
use crate::prompts;
use crate::verification::Rubric;

impl Discovery<'_> {
    /// Domain-scoped engine query. Results skew towards articles, so the
    /// strict rubric applies.
    pub(super) async fn run_search(&self, ctx: &mut RunContext) -> StrategyOutcome {
        let query = prompts::search_query(&ctx.target);
        let links = match with_timeout(
            "search",
            self.config.navigation_timeout,
            self.search.search(&query, self.config.max_search_results),
        )
        .await
        {
            Ok(links) => links,
            Err(e) => {
                ctx.record(
                    Phase::Search,
                    "query",
                    StepOutcome::Skip,
                    format!("{} search failed: {e}", self.search.name()),
                    None,
                );
                return StrategyOutcome::NoResults;
            }
        };

        ctx.raw_result_count += links.len();
        ctx.record(
            Phase::Search,
            "query",
            StepOutcome::Info,
            format!("{query:?} returned {} results", links.len()),
            None,
        );
        if links.is_empty() {
            return StrategyOutcome::NoResults;
        }

        self.verify_links(ctx, Phase::Search, &links, Rubric::Strict, false)
            .await
    }
}
