//! Per-run mutable state: the audit trail and the aggregate counters.
//!
//! One `RunContext` per target per run. Nothing here is shared between targets.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use pressroom_common::{DiscoveryStep, Phase, StepOutcome, Target};

pub struct RunContext {
    pub target: Target,
    /// Candidates for which verification was started, across all strategies.
    pub candidates_checked: usize,
    /// Links received from external sources, across all strategies.
    pub raw_result_count: usize,
    steps: Vec<DiscoveryStep>,
    seq: u32,
    last_ts: Option<DateTime<Utc>>,
}

impl RunContext {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            candidates_checked: 0,
            raw_result_count: 0,
            steps: Vec::new(),
            seq: 0,
            last_ts: None,
        }
    }

    /// Append an audit step. Timestamps never go backwards even if the wall
    /// clock does.
    pub fn record(
        &mut self,
        phase: Phase,
        action: &str,
        outcome: StepOutcome,
        detail: impl Into<String>,
        url: Option<&str>,
    ) {
        self.seq += 1;
        let now = Utc::now();
        let timestamp = match self.last_ts {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_ts = Some(timestamp);

        let detail = detail.into();
        let domain = self.target.domain.as_str();
        let phase_label = phase.label();
        let link = url.unwrap_or("");
        match outcome {
            StepOutcome::Success | StepOutcome::Fail => {
                info!(domain, phase = phase_label, action, url = link, ?outcome, detail = detail.as_str(), "Discovery step")
            }
            StepOutcome::Skip => {
                warn!(domain, phase = phase_label, action, url = link, detail = detail.as_str(), "Discovery step skipped")
            }
            StepOutcome::Info => {
                debug!(domain, phase = phase_label, action, url = link, detail = detail.as_str(), "Discovery step")
            }
        }

        self.steps.push(DiscoveryStep {
            phase_id: format!("{}-{}", phase.label(), self.seq),
            action: action.to_string(),
            outcome,
            detail,
            url: url.map(String::from),
            timestamp,
        });
    }

    pub fn steps(&self) -> &[DiscoveryStep] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<DiscoveryStep> {
        self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_ids_encode_phase_and_sequence() {
        let mut ctx = RunContext::new(Target::parse("Acme", "acme.com").unwrap());
        ctx.record(Phase::Search, "query", StepOutcome::Info, "q", None);
        ctx.record(Phase::Homepage, "navigate", StepOutcome::Fail, "404", Some("https://acme.com/"));
        let ids: Vec<_> = ctx.steps().iter().map(|s| s.phase_id.as_str()).collect();
        assert_eq!(ids, vec!["search-1", "homepage-2"]);
        assert_eq!(ctx.steps()[1].url.as_deref(), Some("https://acme.com/"));
    }

    #[test]
    fn timestamps_are_monotonic() {
        let mut ctx = RunContext::new(Target::parse("Acme", "acme.com").unwrap());
        for _ in 0..20 {
            ctx.record(Phase::Search, "tick", StepOutcome::Info, "", None);
        }
        let steps = ctx.steps();
        assert!(steps.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }
}
