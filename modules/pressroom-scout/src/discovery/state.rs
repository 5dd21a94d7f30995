//! Orchestrator states and the transition table between them.

use std::fmt;

use pressroom_common::{Phase, Strategy};

use crate::verification::VerifiedMatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryState {
    Search,
    Homepage,
    SiteSearch,
    Success,
    Exhausted,
}

/// How a single strategy attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyOutcome {
    Verified(VerifiedMatch),
    /// The source produced no raw links at all.
    NoResults,
    /// Links were found but no candidate survived verification.
    Exhausted,
}

impl DiscoveryState {
    pub const INITIAL: DiscoveryState = DiscoveryState::Search;

    pub fn is_terminal(&self) -> bool {
        matches!(self, DiscoveryState::Success | DiscoveryState::Exhausted)
    }

    /// Audit phase for a strategy state. Terminal states have none.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            DiscoveryState::Search => Some(Phase::Search),
            DiscoveryState::Homepage => Some(Phase::Homepage),
            DiscoveryState::SiteSearch => Some(Phase::SiteSearch),
            DiscoveryState::Success | DiscoveryState::Exhausted => None,
        }
    }

    pub fn strategy(&self) -> Option<Strategy> {
        match self {
            DiscoveryState::Search => Some(Strategy::Search),
            DiscoveryState::Homepage => Some(Strategy::Homepage),
            DiscoveryState::SiteSearch => Some(Strategy::SiteSearch),
            DiscoveryState::Success | DiscoveryState::Exhausted => None,
        }
    }

    /// Transition table. Any verified match ends the run; anything else
    /// advances to the next strategy in priority order. Terminal states are
    /// absorbing.
    pub fn next(self, outcome: &StrategyOutcome) -> DiscoveryState {
        use DiscoveryState::*;
        match (self, outcome) {
            (Success, _) => Success,
            (Exhausted, _) => Exhausted,
            (_, StrategyOutcome::Verified(_)) => Success,
            (Search, _) => Homepage,
            (Homepage, _) => SiteSearch,
            (SiteSearch, _) => Exhausted,
        }
    }
}

impl fmt::Display for DiscoveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Search => write!(f, "SEARCH"),
            Self::Homepage => write!(f, "HOMEPAGE"),
            Self::SiteSearch => write!(f, "SITE_SEARCH"),
            Self::Success => write!(f, "SUCCESS"),
            Self::Exhausted => write!(f, "EXHAUSTED"),
        }
    }
}
