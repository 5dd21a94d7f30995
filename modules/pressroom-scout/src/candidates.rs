//! Bounded, ordered candidate lists for verification.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use pressroom_common::{is_same_site, Candidate, ClassifiedLink, LinkCategory};

use crate::classifier::extract_root_urls;
use crate::traits::LinkScore;

/// Build at most `max_candidates` candidates for `domain`.
///
/// Listing links come first in discovery order; remaining capacity is filled
/// with root URLs mined from up to `max_article_roots` article links. URLs are
/// deduplicated exactly, first occurrence wins.
pub fn build_candidates(
    links: &[ClassifiedLink],
    domain: &str,
    max_candidates: usize,
    max_article_roots: usize,
) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    let listings = links
        .iter()
        .filter(|l| l.category == LinkCategory::Listing)
        .map(|l| (l.link.url.clone(), l.link.display_text.clone()));

    for (url, text) in listings {
        if candidates.len() >= max_candidates {
            break;
        }
        if is_same_site(&url, domain) && seen.insert(url.clone()) {
            candidates.push(Candidate {
                url,
                display_text: text,
                rank: candidates.len() + 1,
            });
        }
    }

    if candidates.len() < max_candidates {
        for root in extract_root_urls(links, max_article_roots) {
            if candidates.len() >= max_candidates {
                break;
            }
            if is_same_site(&root, domain) && seen.insert(root.clone()) {
                debug!(url = root.as_str(), "Adding root URL candidate");
                candidates.push(Candidate {
                    url: root,
                    display_text: String::new(),
                    rank: candidates.len() + 1,
                });
            }
        }
    }

    candidates
}

/// Reorder candidates by descending likelihood score.
///
/// Stable: ties keep their original relative order. Candidates without a score
/// follow the scored ones in original order. An empty score set leaves the
/// list untouched. The candidate set itself never changes.
pub fn apply_ranking(candidates: Vec<Candidate>, scores: &[LinkScore]) -> Vec<Candidate> {
    if scores.is_empty() {
        return candidates;
    }

    let mut by_url: HashMap<&str, u8> = HashMap::new();
    for s in scores {
        by_url.entry(s.url.as_str()).or_insert(s.score);
    }

    let (mut scored, unscored): (Vec<_>, Vec<_>) = candidates
        .into_iter()
        .map(|c| (by_url.get(c.url.as_str()).copied(), c))
        .partition(|(score, _)| score.is_some());

    scored.sort_by(|(a, _), (b, _)| b.cmp(a));

    scored
        .into_iter()
        .chain(unscored)
        .map(|(_, c)| c)
        .enumerate()
        .map(|(i, c)| Candidate { rank: i + 1, ..c })
        .collect()
}
