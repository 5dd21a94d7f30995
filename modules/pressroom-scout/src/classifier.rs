//! Rule-based link triage: listing page, article, or irrelevant.
//!
//! Runs before any semantic call so that only listing-shaped, same-site URLs
//! reach verification. Deterministic and side-effect free.

use std::collections::HashSet;

use tracing::debug;
use url::Url;

use pressroom_common::{domain_of, is_same_site, parse_web_url, ClassifiedLink, LinkCategory, RawLink};

/// At least one of these must appear in the URL path, anchor text or snippet.
const NEWS_TOKENS: &[&str] = &[
    "news",
    "press",
    "media",
    "announcement",
    "release",
    "pressroom",
];

/// Root-URL prefixes are kept only when their path still carries one of these.
const ROOT_TOKENS: &[&str] = &["news", "press", "media", "blog"];

const BINARY_EXTENSIONS: &[&str] = &[
    "pdf", "jpg", "jpeg", "png", "gif", "svg", "webp", "bmp", "ico", "tif", "tiff", "zip", "doc",
    "docx", "xls", "xlsx", "ppt", "pptx", "mp3", "mp4", "mov",
];

/// Final path segments that name a listing page outright. A match here wins
/// over every article signal.
const GENERIC_LISTING_NAMES: &[&str] = &[
    "",
    "news",
    "press",
    "media",
    "newsroom",
    "pressroom",
    "press-room",
    "press-releases",
    "press-release",
    "pressreleases",
    "news-releases",
    "news-room",
    "news-center",
    "newscenter",
    "media-center",
    "media-room",
    "mediaroom",
    "news-and-media",
    "news-media",
    "news-and-events",
    "latest-news",
    "all-news",
    "announcements",
    "press-center",
];

/// Path segments that mark a single document.
const SINGLE_DOCUMENT_SEGMENTS: &[&str] = &[
    "release-detail",
    "news-detail",
    "news-details",
    "article",
    "story",
    "whitepaper",
    "white-paper",
    "whitepapers",
    "case-study",
    "case-studies",
    "webinar",
];

/// Words in anchor text that read like a headline rather than a section name.
const ANNOUNCEMENT_WORDS: &[&str] = &[
    "announces",
    "announced",
    "launches",
    "launched",
    "unveils",
    "unveiled",
    "acquires",
    "acquired",
    "appoints",
    "appointed",
    "names",
    "partners",
    "completes",
    "completed",
    "expands",
    "reports",
    "reported",
    "q1",
    "q2",
    "q3",
    "q4",
];

const ANNOUNCEMENT_PHRASES: &[&str] = &[
    "first quarter",
    "second quarter",
    "third quarter",
    "fourth quarter",
    "fiscal year",
    "full year",
];

/// A final segment longer than this reads as an article slug.
const SLUG_LENGTH_THRESHOLD: usize = 40;
/// A final segment with at least this many hyphens reads as an article slug.
const SLUG_HYPHEN_THRESHOLD: usize = 4;
/// Root-URL extraction looks at path prefixes up to this depth.
const MAX_ROOT_DEPTH: usize = 3;

fn path_segments(url: &Url) -> Vec<String> {
    url.path()
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

fn is_binary_asset(segments: &[String]) -> bool {
    let Some(last) = segments.last() else {
        return false;
    };
    match last.rsplit_once('.') {
        Some((_, ext)) => BINARY_EXTENSIONS.contains(&ext),
        None => false,
    }
}

/// `subdomain` is the part of the host left of the target domain, so that
/// `newsroom.example.com` passes while the target's own name never does.
fn has_news_token(link: &RawLink, subdomain: &str, path: &str) -> bool {
    let text = link.display_text.to_lowercase();
    let snippet = link.snippet.to_lowercase();
    NEWS_TOKENS.iter().any(|t| {
        subdomain.contains(t) || path.contains(t) || text.contains(t) || snippet.contains(t)
    })
}

fn is_year_segment(segment: &str) -> bool {
    segment.len() == 4
        && segment.chars().all(|c| c.is_ascii_digit())
        && (segment.starts_with("19") || segment.starts_with("20"))
}

fn looks_like_slug(segment: &str) -> bool {
    segment.len() > SLUG_LENGTH_THRESHOLD
        || segment.matches('-').count() >= SLUG_HYPHEN_THRESHOLD
}

fn reads_like_headline(text: &str) -> bool {
    let lower = text.to_lowercase();
    if ANNOUNCEMENT_PHRASES.iter().any(|p| lower.contains(p)) {
        return true;
    }
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| ANNOUNCEMENT_WORDS.contains(&word))
}

/// Classify one link for `domain`.
///
/// Off-site links, binary assets, and links with no news vocabulary are
/// `Irrelevant`. Everything else is `Article` or `Listing`.
pub fn classify_link(link: &RawLink, domain: &str) -> LinkCategory {
    if !is_same_site(&link.url, domain) {
        return LinkCategory::Irrelevant;
    }
    let Some(parsed) = parse_web_url(&link.url) else {
        return LinkCategory::Irrelevant;
    };
    let segments = path_segments(&parsed);
    if is_binary_asset(&segments) {
        return LinkCategory::Irrelevant;
    }

    let host = domain_of(&link.url).unwrap_or_default();
    let subdomain = host.strip_suffix(domain).unwrap_or("");
    let path = parsed.path().to_lowercase();
    if !has_news_token(link, subdomain, &path) {
        return LinkCategory::Irrelevant;
    }

    let last = segments.last().map(String::as_str).unwrap_or("");
    if GENERIC_LISTING_NAMES.contains(&last) {
        return LinkCategory::Listing;
    }

    let article = segments.iter().any(|s| is_year_segment(s))
        || looks_like_slug(last)
        || segments
            .iter()
            .any(|s| SINGLE_DOCUMENT_SEGMENTS.contains(&s.as_str()))
        || reads_like_headline(&link.display_text);

    if article {
        LinkCategory::Article
    } else {
        LinkCategory::Listing
    }
}

/// Classify every link, keeping discovery order.
pub fn classify_links(links: &[RawLink], domain: &str) -> Vec<ClassifiedLink> {
    links
        .iter()
        .map(|link| {
            let category = classify_link(link, domain);
            debug!(url = link.url.as_str(), ?category, "Classified link");
            ClassifiedLink {
                link: link.clone(),
                category,
            }
        })
        .collect()
}

/// Derive listing-shaped URLs from the paths of up to `max_articles` article links.
///
/// `https://acme.com/news/2024/q1-results` yields `https://acme.com/news` and
/// `https://acme.com/news/2024`. Prefixes without a news/press/media/blog token
/// are dropped. Output is deduplicated in first-seen order.
pub fn extract_root_urls(links: &[ClassifiedLink], max_articles: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut roots = Vec::new();

    let articles = links
        .iter()
        .filter(|l| l.category == LinkCategory::Article)
        .take(max_articles);

    for article in articles {
        let Some(parsed) = parse_web_url(&article.link.url) else {
            continue;
        };
        let Some(host) = parsed.host_str() else {
            continue;
        };
        let segments: Vec<&str> = parsed.path().split('/').filter(|s| !s.is_empty()).collect();
        let depth = segments.len().saturating_sub(1).min(MAX_ROOT_DEPTH);

        for len in 1..=depth {
            let prefix = segments[..len].join("/");
            let lower = prefix.to_lowercase();
            if !ROOT_TOKENS.iter().any(|t| lower.contains(t)) {
                continue;
            }
            let root = format!("{}://{}/{}", parsed.scheme(), host, prefix);
            if seen.insert(root.clone()) {
                roots.push(root);
            }
        }
    }

    roots
}
