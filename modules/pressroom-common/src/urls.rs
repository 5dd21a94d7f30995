//! Domain and URL helpers shared by the classifier, candidate builder and cache.
//!
//! Every function here is total: malformed input yields `None`/`false`, never a panic.

use url::Url;

use crate::error::PressroomError;

/// Schemes that can never point at a web page.
const NON_WEB_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:", "sms:", "ftp:"];

/// Parse an http(s) URL, accepting scheme-less forms like `example.com/news`.
pub fn parse_web_url(raw: &str) -> Option<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
        return None;
    }

    let parsed = match Url::parse(trimmed) {
        Ok(u) => u,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let rest = trimmed.trim_start_matches("//");
            Url::parse(&format!("https://{rest}")).ok()?
        }
        Err(_) => return None,
    };

    match parsed.scheme() {
        "http" | "https" => Some(parsed),
        _ => None,
    }
}

/// Lowercased host of `url` with any leading `www.` removed.
/// Accepts bare hosts (`example.com/news`) as well as absolute URLs.
pub fn domain_of(url: &str) -> Option<String> {
    let parsed = parse_web_url(url)?;
    let host = parsed.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    if host.is_empty() {
        return None;
    }
    Some(host.to_string())
}

/// Normalize a caller-supplied domain into the form used as the cache key.
pub fn normalize_domain(raw: &str) -> Result<String, PressroomError> {
    let host = domain_of(raw).ok_or_else(|| PressroomError::MalformedTarget(raw.to_string()))?;
    if !host.contains('.') || host.starts_with('.') || host.ends_with('.') {
        return Err(PressroomError::MalformedTarget(raw.to_string()));
    }
    Ok(host)
}

/// True when `url` is hosted on `domain` or one of its subdomains.
pub fn is_same_site(url: &str, domain: &str) -> bool {
    let Some(host) = domain_of(url) else {
        return false;
    };
    let domain = domain.trim().to_lowercase();
    let domain = domain.strip_prefix("www.").unwrap_or(&domain);
    if domain.is_empty() {
        return false;
    }
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// Resolve an `href` against the page it was found on.
///
/// Bare anchors and non-web schemes yield `None`. Fragments are stripped so the
/// same page reached through different anchors deduplicates.
pub fn resolve_relative(href: &str, base: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let lower = href.to_ascii_lowercase();
    if NON_WEB_SCHEMES.iter().any(|s| lower.starts_with(s)) {
        return None;
    }

    let base = parse_web_url(base)?;
    let mut resolved = base.join(href).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    resolved.set_fragment(None);
    Some(resolved.to_string())
}
