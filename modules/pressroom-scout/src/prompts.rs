//! Classifier instructions. Each is paired with one `SchemaId`.

use pressroom_common::{Candidate, Target};

/// Five-check rubric used for candidates that came from engine search, where
/// results skew towards individual articles and filtered archive views.
pub fn strict_verification(target: &Target, url: &str) -> String {
    format!(
        "You are verifying whether this page is the official, canonical press-release \
listing page for {name} ({domain}).\n\n\
URL: {url}\n\n\
ALL of the following must hold for is_match = true:\n\
(a) The page shows a LIST of multiple distinct items (titles, usually with dates), \
not the full body of a single article.\n\
(b) It is the first/default page of the list, not page 2+, not an archive filtered \
by year, tag, category or query string.\n\
(c) The items are formal announcements or press releases from {name}, not blog posts, \
whitepapers, regulatory filings, or financial tables.\n\
(d) The URL path is short and is not an article slug.\n\
(e) The page is a list view, not a single document.\n\n\
If any check fails, set is_match = false and name the failing check in the explanation. \
Set extracted_date to the date of the most recent item on the page as YYYY-MM-DD, \
or null if no date is visible.",
        name = target.name,
        domain = target.domain,
    )
}

/// Lighter rubric for candidates found on the site itself.
pub fn listing_verification(target: &Target, url: &str) -> String {
    format!(
        "Is this page the listing page for {name}'s official news or press releases?\n\n\
URL: {url}\n\n\
Answer is_match = true if the page lists multiple news items or press releases \
(titles with dates). Answer is_match = false if it shows a single article, \
an unrelated section, or an error page. \
Set extracted_date to the most recent item's date as YYYY-MM-DD, or null.",
        name = target.name,
    )
}

pub fn rank_candidates(target: &Target, candidates: &[Candidate]) -> String {
    let list = candidates
        .iter()
        .map(|c| {
            if c.display_text.is_empty() {
                format!("- {}", c.url)
            } else {
                format!("- {} (\"{}\")", c.url, c.display_text)
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "These links were found in the navigation of {name}'s website ({domain}). \
Score each from 1 to 10 by how likely it leads to the page listing {name}'s official \
news or press releases (10 = certainly the newsroom). Use each URL exactly as given.\n\n{list}",
        name = target.name,
        domain = target.domain,
    )
}

pub fn navigation_links(target: &Target) -> String {
    format!(
        "List every link in the main navigation, header and footer of this page of \
{name}'s website, including links inside dropdown menus. Return absolute URLs with \
their visible text. Leave snippet empty.",
        name = target.name,
    )
}

pub fn search_results(target: &Target, term: &str) -> String {
    format!(
        "This page shows the results of searching {domain} for \"{term}\". List each \
result link with its title as display_text and any summary text as snippet. Return \
absolute URLs. Ignore navigation, ads and pagination links.",
        domain = target.domain,
    )
}

/// Engine query scoped to the target's site.
pub fn search_query(target: &Target) -> String {
    format!("site:{} press releases news", target.domain)
}
