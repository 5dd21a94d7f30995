//! `PageSession` over a Browserless instance.
//!
//! Browserless is stateless per request, so the session keeps the current
//! page (URL, status, rendered HTML) itself. Element lookups run against that
//! HTML; interactive actions replay a Puppeteer script against the current URL
//! and replace the current page with whatever the script ended on.

use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use spider_transformations::transformation::content::{
    transform_content_input, ReturnFormat, TransformConfig, TransformInput,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use browserless_client::{BrowserlessClient, WaitUntil};

use crate::traits::{
    ActionOutcome, ElementQuery, LinkInfo, NavigationResponse, PageAction, PageElement, PageSession, WaitCondition,
};

static REGION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:nav|header|footer)\b[^>]*>.*?</(?:nav|header|footer)\s*>").expect("valid regex")
});
static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a\s*>").expect("valid regex"));
static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)\bhref\s*=\s*["']([^"']+)["']"#).expect("valid regex"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").expect("valid regex"));
static NOISE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|noscript|template)\b[^>]*>.*?</(?:script|style|noscript|template)\s*>")
        .expect("valid regex")
});
static SEARCH_INPUT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<input\b[^>]*(?:type\s*=\s*["']?search|name\s*=\s*["']?(?:q|s|search|query|keys|keywords)["'\s>])[^>]*>"#,
    )
    .expect("valid regex")
});
static SEARCH_TOGGLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<(?:button|a)\b[^>]*(?:aria-label|class|id|title)\s*=\s*["'][^"']*search[^"']*["'][^>]*>"#)
        .expect("valid regex")
});

/// Opens collapsed navigation and returns the expanded DOM.
const EXPAND_MENUS_SCRIPT: &str = r#"
export default async function ({ page, context }) {
  const response = await page.goto(context.url, { waitUntil: "domcontentloaded", timeout: context.timeout });
  const toggles = await page.$$('[aria-expanded="false"], [aria-haspopup="true"], .dropdown-toggle, .menu-toggle, .navbar-toggler, button.hamburger, details > summary');
  for (const toggle of toggles.slice(0, 40)) {
    try {
      await toggle.hover();
      await toggle.click({ delay: 50 });
      await new Promise((r) => setTimeout(r, 150));
    } catch (e) {}
  }
  return {
    data: { url: page.url(), status: response ? response.status() : null, html: await page.content(), expanded: toggles.length },
    type: "application/json",
  };
}
"#;

/// Opens the search box, submits `context.term`, returns the results page.
const SUBMIT_SEARCH_SCRIPT: &str = r#"
export default async function ({ page, context }) {
  await page.goto(context.url, { waitUntil: "domcontentloaded", timeout: context.timeout });
  const inputSelector = 'input[type="search"], input[name="q"], input[name="s"], input[name="search"], input[name="query"], input[name="keys"], input[name="keywords"]';
  let input = await page.$(inputSelector);
  const visible = input ? await input.boundingBox() : null;
  if (!visible) {
    const toggle = await page.$('button[aria-label*="earch" i], a[aria-label*="earch" i], [class*="search" i] button, button[class*="search" i], a[class*="search" i]');
    if (toggle) {
      try { await toggle.click(); } catch (e) {}
      await new Promise((r) => setTimeout(r, 500));
      input = await page.$(inputSelector);
    }
  }
  if (!input) {
    return { data: { url: page.url(), status: null, html: await page.content(), submitted: false }, type: "application/json" };
  }
  await input.click({ clickCount: 3 });
  await input.type(context.term, { delay: 40 });
  const [response] = await Promise.all([
    page.waitForNavigation({ waitUntil: "domcontentloaded", timeout: context.timeout }).catch(() => null),
    input.press("Enter"),
  ]);
  return {
    data: { url: page.url(), status: response ? response.status() : null, html: await page.content(), submitted: true },
    type: "application/json",
  };
}
"#;

#[derive(Debug, Deserialize)]
struct ScriptPage {
    url: String,
    status: Option<u16>,
    html: String,
    #[serde(default = "default_true")]
    submitted: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone)]
struct CurrentPage {
    url: String,
    status: Option<u16>,
    html: String,
}

#[derive(Default)]
struct SessionState {
    page: Option<CurrentPage>,
    /// Links handed out by the last `find_elements`, addressed as `link:{index}`.
    links: Vec<LinkInfo>,
}

pub struct BrowserlessSession {
    client: BrowserlessClient,
    timeout: Duration,
    state: Mutex<SessionState>,
}

impl BrowserlessSession {
    pub fn new(client: BrowserlessClient, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            state: Mutex::new(SessionState::default()),
        }
    }

    async fn current(&self) -> Result<CurrentPage> {
        self.state
            .lock()
            .await
            .page
            .clone()
            .ok_or_else(|| anyhow!("No page loaded in session"))
    }

    async fn replace_page(&self, page: CurrentPage) {
        let mut state = self.state.lock().await;
        state.page = Some(page);
        state.links.clear();
    }

    async fn run_script(&self, script: &str, context: serde_json::Value) -> Result<ScriptPage> {
        let value = self
            .client
            .function(script, context)
            .await
            .context("Browserless function call failed")?;
        serde_json::from_value(value).context("Unexpected Browserless function output")
    }
}

#[async_trait]
impl PageSession for BrowserlessSession {
    async fn navigate(&self, url: &str, wait: WaitCondition, timeout: Duration) -> Result<NavigationResponse> {
        let wait_until = match wait {
            WaitCondition::Load => WaitUntil::Load,
            WaitCondition::DomContentLoaded => WaitUntil::DomContentLoaded,
            WaitCondition::NetworkIdle => WaitUntil::NetworkIdle2,
        };
        let rendered = self
            .client
            .content(url, wait_until, timeout)
            .await
            .with_context(|| format!("Browserless failed to render {url}"))?;

        debug!(url, status = ?rendered.status, bytes = rendered.html.len(), "Rendered page");
        let response = NavigationResponse {
            status: rendered.status,
            final_url: rendered.final_url.clone(),
        };
        self.replace_page(CurrentPage {
            url: rendered.final_url,
            status: rendered.status,
            html: rendered.html,
        })
        .await;
        Ok(response)
    }

    async fn find_elements(&self, query: ElementQuery) -> Result<Vec<PageElement>> {
        let page = self.current().await?;

        let links = match query {
            ElementQuery::NavigationLinks => navigation_links(&page.html),
            ElementQuery::ResultLinks => content_links(&page.html),
            ElementQuery::SearchAffordance => {
                return Ok(search_affordance(&page.html)
                    .map(|description| {
                        vec![PageElement {
                            selector: "search".to_string(),
                            description,
                        }]
                    })
                    .unwrap_or_default());
            }
        };

        let elements = links
            .iter()
            .enumerate()
            .map(|(i, link)| PageElement {
                selector: format!("link:{i}"),
                description: if link.text.is_empty() {
                    link.href.clone()
                } else {
                    link.text.clone()
                },
            })
            .collect();
        self.state.lock().await.links = links;
        Ok(elements)
    }

    async fn read_href_and_text(&self, selector: &str) -> Result<Option<LinkInfo>> {
        let Some(index) = selector.strip_prefix("link:").and_then(|i| i.parse::<usize>().ok()) else {
            return Ok(None);
        };
        Ok(self.state.lock().await.links.get(index).cloned())
    }

    async fn perform_action(&self, action: &PageAction) -> Result<ActionOutcome> {
        let page = self.current().await?;
        let timeout_ms = self.timeout.as_millis() as u64;

        match action {
            PageAction::ExpandMenus => {
                let result = self
                    .run_script(
                        EXPAND_MENUS_SCRIPT,
                        serde_json::json!({ "url": page.url, "timeout": timeout_ms }),
                    )
                    .await;
                match result {
                    Ok(expanded) => {
                        self.replace_page(CurrentPage {
                            url: expanded.url,
                            status: expanded.status.or(page.status),
                            html: expanded.html,
                        })
                        .await;
                        Ok(ActionOutcome {
                            success: true,
                            message: "menus expanded".to_string(),
                        })
                    }
                    Err(e) => {
                        warn!(url = page.url.as_str(), error = %e, "Menu expansion failed, keeping static DOM");
                        Ok(ActionOutcome {
                            success: false,
                            message: format!("menu expansion failed: {e:#}"),
                        })
                    }
                }
            }
            // The toggle is clicked inside the submit script; here we only
            // confirm there is something to open.
            PageAction::OpenSearch => Ok(match search_affordance(&page.html) {
                Some(found) => ActionOutcome {
                    success: true,
                    message: found,
                },
                None => ActionOutcome {
                    success: false,
                    message: "no search box found".to_string(),
                },
            }),
            PageAction::SubmitSearch { term } => {
                let result = self
                    .run_script(
                        SUBMIT_SEARCH_SCRIPT,
                        serde_json::json!({ "url": page.url, "term": term, "timeout": timeout_ms }),
                    )
                    .await?;
                let moved = result.url != page.url;
                info!(from = page.url.as_str(), to = result.url.as_str(), term = term.as_str(), "Site search submitted");
                let submitted = result.submitted;
                self.replace_page(CurrentPage {
                    url: result.url,
                    status: result.status,
                    html: result.html,
                })
                .await;
                Ok(ActionOutcome {
                    success: submitted && moved,
                    message: if !submitted {
                        "search input not found".to_string()
                    } else if moved {
                        format!("searched for {term:?}")
                    } else {
                        "page did not change after submit".to_string()
                    },
                })
            }
            PageAction::Instruction(text) => Ok(ActionOutcome {
                success: false,
                message: format!("free-form instructions are not supported: {text}"),
            }),
        }
    }

    async fn page_content(&self) -> Result<String> {
        let page = self.current().await?;
        Ok(readable_text(&page.url, &page.html))
    }

    async fn current_url(&self) -> Option<String> {
        self.state.lock().await.page.as_ref().map(|p| p.url.clone())
    }
}

// --- HTML helpers ---

fn navigation_links(html: &str) -> Vec<LinkInfo> {
    let html = NOISE_RE.replace_all(html, "");
    REGION_RE
        .find_iter(&html)
        .flat_map(|region| anchors(region.as_str()))
        .collect()
}

/// Anchors outside of navigation, header and footer regions.
fn content_links(html: &str) -> Vec<LinkInfo> {
    let html = NOISE_RE.replace_all(html, "");
    let body = REGION_RE.replace_all(&html, "");
    anchors(&body)
}

fn anchors(html: &str) -> Vec<LinkInfo> {
    ANCHOR_RE
        .captures_iter(html)
        .filter_map(|cap| {
            let href = HREF_RE.captures(&cap[1])?.get(1)?.as_str().trim().to_string();
            Some(LinkInfo {
                href: decode_entities(&href),
                text: visible_text(&cap[2]),
            })
        })
        .collect()
}

fn search_affordance(html: &str) -> Option<String> {
    if let Some(m) = SEARCH_INPUT_RE.find(html) {
        return Some(format!("search input {}", compact(m.as_str(), 120)));
    }
    SEARCH_TOGGLE_RE
        .find(html)
        .map(|m| format!("search toggle {}", compact(m.as_str(), 120)))
}

fn visible_text(fragment: &str) -> String {
    let stripped = TAG_RE.replace_all(fragment, " ");
    decode_entities(&stripped.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn decode_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}

fn compact(s: &str, max_chars: usize) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ").chars().take(max_chars).collect()
}

/// Readability markdown of the page, falling back to tag-stripped text for
/// pages Readability rejects (listing pages often are).
fn readable_text(url: &str, html: &str) -> String {
    let parsed_url = url::Url::parse(url).ok();
    let config = TransformConfig {
        readability: true,
        main_content: true,
        return_format: ReturnFormat::Markdown,
        filter_images: true,
        filter_svg: true,
        clean_html: true,
    };
    let input = TransformInput {
        url: parsed_url.as_ref(),
        content: html.as_bytes(),
        screenshot_bytes: None,
        encoding: None,
        selector_config: None,
        ignore_tags: None,
    };
    let text = transform_content_input(input, &config);
    if !text.trim().is_empty() {
        return text;
    }
    debug!(url, "Empty content after Readability extraction, using raw text");
    visible_text(&NOISE_RE.replace_all(html, " "))
}
