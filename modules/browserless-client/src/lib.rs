pub mod error;

pub use error::{BrowserlessError, Result};

use std::time::Duration;

use reqwest::header::HeaderMap;
use serde::Serialize;
use tracing::debug;

/// Header Browserless sets to the upstream page's HTTP status.
const RESPONSE_CODE_HEADER: &str = "x-response-code";
/// Header Browserless sets to the URL after redirects.
const RESPONSE_URL_HEADER: &str = "x-response-url";

/// Puppeteer `waitUntil` condition for page loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WaitUntil {
    #[serde(rename = "load")]
    Load,
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    #[serde(rename = "networkidle0")]
    NetworkIdle0,
    #[serde(rename = "networkidle2")]
    NetworkIdle2,
}

/// A fully-rendered page plus the status the origin server returned for it.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Upstream status; `None` when Browserless did not report one.
    pub status: Option<u16>,
    pub final_url: String,
    pub html: String,
}

pub struct BrowserlessClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        let mut endpoint = format!("{}/{path}", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }
        endpoint
    }

    /// Render `url` via the /content endpoint.
    ///
    /// A 4xx/5xx from the *target* site is not an error here: it is reported in
    /// `RenderedPage::status`. Only failures of Browserless itself are `Err`.
    pub async fn content(
        &self,
        url: &str,
        wait_until: WaitUntil,
        timeout: Duration,
    ) -> Result<RenderedPage> {
        let body = serde_json::json!({
            "url": url,
            "gotoOptions": {
                "waitUntil": wait_until,
                "timeout": timeout.as_millis() as u64,
            },
        });

        debug!(url, "Browserless content request");

        let resp = self
            .client
            .post(self.endpoint("content"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let upstream_status = status_from_headers(resp.headers());
        let final_url = final_url_from_headers(resp.headers()).unwrap_or_else(|| url.to_string());
        let html = resp.text().await?;

        Ok(RenderedPage {
            status: upstream_status,
            final_url,
            html,
        })
    }

    /// Run a Puppeteer module on the /function endpoint and return the JSON it
    /// produced. `code` must `export default async function ({ page, context })`.
    pub async fn function(
        &self,
        code: &str,
        context: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let body = serde_json::json!({ "code": code, "context": context });

        let resp = self
            .client
            .post(self.endpoint("function"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json().await?)
    }
}

fn status_from_headers(headers: &HeaderMap) -> Option<u16> {
    headers
        .get(RESPONSE_CODE_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn final_url_from_headers(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(RESPONSE_URL_HEADER)?.to_str().ok()?.trim();
    (!value.is_empty()).then(|| value.to_string())
}
