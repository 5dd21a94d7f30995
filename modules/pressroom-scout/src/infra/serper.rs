// Serper (Google Search) adapter for the search strategy.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use pressroom_common::RawLink;

use crate::traits::SearchEngine;

const SERPER_URL: &str = "https://google.serper.dev/search";

#[derive(Debug, serde::Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperResult>,
}

#[derive(Debug, serde::Deserialize)]
struct SerperResult {
    #[serde(default)]
    link: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
}

impl From<SerperResult> for RawLink {
    fn from(r: SerperResult) -> Self {
        RawLink::new(r.title, r.link).with_snippet(r.snippet)
    }
}

pub struct SerperSearch {
    api_key: String,
    client: reqwest::Client,
}

impl SerperSearch {
    pub fn new(api_key: &str) -> Result<Self> {
        Ok(Self {
            api_key: api_key.to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .context("Failed to build HTTP client")?,
        })
    }
}

#[async_trait]
impl SearchEngine for SerperSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<RawLink>> {
        info!(query, max_results, "Serper search");

        let body = serde_json::json!({
            "q": query,
            "num": max_results,
        });

        let resp = self
            .client
            .post(SERPER_URL)
            .header("X-API-KEY", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Serper API request failed")?
            .error_for_status()
            .context("Serper API returned an error status")?;

        let data: SerperResponse = resp
            .json()
            .await
            .context("Failed to parse Serper response")?;

        let links: Vec<RawLink> = data
            .organic
            .into_iter()
            .filter(|r| !r.link.is_empty())
            .take(max_results)
            .map(RawLink::from)
            .collect();

        info!(query, count = links.len(), "Serper search complete");
        Ok(links)
    }

    fn name(&self) -> &str {
        "serper"
    }
}
