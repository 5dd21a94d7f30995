//! `SemanticClassifier` over Claude's forced tool calls.
//!
//! Each `SchemaId` maps onto the Rust type whose generated schema the model
//! must answer in.

use ai_client::util::truncate_to_char_boundary;
use ai_client::Claude;
use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use pressroom_common::VerificationOutcome;

use crate::traits::{ClassifierOutput, LinkList, LinkRanking, PageContext, SchemaId, SemanticClassifier};

/// Page text sent per request.
const MAX_CONTENT_BYTES: usize = 60_000;

const SYSTEM_PROMPT: &str = "You analyze corporate websites to locate their official \
newsroom or press-release listing page. Answer only through the provided tool. \
Base every judgment on the supplied page content; never invent URLs.";

pub struct ClaudeClassifier {
    claude: Claude,
}

impl ClaudeClassifier {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            claude: Claude::new(api_key, model),
        }
    }
}

#[async_trait]
impl SemanticClassifier for ClaudeClassifier {
    async fn classify(&self, instruction: &str, schema: SchemaId, page: &PageContext) -> Result<ClassifierOutput> {
        debug!(
            model = self.claude.model(),
            schema = schema.as_str(),
            url = page.url.as_str(),
            "Claude classify request"
        );

        let prompt = build_prompt(instruction, page);
        let output = match schema {
            SchemaId::SearchResultsList => {
                ClassifierOutput::SearchResults(self.claude.extract::<LinkList>(SYSTEM_PROMPT, prompt).await?)
            }
            SchemaId::PageVerification => ClassifierOutput::PageVerification(
                self.claude
                    .extract::<VerificationOutcome>(SYSTEM_PROMPT, prompt)
                    .await?,
            ),
            SchemaId::LinkRanking => {
                ClassifierOutput::LinkRanking(self.claude.extract::<LinkRanking>(SYSTEM_PROMPT, prompt).await?)
            }
            SchemaId::NavigationLinksList => {
                ClassifierOutput::NavigationLinks(self.claude.extract::<LinkList>(SYSTEM_PROMPT, prompt).await?)
            }
        };
        Ok(output)
    }
}

fn build_prompt(instruction: &str, page: &PageContext) -> String {
    let content = truncate_to_char_boundary(&page.content, MAX_CONTENT_BYTES);
    format!("{instruction}\n\n---\nPage URL: {}\nPage content:\n{content}", page.url)
}
