mod client;
pub(crate) mod types;

use anyhow::{anyhow, Result};

use crate::schema::StructuredOutput;

use client::ClaudeClient;
use types::*;

const TOOL_NAME: &str = "structured_response";

// =============================================================================
// Claude
// =============================================================================

#[derive(Clone)]
pub struct Claude {
    model: String,
    client: ClaudeClient,
}

impl Claude {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let api_key = api_key.into();
        Self {
            model: model.into(),
            client: ClaudeClient::new(&api_key),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One forced tool call whose input schema is generated from `T`. The
    /// reply either deserializes into `T` or the call fails.
    pub async fn extract<T: StructuredOutput>(
        &self,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Result<T> {
        let request = ChatRequest::new(&self.model)
            .system(system_prompt)
            .message(WireMessage::user(user_prompt))
            .temperature(0.0)
            .forced_tool(ToolDefinitionWire {
                name: TOOL_NAME.to_string(),
                description: format!("Record the {} answer.", T::type_name()),
                input_schema: T::input_schema(),
            });

        let response = self.client.chat(&request).await?;
        parse_tool_input(response)
    }
}

fn parse_tool_input<T: StructuredOutput>(response: ChatResponse) -> Result<T> {
    let input = response
        .into_tool_input()
        .ok_or_else(|| anyhow!("No structured output in Claude response"))?;
    serde_json::from_value(input).map_err(|e| anyhow!("Failed to deserialize response: {}", e))
}
