use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;
use crate::domain::ports::reasoning::ReasoningService;

const API_VERSION: &str = "2023-06-01";

pub struct AnthropicReasoner {
    client: Client,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicReasoner {
    pub fn new(api_key: String, model: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model: model.unwrap_or_else(|| "claude-3-5-haiku-latest".to_string()),
        }
    }
}

fn joined_text(blocks: Vec<ContentBlock>) -> String {
    blocks
        .into_iter()
        .filter(|b| b.kind == "text")
        .filter_map(|b| b.text)
        .collect::<Vec<_>>()
        .join("")
}

#[async_trait::async_trait]
impl ReasoningService for AnthropicReasoner {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
        model: &str,
    ) -> Result<String, DomainError> {
        let resp = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&MessagesRequest {
                model,
                system,
                max_tokens,
                messages: vec![Message {
                    role: "user",
                    content: user,
                }],
            })
            .send()
            .await
            .map_err(|e| DomainError::Reasoning(format!("Anthropic API error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(DomainError::Reasoning(format!("Anthropic API {status}: {body}")));
        }

        let result: MessagesResponse = resp
            .json()
            .await
            .map_err(|e| DomainError::Reasoning(format!("Parse error: {e}")))?;
        let text = joined_text(result.content);
        if text.trim().is_empty() {
            return Err(DomainError::Reasoning("Anthropic returned no text".into()));
        }
        Ok(text)
    }
}
