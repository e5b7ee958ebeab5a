/// OpenAI-compatible chat completions backend
use serde::{Deserialize, Serialize};

use super::Classify;
use crate::error::ProviderError;
use crate::prompt;
use crate::storage::Settings;
use crate::tab_data::ClassifyInput;

pub const SYSTEM_PROMPT: &str = "You are a browser tab group classificator";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

pub struct GptProvider {
    client: reqwest::Client,
    api_url: String,
    model: String,
    prompt: String,
}

impl GptProvider {
    pub fn new(client: reqwest::Client, settings: &Settings) -> GptProvider {
        GptProvider {
            client,
            api_url: settings.chat_api_url().to_string(),
            model: settings.model_name().to_string(),
            prompt: settings.prompt_template().to_string(),
        }
    }

    pub fn request_body(&self, tab: &ClassifyInput, categories: &[String]) -> ChatRequest {
        ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt::render(&self.prompt, tab, categories),
                },
            ],
            model: self.model.clone(),
        }
    }
}

impl Classify for GptProvider {
    async fn classify(
        &self,
        tab: &ClassifyInput,
        categories: &[String],
        api_key: &str,
    ) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .header("Api-Key", api_key)
            .json(&self.request_body(tab, categories))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body: serde_json::Value = response.json().await?;
        parse_response(body)
    }
}

/// `choices[0].message.content`
pub fn parse_response(body: serde_json::Value) -> Result<String, ProviderError> {
    let response: ChatResponse =
        serde_json::from_value(body).map_err(|e| ProviderError::Malformed(e.to_string()))?;

    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| ProviderError::Malformed("no choices in completion".to_string()))
}
