/// Gemini generateContent backend
use serde::{Deserialize, Serialize};

use super::Classify;
use super::gpt::SYSTEM_PROMPT;
use crate::error::ProviderError;
use crate::prompt;
use crate::storage::Settings;
use crate::tab_data::ClassifyInput;

pub const GENERATE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent";
pub const MODELS_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

pub struct GeminiProvider {
    client: reqwest::Client,
    prompt: String,
}

fn content(role: &str, text: String) -> Content {
    Content {
        role: role.to_string(),
        parts: vec![Part { text }],
    }
}

impl GeminiProvider {
    pub fn new(client: reqwest::Client, settings: &Settings) -> GeminiProvider {
        GeminiProvider {
            client,
            prompt: settings.prompt_template().to_string(),
        }
    }

    /// Gemini has no system role; the instruction goes in as a model turn
    pub fn request_body(&self, tab: &ClassifyInput, categories: &[String]) -> GenerateRequest {
        GenerateRequest {
            contents: vec![
                content("user", String::new()),
                content("model", SYSTEM_PROMPT.to_string()),
                content("user", prompt::render(&self.prompt, tab, categories)),
            ],
        }
    }
}

impl Classify for GeminiProvider {
    async fn classify(
        &self,
        tab: &ClassifyInput,
        categories: &[String],
        api_key: &str,
    ) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(format!("{}?key={}", GENERATE_URL, api_key))
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

/// `candidates[0].content.parts[0].text`
pub fn parse_response(body: serde_json::Value) -> Result<String, ProviderError> {
    let response: GenerateResponse =
        serde_json::from_value(body).map_err(|e| ProviderError::Malformed(e.to_string()))?;

    response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content.parts.into_iter().next())
        .map(|part| part.text)
        .ok_or_else(|| ProviderError::Malformed("no candidates in response".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body_turns() {
        let provider = GeminiProvider::new(reqwest::Client::new(), &Settings::default());
        let tab = ClassifyInput {
            url: "https://www.bbc.co.uk/news".to_string(),
            title: "BBC News".to_string(),
        };

        let body = serde_json::to_value(provider.request_body(&tab, &["News".to_string()])).unwrap();
        let contents = body["contents"].as_array().unwrap();

        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0], json!({"role": "user", "parts": [{"text": ""}]}));
        assert_eq!(contents[1]["role"], json!("model"));
        let prompt = contents[2]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains("https://www.bbc.co.uk/news"));
        assert!(prompt.contains("BBC News"));
    }

    #[test]
    fn test_parse_response() {
        let body = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "News"}]},
                "finishReason": "STOP"
            }]
        });
        assert_eq!(parse_response(body).unwrap(), "News");
    }

    #[test]
    fn test_parse_blocked_response() {
        let body = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        assert!(parse_response(body).is_err());
    }
}
