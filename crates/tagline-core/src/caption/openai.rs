//! OpenAI-compatible captioning backend using the Chat Completions API.
//!
//! Sends the image via data URL in the user message content array. Any
//! server speaking the same protocol works by pointing `llm.openai.endpoint`
//! at it.

use super::provider::{request_error, CaptionProvider, CaptionRequest, CaptionResponse};
use crate::error::PipelineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Chat Completions provider.
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl OpenAiProvider {
    pub fn new(endpoint: &str, api_key: &str, model: &str, timeout: Duration) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
            timeout,
        }
    }
}

// --- Request types ---

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ChatContent>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ChatContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

impl ChatRequest {
    fn from_caption(model: &str, request: &CaptionRequest) -> Self {
        Self {
            model: model.to_string(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: request.top_p,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ChatContent::ImageUrl {
                        image_url: ImageUrl {
                            url: request.image.data_url(),
                        },
                    },
                    ChatContent::Text {
                        text: request.prompt.clone(),
                    },
                ],
            }],
        }
    }
}

// --- Response types ---

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    model: String,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl CaptionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, request: &CaptionRequest) -> Result<CaptionResponse, PipelineError> {
        let start = Instant::now();
        let body = ChatRequest::from_caption(&self.model, request);

        let resp = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| request_error("OpenAI", self.timeout, e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Caption {
                message: format!("OpenAI HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        let chat_resp: ChatResponse = resp.json().await.map_err(|e| PipelineError::Caption {
            message: format!("Failed to parse OpenAI response: {e}"),
            status_code: None,
        })?;

        let text = chat_resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| PipelineError::Caption {
                message: "OpenAI returned empty choices array, no caption generated".to_string(),
                status_code: None,
            })?;

        Ok(CaptionResponse {
            text,
            model: chat_resp.model,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::provider::ImageInput;
    use crate::config::CaptionConfig;

    #[test]
    fn test_chat_request_shape() {
        let image = ImageInput {
            data: "AAAA".to_string(),
            media_type: "image/jpeg".to_string(),
        };
        let request = CaptionRequest::sampled(image, &CaptionConfig::default());
        let body =
            serde_json::to_value(ChatRequest::from_caption("gpt-4o-mini", &request)).unwrap();

        assert_eq!(body["model"], "gpt-4o-mini");
        let content = &body["messages"][0]["content"];
        assert_eq!(content[0]["type"], "image_url");
        assert_eq!(content[0]["image_url"]["url"], "data:image/jpeg;base64,AAAA");
        assert_eq!(content[1]["type"], "text");
        assert!(body.get("top_p").is_some());
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{"model":"gpt-4o-mini","choices":[{"message":{"content":"a cat"}}]}"#;
        let resp: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.choices[0].message.content.as_deref(), Some("a cat"));
    }
}
