//! Ollama captioning backend for local vision models.
//!
//! Talks to a local Ollama instance via its `/api/generate` endpoint.

use super::provider::{request_error, CaptionProvider, CaptionRequest, CaptionResponse};
use crate::error::PipelineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Ollama provider for local vision model inference.
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl OllamaProvider {
    pub fn new(endpoint: &str, model: &str, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

/// Ollama /api/generate request body.
#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    images: Vec<String>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

/// Ollama /api/generate response.
#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaRequest {
    fn from_caption(model: &str, request: &CaptionRequest) -> Self {
        Self {
            model: model.to_string(),
            prompt: request.prompt.clone(),
            images: vec![request.image.data.clone()],
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
                top_p: request.top_p,
            },
        }
    }
}

#[async_trait]
impl CaptionProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, request: &CaptionRequest) -> Result<CaptionResponse, PipelineError> {
        let url = format!("{}/api/generate", self.endpoint);
        let start = Instant::now();
        let body = OllamaRequest::from_caption(&self.model, request);

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| request_error("Ollama", self.timeout, e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Caption {
                message: format!("Ollama HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        let ollama_resp: OllamaResponse =
            resp.json().await.map_err(|e| PipelineError::Caption {
                message: format!("Failed to parse Ollama response: {e}"),
                status_code: None,
            })?;

        Ok(CaptionResponse {
            text: ollama_resp.response,
            model: self.model.clone(),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
