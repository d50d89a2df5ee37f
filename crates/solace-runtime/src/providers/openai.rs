//! OpenAI-compatible chat-completions provider.
//!
//! Implements the `LlmProvider` trait against any endpoint speaking the
//! `/chat/completions` wire format.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{GenerateRequest, GenerateResponse, LlmProvider, ProviderError, TokenUsage};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Retry budget consumed by the orchestrator, not by this binding.
    pub max_retries: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 512,
            timeout_secs: 30,
            max_retries: 2,
        }
    }
}

/// OpenAI-compatible API provider
#[derive(Debug)]
pub struct OpenAiCompatProvider {
    client: Client,
    config: ProviderConfig,
}

impl OpenAiCompatProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn get_model(&self, req: &GenerateRequest) -> String {
        req.model
            .clone()
            .unwrap_or_else(|| self.config.model.clone())
    }

    fn build_messages(&self, req: &GenerateRequest) -> Vec<WireMessage> {
        let mut messages = Vec::with_capacity(req.history.len() + 2);
        if let Some(system) = &req.system_prompt {
            messages.push(WireMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        for turn in &req.history {
            messages.push(WireMessage {
                role: turn.role.clone(),
                content: turn.content.clone(),
            });
        }
        messages.push(WireMessage {
            role: "user".to_string(),
            content: req.prompt.clone(),
        });
        messages
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct CompletionsRequest {
    model: String,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CompletionsResponse {
    choices: Vec<Choice>,
    model: Option<String>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &'static str {
        "openai-compat"
    }

    async fn generate(&self, req: GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        let wire_req = CompletionsRequest {
            model: self.get_model(&req),
            messages: self.build_messages(&req),
            max_tokens: req.max_tokens.unwrap_or(self.config.max_tokens),
            temperature: req.temperature.unwrap_or(self.config.temperature),
        };

        debug!(
            model = %wire_req.model,
            messages = wire_req.messages.len(),
            "dispatching chat completion"
        );

        let started = Instant::now();
        let response = self
            .client
            .post(self.endpoint("/chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&wire_req)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout
                } else {
                    ProviderError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unable to read body>".to_string());
            return Err(ProviderError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let wire_resp: CompletionsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        let choice = wire_resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Decode("response carried no choices".to_string()))?;

        Ok(GenerateResponse {
            content: choice.message.content,
            model: wire_resp.model,
            finish_reason: choice.finish_reason,
            token_usage: wire_resp.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            latency: started.elapsed(),
        })
    }

    async fn is_available(&self) -> bool {
        self.client
            .get(self.endpoint("/models"))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}
