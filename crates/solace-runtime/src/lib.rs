//! Runtime abstractions for LLM providers.
//!
//! Any concrete vendor binding is interchangeable behind [`LlmProvider`];
//! the pipeline never sees vendor wire formats.

pub mod providers;

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use providers::OpenAiCompatProvider;

/// One prior turn handed to the provider, already reduced to wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub history: Vec<ChatTurn>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl GenerateRequest {
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            history: Vec::new(),
            model: None,
            max_tokens: None,
            temperature: None,
        }
    }
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub content: String,
    pub model: Option<String>,
    pub finish_reason: Option<String>,
    pub token_usage: Option<TokenUsage>,
    /// Wall-clock time the provider call took.
    pub latency: Duration,
}

/// Incremental streaming output, terminated by a completion marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamChunk {
    Delta {
        text: String,
    },
    Done {
        finish_reason: Option<String>,
        token_usage: Option<TokenUsage>,
    },
}

pub type ProviderStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, ProviderError>> + Send>>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned HTTP {status}")]
    HttpStatus { status: u16, body: String },

    #[error("malformed provider response: {0}")]
    Decode(String),

    #[error("provider call timed out")]
    Timeout,

    #[error("operation not supported: {0}")]
    Unsupported(String),

    #[error("mock provider has no queued response")]
    MockQueueEmpty,
}

impl ProviderError {
    /// Whether a retry could plausibly succeed. Client-side mistakes
    /// (4xx other than 429) and unsupported operations are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Transport(_) | ProviderError::Timeout => true,
            ProviderError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            ProviderError::Decode(_)
            | ProviderError::Unsupported(_)
            | ProviderError::MockQueueEmpty => false,
        }
    }
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, req: GenerateRequest) -> Result<GenerateResponse, ProviderError>;

    /// Streaming variant. Providers without a streaming binding report
    /// [`ProviderError::Unsupported`].
    async fn generate_stream(&self, req: GenerateRequest) -> Result<ProviderStream, ProviderError> {
        let _ = req;
        Err(ProviderError::Unsupported("streaming".to_string()))
    }

    /// Cheap liveness probe; defaults to optimistic.
    async fn is_available(&self) -> bool {
        true
    }
}

/// Scripted provider for tests: queued results are replayed in order.
#[derive(Debug, Default)]
pub struct MockProvider {
    generate_queue: Mutex<VecDeque<Result<GenerateResponse, ProviderError>>>,
    stream_queue: Mutex<VecDeque<Result<Vec<StreamChunk>, ProviderError>>>,
    generate_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue_generate(&self, result: Result<GenerateResponse, ProviderError>) {
        self.generate_queue
            .lock()
            .expect("mock generate queue poisoned")
            .push_back(result);
    }

    pub fn enqueue_reply(&self, content: impl Into<String>) {
        self.enqueue_generate(Ok(GenerateResponse {
            content: content.into(),
            model: Some("mock-1".to_string()),
            finish_reason: Some("stop".to_string()),
            token_usage: None,
            latency: Duration::from_millis(1),
        }));
    }

    pub fn enqueue_stream(&self, result: Result<Vec<StreamChunk>, ProviderError>) {
        self.stream_queue
            .lock()
            .expect("mock stream queue poisoned")
            .push_back(result);
    }

    /// Number of `generate` invocations so far.
    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn generate(&self, _req: GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.generate_queue
            .lock()
            .expect("mock generate queue poisoned")
            .pop_front()
            .unwrap_or(Err(ProviderError::MockQueueEmpty))
    }

    async fn generate_stream(
        &self,
        _req: GenerateRequest,
    ) -> Result<ProviderStream, ProviderError> {
        let next = self
            .stream_queue
            .lock()
            .expect("mock stream queue poisoned")
            .pop_front()
            .unwrap_or(Err(ProviderError::MockQueueEmpty))?;

        Ok(Box::pin(stream::iter(next.into_iter().map(Ok))))
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    fn request() -> GenerateRequest {
        GenerateRequest {
            prompt: "hello".to_string(),
            system_prompt: Some("be brief".to_string()),
            history: vec![ChatTurn::new("user", "earlier")],
            model: Some("mock-1".to_string()),
            max_tokens: Some(64),
            temperature: Some(0.0),
        }
    }

    #[tokio::test]
    async fn mock_generate_returns_queued_response() {
        let provider = MockProvider::new();
        provider.enqueue_reply("hello from mock");

        let response = provider.generate(request()).await.unwrap();

        assert_eq!(response.content, "hello from mock");
        assert_eq!(response.model.as_deref(), Some("mock-1"));
        assert_eq!(provider.generate_calls(), 1);
    }

    #[tokio::test]
    async fn mock_generate_stream_emits_chunks_in_order() {
        let provider = MockProvider::new();
        provider.enqueue_stream(Ok(vec![
            StreamChunk::Delta {
                text: "hel".to_string(),
            },
            StreamChunk::Delta {
                text: "lo".to_string(),
            },
            StreamChunk::Done {
                finish_reason: Some("stop".to_string()),
                token_usage: None,
            },
        ]));

        let mut stream = provider.generate_stream(request()).await.unwrap();
        let mut collected = String::new();
        let mut finished = false;
        while let Some(chunk) = stream.next().await {
            match chunk.unwrap() {
                StreamChunk::Delta { text } => collected.push_str(&text),
                StreamChunk::Done { finish_reason, .. } => {
                    assert_eq!(finish_reason.as_deref(), Some("stop"));
                    finished = true;
                }
            }
        }

        assert_eq!(collected, "hello");
        assert!(finished);
    }

    #[tokio::test]
    async fn mock_reports_empty_queue_error() {
        let provider = MockProvider::new();

        let err = provider.generate(request()).await.unwrap_err();

        assert_eq!(err, ProviderError::MockQueueEmpty);
    }

    #[test]
    fn retryability_follows_error_class() {
        assert!(ProviderError::Timeout.is_retryable());
        assert!(ProviderError::Transport("reset".into()).is_retryable());
        assert!(ProviderError::HttpStatus {
            status: 503,
            body: String::new()
        }
        .is_retryable());
        assert!(ProviderError::HttpStatus {
            status: 429,
            body: String::new()
        }
        .is_retryable());
        assert!(!ProviderError::HttpStatus {
            status: 401,
            body: String::new()
        }
        .is_retryable());
        assert!(!ProviderError::Decode("bad json".into()).is_retryable());
    }
}
