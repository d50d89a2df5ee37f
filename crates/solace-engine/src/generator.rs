//! Response generator - the per-turn orchestrator.
//!
//! Composes sanitization, strategy selection, token budgeting, memory,
//! and the breaker-guarded provider path into one infallible surface:
//! every failure terminates in a deterministic template, never in an
//! error the caller has to handle.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use solace_context::{SessionManager, TokenCounter};
use solace_core::{ChatContext, DiagnosticContext, Intent, IntentClassification};
use solace_privacy::Sanitizer;
use solace_runtime::{ChatTurn, GenerateRequest, GenerateResponse, LlmProvider, ProviderError};

use crate::breaker::{BreakerError, CircuitBreaker};
use crate::config::PipelineConfig;
use crate::retry::{RetryConfig, RetryPolicy};
use crate::strategy::{ResponseStrategy, StrategySelector};
use crate::templates::{TemplateCatalog, PRIVACY_REFUSAL};

const SYSTEM_PROMPT: &str = "You are a supportive wellness companion. Keep replies brief, \
encouraging, and free of medical claims. Never repeat personal identifiers back to the user.";

/// Orchestrator tuning knobs.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Per-attempt provider deadline
    pub provider_timeout: Duration,
    /// Output cap for full LLM replies
    pub reply_max_tokens: u32,
    /// Output cap for hybrid elaborations; small, so the spliced
    /// sentence cannot dominate the template
    pub hybrid_max_tokens: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_secs(30),
            reply_max_tokens: 512,
            hybrid_max_tokens: 60,
        }
    }
}

/// Turns a user message into a reply.
pub struct ResponseGenerator {
    sanitizer: Sanitizer,
    tokens: TokenCounter,
    memory: Arc<SessionManager>,
    selector: StrategySelector,
    breaker: CircuitBreaker,
    provider: Arc<dyn LlmProvider>,
    retry: RetryConfig,
    config: GeneratorConfig,
}

impl ResponseGenerator {
    pub fn from_config(config: &PipelineConfig, provider: Arc<dyn LlmProvider>) -> Self {
        let generator_config = GeneratorConfig {
            provider_timeout: Duration::from_secs(config.provider.timeout_secs),
            reply_max_tokens: config.provider.max_tokens,
            ..GeneratorConfig::default()
        };
        let retry = RetryConfig {
            max_retries: config.provider.max_retries,
            ..RetryConfig::default()
        };

        Self {
            sanitizer: Sanitizer::new(config.sanitizer),
            tokens: TokenCounter::new(&config.tokens),
            memory: Arc::new(SessionManager::new(config.memory.clone())),
            selector: StrategySelector::new(config.strategy.clone()),
            breaker: CircuitBreaker::new(config.breaker.clone()),
            provider,
            retry,
            config: generator_config,
        }
    }

    /// The breaker guarding this generator's provider.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// The conversation memory behind this generator.
    pub fn memory(&self) -> &SessionManager {
        &self.memory
    }

    /// Generate a reply for one user turn.
    ///
    /// Never returns an error: strict-mode sanitization blocks become a
    /// privacy refusal, and every provider failure lands on the
    /// deterministic template for the classified intent.
    pub async fn generate(
        &self,
        user_message: &str,
        classification: &IntentClassification,
        context: &ChatContext,
        diagnostics: Option<&DiagnosticContext>,
    ) -> String {
        let intent = classification.intent;

        let sanitized = match self.sanitizer.sanitize(user_message) {
            Ok(result) => result,
            Err(e) => {
                info!(intent = %intent, error = %e, "message blocked before leaving the device");
                return PRIVACY_REFUSAL.to_string();
            }
        };

        let strategy = self.selector.select(classification, context);
        debug!(intent = %intent, ?strategy, confidence = classification.confidence, "strategy selected");

        match strategy {
            ResponseStrategy::Template => {
                let reply = TemplateCatalog::response_for(intent);
                self.record_turn(&context.session_id, &sanitized.sanitized_text, reply)
                    .await;
                reply.to_string()
            }
            ResponseStrategy::Llm | ResponseStrategy::Hybrid => {
                match self
                    .generate_via_provider(&sanitized.sanitized_text, intent, strategy, context, diagnostics)
                    .await
                {
                    Some(reply) => {
                        self.record_turn(&context.session_id, &sanitized.sanitized_text, &reply)
                            .await;
                        reply
                    }
                    None => TemplateCatalog::response_for(intent).to_string(),
                }
            }
        }
    }

    /// Breaker-guarded provider path with bounded retries. `None` means
    /// the caller should fall back to the template.
    async fn generate_via_provider(
        &self,
        sanitized_message: &str,
        intent: Intent,
        strategy: ResponseStrategy,
        context: &ChatContext,
        diagnostics: Option<&DiagnosticContext>,
    ) -> Option<String> {
        let request = self
            .build_request(sanitized_message, intent, strategy, context, diagnostics)
            .await;

        let mut policy = RetryPolicy::new(self.retry.clone());
        loop {
            match self.attempt(request.clone()).await {
                Ok(response) => {
                    return Some(self.finish_reply(intent, strategy, response));
                }
                Err(BreakerError::Open { retry_after }) => {
                    // The breaker stays open past any retry delay; do
                    // not spin on it.
                    warn!(intent = %intent, ?retry_after, "provider circuit open, using template");
                    return None;
                }
                Err(BreakerError::Inner(e)) => {
                    if !e.is_retryable() {
                        warn!(intent = %intent, error = %e, "provider failure is final, using template");
                        return None;
                    }
                    match policy.next_delay() {
                        Some(delay) => {
                            warn!(
                                attempt = policy.attempt(),
                                delay_ms = delay.as_millis(),
                                error = %e,
                                "provider attempt failed, retrying"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        None => {
                            warn!(intent = %intent, error = %e, "retry budget exhausted, using template");
                            return None;
                        }
                    }
                }
            }
        }
    }

    /// One provider attempt through the breaker, with the configured
    /// deadline. A timed-out call is a breaker failure like any other.
    async fn attempt(
        &self,
        request: GenerateRequest,
    ) -> Result<GenerateResponse, BreakerError<ProviderError>> {
        let deadline = self.config.provider_timeout;
        let provider = Arc::clone(&self.provider);
        self.breaker
            .execute(move || async move {
                match tokio::time::timeout(deadline, provider.generate(request)).await {
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::Timeout),
                }
            })
            .await
    }

    async fn build_request(
        &self,
        sanitized_message: &str,
        intent: Intent,
        strategy: ResponseStrategy,
        context: &ChatContext,
        diagnostics: Option<&DiagnosticContext>,
    ) -> GenerateRequest {
        let system_prompt = self.build_system_prompt(intent, diagnostics);

        let prompt = match strategy {
            ResponseStrategy::Hybrid => format!(
                "In one short, warm sentence that can be spliced into a reply about {intent}, \
                 respond to: {sanitized_message}"
            ),
            _ => sanitized_message.to_string(),
        };

        let full_history = self.memory.history(&context.session_id).await;
        let kept = self
            .tokens
            .truncate_history(&full_history, &system_prompt, &prompt);
        if kept.len() < full_history.len() {
            debug!(
                dropped = full_history.len() - kept.len(),
                kept = kept.len(),
                "history truncated to fit token budget"
            );
        }

        let history = kept
            .iter()
            .map(|m| ChatTurn::new(m.role.as_str(), m.content.clone()))
            .collect();

        let max_tokens = match strategy {
            ResponseStrategy::Hybrid => self.config.hybrid_max_tokens,
            _ => self.config.reply_max_tokens,
        };

        GenerateRequest {
            prompt,
            system_prompt: Some(system_prompt),
            history,
            model: None,
            max_tokens: Some(max_tokens),
            temperature: None,
        }
    }

    /// System prompt with sanitized diagnostic hints embedded. Raw
    /// diagnostic values never reach the wire: each value goes through
    /// the same sanitizer as user text, and a value the sanitizer
    /// refuses is dropped.
    fn build_system_prompt(&self, intent: Intent, diagnostics: Option<&DiagnosticContext>) -> String {
        let mut prompt = format!("{SYSTEM_PROMPT}\nThe user's request was classified as: {intent}.");

        if let Some(diagnostics) = diagnostics.filter(|d| !d.is_empty()) {
            prompt.push_str("\nDiagnostic hints:");
            for (key, value) in diagnostics.iter() {
                match self.sanitizer.sanitize(value) {
                    Ok(clean) => {
                        prompt.push_str(&format!("\n- {key}: {}", clean.sanitized_text));
                    }
                    Err(e) => {
                        warn!(key, error = %e, "dropping diagnostic hint");
                    }
                }
            }
        }

        prompt
    }

    fn finish_reply(
        &self,
        intent: Intent,
        strategy: ResponseStrategy,
        response: GenerateResponse,
    ) -> String {
        match strategy {
            ResponseStrategy::Hybrid => match TemplateCatalog::hybrid_for(intent) {
                Some(template) => TemplateCatalog::render_hybrid(template, &response.content),
                None => TemplateCatalog::response_for(intent).to_string(),
            },
            _ => response.content,
        }
    }

    async fn record_turn(&self, session_id: &str, user_text: &str, reply: &str) {
        self.memory.add_user_message(session_id, user_text).await;
        self.memory.add_assistant_message(session_id, reply).await;
    }
}
