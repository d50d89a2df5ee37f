//! End-to-end pipeline tests.
//!
//! Drive the full response generator through the public surface with a
//! scripted provider and assert the resilience and privacy guarantees
//! hold across component boundaries.

use std::sync::Arc;

use solace_core::{ChatContext, Intent, IntentClassification, Sentiment};
use solace_engine::templates::{TemplateCatalog, PRIVACY_REFUSAL};
use solace_engine::{CircuitState, PipelineConfig, ResponseGenerator};
use solace_privacy::SanitizerConfig;
use solace_runtime::{MockProvider, ProviderError};

fn generator_with(provider: Arc<MockProvider>, config: PipelineConfig) -> ResponseGenerator {
    ResponseGenerator::from_config(&config, provider)
}

fn ask(intent: Intent, confidence: f64) -> IntentClassification {
    IntentClassification::new(intent, confidence)
}

#[tokio::test]
async fn open_breaker_yields_template_and_no_provider_traffic() {
    let provider = Arc::new(MockProvider::new());
    let generator = generator_with(provider.clone(), PipelineConfig::default());
    generator.breaker().force_open();

    let context = ChatContext::new("e2e-open");
    let reply = generator
        .generate(
            "what should I change about my routine?",
            &ask(Intent::GeneralQuestion, 0.9),
            &context,
            None,
        )
        .await;

    assert_eq!(reply, TemplateCatalog::response_for(Intent::GeneralQuestion));
    assert_eq!(provider.generate_calls(), 0);
}

#[tokio::test]
async fn strict_mode_phi_yields_refusal_and_no_provider_traffic() {
    let provider = Arc::new(MockProvider::new());
    let config = PipelineConfig {
        sanitizer: SanitizerConfig { strict_mode: true },
        ..PipelineConfig::default()
    };
    let generator = generator_with(provider.clone(), config);

    let context = ChatContext::new("e2e-strict");
    let reply = generator
        .generate(
            "reach me at someone@example.com about my progress",
            &ask(Intent::GeneralQuestion, 0.9),
            &context,
            None,
        )
        .await;

    assert_eq!(reply, PRIVACY_REFUSAL);
    assert_eq!(provider.generate_calls(), 0);
    assert_eq!(generator.memory().message_count("e2e-strict").await, 0);
}

#[tokio::test]
async fn provider_outage_trips_breaker_then_recovers() {
    let provider = Arc::new(MockProvider::new());
    let mut config = PipelineConfig::default();
    config.provider.max_retries = 0;
    config.breaker.failure_threshold = 3;
    config.breaker.success_threshold = 1;
    let generator = generator_with(provider.clone(), config);

    let context = ChatContext::new("e2e-outage");
    // Three failing turns trip the breaker.
    for _ in 0..3 {
        provider.enqueue_generate(Err(ProviderError::Transport("connection refused".into())));
        let reply = generator
            .generate("anything", &ask(Intent::GeneralQuestion, 0.9), &context, None)
            .await;
        assert_eq!(reply, TemplateCatalog::response_for(Intent::GeneralQuestion));
    }
    assert_eq!(generator.breaker().state(), CircuitState::Open);
    assert_eq!(generator.breaker().metrics().failed_calls, 3);

    // While open, further turns are served without provider traffic.
    let calls_before = provider.generate_calls();
    generator
        .generate("still there?", &ask(Intent::GeneralQuestion, 0.9), &context, None)
        .await;
    assert_eq!(provider.generate_calls(), calls_before);

    // An operator reset plus a healthy provider restores LLM replies.
    generator.breaker().reset();
    provider.enqueue_reply("Back on track.");
    let reply = generator
        .generate("and now?", &ask(Intent::GeneralQuestion, 0.9), &context, None)
        .await;
    assert_eq!(reply, "Back on track.");
}

#[tokio::test]
async fn conversation_flows_through_memory_across_turns() {
    let provider = Arc::new(MockProvider::new());
    let generator = generator_with(provider.clone(), PipelineConfig::default());

    let context = ChatContext::new("e2e-flow");

    // Turn 1: high-confidence greeting on the first turn - template path.
    let greeting = generator
        .generate("hi there!", &ask(Intent::Greeting, 0.95), &context, None)
        .await;
    assert_eq!(greeting, TemplateCatalog::response_for(Intent::Greeting));

    // Turn 2: open question - LLM path, with the greeting in history.
    provider.enqueue_reply("A brisk walk after lunch works well.");
    let context = context.with_turn_count(1);
    let advice = generator
        .generate(
            "what's an easy habit to start?",
            &ask(Intent::GeneralQuestion, 0.9),
            &context,
            None,
        )
        .await;
    assert_eq!(advice, "A brisk walk after lunch works well.");

    let history = generator.memory().history("e2e-flow").await;
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].content, "hi there!");
    assert_eq!(history[3].content, "A brisk walk after lunch works well.");
}

#[tokio::test]
async fn sanitized_metrics_never_reach_provider_or_memory() {
    let provider = Arc::new(MockProvider::new());
    let generator = generator_with(provider.clone(), PipelineConfig::default());
    provider.enqueue_reply("Sounds like a solid day.");

    let context = ChatContext::new("e2e-sanitize");
    generator
        .generate(
            "I hit 12,500 steps on my Fitbit yesterday",
            &ask(Intent::GeneralQuestion, 0.9),
            &context,
            None,
        )
        .await;

    let history = generator.memory().history("e2e-sanitize").await;
    let recorded = &history[0].content;
    assert!(!recorded.contains("12,500"));
    assert!(!recorded.to_lowercase().contains("fitbit"));
    assert!(!recorded.contains("yesterday"));
    assert!(recorded.contains("[metric]"));
}

#[tokio::test]
async fn hybrid_turn_blends_template_and_completion() {
    let provider = Arc::new(MockProvider::new());
    let generator = generator_with(provider.clone(), PipelineConfig::default());
    provider.enqueue_reply("you've logged activity every day this week");

    let context = ChatContext::new("e2e-hybrid")
        .with_turn_count(2)
        .with_sentiment(Sentiment::Negative);
    let reply = generator
        .generate(
            "I don't feel like I'm getting anywhere",
            &ask(Intent::GoalProgress, 0.9),
            &context,
            None,
        )
        .await;

    // Negative sentiment upgrades a confident template turn to hybrid.
    assert!(reply.contains("you've logged activity every day this week"));
    assert!(reply.contains("making progress"));
    assert_eq!(provider.generate_calls(), 1);
}
