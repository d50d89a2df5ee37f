//! Per-turn response strategy selection.
//!
//! A pure decision over (intent, confidence, context signals). The
//! selector never performs I/O, so every branch is unit-testable.

use serde::{Deserialize, Serialize};

use solace_core::{ChatContext, Intent, IntentClassification, Sentiment};

use crate::templates::TemplateCatalog;

/// How a turn should be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStrategy {
    /// Canned, deterministic response
    Template,
    /// Full LLM generation
    Llm,
    /// Template with one LLM-generated elaboration spliced in
    Hybrid,
}

/// Strategy selector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Confidence at or above which the cheap template path wins
    pub confidence_threshold: f64,
    /// Confidence at or above which hybrid is still worthwhile
    pub hybrid_threshold: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.85,
            hybrid_threshold: 0.6,
        }
    }
}

/// Pure, side-effect-free strategy decision.
#[derive(Debug, Clone, Default)]
pub struct StrategySelector {
    config: StrategyConfig,
}

impl StrategySelector {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    pub fn select(
        &self,
        classification: &IntentClassification,
        context: &ChatContext,
    ) -> ResponseStrategy {
        let intent = classification.intent;

        // Open-ended intents have no useful canned answer.
        if intent.is_open_ended() {
            return ResponseStrategy::Llm;
        }

        // A greeting opening the conversation is always answered from the
        // template, whatever the classifier's confidence.
        if intent == Intent::Greeting && context.turn_count == 0 {
            return ResponseStrategy::Template;
        }

        if classification.confidence >= self.config.confidence_threshold {
            // Negative sentiment upgrades a confident template turn.
            if context.sentiment == Some(Sentiment::Negative)
                && TemplateCatalog::has_hybrid(intent)
            {
                return ResponseStrategy::Hybrid;
            }
            return ResponseStrategy::Template;
        }

        if classification.confidence >= self.config.hybrid_threshold
            && TemplateCatalog::has_hybrid(intent)
        {
            return ResponseStrategy::Hybrid;
        }

        ResponseStrategy::Llm
    }
}
