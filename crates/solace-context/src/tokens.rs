//! Token estimation and conversation budgeting.
//!
//! Counts are approximations: each profile applies its own
//! characters-per-token ratio, so profiles may disagree on the same input
//! but each is internally deterministic and therefore cacheable.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;
use serde::{Deserialize, Serialize};

use solace_core::ConversationMessage;

/// Structured turns cost more than their raw text; every history entry
/// carries this fixed framing overhead.
pub const PER_MESSAGE_OVERHEAD: usize = 4;

const CACHE_CAPACITY: usize = 1000;

/// Approximation profile used to estimate token counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerProfile {
    Gpt4oMini,
    Claude3Haiku,
    CharHeuristic,
}

impl TokenizerProfile {
    /// Resolve a profile from a configured model name. Unrecognized
    /// names fall back to the plain character heuristic.
    pub fn for_model(model: &str) -> Self {
        let model = model.to_ascii_lowercase();
        if model.starts_with("gpt-") {
            TokenizerProfile::Gpt4oMini
        } else if model.starts_with("claude") {
            TokenizerProfile::Claude3Haiku
        } else {
            TokenizerProfile::CharHeuristic
        }
    }

    fn chars_per_token(self) -> f64 {
        match self {
            TokenizerProfile::Gpt4oMini => 4.0,
            TokenizerProfile::Claude3Haiku => 3.5,
            TokenizerProfile::CharHeuristic => 5.0,
        }
    }
}

impl Default for TokenizerProfile {
    fn default() -> Self {
        TokenizerProfile::CharHeuristic
    }
}

/// Token counter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Maximum tokens in the model's context window
    pub max_context_tokens: usize,
    /// Reserved headroom below the hard window
    pub safety_margin: usize,
    /// Model name selecting the tokenizer profile
    pub model: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            max_context_tokens: 4096,
            safety_margin: 256,
            model: "gpt-4o-mini".to_string(),
        }
    }
}

/// Derived token budget for one outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBudget {
    pub max_context_tokens: usize,
    pub safety_margin: usize,
}

impl TokenBudget {
    pub fn new(max_context_tokens: usize, safety_margin: usize) -> Self {
        Self {
            max_context_tokens,
            safety_margin,
        }
    }

    pub fn effective_limit(&self) -> usize {
        self.max_context_tokens.saturating_sub(self.safety_margin)
    }
}

/// Estimated cost of a full conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTokenReport {
    pub tokens: usize,
    pub exceeds_limit: bool,
    pub remaining_tokens: usize,
}

/// Estimates token costs for text and full conversation turns.
///
/// Identical input text always yields an identical count for a given
/// profile; recent results are served from a bounded LRU cache shared
/// across callers.
pub struct TokenCounter {
    profile: TokenizerProfile,
    budget: TokenBudget,
    cache: Mutex<LruCache<String, usize>>,
}

impl TokenCounter {
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            profile: TokenizerProfile::for_model(&config.model),
            budget: TokenBudget::new(config.max_context_tokens, config.safety_margin),
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(CACHE_CAPACITY).expect("cache capacity is non-zero"),
            )),
        }
    }

    pub fn with_profile(mut self, profile: TokenizerProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn profile(&self) -> TokenizerProfile {
        self.profile
    }

    pub fn budget(&self) -> TokenBudget {
        self.budget
    }

    /// Estimate the token count of one text string.
    ///
    /// Zero for empty input, at least one otherwise, monotonic in text
    /// length.
    pub fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }

        if let Ok(mut cache) = self.cache.lock() {
            if let Some(&cached) = cache.get(text) {
                return cached;
            }
        }

        let estimate = ((text.chars().count() as f64) / self.profile.chars_per_token()).ceil()
            as usize;
        let estimate = estimate.max(1);

        if let Ok(mut cache) = self.cache.lock() {
            cache.put(text.to_string(), estimate);
        }

        estimate
    }

    /// Estimate the total cost of system prompt + history + user message,
    /// with per-entry framing overhead for history.
    pub fn count_conversation(
        &self,
        system_prompt: &str,
        user_message: &str,
        history: &[ConversationMessage],
    ) -> ConversationTokenReport {
        let base = self.count(system_prompt) + self.count(user_message);
        let history_tokens: usize = history
            .iter()
            .map(|m| self.count(&m.content) + PER_MESSAGE_OVERHEAD)
            .sum();

        let tokens = base + history_tokens;
        let limit = self.budget.effective_limit();

        ConversationTokenReport {
            tokens,
            exceeds_limit: tokens > limit,
            remaining_tokens: limit.saturating_sub(tokens),
        }
    }

    /// Drop oldest history entries until the remainder, combined with the
    /// system prompt and user message, fits under the effective limit.
    ///
    /// The kept entries preserve their original relative order. When the
    /// base alone (system + user, no history) already exceeds the limit,
    /// the result is empty; the user message itself is never altered.
    pub fn truncate_history(
        &self,
        history: &[ConversationMessage],
        system_prompt: &str,
        user_message: &str,
    ) -> Vec<ConversationMessage> {
        self.truncate_history_with_limit(
            history,
            system_prompt,
            user_message,
            self.budget.effective_limit(),
        )
    }

    /// [`Self::truncate_history`] against an explicit limit.
    pub fn truncate_history_with_limit(
        &self,
        history: &[ConversationMessage],
        system_prompt: &str,
        user_message: &str,
        limit: usize,
    ) -> Vec<ConversationMessage> {
        let base = self.count(system_prompt) + self.count(user_message);
        if base > limit {
            return Vec::new();
        }

        let costs: Vec<usize> = history
            .iter()
            .map(|m| self.count(&m.content) + PER_MESSAGE_OVERHEAD)
            .collect();

        let mut total: usize = base + costs.iter().sum::<usize>();
        let mut start = 0;
        while total > limit && start < history.len() {
            total -= costs[start];
            start += 1;
        }

        history[start..].to_vec()
    }
}
