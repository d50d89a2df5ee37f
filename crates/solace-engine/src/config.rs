//! Pipeline configuration surface.

use serde::{Deserialize, Serialize};

use solace_context::{MemoryConfig, TokenConfig};
use solace_privacy::SanitizerConfig;
use solace_runtime::providers::ProviderConfig;

use crate::breaker::BreakerConfig;
use crate::strategy::StrategyConfig;

/// Aggregated configuration for one pipeline instance.
///
/// Every section has working defaults; deserialization accepts partial
/// documents and fills the rest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub sanitizer: SanitizerConfig,
    pub tokens: TokenConfig,
    pub breaker: BreakerConfig,
    pub memory: MemoryConfig,
    pub provider: ProviderConfig,
    pub strategy: StrategyConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_numbers() {
        let config = PipelineConfig::default();

        assert!(!config.sanitizer.strict_mode);
        assert_eq!(config.tokens.max_context_tokens, 4096);
        assert_eq!(config.breaker.failure_threshold, 5);
        assert_eq!(config.memory.max_messages, 50);
        assert_eq!(config.strategy.confidence_threshold, 0.85);
    }

    #[test]
    fn partial_document_fills_defaults() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{
                "sanitizer": {"strict_mode": true},
                "breaker": {"failure_threshold": 3, "success_threshold": 1,
                            "timeout_secs": 10, "window_size": 20}
            }"#,
        )
        .unwrap();

        assert!(config.sanitizer.strict_mode);
        assert_eq!(config.breaker.failure_threshold, 3);
        assert_eq!(config.memory.max_messages, 50);
    }
}
