//! Sanitizer implementation.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{PrivacyError, PrivacyResult};
use crate::patterns::{DETECTORS, STRICT_PATTERNS};

/// Sanitizer configuration
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SanitizerConfig {
    /// When set, email addresses and phone numbers abort the call
    /// instead of being flagged.
    #[serde(default)]
    pub strict_mode: bool,
}

/// Outcome of one sanitize call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizationResult {
    pub original_text: String,
    pub sanitized_text: String,
    pub was_sanitized: bool,
    /// Human-readable log of substitutions, e.g. `"METRIC_VALUE: 10,000"`,
    /// one entry per firing.
    pub replacements: Vec<String>,
    /// True when a high-severity identifier was present, even if the
    /// mode did not abort on it.
    pub had_phi: bool,
}

impl SanitizationResult {
    fn untouched(text: &str) -> Self {
        Self {
            original_text: text.to_string(),
            sanitized_text: text.to_string(),
            was_sanitized: false,
            replacements: Vec::new(),
            had_phi: false,
        }
    }

    pub fn replacement_count(&self) -> usize {
        self.replacements.len()
    }
}

/// Detects and replaces sensitive substrings in outbound text.
#[derive(Debug, Clone, Default)]
pub struct Sanitizer {
    config: SanitizerConfig,
}

impl Sanitizer {
    pub fn new(config: SanitizerConfig) -> Self {
        Self { config }
    }

    pub fn strict(mut self) -> Self {
        self.config.strict_mode = true;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.config.strict_mode
    }

    /// Sanitize one text string.
    ///
    /// Never errors in non-strict mode. In strict mode, a high-severity
    /// identifier returns [`PrivacyError::PhiDetected`] without rewriting
    /// anything; those identifiers are never silently substituted.
    pub fn sanitize(&self, text: &str) -> PrivacyResult<SanitizationResult> {
        if text.is_empty() {
            return Ok(SanitizationResult::untouched(text));
        }

        let mut had_phi = false;
        for (category, re) in STRICT_PATTERNS.iter() {
            if re.is_match(text) {
                had_phi = true;
                if self.config.strict_mode {
                    warn!(category = %category, "strict mode rejected outbound text");
                    return Err(PrivacyError::PhiDetected {
                        category: (*category).to_string(),
                    });
                }
            }
        }

        let mut sanitized = text.to_string();
        let mut replacements = Vec::new();

        for detector in DETECTORS.iter() {
            let before = replacements.len();
            for m in detector.regex.find_iter(&sanitized) {
                replacements.push(format!("{}: {}", detector.label, m.as_str()));
            }
            if replacements.len() > before {
                sanitized = detector
                    .regex
                    .replace_all(&sanitized, detector.placeholder)
                    .to_string();
            }
        }

        let was_sanitized = !replacements.is_empty();
        if was_sanitized {
            debug!(
                replacements = replacements.len(),
                had_phi, "sanitized outbound text"
            );
        }

        Ok(SanitizationResult {
            original_text: text.to_string(),
            sanitized_text: if was_sanitized {
                sanitized
            } else {
                text.to_string()
            },
            was_sanitized,
            replacements,
            had_phi,
        })
    }
}
