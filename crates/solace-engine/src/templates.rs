//! Deterministic response templates.
//!
//! One fixed response per intent, used directly on the template path and
//! as the fallback for every provider failure. Hybrid variants carry a
//! `{detail}` placeholder for the LLM-generated elaboration.

use solace_core::Intent;

/// Placeholder spliced by the hybrid path.
pub const DETAIL_PLACEHOLDER: &str = "{detail}";

/// Refusal used when strict-mode sanitization blocks a message. Plain
/// and non-alarming; never mentions what was detected.
pub const PRIVACY_REFUSAL: &str = "I'd rather not pass that along as written. \
Could you rephrase without personal contact details, and I'll do my best to help?";

/// Static per-intent response catalog.
pub struct TemplateCatalog;

impl TemplateCatalog {
    /// The deterministic response for an intent. Total over all intents,
    /// so every failure path has somewhere safe to land.
    pub fn response_for(intent: Intent) -> &'static str {
        match intent {
            Intent::Greeting => "Hello! I'm here to help you keep an eye on your activity. \
                What would you like to know?",
            Intent::StepCountQuery => "I can check your recent activity. Your step data comes \
                straight from your device, so make sure it has synced recently.",
            Intent::GoalProgress => "You're making progress toward your goal. Keeping a steady \
                routine matters more than any single day.",
            Intent::PermissionHelp => "To share activity data with me, enable health permissions \
                in your device settings, then come back here.",
            Intent::GeneralQuestion => "That's a good question. I can help best with questions \
                about your activity, goals, and device setup.",
            Intent::Farewell => "Take care! I'll be here whenever you want to check in again.",
            Intent::Unknown => "I'm not quite sure what you're after. Could you put it another \
                way?",
        }
    }

    /// Hybrid variant with a `{detail}` placeholder, for intents where a
    /// single generated sentence meaningfully improves the canned text.
    pub fn hybrid_for(intent: Intent) -> Option<&'static str> {
        match intent {
            Intent::GoalProgress => Some(
                "You're making progress toward your goal. {detail} Keeping a steady routine \
                 matters more than any single day.",
            ),
            Intent::StepCountQuery => Some(
                "Here's what I can tell from your recent activity: {detail}",
            ),
            Intent::PermissionHelp => Some(
                "{detail} Once permissions are enabled in your device settings, your data will \
                 start flowing again.",
            ),
            _ => None,
        }
    }

    pub fn has_hybrid(intent: Intent) -> bool {
        Self::hybrid_for(intent).is_some()
    }

    /// Splice a generated elaboration into a hybrid template. Falls back
    /// to the template text unchanged when the placeholder is missing.
    pub fn render_hybrid(template: &str, detail: &str) -> String {
        if template.contains(DETAIL_PLACEHOLDER) {
            template.replace(DETAIL_PLACEHOLDER, detail.trim())
        } else {
            template.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_intent_has_a_response() {
        let intents = [
            Intent::Greeting,
            Intent::StepCountQuery,
            Intent::GoalProgress,
            Intent::PermissionHelp,
            Intent::GeneralQuestion,
            Intent::Farewell,
            Intent::Unknown,
        ];
        for intent in intents {
            assert!(!TemplateCatalog::response_for(intent).is_empty());
        }
    }

    #[test]
    fn responses_are_deterministic() {
        assert_eq!(
            TemplateCatalog::response_for(Intent::Greeting),
            TemplateCatalog::response_for(Intent::Greeting)
        );
    }

    #[test]
    fn hybrid_templates_carry_the_placeholder() {
        for intent in [
            Intent::GoalProgress,
            Intent::StepCountQuery,
            Intent::PermissionHelp,
        ] {
            let template = TemplateCatalog::hybrid_for(intent).unwrap();
            assert!(template.contains(DETAIL_PLACEHOLDER));
        }
        assert!(TemplateCatalog::hybrid_for(Intent::Farewell).is_none());
    }

    #[test]
    fn render_splices_detail() {
        let rendered =
            TemplateCatalog::render_hybrid("Before {detail} after.", " the middle part ");
        assert_eq!(rendered, "Before the middle part after.");
    }

    #[test]
    fn render_without_placeholder_returns_template() {
        let rendered = TemplateCatalog::render_hybrid("No slot here.", "ignored");
        assert_eq!(rendered, "No slot here.");
    }
}
