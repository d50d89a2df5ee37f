//! Intent labels consumed by the response pipeline.
//!
//! Classification itself happens upstream; the pipeline only sees the
//! resulting label and confidence score.

use serde::{Deserialize, Serialize};

/// Recognized user intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    StepCountQuery,
    GoalProgress,
    PermissionHelp,
    GeneralQuestion,
    Farewell,
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Greeting => "greeting",
            Intent::StepCountQuery => "step_count_query",
            Intent::GoalProgress => "goal_progress",
            Intent::PermissionHelp => "permission_help",
            Intent::GeneralQuestion => "general_question",
            Intent::Farewell => "farewell",
            Intent::Unknown => "unknown",
        }
    }

    /// Whether this intent is inherently open-ended and has no useful
    /// canned answer, no matter how confident the classifier was.
    pub fn is_open_ended(&self) -> bool {
        matches!(self, Intent::GeneralQuestion | Intent::Unknown)
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Output of the upstream intent classifier for one user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentClassification {
    pub intent: Intent,
    /// Classifier confidence in `[0.0, 1.0]`.
    pub confidence: f64,
}

impl IntentClassification {
    pub fn new(intent: Intent, confidence: f64) -> Self {
        Self {
            intent,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}
