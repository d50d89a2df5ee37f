//! Diagnostic context supplied by an external diagnostics collaborator.

use serde::{Deserialize, Serialize};

/// Flat, ordered key-value snapshot of device/app state (permission
/// status, data-source count, primary issue) that the orchestrator may
/// embed into the system prompt as hints.
///
/// Values are not user-authored text, but they still pass through the
/// sanitizer before leaving the device so that device and app names are
/// generalized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticContext {
    entries: Vec<(String, String)>,
}

impl DiagnosticContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
