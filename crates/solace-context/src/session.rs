//! Conversation session state.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use solace_core::{ConversationMessage, MessageRecord, SessionRecord};

/// Conversation memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Maximum messages retained per session; oldest are dropped first
    pub max_messages: usize,
    /// Soft cap used when sizing history for prompts
    pub max_tokens: usize,
    /// Idle seconds after which a session is treated as absent
    pub session_timeout_secs: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_messages: 50,
            max_tokens: 2048,
            session_timeout_secs: 1800,
        }
    }
}

impl MemoryConfig {
    pub fn session_timeout(&self) -> Duration {
        Duration::seconds(self.session_timeout_secs as i64)
    }
}

/// One active conversation: an ordered message list plus activity
/// timestamps. Insertion order is chronological and preserved across
/// trimming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    pub id: String,
    pub messages: Vec<ConversationMessage>,
    pub start_time: DateTime<Utc>,
    pub last_activity_time: DateTime<Utc>,
    pub metadata: HashMap<String, String>,
}

impl ConversationSession {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            messages: Vec::new(),
            start_time: now,
            last_activity_time: now,
            metadata: HashMap::new(),
        }
    }

    /// Update the activity timestamp.
    pub fn touch(&mut self) {
        self.last_activity_time = Utc::now();
    }

    /// Append a message, touch the session, then enforce the message-count
    /// cap by dropping the oldest entries.
    pub fn push(&mut self, message: ConversationMessage, max_messages: usize) {
        self.messages.push(message);
        self.touch();

        if self.messages.len() > max_messages {
            let excess = self.messages.len() - max_messages;
            self.messages.drain(..excess);
        }
    }

    /// Last `n` messages in original order, or all when fewer exist.
    pub fn recent(&self, n: usize) -> &[ConversationMessage] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    pub fn is_expired(&self, timeout: Duration, now: DateTime<Utc>) -> bool {
        now - self.last_activity_time > timeout
    }

    /// Export to the stable persistence record, preserving message order
    /// and all fields exactly.
    pub fn to_record(&self) -> SessionRecord {
        SessionRecord {
            id: self.id.clone(),
            start_time: self.start_time,
            last_activity_time: self.last_activity_time,
            messages: self
                .messages
                .iter()
                .map(|m| MessageRecord {
                    id: m.id,
                    role: m.role,
                    content: m.content.clone(),
                    timestamp: m.timestamp,
                    metadata: m.metadata.clone(),
                })
                .collect(),
            metadata: self.metadata.clone(),
        }
    }

    /// Rebuild a session from its export record.
    pub fn from_record(record: SessionRecord) -> Self {
        Self {
            id: record.id,
            messages: record
                .messages
                .into_iter()
                .map(|m| ConversationMessage {
                    id: m.id,
                    role: m.role,
                    content: m.content,
                    timestamp: m.timestamp,
                    metadata: m.metadata,
                    token_count: None,
                })
                .collect(),
            start_time: record.start_time,
            last_activity_time: record.last_activity_time,
            metadata: record.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_trims_oldest_beyond_cap() {
        let mut session = ConversationSession::new("s");
        for i in 0..7 {
            session.push(ConversationMessage::user(format!("m{i}")), 5);
        }

        assert_eq!(session.messages.len(), 5);
        let contents: Vec<&str> = session.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4", "m5", "m6"]);
    }

    #[test]
    fn recent_returns_newest_suffix_in_order() {
        let mut session = ConversationSession::new("s");
        for i in 0..4 {
            session.push(ConversationMessage::user(format!("m{i}")), 50);
        }

        let recent: Vec<&str> = session.recent(2).iter().map(|m| m.content.as_str()).collect();
        assert_eq!(recent, vec!["m2", "m3"]);

        assert_eq!(session.recent(10).len(), 4);
    }

    #[test]
    fn expiry_is_relative_to_last_activity() {
        let mut session = ConversationSession::new("s");
        session.last_activity_time = Utc::now() - Duration::seconds(120);

        assert!(session.is_expired(Duration::seconds(60), Utc::now()));
        assert!(!session.is_expired(Duration::seconds(600), Utc::now()));
    }

    #[test]
    fn record_round_trip_preserves_everything() {
        let mut session = ConversationSession::new("s");
        session.metadata.insert("channel".to_string(), "chat".to_string());
        session.push(ConversationMessage::user("hello"), 50);
        session.push(ConversationMessage::assistant("hi there"), 50);

        let rebuilt = ConversationSession::from_record(session.to_record());

        assert_eq!(rebuilt.id, session.id);
        assert_eq!(rebuilt.start_time, session.start_time);
        assert_eq!(rebuilt.last_activity_time, session.last_activity_time);
        assert_eq!(rebuilt.metadata, session.metadata);
        assert_eq!(rebuilt.messages.len(), 2);
        assert_eq!(rebuilt.messages[0].content, "hello");
        assert_eq!(rebuilt.messages[1].role, solace_core::MessageRole::Assistant);
    }
}
