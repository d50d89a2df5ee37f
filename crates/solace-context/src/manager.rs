//! Session manager implementation.
//!
//! The manager owns the full session map and is the only mutator.
//! Sessions live behind individual locks so concurrent appends to the
//! same session serialize while different sessions stay independent.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use solace_core::{ConversationMessage, SessionRecord};

use crate::error::{ContextError, ContextResult};
use crate::session::{ConversationSession, MemoryConfig};

type SharedSession = Arc<Mutex<ConversationSession>>;

/// Owns session-id-keyed conversation memory.
///
/// Expiration is lazy: an expired session is treated as absent wherever
/// it is observed and removed when sessions are enumerated.
pub struct SessionManager {
    sessions: RwLock<HashMap<String, SharedSession>>,
    config: MemoryConfig,
}

impl SessionManager {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Get the live session for `id`, creating one on first access or
    /// when the existing one has expired.
    async fn get_or_create(&self, id: &str) -> SharedSession {
        {
            let sessions = self.sessions.read().await;
            if let Some(existing) = sessions.get(id) {
                let expired = {
                    let session = existing.lock().await;
                    session.is_expired(self.config.session_timeout(), Utc::now())
                };
                if !expired {
                    return Arc::clone(existing);
                }
            }
        }

        let mut sessions = self.sessions.write().await;
        // Re-check under the write lock; another task may have won.
        if let Some(existing) = sessions.get(id) {
            let expired = {
                let session = existing.lock().await;
                session.is_expired(self.config.session_timeout(), Utc::now())
            };
            if !expired {
                return Arc::clone(existing);
            }
            debug!(session_id = id, "replacing expired session");
        }

        let fresh: SharedSession = Arc::new(Mutex::new(ConversationSession::new(id)));
        sessions.insert(id.to_string(), Arc::clone(&fresh));
        fresh
    }

    /// Append a user message to the session.
    pub async fn add_user_message(&self, id: &str, content: impl Into<String>) {
        self.append(id, ConversationMessage::user(content.into())).await;
    }

    /// Append an assistant message to the session.
    pub async fn add_assistant_message(&self, id: &str, content: impl Into<String>) {
        self.append(id, ConversationMessage::assistant(content.into()))
            .await;
    }

    /// Append a pre-built message to the session.
    pub async fn append(&self, id: &str, message: ConversationMessage) {
        let shared = self.get_or_create(id).await;
        let mut session = shared.lock().await;
        session.push(message, self.config.max_messages);
    }

    /// Owned snapshot of the session history in chronological order.
    ///
    /// Mutating the returned vector has no effect on manager state; all
    /// mutation goes through the manager.
    pub async fn history(&self, id: &str) -> Vec<ConversationMessage> {
        match self.live_session(id).await {
            Some(shared) => shared.lock().await.messages.clone(),
            None => Vec::new(),
        }
    }

    /// Last `n` messages in original order, or all when fewer exist.
    pub async fn recent(&self, id: &str, n: usize) -> Vec<ConversationMessage> {
        match self.live_session(id).await {
            Some(shared) => shared.lock().await.recent(n).to_vec(),
            None => Vec::new(),
        }
    }

    /// Message count for the session; zero when absent or expired.
    pub async fn message_count(&self, id: &str) -> usize {
        match self.live_session(id).await {
            Some(shared) => shared.lock().await.messages.len(),
            None => 0,
        }
    }

    /// Ids of all live sessions. Expired sessions are purged here.
    pub async fn active_session_ids(&self) -> Vec<String> {
        let timeout = self.config.session_timeout();
        let now = Utc::now();

        let mut sessions = self.sessions.write().await;
        let mut expired = Vec::new();
        for (id, shared) in sessions.iter() {
            if shared.lock().await.is_expired(timeout, now) {
                expired.push(id.clone());
            }
        }
        for id in &expired {
            sessions.remove(id);
            debug!(session_id = %id, "purged expired session");
        }

        sessions.keys().cloned().collect()
    }

    /// Remove a session explicitly. Returns whether it existed.
    pub async fn clear_session(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    /// Export the session as its stable persistence record.
    pub async fn export_session(&self, id: &str) -> ContextResult<SessionRecord> {
        match self.live_session(id).await {
            Some(shared) => Ok(shared.lock().await.to_record()),
            None => Err(ContextError::SessionNotFound(id.to_string())),
        }
    }

    /// Import a session record, replacing any session with the same id.
    pub async fn import_session(&self, record: SessionRecord) {
        let session = ConversationSession::from_record(record);
        let id = session.id.clone();
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(session)));
    }

    async fn live_session(&self, id: &str) -> Option<SharedSession> {
        let sessions = self.sessions.read().await;
        let shared = sessions.get(id)?;
        let expired = shared
            .lock()
            .await
            .is_expired(self.config.session_timeout(), Utc::now());
        if expired {
            None
        } else {
            Some(Arc::clone(shared))
        }
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(MemoryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_with(max_messages: usize, timeout_secs: u64) -> SessionManager {
        SessionManager::new(MemoryConfig {
            max_messages,
            session_timeout_secs: timeout_secs,
            ..MemoryConfig::default()
        })
    }

    #[tokio::test]
    async fn first_access_creates_session() {
        let manager = SessionManager::default();
        manager.add_user_message("s1", "hello").await;

        let history = manager.history("s1").await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "hello");
    }

    #[tokio::test]
    async fn overflow_keeps_exactly_max_newest_in_order() {
        let manager = manager_with(5, 3600);
        for i in 0..9 {
            manager.add_user_message("s1", format!("m{i}")).await;
        }

        let history = manager.history("s1").await;
        assert_eq!(history.len(), 5);
        let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m4", "m5", "m6", "m7", "m8"]);
    }

    #[tokio::test]
    async fn history_snapshot_does_not_alias_manager_state() {
        let manager = SessionManager::default();
        manager.add_user_message("s1", "hello").await;

        let mut snapshot = manager.history("s1").await;
        snapshot.clear();

        assert_eq!(manager.message_count("s1").await, 1);
    }

    #[tokio::test]
    async fn recent_returns_last_n() {
        let manager = SessionManager::default();
        for i in 0..4 {
            manager.add_user_message("s1", format!("m{i}")).await;
        }

        let recent = manager.recent("s1", 2).await;
        let contents: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3"]);
    }

    #[tokio::test]
    async fn expired_session_is_treated_as_absent() {
        let manager = manager_with(50, 0);
        manager.add_user_message("s1", "hello").await;

        // timeout of zero seconds: any strictly-later observation expires it
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        assert!(manager.history("s1").await.is_empty());
        assert!(manager.active_session_ids().await.is_empty());
    }

    #[tokio::test]
    async fn enumeration_purges_expired_sessions_only() {
        let manager = manager_with(50, 3600);
        manager.add_user_message("live", "hello").await;

        // Insert an already-expired session directly via import.
        let mut stale = ConversationSession::new("stale");
        stale.last_activity_time = Utc::now() - chrono::Duration::seconds(7200);
        manager.import_session(stale.to_record()).await;

        let ids = manager.active_session_ids().await;
        assert_eq!(ids, vec!["live".to_string()]);
    }

    #[tokio::test]
    async fn clear_session_removes_state() {
        let manager = SessionManager::default();
        manager.add_user_message("s1", "hello").await;

        assert!(manager.clear_session("s1").await);
        assert!(!manager.clear_session("s1").await);
        assert!(manager.history("s1").await.is_empty());
    }

    #[tokio::test]
    async fn export_import_round_trips() {
        let manager = SessionManager::default();
        manager.add_user_message("s1", "how many steps").await;
        manager.add_assistant_message("s1", "let me check").await;

        let record = manager.export_session("s1").await.unwrap();

        let other = SessionManager::default();
        other.import_session(record.clone()).await;
        let reexported = other.export_session("s1").await.unwrap();

        assert_eq!(reexported, record);
    }

    #[tokio::test]
    async fn export_of_unknown_session_errors() {
        let manager = SessionManager::default();
        let err = manager.export_session("missing").await.unwrap_err();
        assert!(matches!(err, ContextError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn concurrent_appends_to_one_session_hold_the_cap() {
        let manager = Arc::new(manager_with(10, 3600));

        let mut handles = Vec::new();
        for task in 0..8 {
            let manager = Arc::clone(&manager);
            handles.push(tokio::spawn(async move {
                for i in 0..25 {
                    manager
                        .add_user_message("shared", format!("t{task}-m{i}"))
                        .await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(manager.message_count("shared").await, 10);
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let manager = SessionManager::default();
        manager.add_user_message("a", "for a").await;
        manager.add_user_message("b", "for b").await;

        assert_eq!(manager.history("a").await.len(), 1);
        assert_eq!(manager.history("b").await.len(), 1);
        assert_eq!(manager.history("a").await[0].content, "for a");
    }
}
