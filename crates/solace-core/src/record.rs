//! Session export/import records.
//!
//! These are the stable persistence contract: a session round-trips
//! through `SessionRecord` with message order and all fields preserved
//! exactly. The storage medium behind them is not this crate's concern.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::MessageRole;

/// One exported message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

/// One exported session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub last_activity_time: DateTime<Utc>,
    pub messages: Vec<MessageRecord>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}
