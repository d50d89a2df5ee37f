//! Solace core library - conversation domain types.
//!
//! This crate provides:
//! - Conversation messages and roles
//! - Intent classification results consumed by the pipeline
//! - Per-turn chat context signals
//! - Diagnostic context records
//! - Session export/import records (the persistence contract)

pub mod context;
pub mod diagnostic;
pub mod intent;
pub mod message;
pub mod record;

pub use context::{ChatContext, Sentiment};
pub use diagnostic::DiagnosticContext;
pub use intent::{Intent, IntentClassification};
pub use message::{ConversationMessage, MessageRole};
pub use record::{MessageRecord, SessionRecord};

/// Core library version
pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");
