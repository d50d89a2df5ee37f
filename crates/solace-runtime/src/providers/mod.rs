//! LLM provider implementations.
//!
//! Concrete bindings of the [`crate::LlmProvider`] trait. One binding
//! covers any OpenAI-compatible chat-completions endpoint, which
//! includes common local gateways.

pub mod openai;

pub use openai::{OpenAiCompatProvider, ProviderConfig};
