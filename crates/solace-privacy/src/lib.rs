//! Solace outbound-text sanitization.
//!
//! Detects and replaces sensitive substrings before any text leaves the
//! device: numeric health metrics, date/time references, named fitness
//! apps, named wearable devices, and place names. In strict mode,
//! higher-severity identifiers (email addresses, phone numbers) abort
//! the call instead of being rewritten.
//!
//! Detection is best-effort pattern matching, not certified
//! de-identification; the patterns trade a documented false-positive
//! rate for coverage.

pub mod error;
mod patterns;
pub mod sanitizer;

pub use error::{PrivacyError, PrivacyResult};
pub use patterns::contains_sensitive;
pub use sanitizer::{SanitizationResult, Sanitizer, SanitizerConfig};
