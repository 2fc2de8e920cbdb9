//! LLM provider adapters producing [`crate::decision::Decision`].
//!
//! Every provider call returns a single structured contract: a validated
//! [`Decision`](crate::decision::Decision), never raw free-text.

pub mod provider;
pub mod providers;

pub use provider::{ProviderConfig, ProviderType, StructuredLlmProvider};
