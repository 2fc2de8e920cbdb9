//! Concrete [`crate::llm::provider::StructuredLlmProvider`] implementations.

pub mod anthropic;
pub mod base;
pub mod fixed;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use base::{HttpProviderClient, OpenAICompatible};
pub use fixed::FixedDecisionProvider;
pub use openai::OpenAiProvider;
