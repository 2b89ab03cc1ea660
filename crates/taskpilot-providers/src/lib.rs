//! # taskpilot-providers
//!
//! Hosted model provider abstraction for Taskpilot.
//!
//! This crate provides:
//! - Provider trait for abstracting hosted model APIs
//! - Google Gemini implementation (completions and embeddings)
//! - Mock provider and deterministic embedder for demo mode and tests
//! - Provider registry and selection

pub mod google;
pub mod mock;
pub mod registry;
pub mod traits;

pub use google::GoogleProvider;
pub use mock::{hash_embed, HashEmbedder, MockProvider};
pub use registry::ProviderRegistry;
pub use traits::{
    CompletionRequest, CompletionResponse, Embedder, FinishReason, ModelInfo, Provider, Usage,
};
