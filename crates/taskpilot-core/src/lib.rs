//! # taskpilot-core
//!
//! Core types and abstractions for Taskpilot - the conversational business copilot.
//!
//! This crate provides:
//! - Conversation turn primitives
//! - Tool request/result types
//! - Configuration system
//! - Common error types

pub mod config;
pub mod error;
pub mod message;
pub mod tool;

pub use config::Config;
pub use error::{Error, IntegrationError, Result};
pub use message::{Conversation, Message, Role};
pub use tool::{ToolCall, ToolDefinition, ToolResult};
