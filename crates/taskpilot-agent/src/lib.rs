//! # taskpilot-agent
//!
//! Orchestration layer for taskpilot:
//! - Keyword action router (pure, no I/O)
//! - Sequential workflow pipeline over the tool registry
//! - Markdown response formatting
//! - Fail-soft output validation
//! - The [`Copilot`] struct tying it all to a conversation

pub mod agent;
pub mod format;
pub mod pipeline;
pub mod prompts;
pub mod router;
pub mod validate;

pub use agent::{Copilot, CopilotResponse};
pub use format::{default_stakeholders, extract_stakeholders, Stakeholder};
pub use pipeline::{IntentAnalysis, Pipeline, StepError, WorkflowState};
pub use router::{extract_project, Action, ActionRequest, Router};
pub use validate::{validate, ValidationReport};
