//! Action handlers for the taskpilot copilot.
//!
//! Each handler implements the [`Tool`] trait and is executed through a
//! [`ToolRegistry`]. Handlers take their inputs from the call arguments
//! and return a structured [`ToolResult`](taskpilot_core::ToolResult)
//! payload the formatter can render.

use std::sync::Arc;

use taskpilot_core::{Config, IntegrationError};
use taskpilot_integrations::{CalendarSource, KnowledgeBase, Tracker, Workday};
use taskpilot_providers::Provider;

pub mod calendar;
pub mod email;
pub mod knowledge;
pub mod planner;
pub mod registry;
pub mod status;
pub mod tasks;

pub use calendar::CalendarTool;
pub use email::{parse_email_reply, EmailComposerTool, EmailDraft};
pub use knowledge::KnowledgeSearchTool;
pub use planner::{
    allocate_blocks, create_plan, generate_suggestions, score_task, score_tasks, BlockType,
    PlanPreferences, PlanSummary, PriorityPlan, PriorityPlannerTool, ScheduleEntry, ScoredTask,
};
pub use registry::{Tool, ToolContext, ToolRegistry};
pub use status::{compute_metrics, derive_status, identify_blockers, ProjectStatusTool};
pub use tasks::{apply_filters, sort_tasks, TaskFilters, TaskListTool};

/// Errors from handler lookup and execution.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error(transparent)]
    Integration(#[from] IntegrationError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Execution failed: {0}")]
    Execution(String),
}

impl ToolError {
    pub fn invalid_args(message: impl Into<String>) -> Self {
        Self::InvalidArguments(message.into())
    }

    pub fn missing_param(name: impl Into<String>) -> Self {
        Self::MissingParameter(name.into())
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    /// True when retrying the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Integration(
                IntegrationError::Timeout { .. } | IntegrationError::NetworkError { .. }
            )
        )
    }
}

impl ToolRegistry {
    /// Build a registry with every built-in handler registered, search
    /// limits and working hours taken from `config`.
    pub fn with_builtins(
        tracker: Arc<dyn Tracker>,
        knowledge: Arc<KnowledgeBase>,
        calendar: Arc<dyn CalendarSource>,
        provider: Arc<dyn Provider>,
        config: &Config,
    ) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ProjectStatusTool::new(tracker.clone())));
        registry.register(Arc::new(
            KnowledgeSearchTool::new(knowledge)
                .with_limits(config.knowledge.top_k, config.knowledge.min_query_len),
        ));
        registry.register(Arc::new(EmailComposerTool::new(provider)));
        registry.register(Arc::new(
            CalendarTool::new(calendar).with_workday(Workday::from_config(&config.workday)),
        ));
        registry.register(Arc::new(TaskListTool::new(tracker)));
        registry.register(Arc::new(PriorityPlannerTool));
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskpilot_integrations::{DemoCalendar, DemoTracker};
    use taskpilot_providers::MockProvider;

    #[tokio::test]
    async fn test_with_builtins_registers_all_handlers() {
        let knowledge = KnowledgeBase::with_sample_documents(Arc::new(
            taskpilot_providers::HashEmbedder,
        ))
        .await
        .unwrap();
        let registry = ToolRegistry::with_builtins(
            Arc::new(DemoTracker),
            Arc::new(knowledge),
            Arc::new(DemoCalendar),
            Arc::new(MockProvider::new()),
            &Config::default(),
        );

        for name in [
            "project_status",
            "knowledge_search",
            "compose_email",
            "calendar",
            "tasks",
            "priority_plan",
        ] {
            assert!(registry.contains(name), "missing handler: {name}");
        }
        assert_eq!(registry.len(), 6);
    }

    #[test]
    fn test_transient_errors() {
        let err = ToolError::Integration(IntegrationError::Timeout {
            service: "tracker".to_string(),
            seconds: 30,
        });
        assert!(err.is_transient());
        assert!(!ToolError::NotFound("x".to_string()).is_transient());
    }
}
