//! Task list handler: open tasks with filters and sorting.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{info, instrument};

use taskpilot_core::{ToolCall, ToolDefinition, ToolResult};
use taskpilot_integrations::{Tracker, TrackerTask};

use crate::registry::{Tool, ToolContext};
use crate::ToolError;

/// Filters applied to a task query.
#[derive(Debug, Default, Clone)]
pub struct TaskFilters {
    /// Accepted statuses; empty means any
    pub status: Vec<String>,
    pub priority: Option<String>,
    pub project: Option<String>,
    pub due_before: Option<NaiveDate>,
}

impl TaskFilters {
    fn from_arguments(arguments: &serde_json::Value) -> Self {
        let filters = arguments.get("filters").unwrap_or(arguments);
        let status = match filters.get("status") {
            Some(serde_json::Value::String(s)) => vec![s.clone()],
            Some(serde_json::Value::Array(values)) => values
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };
        Self {
            status,
            priority: filters
                .get("priority")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            project: filters
                .get("project")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            due_before: filters
                .get("due_before")
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse().ok()),
        }
    }
}

/// Apply filters to a task list.
pub fn apply_filters(tasks: Vec<TrackerTask>, filters: &TaskFilters) -> Vec<TrackerTask> {
    tasks
        .into_iter()
        .filter(|t| {
            filters.status.is_empty() || filters.status.iter().any(|s| t.status.as_str() == s)
        })
        .filter(|t| {
            filters
                .priority
                .as_deref()
                .map(|p| t.priority.as_str() == p)
                .unwrap_or(true)
        })
        .filter(|t| {
            filters
                .project
                .as_deref()
                .map(|p| t.project.eq_ignore_ascii_case(p))
                .unwrap_or(true)
        })
        .filter(|t| match (filters.due_before, t.due_date) {
            (Some(cutoff), Some(due)) => due <= cutoff,
            (Some(_), None) => false,
            (None, _) => true,
        })
        .collect()
}

/// Sort a task list by the given field.
pub fn sort_tasks(mut tasks: Vec<TrackerTask>, sort_by: &str) -> Vec<TrackerTask> {
    match sort_by {
        "priority" => tasks.sort_by_key(|t| t.priority.rank()),
        "created_date" => tasks.sort_by_key(|t| t.created_date),
        // due_date is the default; tasks without one sort last
        _ => tasks.sort_by_key(|t| t.due_date.unwrap_or(NaiveDate::MAX)),
    }
    tasks
}

/// Handler for the supplementary `tasks` action.
pub struct TaskListTool {
    tracker: Arc<dyn Tracker>,
}

impl TaskListTool {
    pub fn new(tracker: Arc<dyn Tracker>) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl Tool for TaskListTool {
    fn name(&self) -> &str {
        "tasks"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("tasks", "Query open tasks with filters and sorting")
            .with_parameters(serde_json::json!({
                "type": "object",
                "properties": {
                    "filters": {
                        "type": "object",
                        "properties": {
                            "status": { "description": "Status name or list of names" },
                            "priority": { "type": "string" },
                            "project": { "type": "string" },
                            "due_before": { "type": "string" }
                        }
                    },
                    "sort_by": {
                        "type": "string",
                        "enum": ["due_date", "priority", "created_date"]
                    }
                }
            }))
    }

    #[instrument(skip(self, call, ctx), fields(tool = self.name()))]
    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let filters = TaskFilters::from_arguments(&call.arguments);
        let sort_by = call.str_arg("sort_by").unwrap_or("due_date");

        info!("Querying open tasks for {}", ctx.user_email);

        let tasks = self.tracker.open_tasks(Some(&ctx.user_email)).await?;
        let tasks = sort_tasks(apply_filters(tasks, &filters), sort_by);

        Ok(ToolResult::success(
            &call.id,
            serde_json::json!({
                "total_count": tasks.len(),
                "tasks": tasks,
                "sort_by": sort_by,
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskpilot_integrations::DemoTracker;

    fn sample() -> Vec<TrackerTask> {
        DemoTracker::sample_tasks("john.doe@company.com")
    }

    #[test]
    fn test_filter_by_project() {
        let filters = TaskFilters {
            project: Some("Atlas".to_string()),
            ..Default::default()
        };
        let tasks = apply_filters(sample(), &filters);
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().all(|t| t.project == "Atlas"));
    }

    #[test]
    fn test_filter_by_status_and_priority() {
        let filters = TaskFilters {
            status: vec!["todo".to_string()],
            priority: Some("high".to_string()),
            ..Default::default()
        };
        let tasks = apply_filters(sample(), &filters);
        assert_eq!(tasks.len(), 2);
    }

    #[test]
    fn test_filter_due_before() {
        let today = chrono::Local::now().date_naive();
        let filters = TaskFilters {
            due_before: Some(today + chrono::Duration::days(1)),
            ..Default::default()
        };
        let tasks = apply_filters(sample(), &filters);
        // PHOE-178 (today) and PHOE-145 (tomorrow)
        assert_eq!(tasks.len(), 2);
    }

    #[test]
    fn test_sort_by_priority() {
        let tasks = sort_tasks(sample(), "priority");
        assert_eq!(tasks[0].id, "PHOE-145"); // critical first
        assert_eq!(tasks.last().unwrap().id, "PHOE-201"); // low last
    }

    #[test]
    fn test_sort_by_due_date_default() {
        let tasks = sort_tasks(sample(), "due_date");
        assert_eq!(tasks[0].id, "PHOE-178"); // due today
    }

    #[tokio::test]
    async fn test_execute_returns_all_tasks() {
        let tool = TaskListTool::new(Arc::new(DemoTracker));
        let call = ToolCall::new("tasks", serde_json::json!({}));
        let result = tool.execute(&call, &ToolContext::default()).await.unwrap();

        assert!(result.success);
        assert_eq!(result.payload["total_count"], 6);
    }
}
