//! Project status handler: tracker lookup plus derived health metrics.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument};

use taskpilot_core::{ToolCall, ToolDefinition, ToolResult};
use taskpilot_integrations::{
    Blocker, OverallStatus, Priority, ProjectStatus, Severity, StoryPoints, TaskMetrics,
    TaskStatus, Tracker, TrackerTask,
};

use crate::registry::{Tool, ToolContext};
use crate::ToolError;

/// Compute aggregate task metrics for a project.
pub fn compute_metrics(tasks: &[TrackerTask]) -> TaskMetrics {
    let total = tasks.len();
    if total == 0 {
        return TaskMetrics::default();
    }

    let completed = tasks.iter().filter(|t| t.status == TaskStatus::Done).count();
    let in_progress = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::InProgress && !t.is_blocked())
        .count();
    let blocked = tasks.iter().filter(|t| t.is_blocked()).count();
    let todo = total.saturating_sub(completed + in_progress + blocked);

    let total_points: u32 = tasks.iter().filter_map(|t| t.story_points).sum();
    let completed_points: u32 = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Done)
        .filter_map(|t| t.story_points)
        .sum();

    TaskMetrics {
        total,
        completed,
        in_progress,
        blocked,
        todo,
        completion_percentage: (completed as f64 / total as f64 * 1000.0).round() / 10.0,
        story_points: StoryPoints {
            total: total_points,
            completed: completed_points,
            remaining: total_points - completed_points,
        },
    }
}

/// Collect blocked tasks, most severe first.
pub fn identify_blockers(tasks: &[TrackerTask]) -> Vec<Blocker> {
    let mut blockers: Vec<Blocker> = tasks
        .iter()
        .filter(|t| t.is_blocked())
        .map(|t| Blocker {
            task_id: t.id.clone(),
            task_title: t.title.clone(),
            reason: t
                .blocker_reason
                .clone()
                .unwrap_or_else(|| "No reason specified".to_string()),
            owner: t.assignee.clone().unwrap_or_else(|| "Unassigned".to_string()),
            severity: blocker_severity(t.priority),
        })
        .collect();

    blockers.sort_by_key(|b| b.severity.rank());
    blockers
}

fn blocker_severity(priority: Priority) -> Severity {
    match priority {
        Priority::Critical => Severity::Critical,
        Priority::High => Severity::High,
        Priority::Medium => Severity::Medium,
        Priority::Low => Severity::Low,
    }
}

/// Derive overall project health from metrics and blockers.
pub fn derive_status(metrics: &TaskMetrics, blockers: &[Blocker]) -> OverallStatus {
    if metrics.total == 0 {
        return OverallStatus::Unknown;
    }

    let critical = blockers
        .iter()
        .filter(|b| b.severity == Severity::Critical)
        .count();

    if critical > 0 || blockers.len() >= 3 {
        OverallStatus::AtRisk
    } else if metrics.completion_percentage >= 90.0 {
        OverallStatus::OnTrack
    } else if metrics.completion_percentage >= 70.0 && blockers.is_empty() {
        OverallStatus::OnTrack
    } else if !blockers.is_empty() {
        OverallStatus::AtRisk
    } else {
        OverallStatus::OnTrack
    }
}

/// Handler for the `status-lookup` action.
pub struct ProjectStatusTool {
    tracker: Arc<dyn Tracker>,
}

impl ProjectStatusTool {
    pub fn new(tracker: Arc<dyn Tracker>) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl Tool for ProjectStatusTool {
    fn name(&self) -> &str {
        "project_status"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "project_status",
            "Retrieve current project status, metrics, tasks, and blockers from the tracker",
        )
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "project": {
                    "type": "string",
                    "description": "Project name, key, or ID"
                }
            },
            "required": ["project"]
        }))
    }

    fn validate(&self, arguments: &serde_json::Value) -> Result<(), ToolError> {
        match arguments.get("project").and_then(|v| v.as_str()) {
            Some(p) if !p.trim().is_empty() => Ok(()),
            _ => Err(ToolError::missing_param("project")),
        }
    }

    #[instrument(skip(self, call, _ctx), fields(tool = self.name()))]
    async fn execute(&self, call: &ToolCall, _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let identifier = call
            .str_arg("project")
            .ok_or_else(|| ToolError::missing_param("project"))?;

        info!("Fetching status for project: {identifier}");

        let Some(project) = self.tracker.find_project(identifier).await? else {
            let suggestions = self.tracker.project_suggestions(identifier).await;
            return Ok(ToolResult::error_with_payload(
                &call.id,
                format!("Project '{identifier}' not found"),
                serde_json::json!({
                    "kind": "project_not_found",
                    "suggestions": suggestions,
                }),
            ));
        };

        let sprint = self.tracker.active_sprint(&project.key).await?;
        let tasks = self
            .tracker
            .project_tasks(&project.key, sprint.as_ref().map(|s| s.id))
            .await?;

        let metrics = compute_metrics(&tasks);
        let blockers = identify_blockers(&tasks);
        let status = derive_status(&metrics, &blockers);

        let summary = ProjectStatus {
            project_name: project.name,
            project_key: project.key,
            status,
            completion_percentage: metrics.completion_percentage,
            sprint,
            metrics,
            blockers,
            tasks,
        };

        Ok(ToolResult::success(&call.id, serde_json::to_value(summary)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskpilot_integrations::DemoTracker;

    fn sample_tasks() -> Vec<TrackerTask> {
        DemoTracker::sample_tasks("john.doe@company.com")
    }

    #[test]
    fn test_compute_metrics_counts() {
        let metrics = compute_metrics(&sample_tasks());
        assert_eq!(metrics.total, 6);
        assert_eq!(metrics.completed, 0);
        assert_eq!(metrics.blocked, 1);
        assert_eq!(metrics.in_progress, 1);
        assert_eq!(metrics.todo, 4);
        assert_eq!(metrics.completion_percentage, 0.0);
        assert_eq!(metrics.story_points.total, 23);
    }

    #[test]
    fn test_empty_task_list_is_unknown() {
        let metrics = compute_metrics(&[]);
        assert_eq!(derive_status(&metrics, &[]), OverallStatus::Unknown);
    }

    #[test]
    fn test_critical_blocker_puts_project_at_risk() {
        let tasks = sample_tasks();
        let metrics = compute_metrics(&tasks);
        let blockers = identify_blockers(&tasks);
        assert_eq!(blockers.len(), 1);
        assert_eq!(blockers[0].severity, Severity::Critical);
        assert_eq!(derive_status(&metrics, &blockers), OverallStatus::AtRisk);
    }

    #[test]
    fn test_high_completion_without_blockers_is_on_track() {
        let mut tasks = sample_tasks();
        for task in &mut tasks {
            task.status = TaskStatus::Done;
            task.blocked = false;
            task.labels.retain(|l| l != "blocker");
        }
        let metrics = compute_metrics(&tasks);
        let blockers = identify_blockers(&tasks);
        assert_eq!(metrics.completion_percentage, 100.0);
        assert_eq!(derive_status(&metrics, &blockers), OverallStatus::OnTrack);
    }

    #[tokio::test]
    async fn test_unknown_project_returns_suggestions_payload() {
        let tool = ProjectStatusTool::new(Arc::new(DemoTracker));
        let call = ToolCall::new("project_status", serde_json::json!({ "project": "Phoenx" }));
        let result = tool.execute(&call, &ToolContext::default()).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.payload["kind"], "project_not_found");
        // "Phoenx" fuzzy-matches nothing, suggestions list may be empty
        assert!(result.payload["suggestions"].is_array());
    }

    #[tokio::test]
    async fn test_demo_phoenix_status_is_at_risk() {
        let tool = ProjectStatusTool::new(Arc::new(DemoTracker));
        let call = ToolCall::new("project_status", serde_json::json!({ "project": "Phoenix" }));
        let result = tool.execute(&call, &ToolContext::default()).await.unwrap();

        assert!(result.success);
        assert_eq!(result.payload["project_key"], "PHOE");
        assert_eq!(result.payload["status"], "at_risk");
        assert_eq!(result.payload["sprint"]["name"], "Phoenix Sprint 14");
    }

    #[test]
    fn test_missing_project_argument_fails_validation() {
        let tool = ProjectStatusTool::new(Arc::new(DemoTracker));
        assert!(tool.validate(&serde_json::json!({})).is_err());
        assert!(tool.validate(&serde_json::json!({ "project": " " })).is_err());
        assert!(tool.validate(&serde_json::json!({ "project": "Phoenix" })).is_ok());
    }
}
