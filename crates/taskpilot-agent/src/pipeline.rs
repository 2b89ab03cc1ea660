//! Sequential workflow pipeline.
//!
//! Routed actions run one after another against a mutable
//! [`WorkflowState`]; earlier outputs feed later steps (status feeds the
//! stakeholder search and the email key points, calendar and tasks feed
//! the planner). Step failures are recorded, not fatal, until more than
//! `error_threshold` of them accumulate.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use taskpilot_core::ToolCall;
use taskpilot_tools::{ToolContext, ToolRegistry};

use crate::format::{default_stakeholders, extract_stakeholders, Stakeholder};
use crate::router::{Action, ActionRequest};

/// A recorded step failure.
#[derive(Debug, Clone)]
pub struct StepError {
    pub step: String,
    pub message: String,
}

impl StepError {
    pub fn new(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            message: message.into(),
        }
    }
}

/// Best-effort LLM intent analysis, attached to the state when available.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntentAnalysis {
    #[serde(default)]
    pub intent: String,
    #[serde(default)]
    pub entities: Value,
    #[serde(default)]
    pub required_tools: Vec<String>,
    #[serde(default)]
    pub confidence: f64,
}

impl IntentAnalysis {
    /// Project named by the model's entity extraction, if any.
    pub fn project(&self) -> Option<&str> {
        self.entities
            .get("project")
            .and_then(|p| p.as_str())
            .filter(|p| !p.is_empty())
    }
}

/// Accumulated outputs of a workflow run.
#[derive(Debug, Default)]
pub struct WorkflowState {
    pub project_status: Option<Value>,
    pub stakeholders: Vec<Stakeholder>,
    pub email_draft: Option<Value>,
    pub knowledge: Option<Value>,
    pub calendar: Option<Value>,
    pub tasks: Option<Value>,
    pub plan: Option<Value>,
    pub intent: Option<IntentAnalysis>,
    pub errors: Vec<StepError>,
    pub tools_called: Vec<String>,
}

impl WorkflowState {
    fn project_name(&self) -> &str {
        self.project_status
            .as_ref()
            .and_then(|s| s.get("project_name"))
            .and_then(|n| n.as_str())
            .unwrap_or("Phoenix")
    }
}

/// Runs routed actions through the tool registry.
pub struct Pipeline {
    registry: Arc<ToolRegistry>,
    error_threshold: usize,
}

impl Pipeline {
    pub fn new(registry: Arc<ToolRegistry>, error_threshold: usize) -> Self {
        Self {
            registry,
            error_threshold,
        }
    }

    /// Whether a run accumulated enough failures to short-circuit.
    pub fn exceeded_threshold(&self, state: &WorkflowState) -> bool {
        state.errors.len() > self.error_threshold
    }

    /// Execute the routed actions in order.
    pub async fn run(&self, requests: &[ActionRequest], ctx: &ToolContext) -> WorkflowState {
        let mut state = WorkflowState::default();

        for request in requests {
            if self.exceeded_threshold(&state) {
                warn!(
                    "Stopping workflow early after {} step errors",
                    state.errors.len()
                );
                break;
            }

            match request.action {
                Action::StatusLookup => self.step_status(&mut state, request, ctx).await,
                Action::KnowledgeSearch => self.step_knowledge(&mut state, request, ctx).await,
                Action::EmailCompose => self.step_email(&mut state, request, ctx).await,
                Action::CalendarAction => self.step_calendar(&mut state, request, ctx).await,
                Action::PriorityPlan => self.step_plan(&mut state, ctx).await,
            }
        }

        state
    }

    async fn call(
        &self,
        state: &mut WorkflowState,
        step: &str,
        name: &str,
        arguments: Value,
        ctx: &ToolContext,
    ) -> Option<Value> {
        let call = ToolCall::new(name, arguments);
        state.tools_called.push(name.to_string());

        match self.registry.execute(&call, ctx).await {
            Ok(result) if result.success => {
                info!(tool = name, duration_ms = result.duration_ms, "Step complete");
                Some(result.payload)
            }
            Ok(result) => {
                let message = result.error.unwrap_or_else(|| "unknown error".to_string());
                warn!(tool = name, "Step returned error: {message}");
                state.errors.push(StepError::new(step, message));
                // Error payloads (suggestions, fallback drafts) still render
                Some(result.payload)
            }
            Err(e) => {
                warn!(tool = name, "Step failed: {e}");
                state.errors.push(StepError::new(step, e.to_string()));
                None
            }
        }
    }

    async fn step_status(
        &self,
        state: &mut WorkflowState,
        request: &ActionRequest,
        ctx: &ToolContext,
    ) {
        let project = request
            .arguments
            .get("project")
            .and_then(|p| p.as_str())
            .unwrap_or("Phoenix");

        state.project_status = self
            .call(
                state,
                "status-lookup",
                "project_status",
                json!({"project": project}),
                ctx,
            )
            .await;
    }

    async fn step_knowledge(
        &self,
        state: &mut WorkflowState,
        request: &ActionRequest,
        ctx: &ToolContext,
    ) {
        let query = request
            .arguments
            .get("query")
            .and_then(|q| q.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} stakeholders team members", state.project_name()));

        let mut arguments = json!({"query": query});
        // Only the status workflow narrows the search to one project
        if let Some(project) = request.arguments.get("project") {
            arguments["project"] = project.clone();
        }

        let payload = self
            .call(state, "knowledge-search", "knowledge_search", arguments, ctx)
            .await;

        if let Some(payload) = payload {
            state.stakeholders = extract_stakeholders(&payload);
            state.knowledge = Some(payload);
        }
        if state.stakeholders.is_empty() {
            state.stakeholders = default_stakeholders();
        }
    }

    async fn step_email(
        &self,
        state: &mut WorkflowState,
        request: &ActionRequest,
        ctx: &ToolContext,
    ) {
        let purpose = request
            .arguments
            .get("topic")
            .and_then(|t| t.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Weekly status update for {}", state.project_name()));
        // A standalone topic email has no status to summarize
        let key_points = if state.project_status.is_some()
            || request.arguments.get("topic").is_none()
        {
            build_key_points(state.project_status.as_ref())
        } else {
            Vec::new()
        };

        let tone = match state
            .project_status
            .as_ref()
            .and_then(|s| s.get("status"))
            .and_then(|s| s.as_str())
        {
            Some("at_risk") => "urgent",
            _ => "formal",
        };

        let recipients = state
            .stakeholders
            .iter()
            .take(4)
            .map(|s| format!("{} <{}> (Stakeholder)", s.name, s.email))
            .collect::<Vec<_>>()
            .join(", ");

        let mut arguments = json!({
            "purpose": purpose,
            "key_points": key_points,
            "tone": tone,
        });
        if !recipients.is_empty() {
            arguments["recipients"] = json!(recipients);
        }

        let payload = self
            .call(state, "email-compose", "compose_email", arguments, ctx)
            .await;

        // Both the success payload and the llm_unavailable fallback carry
        // the draft under "draft".
        state.email_draft = payload.and_then(|p| p.get("draft").cloned());
    }

    async fn step_calendar(
        &self,
        state: &mut WorkflowState,
        request: &ActionRequest,
        ctx: &ToolContext,
    ) {
        let date = request
            .arguments
            .get("date")
            .and_then(|d| d.as_str())
            .unwrap_or("today");

        let payload = self
            .call(
                state,
                "calendar-action",
                "calendar",
                json!({"action": "get_events", "date": date}),
                ctx,
            )
            .await;

        // An unreadable calendar degrades to an empty day
        state.calendar = Some(payload.unwrap_or_else(|| {
            json!({"events": [], "free_blocks": [], "total_meeting_minutes": 0})
        }));
    }

    async fn step_plan(&self, state: &mut WorkflowState, ctx: &ToolContext) {
        let tasks_payload = self
            .call(
                state,
                "task-list",
                "tasks",
                json!({
                    "filters": {"status": ["todo", "in_progress", "blocked"]},
                    "sort_by": "due_date",
                }),
                ctx,
            )
            .await
            .unwrap_or_else(|| json!({"tasks": [], "total_count": 0}));

        let tasks = tasks_payload.get("tasks").cloned().unwrap_or(json!([]));
        state.tasks = Some(tasks_payload);

        let calendar = state.calendar.clone().unwrap_or(json!({}));
        let events = calendar.get("events").cloned().unwrap_or(json!([]));
        let free_blocks = calendar.get("free_blocks").cloned().unwrap_or(json!([]));

        state.plan = self
            .call(
                state,
                "priority-plan",
                "priority_plan",
                json!({
                    "tasks": tasks,
                    "calendar_events": events,
                    "free_blocks": free_blocks,
                    "preferences": {"morning_focus": true},
                }),
                ctx,
            )
            .await;
    }
}

/// Turn a status payload into email key points.
fn build_key_points(status: Option<&Value>) -> Vec<String> {
    let Some(status) = status.filter(|s| s.get("kind").is_none()) else {
        return vec!["Project status could not be retrieved".to_string()];
    };

    let mut points = Vec::new();

    let completion = status["completion_percentage"].as_f64().unwrap_or(0.0);
    let completed = status["metrics"]["completed"].as_u64().unwrap_or(0);
    let total = status["metrics"]["total"].as_u64().unwrap_or(0);
    points.push(format!(
        "Project is {completion}% complete ({completed} of {total} tasks done)"
    ));

    let overall = status["status"].as_str().unwrap_or("unknown").replace('_', " ");
    points.push(format!("Status: {overall}"));

    if let Some(blockers) = status.get("blockers").and_then(|b| b.as_array()) {
        if !blockers.is_empty() {
            points.push(format!("{} blocking issues identified", blockers.len()));
            for blocker in blockers.iter().take(3) {
                points.push(format!(
                    "{} blocker: {} (owner: {})",
                    blocker["severity"].as_str().unwrap_or("medium"),
                    blocker["task_title"].as_str().unwrap_or("Unknown"),
                    blocker["owner"].as_str().unwrap_or("Unassigned"),
                ));
            }
        }
    }

    if let Some(sprint) = status.get("sprint").filter(|s| !s.is_null()) {
        points.push(format!(
            "Sprint {}: in progress",
            sprint["name"].as_str().unwrap_or("current")
        ));
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use taskpilot_integrations::{DemoCalendar, DemoTracker, KnowledgeBase};
    use taskpilot_providers::{HashEmbedder, MockProvider};

    use crate::router::Router;

    async fn demo_pipeline() -> Pipeline {
        let knowledge = KnowledgeBase::with_sample_documents(Arc::new(HashEmbedder))
            .await
            .unwrap();
        let registry = ToolRegistry::with_builtins(
            Arc::new(DemoTracker),
            Arc::new(knowledge),
            Arc::new(DemoCalendar),
            Arc::new(MockProvider::new()),
            &taskpilot_core::Config::default(),
        );
        Pipeline::new(Arc::new(registry), 2)
    }

    #[tokio::test]
    async fn test_status_email_workflow_populates_state() {
        let pipeline = demo_pipeline().await;
        let requests = Router::route("Get the Phoenix status and draft an update email");
        let ctx = ToolContext::default();

        let state = pipeline.run(&requests, &ctx).await;

        let status = state.project_status.as_ref().unwrap();
        assert_eq!(status["project_name"], "Phoenix");
        assert!(!state.stakeholders.is_empty());
        assert!(state.email_draft.is_some());
        assert_eq!(
            state.tools_called,
            vec!["project_status", "knowledge_search", "compose_email"]
        );
    }

    #[tokio::test]
    async fn test_plan_workflow_feeds_calendar_into_planner() {
        let pipeline = demo_pipeline().await;
        let requests = Router::route("plan my day");
        let ctx = ToolContext::default();

        let state = pipeline.run(&requests, &ctx).await;

        assert!(state.calendar.is_some());
        assert!(state.tasks.is_some());
        let plan = state.plan.as_ref().unwrap();
        assert_eq!(plan["summary"]["total_tasks"], 6);
    }

    #[tokio::test]
    async fn test_unknown_project_records_error_but_keeps_payload() {
        let pipeline = demo_pipeline().await;
        let requests = Router::route("get Zephyr status");
        let ctx = ToolContext::default();

        let state = pipeline.run(&requests, &ctx).await;

        assert_eq!(state.errors.len(), 1);
        let status = state.project_status.as_ref().unwrap();
        assert_eq!(status["kind"], "project_not_found");
        assert!(!pipeline.exceeded_threshold(&state));
    }

    #[tokio::test]
    async fn test_error_threshold_short_circuits_run() {
        // No handlers registered, so every step fails.
        let pipeline = Pipeline::new(Arc::new(ToolRegistry::new()), 2);
        let requests: Vec<ActionRequest> = (0..4)
            .map(|_| ActionRequest {
                action: Action::StatusLookup,
                arguments: json!({"project": "Phoenix"}),
            })
            .collect();

        let state = pipeline.run(&requests, &ToolContext::default()).await;

        // The fourth request never runs.
        assert_eq!(state.errors.len(), 3);
        assert_eq!(state.tools_called.len(), 3);
        assert!(pipeline.exceeded_threshold(&state));

        let reply = crate::format::render_errors(&state.errors);
        assert!(reply.contains("- status-lookup: Tool not found"));
        assert!(reply.contains("try again"));
    }

    #[tokio::test]
    async fn test_plan_step_failures_name_their_steps() {
        let pipeline = Pipeline::new(Arc::new(ToolRegistry::new()), 2);
        let requests = Router::route("plan my day");

        let state = pipeline.run(&requests, &ToolContext::default()).await;

        let steps: Vec<&str> = state.errors.iter().map(|e| e.step.as_str()).collect();
        assert_eq!(steps, vec!["calendar-action", "task-list", "priority-plan"]);
    }

    #[test]
    fn test_key_points_from_status_payload() {
        let status = json!({
            "completion_percentage": 16.7,
            "status": "at_risk",
            "metrics": {"completed": 1, "total": 6},
            "blockers": [
                {"severity": "critical", "task_title": "Fix payment gateway", "owner": "John Doe"}
            ],
            "sprint": {"name": "Phoenix Sprint 14"}
        });

        let points = build_key_points(Some(&status));
        assert_eq!(points[0], "Project is 16.7% complete (1 of 6 tasks done)");
        assert_eq!(points[1], "Status: at risk");
        assert!(points[2].contains("1 blocking issues"));
        assert!(points[3].contains("critical blocker: Fix payment gateway"));
        assert!(points.last().unwrap().contains("Phoenix Sprint 14"));
    }

    #[test]
    fn test_key_points_for_missing_status() {
        let points = build_key_points(None);
        assert_eq!(points, vec!["Project status could not be retrieved"]);
    }
}
