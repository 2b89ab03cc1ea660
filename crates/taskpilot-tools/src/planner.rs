//! Priority planner: score tasks, allocate free blocks, suggest next steps.
//!
//! Pure computation over tasks, calendar events, and free blocks. The
//! scoring model weighs urgency 0.40, impact 0.30, deadline proximity
//! 0.20, and context 0.10.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use taskpilot_core::{ToolCall, ToolDefinition, ToolResult};
use taskpilot_integrations::{CalendarEvent, FreeBlock, Priority, TaskStatus, TrackerTask};

use crate::registry::{Tool, ToolContext};
use crate::ToolError;

/// Score above which a task counts as high priority.
const HIGH_PRIORITY_THRESHOLD: f64 = 80.0;

/// Blocks shorter than this are not worth scheduling into.
const MIN_SCHEDULABLE_MINUTES: i64 = 30;

/// Blocks at least this long qualify as deep work.
const DEEP_WORK_MINUTES: i64 = 90;

/// A task with its computed priority score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredTask {
    #[serde(flatten)]
    pub task: TrackerTask,
    pub priority_score: f64,
    pub urgency: f64,
    pub impact: f64,
    pub deadline_score: f64,
    pub context: f64,
}

/// Kind of scheduled block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    DeepWork,
    FocusedTask,
}

/// A task placed into a free block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub task_id: String,
    pub task_title: String,
    pub priority_score: f64,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_minutes: i64,
    pub block_type: BlockType,
}

/// Plan-level counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSummary {
    pub total_tasks: usize,
    pub high_priority_count: usize,
    pub scheduled_tasks: usize,
    pub total_meeting_minutes: i64,
    pub total_free_minutes: i64,
}

/// A complete prioritized daily plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityPlan {
    pub prioritized_tasks: Vec<ScoredTask>,
    pub schedule: Vec<ScheduleEntry>,
    pub suggestions: Vec<String>,
    pub summary: PlanSummary,
}

/// Planning preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanPreferences {
    /// Put high-priority work into morning blocks
    pub morning_focus: bool,
}

impl Default for PlanPreferences {
    fn default() -> Self {
        Self { morning_focus: true }
    }
}

/// Score a single task (0-100 per component).
pub fn score_task(task: &TrackerTask, today: NaiveDate) -> ScoredTask {
    let urgency = calculate_urgency(task);
    let impact = calculate_impact(task);
    let deadline_score = calculate_deadline_score(task, today);
    let context = calculate_context(task);

    let priority_score =
        urgency * 0.40 + impact * 0.30 + deadline_score * 0.20 + context * 0.10;

    ScoredTask {
        task: task.clone(),
        priority_score: (priority_score * 10.0).round() / 10.0,
        urgency,
        impact,
        deadline_score,
        context,
    }
}

fn calculate_urgency(task: &TrackerTask) -> f64 {
    let mut score: f64 = match task.priority {
        Priority::Critical => 100.0,
        Priority::High => 75.0,
        Priority::Medium => 50.0,
        Priority::Low => 25.0,
    };

    if task.is_blocked() {
        score += 15.0;
    }
    if task.labels.iter().any(|l| l == "critical-path") {
        score += 10.0;
    }

    score.min(100.0)
}

fn calculate_impact(task: &TrackerTask) -> f64 {
    let mut score: f64 = 50.0;

    // Main project carries more weight
    if task.project == "Phoenix" {
        score += 20.0;
    }

    match task.story_points.unwrap_or(0) {
        p if p >= 5 => score += 15.0,
        p if p >= 3 => score += 10.0,
        _ => {}
    }

    if task.labels.iter().any(|l| l == "blocker") {
        score += 20.0;
    }
    if task.labels.iter().any(|l| l == "external-dependency") {
        score += 10.0;
    }

    score.min(100.0)
}

fn calculate_deadline_score(task: &TrackerTask, today: NaiveDate) -> f64 {
    let Some(due) = task.due_date else {
        return 50.0;
    };

    let days_until_due = (due - today).num_days();
    match days_until_due {
        d if d <= 0 => 100.0,
        1 => 90.0,
        2..=3 => 75.0,
        4..=7 => 60.0,
        d => (100.0 - d as f64 * 3.0).max(30.0),
    }
}

fn calculate_context(task: &TrackerTask) -> f64 {
    let mut score: f64 = 50.0;

    // Momentum: keep going on started work
    if task.status == TaskStatus::InProgress {
        score += 30.0;
    }
    if task.is_blocked() {
        score += 20.0;
    }

    score.min(100.0)
}

/// Score all tasks and sort them best first.
pub fn score_tasks(tasks: &[TrackerTask], today: NaiveDate) -> Vec<ScoredTask> {
    let mut scored: Vec<ScoredTask> = tasks.iter().map(|t| score_task(t, today)).collect();
    scored.sort_by(|a, b| {
        b.priority_score
            .partial_cmp(&a.priority_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored
}

/// Allocate scored tasks into free blocks, longest blocks first.
pub fn allocate_blocks(
    tasks: &[ScoredTask],
    free_blocks: &[FreeBlock],
    preferences: &PlanPreferences,
) -> Vec<ScheduleEntry> {
    let mut sorted_blocks: Vec<&FreeBlock> = free_blocks.iter().collect();
    sorted_blocks.sort_by(|a, b| b.duration_minutes.cmp(&a.duration_minutes));

    let mut schedule = Vec::new();
    let mut allocated: Vec<&str> = Vec::new();

    for block in sorted_blocks {
        if block.duration_minutes < MIN_SCHEDULABLE_MINUTES {
            continue;
        }

        let is_morning = block.start.hour() < 12;

        for scored in tasks {
            if allocated.contains(&scored.task.id.as_str()) {
                continue;
            }

            let task_minutes = (scored.task.estimated_hours.unwrap_or(1.0) * 60.0) as i64;
            if task_minutes > block.duration_minutes {
                continue;
            }

            // Morning blocks are reserved for high-priority work when the
            // preference is set.
            let morning_reserved = preferences.morning_focus && is_morning;
            if morning_reserved && scored.priority_score < HIGH_PRIORITY_THRESHOLD {
                continue;
            }

            let block_type = if morning_reserved && block.duration_minutes >= DEEP_WORK_MINUTES {
                BlockType::DeepWork
            } else {
                BlockType::FocusedTask
            };

            schedule.push(ScheduleEntry {
                task_id: scored.task.id.clone(),
                task_title: scored.task.title.clone(),
                priority_score: scored.priority_score,
                start: block.start,
                end: block.start + Duration::minutes(task_minutes),
                duration_minutes: task_minutes,
                block_type,
            });
            allocated.push(&scored.task.id);
            break;
        }
    }

    schedule
}

/// Generate proactive suggestions from the plan inputs.
pub fn generate_suggestions(
    tasks: &[ScoredTask],
    events: &[CalendarEvent],
    schedule: &[ScheduleEntry],
    today: NaiveDate,
) -> Vec<String> {
    let mut suggestions = Vec::new();

    let critical_blocked = tasks
        .iter()
        .filter(|t| t.task.is_blocked() && t.task.priority == Priority::Critical)
        .count();
    if critical_blocked > 0 {
        suggestions.push(format!(
            "CRITICAL: {critical_blocked} blocked task(s) need immediate escalation"
        ));
    }

    let due_today = tasks
        .iter()
        .filter(|t| t.task.due_date == Some(today))
        .count();
    if due_today > 0 {
        suggestions.push(format!(
            "{due_today} task(s) due today - prioritize completion"
        ));
    }

    let meeting_minutes: i64 = events.iter().map(|e| e.duration_minutes).sum();
    if meeting_minutes > 180 {
        suggestions.push(format!(
            "Heavy meeting day ({}h {}m) - consider rescheduling non-critical meetings for focus time",
            meeting_minutes / 60,
            meeting_minutes % 60
        ));
    }

    let unscheduled_high_priority = tasks
        .iter()
        .filter(|t| t.priority_score >= HIGH_PRIORITY_THRESHOLD)
        .filter(|t| !schedule.iter().any(|s| s.task_id == t.task.id))
        .count();
    if unscheduled_high_priority > 0 {
        suggestions.push(format!(
            "{unscheduled_high_priority} high-priority task(s) not scheduled - may need to defer lower-priority work"
        ));
    }

    suggestions
}

/// Build the full plan.
pub fn create_plan(
    tasks: &[TrackerTask],
    events: &[CalendarEvent],
    free_blocks: &[FreeBlock],
    preferences: &PlanPreferences,
    today: NaiveDate,
) -> PriorityPlan {
    let scored = score_tasks(tasks, today);
    let schedule = allocate_blocks(&scored, free_blocks, preferences);
    let suggestions = generate_suggestions(&scored, events, &schedule, today);

    let summary = PlanSummary {
        total_tasks: tasks.len(),
        high_priority_count: scored
            .iter()
            .filter(|t| t.priority_score >= HIGH_PRIORITY_THRESHOLD)
            .count(),
        scheduled_tasks: schedule.len(),
        total_meeting_minutes: events.iter().map(|e| e.duration_minutes).sum(),
        total_free_minutes: free_blocks.iter().map(|b| b.duration_minutes).sum(),
    };

    let mut prioritized_tasks = scored;
    prioritized_tasks.truncate(10);

    PriorityPlan {
        prioritized_tasks,
        schedule,
        suggestions,
        summary,
    }
}

/// Handler for the `priority-plan` action.
///
/// Inputs arrive in the call arguments; the pipeline feeds them from the
/// earlier calendar and task steps.
pub struct PriorityPlannerTool;

#[async_trait]
impl Tool for PriorityPlannerTool {
    fn name(&self) -> &str {
        "priority_plan"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "priority_plan",
            "Create a prioritized daily plan with time blocking",
        )
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "tasks": { "type": "array" },
                "calendar_events": { "type": "array" },
                "free_blocks": { "type": "array" },
                "preferences": { "type": "object" }
            },
            "required": ["tasks"]
        }))
    }

    #[instrument(skip(self, call, ctx), fields(tool = self.name()))]
    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let tasks: Vec<TrackerTask> = parse_array(&call.arguments, "tasks")?;
        let events: Vec<CalendarEvent> =
            parse_array(&call.arguments, "calendar_events").unwrap_or_default();
        let free_blocks: Vec<FreeBlock> =
            parse_array(&call.arguments, "free_blocks").unwrap_or_default();
        let preferences: PlanPreferences = call
            .arguments
            .get("preferences")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        info!("Creating priority plan for {} tasks", tasks.len());

        let plan = create_plan(&tasks, &events, &free_blocks, &preferences, ctx.today);
        Ok(ToolResult::success(&call.id, serde_json::to_value(plan)?))
    }
}

fn parse_array<T: serde::de::DeserializeOwned>(
    arguments: &serde_json::Value,
    key: &str,
) -> Result<Vec<T>, ToolError> {
    let value = arguments
        .get(key)
        .cloned()
        .ok_or_else(|| ToolError::missing_param(key))?;
    serde_json::from_value(value)
        .map_err(|e| ToolError::invalid_args(format!("bad '{key}' array: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use taskpilot_integrations::DemoTracker;

    fn today() -> NaiveDate {
        chrono::Local::now().date_naive()
    }

    fn sample_tasks() -> Vec<TrackerTask> {
        DemoTracker::sample_tasks("john.doe@company.com")
    }

    fn block(date: NaiveDate, start: (u32, u32), minutes: i64) -> FreeBlock {
        let start = date.and_time(NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap());
        FreeBlock {
            start,
            end: start + Duration::minutes(minutes),
            duration_minutes: minutes,
        }
    }

    #[test]
    fn test_blocked_critical_task_scores_highest() {
        let scored = score_tasks(&sample_tasks(), today());
        assert_eq!(scored[0].task.id, "PHOE-145");
        assert!(scored[0].priority_score > 90.0);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let a = score_tasks(&sample_tasks(), today());
        let b = score_tasks(&sample_tasks(), today());
        let scores_a: Vec<f64> = a.iter().map(|t| t.priority_score).collect();
        let scores_b: Vec<f64> = b.iter().map(|t| t.priority_score).collect();
        assert_eq!(scores_a, scores_b);
    }

    #[test]
    fn test_deadline_score_brackets() {
        let mut task = sample_tasks().remove(0);
        let today = today();

        task.due_date = Some(today - Duration::days(2));
        assert_eq!(calculate_deadline_score(&task, today), 100.0); // overdue
        task.due_date = Some(today + Duration::days(1));
        assert_eq!(calculate_deadline_score(&task, today), 90.0);
        task.due_date = Some(today + Duration::days(3));
        assert_eq!(calculate_deadline_score(&task, today), 75.0);
        task.due_date = Some(today + Duration::days(7));
        assert_eq!(calculate_deadline_score(&task, today), 60.0);
        task.due_date = None;
        assert_eq!(calculate_deadline_score(&task, today), 50.0);
    }

    #[test]
    fn test_allocation_skips_short_blocks() {
        let date = today();
        let scored = score_tasks(&sample_tasks(), date);
        let blocks = vec![block(date, (13, 0), 20)];
        let schedule = allocate_blocks(&scored, &blocks, &PlanPreferences::default());
        assert!(schedule.is_empty());
    }

    #[test]
    fn test_morning_blocks_reserved_for_high_priority() {
        let date = today();
        let mut tasks = sample_tasks();
        // Keep only a low-priority task
        tasks.retain(|t| t.id == "PHOE-201");
        let scored = score_tasks(&tasks, date);
        assert!(scored[0].priority_score < HIGH_PRIORITY_THRESHOLD);

        let morning = vec![block(date, (9, 30), 240)];
        let schedule = allocate_blocks(&scored, &morning, &PlanPreferences::default());
        assert!(schedule.is_empty());

        // Without the preference the same block gets used
        let schedule = allocate_blocks(
            &scored,
            &morning,
            &PlanPreferences { morning_focus: false },
        );
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].block_type, BlockType::FocusedTask);
    }

    #[test]
    fn test_long_morning_block_is_deep_work() {
        let date = today();
        let scored = score_tasks(&sample_tasks(), date);
        let blocks = vec![block(date, (9, 15), 285)];
        let schedule = allocate_blocks(&scored, &blocks, &PlanPreferences::default());

        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].task_id, "PHOE-145");
        assert_eq!(schedule[0].block_type, BlockType::DeepWork);
    }

    #[test]
    fn test_suggestions_cover_blockers_and_meeting_load() {
        let date = today();
        let scored = score_tasks(&sample_tasks(), date);
        let long_meeting = CalendarEvent {
            id: "evt_x".to_string(),
            title: "All-day workshop".to_string(),
            start: date.and_time(NaiveTime::from_hms_opt(9, 0, 0).unwrap()),
            end: date.and_time(NaiveTime::from_hms_opt(13, 0, 0).unwrap()),
            duration_minutes: 240,
            attendees: vec![],
        };

        let suggestions = generate_suggestions(&scored, &[long_meeting], &[], date);
        assert!(suggestions.iter().any(|s| s.contains("CRITICAL")));
        assert!(suggestions.iter().any(|s| s.contains("due today")));
        assert!(suggestions.iter().any(|s| s.contains("Heavy meeting day")));
        assert!(suggestions.iter().any(|s| s.contains("not scheduled")));
    }

    #[tokio::test]
    async fn test_planner_tool_end_to_end() {
        let date = today();
        let tool = PriorityPlannerTool;
        let blocks = vec![block(date, (9, 15), 285), block(date, (15, 0), 60)];
        let call = ToolCall::new(
            "priority_plan",
            serde_json::json!({
                "tasks": sample_tasks(),
                "calendar_events": [],
                "free_blocks": blocks,
            }),
        );

        let ctx = ToolContext::default().with_today(date);
        let result = tool.execute(&call, &ctx).await.unwrap();
        assert!(result.success);
        assert_eq!(result.payload["summary"]["total_tasks"], 6);
        assert!(result.payload["schedule"].as_array().unwrap().len() >= 1);
    }
}
