//! Domain records shared by the tracker, calendar, and status tooling.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A project as known to the tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerProject {
    pub id: String,
    pub key: String,
    pub name: String,
}

/// An active or past sprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sprint {
    pub id: u64,
    pub name: String,
    pub state: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Workflow state of a tracker task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Blocked,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Done => "done",
        }
    }
}

/// Task priority, ordered from most to least urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    /// Sort rank, lower is more urgent.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    /// Parse a tracker priority name ("Highest", "High", ...).
    pub fn from_tracker_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "highest" | "critical" => Priority::Critical,
            "high" => Priority::High,
            "medium" => Priority::Medium,
            _ => Priority::Low,
        }
    }
}

/// A task as returned by the tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerTask {
    pub id: String,
    pub title: String,
    pub project: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub created_date: Option<NaiveDate>,
    pub estimated_hours: Option<f64>,
    pub story_points: Option<u32>,
    #[serde(default)]
    pub labels: Vec<String>,
    pub assignee: Option<String>,
    #[serde(default)]
    pub blocked: bool,
    pub blocker_reason: Option<String>,
}

impl TrackerTask {
    /// Whether the task counts as blocked, via status or labels.
    pub fn is_blocked(&self) -> bool {
        self.blocked
            || self.status == TaskStatus::Blocked
            || self.labels.iter().any(|l| l.eq_ignore_ascii_case("blocked")
                || l.eq_ignore_ascii_case("blocker"))
    }
}

/// Severity of a blocker, derived from the task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

/// A blocked task with its reason and owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blocker {
    pub task_id: String,
    pub task_title: String,
    pub reason: String,
    pub owner: String,
    pub severity: Severity,
}

/// Aggregated task counts for a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskMetrics {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub blocked: usize,
    pub todo: usize,
    pub completion_percentage: f64,
    pub story_points: StoryPoints,
}

/// Story point totals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoryPoints {
    pub total: u32,
    pub completed: u32,
    pub remaining: u32,
}

/// Overall health of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    OnTrack,
    AtRisk,
    Unknown,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::OnTrack => "on_track",
            OverallStatus::AtRisk => "at_risk",
            OverallStatus::Unknown => "unknown",
        }
    }
}

/// Full project status summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectStatus {
    pub project_name: String,
    pub project_key: String,
    pub status: OverallStatus,
    pub completion_percentage: f64,
    pub sprint: Option<Sprint>,
    pub metrics: TaskMetrics,
    pub blockers: Vec<Blocker>,
    pub tasks: Vec<TrackerTask>,
}

/// A calendar event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_minutes: i64,
    #[serde(default)]
    pub attendees: Vec<String>,
}

/// A gap between meetings within working hours.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreeBlock {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_minutes: i64,
}

/// A knowledge-base search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snippet {
    pub id: String,
    pub content: String,
    pub metadata: serde_json::Value,
    pub relevance: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_from_tracker_name() {
        assert_eq!(Priority::from_tracker_name("Highest"), Priority::Critical);
        assert_eq!(Priority::from_tracker_name("High"), Priority::High);
        assert_eq!(Priority::from_tracker_name("Medium"), Priority::Medium);
        assert_eq!(Priority::from_tracker_name("None"), Priority::Low);
    }

    #[test]
    fn test_blocked_via_label() {
        let task = TrackerTask {
            id: "PHOE-145".to_string(),
            title: "Follow up on vendor API key delay".to_string(),
            project: "Phoenix".to_string(),
            status: TaskStatus::InProgress,
            priority: Priority::Critical,
            due_date: None,
            created_date: None,
            estimated_hours: None,
            story_points: Some(3),
            labels: vec!["blocker".to_string()],
            assignee: None,
            blocked: false,
            blocker_reason: None,
        };
        assert!(task.is_blocked());
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let json = serde_json::to_string(&OverallStatus::AtRisk).unwrap();
        assert_eq!(json, "\"at_risk\"");
    }
}
