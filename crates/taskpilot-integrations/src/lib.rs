//! # taskpilot-integrations
//!
//! External-service clients for Taskpilot.
//!
//! This crate provides:
//! - Tracker client (Jira-compatible REST) with a demo fallback
//! - In-process knowledge base with embedding search
//! - Calendar source and free-block computation
//! - Shared domain records (tasks, sprints, blockers, events)

pub mod calendar;
pub mod knowledge;
pub mod tracker;
pub mod types;

pub use calendar::{free_blocks, CalendarSource, DemoCalendar, Workday};
pub use knowledge::KnowledgeBase;
pub use tracker::{DemoTracker, RestTracker, Tracker};
pub use types::{
    Blocker, CalendarEvent, FreeBlock, OverallStatus, Priority, ProjectStatus, Severity, Snippet,
    Sprint, StoryPoints, TaskMetrics, TaskStatus, TrackerProject, TrackerTask,
};
