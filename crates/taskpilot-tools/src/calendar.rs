//! Calendar handler: events and availability for a date.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{info, instrument};

use taskpilot_core::{ToolCall, ToolDefinition, ToolResult};
use taskpilot_integrations::{
    calendar::free_blocks, calendar::total_meeting_minutes, CalendarSource, Workday,
};

use crate::registry::{Tool, ToolContext};
use crate::ToolError;

/// Handler for the `calendar-action` action.
pub struct CalendarTool {
    source: Arc<dyn CalendarSource>,
    workday: Workday,
}

impl CalendarTool {
    pub fn new(source: Arc<dyn CalendarSource>) -> Self {
        Self {
            source,
            workday: Workday::default(),
        }
    }

    /// Use configured working hours instead of the 09:00-18:00 default.
    pub fn with_workday(mut self, workday: Workday) -> Self {
        self.workday = workday;
        self
    }
}

#[async_trait]
impl Tool for CalendarTool {
    fn name(&self) -> &str {
        "calendar"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "calendar",
            "View calendar events and check availability for a date",
        )
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["get_events", "check_availability"],
                    "description": "Calendar operation"
                },
                "date": {
                    "type": "string",
                    "description": "Date to query (YYYY-MM-DD or \"today\")"
                }
            }
        }))
    }

    fn validate(&self, arguments: &serde_json::Value) -> Result<(), ToolError> {
        if let Some(action) = arguments.get("action").and_then(|v| v.as_str()) {
            if action != "get_events" && action != "check_availability" {
                return Err(ToolError::invalid_args(format!(
                    "unknown calendar action '{action}'"
                )));
            }
        }
        Ok(())
    }

    #[instrument(skip(self, call, ctx), fields(tool = self.name()))]
    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let action = call.str_arg("action").unwrap_or("get_events");
        let date = match call.str_arg("date") {
            None | Some("today") => ctx.today,
            Some(raw) => raw.parse::<NaiveDate>().unwrap_or(ctx.today),
        };

        info!("Executing calendar action: {action}");

        let events = self.source.events_for(date).await?;
        let blocks = free_blocks(&events, date, &self.workday);

        let payload = match action {
            "check_availability" => serde_json::json!({
                "date": date.to_string(),
                "is_available": !blocks.is_empty(),
                "free_blocks": blocks,
                "busy_periods": events.iter().map(|e| serde_json::json!({
                    "start": e.start,
                    "end": e.end,
                    "title": e.title,
                })).collect::<Vec<_>>(),
            }),
            _ => serde_json::json!({
                "date": date.to_string(),
                "events": events,
                "free_blocks": blocks,
                "total_meeting_minutes": total_meeting_minutes(&events),
                "total_free_minutes": blocks.iter().map(|b| b.duration_minutes).sum::<i64>(),
            }),
        };

        Ok(ToolResult::success(&call.id, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskpilot_integrations::DemoCalendar;

    fn ctx_on_wednesday() -> ToolContext {
        ToolContext::default().with_today(NaiveDate::from_ymd_opt(2026, 8, 26).unwrap())
    }

    #[tokio::test]
    async fn test_get_events_includes_free_blocks() {
        let tool = CalendarTool::new(Arc::new(DemoCalendar));
        let call = ToolCall::new("calendar", serde_json::json!({}));
        let result = tool.execute(&call, &ctx_on_wednesday()).await.unwrap();

        assert!(result.success);
        assert_eq!(result.payload["events"].as_array().unwrap().len(), 3);
        assert_eq!(result.payload["total_meeting_minutes"], 105);
        assert_eq!(result.payload["free_blocks"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_check_availability() {
        let tool = CalendarTool::new(Arc::new(DemoCalendar));
        let call = ToolCall::new(
            "calendar",
            serde_json::json!({ "action": "check_availability", "date": "2026-08-26" }),
        );
        let result = tool.execute(&call, &ToolContext::default()).await.unwrap();

        assert!(result.success);
        assert_eq!(result.payload["is_available"], true);
        assert_eq!(result.payload["busy_periods"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_configured_workday_shifts_free_blocks() {
        let mut config = taskpilot_core::Config::default();
        config.workday.start = "08:00".to_string();
        let tool = CalendarTool::new(Arc::new(DemoCalendar))
            .with_workday(Workday::from_config(&config.workday));

        let call = ToolCall::new("calendar", serde_json::json!({}));
        let result = tool.execute(&call, &ctx_on_wednesday()).await.unwrap();

        // An extra 08:00-09:00 block appears before the standup.
        let blocks = result.payload["free_blocks"].as_array().unwrap();
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[0]["duration_minutes"], 60);
    }

    #[tokio::test]
    async fn test_unknown_action_fails_validation() {
        let tool = CalendarTool::new(Arc::new(DemoCalendar));
        assert!(tool
            .validate(&serde_json::json!({ "action": "delete_everything" }))
            .is_err());
    }
}
