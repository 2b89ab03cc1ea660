//! Markdown response rendering.
//!
//! The formatter turns the pipeline's accumulated state into the final
//! reply. It renders whatever sections the workflow produced; missing
//! steps simply drop their section.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pipeline::{StepError, WorkflowState};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\w.\-]+@[\w.\-]+\.\w+").expect("valid regex"));
static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Z][a-z]+ [A-Z][a-z]+").expect("valid regex"));

/// A person to address a status email to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stakeholder {
    pub name: String,
    pub email: String,
}

/// Fallback recipients when no stakeholders can be extracted.
pub fn default_stakeholders() -> Vec<Stakeholder> {
    vec![
        Stakeholder {
            name: "Sarah Chen".to_string(),
            email: "sarah.chen@company.com".to_string(),
        },
        Stakeholder {
            name: "Michael Rodriguez".to_string(),
            email: "michael.r@company.com".to_string(),
        },
    ]
}

/// Pull stakeholder names and emails out of knowledge search results.
///
/// Names without an adjacent email get a synthesized company address.
/// Duplicates by name are dropped.
pub fn extract_stakeholders(results: &Value) -> Vec<Stakeholder> {
    let mut stakeholders = Vec::new();

    let docs = results
        .get("results")
        .and_then(|r| r.as_array())
        .cloned()
        .unwrap_or_default();

    for doc in docs {
        let Some(content) = doc.get("content").and_then(|c| c.as_str()) else {
            continue;
        };
        let emails: Vec<&str> = EMAIL_RE.find_iter(content).map(|m| m.as_str()).collect();

        for name in NAME_RE.find_iter(content).take(5) {
            let name = name.as_str().to_string();
            let email = emails
                .first()
                .map(|e| e.to_string())
                .unwrap_or_else(|| format!("{}@company.com", name.to_lowercase().replace(' ', ".")));
            stakeholders.push(Stakeholder { name, email });
        }
    }

    let mut seen = Vec::new();
    stakeholders.retain(|s| {
        if seen.contains(&s.name) {
            false
        } else {
            seen.push(s.name.clone());
            true
        }
    });

    stakeholders
}

/// Render the final reply for a completed workflow.
pub fn render(state: &WorkflowState, today: NaiveDate) -> String {
    if state.plan.is_some() {
        render_plan(state, today)
    } else if state.email_draft.is_some() {
        render_status_email(state)
    } else if state.project_status.is_some() {
        render_status_only(state)
    } else if state.knowledge.is_some() {
        render_snippets(state)
    } else if state.calendar.is_some() {
        render_calendar(state)
    } else {
        "I wasn't able to gather any results for that request.".to_string()
    }
}

/// Render the short-circuit error reply.
pub fn render_errors(errors: &[StepError]) -> String {
    let mut lines = vec!["I encountered some issues while processing your request:".to_string(), String::new()];
    for error in errors {
        lines.push(format!("- {}: {}", error.step, error.message));
    }
    lines.push(String::new());
    lines.push("Would you like me to try again or help with something else?".to_string());
    lines.join("\n")
}

fn title_case(status: &str) -> String {
    status
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn push_status_section(out: &mut Vec<String>, status: &Value) {
    out.push("## Project Status".to_string());
    out.push(String::new());

    if status.get("kind").is_some() {
        // Error payload from the status handler
        out.push("Could not retrieve the project status.".to_string());
        if let Some(suggestions) = status.get("suggestions").and_then(|s| s.as_array()) {
            let names: Vec<&str> = suggestions.iter().filter_map(|s| s.as_str()).collect();
            if !names.is_empty() {
                out.push(format!("**Available projects:** {}", names.join(", ")));
            }
        }
        out.push(String::new());
        return;
    }

    let name = status["project_name"].as_str().unwrap_or("Unknown Project");
    let completion = status["completion_percentage"].as_f64().unwrap_or(0.0);
    let overall = title_case(status["status"].as_str().unwrap_or("unknown"));
    let completed = status["metrics"]["completed"].as_u64().unwrap_or(0);
    let total = status["metrics"]["total"].as_u64().unwrap_or(0);

    out.push(format!("**Project:** {name}"));
    out.push(format!("**Status:** {overall}"));
    out.push(format!("**Completion:** {completion}%"));
    out.push(format!("**Tasks:** {completed}/{total} completed"));
    out.push(String::new());

    if let Some(blockers) = status.get("blockers").and_then(|b| b.as_array()) {
        if !blockers.is_empty() {
            out.push("### Blockers".to_string());
            out.push(String::new());
            for blocker in blockers.iter().take(5) {
                out.push(format!(
                    "- **{}**: {} (Owner: {})",
                    blocker["severity"].as_str().unwrap_or("medium").to_uppercase(),
                    blocker["task_title"].as_str().unwrap_or("Unknown"),
                    blocker["owner"].as_str().unwrap_or("Unassigned"),
                ));
            }
            out.push(String::new());
        }
    }

    if let Some(sprint) = status.get("sprint").filter(|s| !s.is_null()) {
        out.push("### Current Sprint".to_string());
        out.push(String::new());
        out.push(format!(
            "**Sprint:** {}",
            sprint["name"].as_str().unwrap_or("Current")
        ));
        if let Some(points) = status["metrics"]["story_points"].as_object() {
            out.push(format!(
                "**Progress:** {}/{} points",
                points.get("completed").and_then(|v| v.as_u64()).unwrap_or(0),
                points.get("total").and_then(|v| v.as_u64()).unwrap_or(0),
            ));
        }
        out.push(String::new());
    }
}

fn render_status_only(state: &WorkflowState) -> String {
    let mut out = Vec::new();
    if let Some(status) = &state.project_status {
        push_status_section(&mut out, status);
    }
    out.push("## Next Steps".to_string());
    out.push(String::new());
    out.push("- Address blocking issues".to_string());
    out.push("- Ask me to draft a stakeholder update".to_string());
    out.join("\n")
}

fn render_status_email(state: &WorkflowState) -> String {
    let mut out = vec!["# Project Status & Email Update".to_string(), String::new()];

    if let Some(status) = &state.project_status {
        push_status_section(&mut out, status);
    }

    out.push("## Email Draft".to_string());
    out.push(String::new());

    if let Some(draft) = &state.email_draft {
        let recipients = if state.stakeholders.len() > 3 {
            let named: Vec<&str> = state.stakeholders[..3].iter().map(|s| s.name.as_str()).collect();
            format!("{} and {} others", named.join(", "), state.stakeholders.len() - 3)
        } else if !state.stakeholders.is_empty() {
            state
                .stakeholders
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        } else {
            "Project Stakeholders".to_string()
        };

        out.push(format!("**To:** {recipients}"));
        out.push(format!(
            "**Subject:** {}",
            draft["subject"].as_str().unwrap_or("No subject")
        ));
        out.push(String::new());
        out.push("**Body:**".to_string());
        out.push("```".to_string());
        out.push(draft["body"].as_str().unwrap_or("No content").to_string());
        out.push("```".to_string());
        out.push(String::new());
    }

    out.push("## Next Steps".to_string());
    out.push(String::new());
    out.push("- Review and edit the email draft".to_string());
    out.push("- Send to stakeholders".to_string());
    out.push("- Address blocking issues".to_string());
    out.push("- Schedule follow-up".to_string());

    out.join("\n")
}

fn render_snippets(state: &WorkflowState) -> String {
    let mut out = vec!["## Knowledge Base Results".to_string(), String::new()];

    let results = state
        .knowledge
        .as_ref()
        .and_then(|k| k.get("results"))
        .and_then(|r| r.as_array())
        .cloned()
        .unwrap_or_default();

    if results.is_empty() {
        out.push("No matching documents found.".to_string());
    }

    for (i, doc) in results.iter().enumerate() {
        let relevance = doc["relevance"].as_f64().unwrap_or(0.0);
        out.push(format!("{}. (relevance {relevance:.2})", i + 1));
        out.push(String::new());
        out.push(doc["content"].as_str().unwrap_or("").trim().to_string());
        out.push(String::new());
    }

    out.join("\n")
}

fn render_calendar(state: &WorkflowState) -> String {
    let mut out = vec!["## Today's Calendar".to_string(), String::new()];

    let calendar = state.calendar.as_ref();
    let events = calendar
        .and_then(|c| c.get("events"))
        .and_then(|e| e.as_array())
        .cloned()
        .unwrap_or_default();

    if events.is_empty() {
        out.push("No meetings scheduled.".to_string());
    }
    for event in &events {
        out.push(format!(
            "- **{} - {}:** {}",
            format_clock(event["start"].as_str()),
            format_clock(event["end"].as_str()),
            event["title"].as_str().unwrap_or("Untitled"),
        ));
    }

    if let Some(free) = calendar.and_then(|c| c.get("total_free_minutes")).and_then(|v| v.as_i64()) {
        out.push(String::new());
        out.push(format!("**Available focus time:** {} minutes", free));
    }

    out.join("\n")
}

fn render_plan(state: &WorkflowState, today: NaiveDate) -> String {
    let plan = match &state.plan {
        Some(plan) => plan,
        None => return render_errors(&state.errors),
    };

    let mut out = vec![
        format!("# Daily Priority Plan - {}", today.format("%A, %B %d, %Y")),
        String::new(),
        "## Overview".to_string(),
        String::new(),
    ];

    let summary = &plan["summary"];
    out.push(format!("**Total Tasks:** {}", summary["total_tasks"].as_u64().unwrap_or(0)));
    out.push(format!(
        "**High Priority:** {}",
        summary["high_priority_count"].as_u64().unwrap_or(0)
    ));
    out.push(format!(
        "**Meetings:** {} minutes",
        summary["total_meeting_minutes"].as_i64().unwrap_or(0)
    ));
    out.push(format!(
        "**Available Time:** {} minutes",
        summary["total_free_minutes"].as_i64().unwrap_or(0)
    ));
    out.push(String::new());

    out.push("## Top Priorities".to_string());
    out.push(String::new());
    let tasks = plan["prioritized_tasks"].as_array().cloned().unwrap_or_default();
    for (i, task) in tasks.iter().take(5).enumerate() {
        out.push(format!(
            "{}. **{}** (Score: {})",
            i + 1,
            task["title"].as_str().unwrap_or("Untitled"),
            task["priority_score"].as_f64().unwrap_or(0.0),
        ));
        out.push(format!(
            "   - Project: {}",
            task["project"].as_str().unwrap_or("Unknown")
        ));
        out.push(format!(
            "   - Due: {}",
            task["due_date"].as_str().unwrap_or("No deadline")
        ));
        if task["blocked"].as_bool().unwrap_or(false) {
            out.push(format!(
                "   - BLOCKED: {}",
                task["blocker_reason"].as_str().unwrap_or("Unknown")
            ));
        }
        out.push(String::new());
    }

    out.push("## Your Schedule".to_string());
    out.push(String::new());

    // Merge meetings and scheduled work, ordered by start time
    let mut items: Vec<(String, String)> = Vec::new();
    let events = state
        .calendar
        .as_ref()
        .and_then(|c| c.get("events"))
        .and_then(|e| e.as_array())
        .cloned()
        .unwrap_or_default();
    for event in &events {
        items.push((
            event["start"].as_str().unwrap_or_default().to_string(),
            format!(
                "**{} - {}:** {} (meeting)",
                format_clock(event["start"].as_str()),
                format_clock(event["end"].as_str()),
                event["title"].as_str().unwrap_or("Untitled"),
            ),
        ));
    }
    let schedule = plan["schedule"].as_array().cloned().unwrap_or_default();
    for entry in &schedule {
        let block_type = title_case(entry["block_type"].as_str().unwrap_or("focused_task"));
        items.push((
            entry["start"].as_str().unwrap_or_default().to_string(),
            format!(
                "**{} - {}:** {} ({block_type})",
                format_clock(entry["start"].as_str()),
                format_clock(entry["end"].as_str()),
                entry["task_title"].as_str().unwrap_or("Untitled"),
            ),
        ));
    }
    items.sort_by(|a, b| a.0.cmp(&b.0));
    if items.is_empty() {
        out.push("Nothing scheduled.".to_string());
    }
    for (_, line) in items {
        out.push(line);
    }
    out.push(String::new());

    let suggestions = plan["suggestions"].as_array().cloned().unwrap_or_default();
    if !suggestions.is_empty() {
        out.push("## Suggestions".to_string());
        out.push(String::new());
        for suggestion in &suggestions {
            out.push(format!("- {}", suggestion.as_str().unwrap_or_default()));
        }
        out.push(String::new());
    }

    out.push("## Quick Actions".to_string());
    out.push(String::new());
    out.push("- View detailed task breakdown".to_string());
    out.push("- Reschedule meetings for more focus time".to_string());
    out.push("- Get help with blockers".to_string());

    out.join("\n")
}

fn format_clock(timestamp: Option<&str>) -> String {
    timestamp
        .and_then(|t| t.parse::<NaiveDateTime>().ok())
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "??:??".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_stakeholders_dedupes_by_name() {
        let results = json!({
            "results": [
                { "content": "Team lead: Sarah Chen (sarah.chen@company.com)." },
                { "content": "Sarah Chen and Michael Rodriguez run the weekly sync." }
            ]
        });

        let stakeholders = extract_stakeholders(&results);
        assert_eq!(stakeholders.len(), 2);
        assert_eq!(stakeholders[0].name, "Sarah Chen");
        assert_eq!(stakeholders[0].email, "sarah.chen@company.com");
        // No email in the second document: synthesized address
        assert_eq!(stakeholders[1].name, "Michael Rodriguez");
        assert_eq!(stakeholders[1].email, "michael.rodriguez@company.com");
    }

    #[test]
    fn test_extract_stakeholders_handles_empty_results() {
        assert!(extract_stakeholders(&json!({"results": []})).is_empty());
        assert!(extract_stakeholders(&json!({})).is_empty());
    }

    #[test]
    fn test_render_status_email_sections() {
        let mut state = WorkflowState::default();
        state.project_status = Some(json!({
            "project_name": "Phoenix",
            "status": "at_risk",
            "completion_percentage": 16.7,
            "metrics": {
                "total": 6, "completed": 1,
                "story_points": {"total": 23, "completed": 5}
            },
            "blockers": [
                {"severity": "critical", "task_title": "Fix payment gateway", "owner": "John Doe"}
            ],
            "sprint": {"name": "Phoenix Sprint 14"}
        }));
        state.stakeholders = default_stakeholders();
        state.email_draft = Some(json!({
            "subject": "Phoenix Weekly Update",
            "body": "Hi all,\n\nStatus below.",
        }));

        let text = render(&state, chrono::Local::now().date_naive());
        assert!(text.contains("## Project Status"));
        assert!(text.contains("**Status:** At Risk"));
        assert!(text.contains("### Blockers"));
        assert!(text.contains("**CRITICAL**: Fix payment gateway"));
        assert!(text.contains("Phoenix Sprint 14"));
        assert!(text.contains("**To:** Sarah Chen, Michael Rodriguez"));
        assert!(text.contains("**Subject:** Phoenix Weekly Update"));
        assert!(text.contains("## Next Steps"));
    }

    #[test]
    fn test_render_not_found_status_shows_suggestions() {
        let mut state = WorkflowState::default();
        state.project_status = Some(json!({
            "kind": "project_not_found",
            "suggestions": ["Phoenix", "Atlas"]
        }));

        let text = render(&state, chrono::Local::now().date_naive());
        assert!(text.contains("Could not retrieve the project status"));
        assert!(text.contains("**Available projects:** Phoenix, Atlas"));
    }

    #[test]
    fn test_render_errors_lists_each_step() {
        let errors = vec![
            StepError::new("status-lookup", "tracker unreachable"),
            StepError::new("email-compose", "LLM unavailable"),
        ];
        let text = render_errors(&errors);
        assert!(text.contains("- status-lookup: tracker unreachable"));
        assert!(text.contains("- email-compose: LLM unavailable"));
    }
}
