//! Keyword-based action router.
//!
//! [`Router::route`] is a pure function from free text to an ordered
//! sequence of actions. It never performs I/O; an empty result tells the
//! caller to fall back to a plain conversational reply.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// The fixed set of actions the copilot can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    StatusLookup,
    KnowledgeSearch,
    EmailCompose,
    PriorityPlan,
    CalendarAction,
}

impl Action {
    /// Registry name of the handler behind this action.
    pub fn tool_name(&self) -> &'static str {
        match self {
            Action::StatusLookup => "project_status",
            Action::KnowledgeSearch => "knowledge_search",
            Action::EmailCompose => "compose_email",
            Action::PriorityPlan => "priority_plan",
            Action::CalendarAction => "calendar",
        }
    }
}

/// A routed action with its extracted arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: Action,
    pub arguments: serde_json::Value,
}

impl ActionRequest {
    fn new(action: Action, arguments: serde_json::Value) -> Self {
        Self { action, arguments }
    }
}

/// Capitalized tokens that never name a project.
const COMMON_WORDS: &[&str] = &[
    "And", "Can", "Could", "Draft", "Email", "For", "Get", "Give", "How",
    "Is", "Me", "My", "Please", "Project", "Send", "Show", "Status", "The",
    "Update", "What", "Who", "Would", "You",
];

pub struct Router;

impl Router {
    /// Map free text onto an ordered action sequence.
    pub fn route(text: &str) -> Vec<ActionRequest> {
        let lower = text.to_lowercase();
        let contains_any =
            |keywords: &[&str]| keywords.iter().any(|k| contains_word(&lower, k));

        // Planning requests win over everything else: the plan already
        // covers status and calendar.
        if contains_any(&["priority", "priorities", "plan", "schedule", "my day", "today"]) {
            return vec![
                ActionRequest::new(Action::CalendarAction, json!({"action": "get_events", "date": "today"})),
                ActionRequest::new(Action::PriorityPlan, json!({})),
            ];
        }

        let wants_email = contains_any(&["email", "emails", "draft", "send"]);

        if contains_any(&["status", "progress", "how is"]) {
            let project = extract_project(text).unwrap_or_else(|| "Phoenix".to_string());
            let mut requests = vec![ActionRequest::new(
                Action::StatusLookup,
                json!({"project": project}),
            )];
            if wants_email {
                requests.push(ActionRequest::new(
                    Action::KnowledgeSearch,
                    json!({"query": format!("{project} stakeholders team members"), "project": project}),
                ));
                requests.push(ActionRequest::new(Action::EmailCompose, json!({})));
            }
            return requests;
        }

        if wants_email {
            return vec![ActionRequest::new(
                Action::EmailCompose,
                json!({"topic": text}),
            )];
        }

        if contains_any(&["search", "find", "who is", "know about"]) {
            return vec![ActionRequest::new(
                Action::KnowledgeSearch,
                json!({"query": text}),
            )];
        }

        if contains_any(&["calendar", "meeting", "meetings", "free time"]) {
            return vec![ActionRequest::new(
                Action::CalendarAction,
                json!({"action": "get_events", "date": "today"}),
            )];
        }

        Vec::new()
    }
}

/// Keyword match on word boundaries, so "plan" does not fire inside
/// "explain". Multi-word keywords match as phrases.
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(at, _)| {
        let before = haystack[..at].chars().next_back();
        let after = haystack[at + needle.len()..].chars().next();
        !before.is_some_and(|c| c.is_alphanumeric())
            && !after.is_some_and(|c| c.is_alphanumeric())
    })
}

/// Pick the project name out of a request: the first capitalized token that
/// is neither the leading word nor a common English word.
pub fn extract_project(text: &str) -> Option<String> {
    for (index, word) in text.split_whitespace().enumerate() {
        if index == 0 {
            continue;
        }
        let word = word.trim_matches(|c: char| !c.is_alphanumeric());
        let mut chars = word.chars();
        let Some(first) = chars.next() else { continue };
        if !first.is_uppercase() || !chars.all(|c| c.is_lowercase()) {
            continue;
        }
        if COMMON_WORDS.contains(&word) {
            continue;
        }
        return Some(word.to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_query_routes_with_project() {
        let requests = Router::route("get Phoenix status");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].action, Action::StatusLookup);
        assert_eq!(requests[0].arguments["project"], "Phoenix");
    }

    #[test]
    fn test_status_plus_email_extends_sequence() {
        let requests = Router::route("Get the Phoenix status and draft an update email");
        let actions: Vec<Action> = requests.iter().map(|r| r.action).collect();
        assert_eq!(
            actions,
            vec![Action::StatusLookup, Action::KnowledgeSearch, Action::EmailCompose]
        );
        assert_eq!(requests[0].arguments["project"], "Phoenix");
        assert!(requests[1].arguments["query"]
            .as_str()
            .unwrap()
            .contains("stakeholders"));
    }

    #[test]
    fn test_planning_keywords_route_to_plan() {
        for query in ["plan my day", "what are my priorities today", "help me schedule"] {
            let requests = Router::route(query);
            let actions: Vec<Action> = requests.iter().map(|r| r.action).collect();
            assert_eq!(actions, vec![Action::CalendarAction, Action::PriorityPlan], "{query}");
        }
    }

    #[test]
    fn test_knowledge_and_calendar_routes() {
        let requests = Router::route("who is on the Atlas team?");
        assert_eq!(requests[0].action, Action::KnowledgeSearch);

        let requests = Router::route("do I have any meetings?");
        assert_eq!(requests[0].action, Action::CalendarAction);
    }

    #[test]
    fn test_email_alone() {
        let requests = Router::route("draft an email to the team");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].action, Action::EmailCompose);
    }

    #[test]
    fn test_small_talk_routes_nowhere() {
        assert!(Router::route("hello there").is_empty());
        assert!(Router::route("thanks!").is_empty());
    }

    #[test]
    fn test_keywords_match_whole_words_only() {
        // "plan" inside "explain" must not trigger the plan workflow.
        assert!(Router::route("explain the architecture").is_empty());
        // "send" inside "weekend" must not trigger an email.
        assert!(Router::route("what a great weekend").is_empty());

        let requests = Router::route("what are my priorities?");
        assert_eq!(requests.last().unwrap().action, Action::PriorityPlan);
    }

    #[test]
    fn test_extract_project_skips_leading_and_common_words() {
        assert_eq!(extract_project("How is Atlas doing?"), Some("Atlas".to_string()));
        assert_eq!(extract_project("Get Phoenix status"), Some("Phoenix".to_string()));
        assert_eq!(extract_project("Show Me The Status"), None);
        assert_eq!(extract_project("status please"), None);
    }
}
