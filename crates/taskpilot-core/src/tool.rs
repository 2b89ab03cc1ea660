//! Tool request and result types shared across the workspace.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Definition of a tool the copilot can dispatch to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON schema for the tool's arguments
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {},
            }),
        }
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }
}

/// A routed request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID
    pub id: String,
    /// Tool name to invoke
    pub name: String,
    /// Arguments as a JSON object
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            arguments,
        }
    }

    /// Fetch a string argument by key.
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }
}

/// Result of executing a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the call this result answers
    pub tool_call_id: String,
    /// Whether execution succeeded
    pub success: bool,
    /// Structured payload on success
    pub payload: Value,
    /// Error message on failure
    pub error: Option<String>,
    /// Wall-clock execution time
    pub duration_ms: u64,
}

impl ToolResult {
    pub fn success(tool_call_id: impl Into<String>, payload: Value) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            success: true,
            payload,
            error: None,
            duration_ms: 0,
        }
    }

    pub fn error(tool_call_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            success: false,
            payload: Value::Null,
            error: Some(error.into()),
            duration_ms: 0,
        }
    }

    /// Failure that still carries a structured payload (suggestions,
    /// fallback content) for the formatter.
    pub fn error_with_payload(
        tool_call_id: impl Into<String>,
        error: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            success: false,
            payload,
            error: Some(error.into()),
            duration_ms: 0,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_definition_builder() {
        let def = ToolDefinition::new("status_lookup", "Look up project status")
            .with_parameters(serde_json::json!({
                "type": "object",
                "properties": {
                    "project": { "type": "string" }
                },
                "required": ["project"]
            }));

        assert_eq!(def.name, "status_lookup");
        assert!(def.parameters["required"].is_array());
    }

    #[test]
    fn test_tool_call_str_arg() {
        let call = ToolCall::new("status_lookup", serde_json::json!({ "project": "Phoenix" }));
        assert_eq!(call.str_arg("project"), Some("Phoenix"));
        assert_eq!(call.str_arg("missing"), None);
    }

    #[test]
    fn test_tool_result_success_and_error() {
        let ok = ToolResult::success("call-1", serde_json::json!({ "status": "on_track" }))
            .with_duration(12);
        assert!(ok.success);
        assert_eq!(ok.duration_ms, 12);
        assert!(ok.error.is_none());

        let err = ToolResult::error("call-2", "tracker unreachable");
        assert!(!err.success);
        assert_eq!(err.error.as_deref(), Some("tracker unreachable"));
    }
}
