//! Email composition handler: prompt the model, parse subject and body.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use taskpilot_core::{ToolCall, ToolDefinition, ToolResult};
use taskpilot_providers::{CompletionRequest, Provider};

use crate::registry::{Tool, ToolContext};
use crate::ToolError;

const EMAIL_PROMPT: &str = "Draft a professional email based on the following information:

Purpose: {purpose}

Key Information:
{key_points}

Recipients: {recipients}

Requirements:
- Tone: {tone}
- Be concise but complete
- Use professional formatting
- Highlight critical issues appropriately

Return ONLY a JSON object with:
{
    \"subject\": \"Email subject line\",
    \"body\": \"Full email body with proper formatting\"
}";

/// A drafted email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailDraft {
    pub subject: String,
    pub body: String,
    pub tone: String,
    pub word_count: usize,
}

/// Handler for the `email-compose` action.
pub struct EmailComposerTool {
    provider: Arc<dyn Provider>,
}

impl EmailComposerTool {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    fn build_prompt(purpose: &str, key_points: &[String], recipients: &str, tone: &str) -> String {
        let key_points_text = if key_points.is_empty() {
            "- (no specific points provided)".to_string()
        } else {
            key_points
                .iter()
                .map(|p| format!("- {p}"))
                .collect::<Vec<_>>()
                .join("\n")
        };

        EMAIL_PROMPT
            .replace("{purpose}", purpose)
            .replace("{key_points}", &key_points_text)
            .replace("{recipients}", recipients)
            .replace("{tone}", tone)
    }
}

/// Parse subject and body out of a model reply, trying strategies in order:
/// direct JSON, fenced code block, regex field extraction, raw body.
pub fn parse_email_reply(content: &str, purpose: &str) -> (String, String) {
    #[derive(Deserialize)]
    struct Fields {
        subject: String,
        body: String,
    }

    // Strategy 1: the whole reply is JSON
    if let Ok(fields) = serde_json::from_str::<Fields>(content.trim()) {
        return (fields.subject, fields.body);
    }

    // Strategy 2: JSON inside a fenced code block
    if let Some(inner) = extract_fenced_block(content) {
        if let Ok(fields) = serde_json::from_str::<Fields>(inner.trim()) {
            return (fields.subject, fields.body);
        }
    }

    // Strategy 3: pull the fields out with regexes
    static SUBJECT_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"(?i)["']subject["']\s*:\s*["']([^"']+)["']"#).expect("valid regex")
    });
    static BODY_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"(?is)["']body["']\s*:\s*["']([^"']+)["']"#).expect("valid regex")
    });

    if let Some(subject) = SUBJECT_RE.captures(content).and_then(|c| c.get(1)) {
        warn!("JSON parsing failed, using regex extraction");
        let body = BODY_RE
            .captures(content)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| content.to_string());
        return (subject.as_str().to_string(), body);
    }

    // Strategy 4: use the raw reply as the body
    (format!("Update: {purpose}"), content.to_string())
}

fn extract_fenced_block(content: &str) -> Option<&str> {
    let start = if let Some(idx) = content.find("```json") {
        idx + 7
    } else {
        content.find("```")? + 3
    };
    let end = content[start..].find("```")? + start;
    Some(&content[start..end])
}

#[async_trait]
impl Tool for EmailComposerTool {
    fn name(&self) -> &str {
        "compose_email"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "compose_email",
            "Draft professional emails with appropriate tone and structure",
        )
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "purpose": {
                    "type": "string",
                    "description": "What the email is about"
                },
                "key_points": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Main information to include"
                },
                "recipients": {
                    "type": "string",
                    "description": "Recipient description, e.g. names and roles"
                },
                "tone": {
                    "type": "string",
                    "enum": ["formal", "casual", "urgent"],
                    "description": "Email tone"
                }
            },
            "required": ["purpose"]
        }))
    }

    fn validate(&self, arguments: &serde_json::Value) -> Result<(), ToolError> {
        match arguments.get("purpose").and_then(|v| v.as_str()) {
            Some(p) if !p.trim().is_empty() => Ok(()),
            _ => Err(ToolError::missing_param("purpose")),
        }
    }

    #[instrument(skip(self, call, _ctx), fields(tool = self.name()))]
    async fn execute(&self, call: &ToolCall, _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let purpose = call
            .str_arg("purpose")
            .ok_or_else(|| ToolError::missing_param("purpose"))?;
        let key_points: Vec<String> = call
            .arguments
            .get("key_points")
            .and_then(|v| v.as_array())
            .map(|points| {
                points
                    .iter()
                    .filter_map(|p| p.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        let recipients = call.str_arg("recipients").unwrap_or("General stakeholders");
        let tone = call.str_arg("tone").unwrap_or("formal");

        info!("Composing email: {purpose}");

        let prompt = Self::build_prompt(purpose, &key_points, recipients, tone);
        let request = CompletionRequest::single(
            "You draft clear, professional business emails.",
            prompt,
        );

        let content = match self.provider.complete(request).await {
            Ok(response) => response.content,
            Err(e) => {
                warn!("Email composition failed: {e}");
                // Still hand back a usable draft assembled from the inputs.
                let fallback_body = format!(
                    "Email composition encountered an error. Key points:\n\n{}",
                    key_points
                        .iter()
                        .map(|p| format!("- {p}"))
                        .collect::<Vec<_>>()
                        .join("\n")
                );
                return Ok(ToolResult::error_with_payload(
                    &call.id,
                    format!("LLM unavailable: {e}"),
                    serde_json::json!({
                        "kind": "llm_unavailable",
                        "draft": EmailDraft {
                            subject: format!("Update: {purpose}"),
                            word_count: fallback_body.split_whitespace().count(),
                            body: fallback_body,
                            tone: tone.to_string(),
                        },
                    }),
                ));
            }
        };

        let (subject, body) = parse_email_reply(&content, purpose);
        let draft = EmailDraft {
            word_count: body.split_whitespace().count(),
            subject,
            body,
            tone: tone.to_string(),
        };

        Ok(ToolResult::success(
            &call.id,
            serde_json::json!({ "draft": draft }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskpilot_providers::MockProvider;

    #[test]
    fn test_parse_direct_json() {
        let (subject, body) =
            parse_email_reply(r#"{"subject": "Phoenix Update", "body": "All on track."}"#, "x");
        assert_eq!(subject, "Phoenix Update");
        assert_eq!(body, "All on track.");
    }

    #[test]
    fn test_parse_fenced_json() {
        let content = "Here is the draft:\n```json\n{\"subject\": \"S\", \"body\": \"B\"}\n```";
        let (subject, body) = parse_email_reply(content, "x");
        assert_eq!(subject, "S");
        assert_eq!(body, "B");
    }

    #[test]
    fn test_parse_regex_fallback() {
        let content = "subject field: 'subject': 'Weekly sync' and 'body': 'See attached notes'";
        let (subject, body) = parse_email_reply(content, "x");
        assert_eq!(subject, "Weekly sync");
        assert_eq!(body, "See attached notes");
    }

    #[test]
    fn test_parse_raw_fallback() {
        let content = "Dear team, here is a plain reply with no structure.";
        let (subject, body) = parse_email_reply(content, "status update");
        assert_eq!(subject, "Update: status update");
        assert_eq!(body, content);
    }

    #[tokio::test]
    async fn test_compose_email_success() {
        let provider = MockProvider::with_responses(vec![
            r#"{"subject": "Phoenix Status", "body": "Phoenix is at risk due to a vendor delay."}"#
                .to_string(),
        ]);
        let tool = EmailComposerTool::new(Arc::new(provider));
        let call = ToolCall::new(
            "compose_email",
            serde_json::json!({
                "purpose": "Phoenix weekly status",
                "key_points": ["Vendor API keys delayed", "Sprint 14 on schedule"],
                "tone": "formal",
            }),
        );

        let result = tool.execute(&call, &ToolContext::default()).await.unwrap();
        assert!(result.success);
        assert_eq!(result.payload["draft"]["subject"], "Phoenix Status");
        assert!(result.payload["draft"]["word_count"].as_u64().unwrap() > 0);
    }
}
