//! Knowledge search handler: semantic lookup over the company index.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument};

use taskpilot_core::{ToolCall, ToolDefinition, ToolResult};
use taskpilot_integrations::KnowledgeBase;

use crate::registry::{Tool, ToolContext};
use crate::ToolError;

/// Handler for the `knowledge-search` action.
pub struct KnowledgeSearchTool {
    knowledge: Arc<KnowledgeBase>,
    /// Snippets per search when the call does not ask for a count.
    top_k: usize,
    /// Minimum query length in characters.
    min_query_len: usize,
}

impl KnowledgeSearchTool {
    pub fn new(knowledge: Arc<KnowledgeBase>) -> Self {
        Self {
            knowledge,
            top_k: 3,
            min_query_len: 3,
        }
    }

    /// Use configured search limits instead of the defaults.
    pub fn with_limits(mut self, top_k: usize, min_query_len: usize) -> Self {
        self.top_k = top_k.max(1);
        self.min_query_len = min_query_len;
        self
    }
}

#[async_trait]
impl Tool for KnowledgeSearchTool {
    fn name(&self) -> &str {
        "knowledge_search"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "knowledge_search",
            "Search the internal knowledge base for documents, people, and plans using semantic search",
        )
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Natural language search query"
                },
                "top_k": {
                    "type": "integer",
                    "description": "Number of results to return"
                },
                "project": {
                    "type": "string",
                    "description": "Restrict results to one project"
                }
            },
            "required": ["query"]
        }))
    }

    fn validate(&self, arguments: &serde_json::Value) -> Result<(), ToolError> {
        let query = arguments
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::missing_param("query"))?;
        if query.trim().len() < self.min_query_len {
            return Err(ToolError::invalid_args(format!(
                "query must be at least {} characters",
                self.min_query_len
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, call, _ctx), fields(tool = self.name()))]
    async fn execute(&self, call: &ToolCall, _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let query = call
            .str_arg("query")
            .ok_or_else(|| ToolError::missing_param("query"))?;
        let top_k = call
            .arguments
            .get("top_k")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .unwrap_or(self.top_k);
        let project = call.str_arg("project");

        info!("Searching knowledge base: '{query}'");

        let snippets = self.knowledge.search(query, top_k, project).await?;

        Ok(ToolResult::success(
            &call.id,
            serde_json::json!({
                "query": query,
                "total_found": snippets.len(),
                "results": snippets,
            }),
        ))
    }
}
