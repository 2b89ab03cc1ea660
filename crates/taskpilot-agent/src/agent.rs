//! The [`Copilot`] orchestration layer.
//!
//! Wires the provider, tool registry, router, pipeline, and validator
//! together around an append-only [`Conversation`]. One logical request
//! at a time; no internal parallelism or retries.

use std::sync::Arc;

use tracing::{debug, info, warn};

use taskpilot_core::{Config, Conversation, Error, Message, Result};
use taskpilot_integrations::{
    CalendarSource, DemoCalendar, DemoTracker, KnowledgeBase, RestTracker, Tracker,
};
use taskpilot_providers::{
    CompletionRequest, Embedder, GoogleProvider, HashEmbedder, Provider, ProviderRegistry,
};
use taskpilot_tools::{ToolContext, ToolRegistry};

use crate::format;
use crate::pipeline::{IntentAnalysis, Pipeline};
use crate::prompts;
use crate::router::{Action, ActionRequest, Router};
use crate::validate::validate;

/// A processed reply with validation warnings attached.
#[derive(Debug, Clone)]
pub struct CopilotResponse {
    pub text: String,
    pub warnings: Vec<String>,
    pub tools_called: Vec<String>,
}

/// The conversational copilot.
pub struct Copilot {
    provider: Arc<dyn Provider>,
    pipeline: Pipeline,
    conversation: Conversation,
    ctx: ToolContext,
    config: Config,
}

impl Copilot {
    /// Build a copilot from configuration: pick the provider, the tracker
    /// backend (REST or demo), and seed the knowledge base.
    pub async fn from_config(config: Config) -> Result<Self> {
        let demo = config.demo_mode();

        let providers = ProviderRegistry::from_config(&config);
        let provider = providers
            .default_provider()
            .ok_or_else(|| Error::provider_not_configured(&config.general.provider))?;

        let tracker: Arc<dyn Tracker> = if demo || !config.tracker.is_configured() {
            info!("Using demo tracker data");
            Arc::new(DemoTracker)
        } else {
            Arc::new(RestTracker::from_config(&config.tracker)?)
        };

        let embedder: Arc<dyn Embedder> = match config.google_api_key() {
            Some(key) if !demo => Arc::new(GoogleProvider::new(key)),
            _ => Arc::new(HashEmbedder),
        };
        let knowledge = KnowledgeBase::with_sample_documents(embedder).await?;

        let calendar: Arc<dyn CalendarSource> = Arc::new(DemoCalendar);

        let registry = Arc::new(ToolRegistry::with_builtins(
            tracker,
            Arc::new(knowledge),
            calendar,
            provider.clone(),
            &config,
        ));
        let pipeline = Pipeline::new(registry, config.limits.error_threshold);

        Ok(Self {
            provider,
            pipeline,
            conversation: Conversation::new(),
            ctx: ToolContext::default(),
            config,
        })
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Process one user request end to end.
    pub async fn process(&mut self, query: &str) -> Result<CopilotResponse> {
        self.conversation.push(Message::user(query));

        let mut requests = Router::route(query);
        let (text, tools_called) = if requests.is_empty() {
            debug!("No action matched, falling back to plain chat");
            (self.chat_reply().await?, Vec::new())
        } else {
            let intent = self.analyze_intent(query).await;
            if let Some(ref intent) = intent {
                apply_intent(&mut requests, intent);
            }
            let mut state = self.pipeline.run(&requests, &self.ctx).await;
            state.intent = intent;

            let text = if self.pipeline.exceeded_threshold(&state) {
                format::render_errors(&state.errors)
            } else {
                format::render(&state, self.ctx.today)
            };
            (text, state.tools_called)
        };

        let report = validate(&text);
        if !report.is_clean() {
            warn!("Response validation: {:?}", report.warnings);
        }

        self.conversation.push(Message::assistant(&text));

        Ok(CopilotResponse {
            text,
            warnings: report.warnings,
            tools_called,
        })
    }

    /// Plain conversational reply over the recent history.
    async fn chat_reply(&self) -> Result<String> {
        let request = CompletionRequest {
            model: self.config.general.model.clone(),
            messages: self.conversation.recent(10).to_vec(),
            system: Some(prompts::SYSTEM_PROMPT.to_string()),
            max_tokens: self.config.limits.max_tokens,
            temperature: self.config.limits.temperature,
        };

        let response = self
            .provider
            .complete(request)
            .await
            .map_err(|e| Error::Tool(format!("chat completion failed: {e}")))?;

        Ok(response.content)
    }

    /// Best-effort intent analysis before a multi-step workflow. A parse
    /// or provider failure falls back to the keyword routing alone.
    async fn analyze_intent(&self, query: &str) -> Option<IntentAnalysis> {
        let request = CompletionRequest::single(
            prompts::SYSTEM_PROMPT,
            prompts::intent_analysis_prompt(query),
        )
        .with_model(self.config.general.model.clone())
        .with_limits(self.config.limits.max_tokens, self.config.limits.temperature);

        match self.provider.complete(request).await {
            Ok(response) => match serde_json::from_str::<IntentAnalysis>(&response.content) {
                Ok(intent) => {
                    debug!("Intent parsed: {}", intent.intent);
                    Some(intent)
                }
                Err(_) => {
                    debug!("Could not parse intent analysis, using keyword routing");
                    None
                }
            },
            Err(e) => {
                debug!("Intent analysis unavailable: {e}");
                None
            }
        }
    }
}

/// Fold model-extracted entities into the routed arguments. The model
/// sees more than the keyword matcher does (lowercase project names,
/// pronoun references), so its project wins over the extracted one.
fn apply_intent(requests: &mut [ActionRequest], intent: &IntentAnalysis) {
    let Some(project) = intent.project() else {
        return;
    };

    for request in requests {
        match request.action {
            Action::StatusLookup => {
                request.arguments["project"] = serde_json::json!(project);
            }
            // Keep the stakeholder search on the same project as the
            // status lookup; standalone searches stay untouched.
            Action::KnowledgeSearch if request.arguments.get("project").is_some() => {
                request.arguments["project"] = serde_json::json!(project);
                request.arguments["query"] =
                    serde_json::json!(format!("{project} stakeholders team members"));
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn demo_copilot() -> Copilot {
        let mut config = Config::default();
        config.general.demo = true;
        Copilot::from_config(config).await.unwrap()
    }

    #[tokio::test]
    async fn test_plain_chat_fallback_appends_turns() {
        let mut copilot = demo_copilot().await;

        let response = copilot.process("hello there").await.unwrap();
        assert!(response.tools_called.is_empty());
        assert!(!response.text.is_empty());

        let turns = copilot.conversation().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].text, "hello there");
        assert_eq!(turns[1].text, response.text);
    }

    #[tokio::test]
    async fn test_status_query_runs_workflow() {
        let mut copilot = demo_copilot().await;

        let response = copilot.process("get Phoenix status").await.unwrap();
        assert_eq!(response.tools_called, vec!["project_status"]);
        assert!(response.text.contains("**Project:** Phoenix"));
        assert!(response.warnings.is_empty());
    }

    #[test]
    fn test_intent_entities_override_routed_project() {
        // Lowercase project names slip past the keyword matcher, so the
        // route falls back to the default project.
        let mut requests = Router::route("get the atlas status and draft an update email");
        assert_eq!(requests[0].arguments["project"], "Phoenix");

        let intent = IntentAnalysis {
            intent: "status_inquiry".to_string(),
            entities: serde_json::json!({"project": "Atlas"}),
            ..Default::default()
        };
        apply_intent(&mut requests, &intent);

        assert_eq!(requests[0].arguments["project"], "Atlas");
        assert_eq!(requests[1].arguments["project"], "Atlas");
        assert!(requests[1].arguments["query"]
            .as_str()
            .unwrap()
            .contains("Atlas"));
    }

    #[test]
    fn test_intent_without_project_changes_nothing() {
        let mut requests = Router::route("get Phoenix status");
        apply_intent(&mut requests, &IntentAnalysis::default());
        assert_eq!(requests[0].arguments["project"], "Phoenix");
    }

    #[tokio::test]
    async fn test_conversation_order_preserved_across_turns() {
        let mut copilot = demo_copilot().await;

        copilot.process("get Phoenix status").await.unwrap();
        copilot.process("plan my day").await.unwrap();

        let turns = copilot.conversation().turns();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].text, "get Phoenix status");
        assert_eq!(turns[2].text, "plan my day");
    }
}
