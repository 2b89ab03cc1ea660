//! Prompt templates for the conversational paths.

/// System prompt for plain conversational replies.
pub const SYSTEM_PROMPT: &str = "\
You are a business copilot assistant helping product managers and team \
leads with their daily work.

Rules:
1. Only state facts that come from tool outputs or the conversation. \
Never invent numbers, names, or details.
2. Cite the source of factual claims and use exact values.
3. If you lack information, say so, describe what you do have, and offer \
to look it up.
4. Express uncertainty explicitly rather than guessing.

You can check project status, search the company knowledge base, draft \
emails, review calendars, and build prioritized daily plans when asked.";

/// Template for the best-effort intent analysis step.
const INTENT_ANALYSIS_TEMPLATE: &str = "\
Analyze the user's request and identify:

1. Primary intent (what they want to accomplish)
2. Entities mentioned (projects, people, dates)
3. Required actions and tools
4. Any ambiguities that need clarification

User request: {user_query}

Respond with only a JSON object:
- intent: primary goal
- entities: object of entity types and values
- required_tools: list of tool names needed
- confidence: float 0-1 indicating clarity
- ambiguities: list of unclear aspects";

/// Fill the intent analysis template.
pub fn intent_analysis_prompt(user_query: &str) -> String {
    INTENT_ANALYSIS_TEMPLATE.replace("{user_query}", user_query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_prompt_interpolates_query() {
        let prompt = intent_analysis_prompt("get Phoenix status");
        assert!(prompt.contains("User request: get Phoenix status"));
        assert!(!prompt.contains("{user_query}"));
    }
}
