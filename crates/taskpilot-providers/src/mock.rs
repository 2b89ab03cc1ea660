//! Mock provider and embedder for demo mode and tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::traits::{
    CompletionRequest, CompletionResponse, Embedder, FinishReason, ModelInfo, Provider, Usage,
};

/// Provider that replays scripted responses instead of calling an API.
///
/// Responses are consumed in order; once the script runs out, a fixed
/// fallback line is returned.
pub struct MockProvider {
    responses: Mutex<Vec<String>>,
    fallback: String,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            fallback: "I'm running in demo mode without a model API key, so I can only \
                       answer from canned data."
                .to_string(),
        }
    }

    /// Queue responses to be returned in order.
    pub fn with_responses(responses: Vec<String>) -> Self {
        let mut reversed = responses;
        reversed.reverse();
        Self {
            responses: Mutex::new(reversed),
            ..Self::new()
        }
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn id(&self) -> &str {
        "mock"
    }

    fn name(&self) -> &str {
        "Mock"
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![ModelInfo {
            id: "mock-model".to_string(),
            name: "Mock Model".to_string(),
            provider: "mock".to_string(),
            context_window: 128_000,
            max_output_tokens: 8_192,
        }]
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn complete(&self, request: CompletionRequest) -> anyhow::Result<CompletionResponse> {
        let scripted = self
            .responses
            .lock()
            .map_err(|_| anyhow::anyhow!("mock response queue poisoned"))?
            .pop();

        let input_tokens = request
            .messages
            .iter()
            .map(|m| m.text.len() as u32 / 4)
            .sum();

        let content = scripted.unwrap_or_else(|| self.fallback.clone());
        Ok(CompletionResponse {
            usage: Usage {
                input_tokens,
                output_tokens: content.len() as u32 / 4,
            },
            content,
            finish_reason: FinishReason::Stop,
        })
    }
}

/// Embedding dimension used by the hash embedder.
pub const HASH_EMBED_DIM: usize = 64;

/// Deterministic embedder for demo mode and tests.
///
/// Hashes word tokens into a fixed-size vector so that texts sharing
/// vocabulary land close together under cosine similarity. No network,
/// no model, fully reproducible.
pub struct HashEmbedder;

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_id(&self) -> &str {
        "hash-embedder"
    }

    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        Ok(hash_embed(text))
    }
}

/// Hash a text into a fixed-size vector, one bucket per word hash.
pub fn hash_embed(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; HASH_EMBED_DIM];
    for word in text.split_whitespace() {
        let word = word
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if word.is_empty() {
            continue;
        }
        // FNV-1a
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in word.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        vector[(hash % HASH_EMBED_DIM as u64) as usize] += 1.0;
    }

    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_provider_replays_in_order() {
        let provider = MockProvider::with_responses(vec![
            "first".to_string(),
            "second".to_string(),
        ]);
        let request = CompletionRequest::single("system", "hello");

        let a = provider.complete(request.clone()).await.unwrap();
        let b = provider.complete(request.clone()).await.unwrap();
        let c = provider.complete(request).await.unwrap();

        assert_eq!(a.content, "first");
        assert_eq!(b.content, "second");
        assert!(c.content.contains("demo mode"));
    }

    #[test]
    fn test_hash_embed_is_deterministic_and_normalized() {
        let a = hash_embed("migration plan for the Phoenix database");
        let b = hash_embed("migration plan for the Phoenix database");
        assert_eq!(a, b);

        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_hash_embed_shared_vocabulary_scores_higher() {
        let query = hash_embed("database migration strategy");
        let related = hash_embed("the database migration runs in three phases");
        let unrelated = hash_embed("quarterly marketing budget review");

        let dot = |a: &[f32], b: &[f32]| -> f32 {
            a.iter().zip(b).map(|(x, y)| x * y).sum()
        };
        assert!(dot(&query, &related) > dot(&query, &unrelated));
    }
}
