//! In-process knowledge base with embedding search.
//!
//! Documents are embedded on insert and queries run top-k cosine
//! similarity over the whole index. The index is small (company wiki
//! extracts), so a linear scan is plenty.

use std::sync::{Arc, RwLock};

use serde_json::json;
use tracing::{debug, info};

use taskpilot_core::IntegrationError;
use taskpilot_providers::Embedder;

use crate::types::Snippet;

struct Document {
    id: String,
    content: String,
    metadata: serde_json::Value,
    embedding: Vec<f32>,
}

/// Semantic search index over company knowledge.
pub struct KnowledgeBase {
    embedder: Arc<dyn Embedder>,
    documents: RwLock<Vec<Document>>,
}

impl KnowledgeBase {
    /// Create an empty knowledge base.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            documents: RwLock::new(Vec::new()),
        }
    }

    /// Create a knowledge base seeded with the sample company documents.
    pub async fn with_sample_documents(
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, IntegrationError> {
        let kb = Self::new(embedder);
        kb.seed_sample_documents().await?;
        Ok(kb)
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.documents.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a document to the index.
    pub async fn add_document(
        &self,
        id: impl Into<String>,
        content: impl Into<String>,
        metadata: serde_json::Value,
    ) -> Result<(), IntegrationError> {
        let content = content.into();
        let embedding = self.embedder.embed(&content).await.map_err(|e| {
            IntegrationError::NetworkError {
                service: "embeddings".to_string(),
                message: e.to_string(),
            }
        })?;

        let mut documents = self
            .documents
            .write()
            .map_err(|_| IntegrationError::NetworkError {
                service: "knowledge".to_string(),
                message: "index lock poisoned".to_string(),
            })?;
        documents.push(Document {
            id: id.into(),
            content,
            metadata,
            embedding,
        });
        Ok(())
    }

    /// Search the index, returning the `top_k` most similar snippets.
    ///
    /// `project` filters results on the `project` metadata field.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        project: Option<&str>,
    ) -> Result<Vec<Snippet>, IntegrationError> {
        if self.is_empty() {
            return Err(IntegrationError::IndexEmpty);
        }

        let query_embedding = self.embedder.embed(query).await.map_err(|e| {
            IntegrationError::NetworkError {
                service: "embeddings".to_string(),
                message: e.to_string(),
            }
        })?;

        let documents = self
            .documents
            .read()
            .map_err(|_| IntegrationError::NetworkError {
                service: "knowledge".to_string(),
                message: "index lock poisoned".to_string(),
            })?;

        let mut scored: Vec<Snippet> = documents
            .iter()
            .filter(|doc| match project {
                Some(p) => doc
                    .metadata
                    .get("project")
                    .and_then(|v| v.as_str())
                    .map(|v| v.eq_ignore_ascii_case(p))
                    .unwrap_or(false),
                None => true,
            })
            .map(|doc| Snippet {
                id: doc.id.clone(),
                content: doc.content.clone(),
                metadata: doc.metadata.clone(),
                relevance: cosine_similarity(&query_embedding, &doc.embedding),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);

        debug!(results = scored.len(), "knowledge search complete");
        Ok(scored)
    }

    /// Seed the index with the sample Phoenix/Atlas documents.
    pub async fn seed_sample_documents(&self) -> Result<(), IntegrationError> {
        info!("Seeding knowledge base with sample documents");

        self.add_document(
            "doc_phoenix_team",
            "Project Phoenix Team Structure\n\n\
             Core Team:\n\
             - Product Lead: Sarah Chen (VP Product) - sarah.chen@company.com\n\
             - Engineering Lead: Michael Rodriguez (Senior Director Engineering) - michael.r@company.com\n\
             - Design Lead: Jessica Wong (Design Manager) - jessica.wong@company.com\n\n\
             Executive Sponsors:\n\
             - David Park (CTO)\n\
             - Emily Thompson (VP Engineering)\n\n\
             External Stakeholders:\n\
             - Acme Corp - Primary Customer\n\
             - TechVendor Inc - API Integration Partner",
            json!({
                "source": "confluence://projects/phoenix/team",
                "title": "Project Phoenix - Team Structure",
                "project": "Phoenix",
                "doc_type": "confluence",
            }),
        )
        .await?;

        self.add_document(
            "doc_phoenix_comm",
            "Project Phoenix Communication Plan\n\n\
             Weekly status updates should be sent to:\n\
             - phoenix-team@company.com (internal team, ~15 people)\n\
             - executives-phoenix@company.com (CTO, VP Eng, VP Product)\n\
             - For external updates, include customer-success@acmecorp.com\n\n\
             Escalation path for blockers:\n\
             1. Team Lead (Michael Rodriguez)\n\
             2. VP Engineering (Emily Thompson)\n\
             3. CTO (David Park)\n\n\
             Status update cadence:\n\
             - Daily: Standup at 9:00 AM\n\
             - Weekly: Email update on Tuesdays\n\
             - Monthly: Executive review",
            json!({
                "source": "confluence://projects/phoenix/communication",
                "title": "Project Phoenix - Communication Plan",
                "project": "Phoenix",
                "doc_type": "confluence",
            }),
        )
        .await?;

        self.add_document(
            "doc_atlas_overview",
            "Project Atlas Team\n\n\
             Project Atlas is focused on backend infrastructure improvements.\n\n\
             Team Members:\n\
             - Tech Lead: Alex Kumar\n\
             - Backend Engineers: 4 developers\n\
             - DevOps: 2 engineers\n\n\
             Status: On track\n\
             Timeline: Q1 2026 completion target",
            json!({
                "source": "confluence://projects/atlas/overview",
                "title": "Project Atlas - Overview",
                "project": "Atlas",
                "doc_type": "confluence",
            }),
        )
        .await?;

        Ok(())
    }
}

/// Cosine similarity between two vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskpilot_providers::HashEmbedder;

    #[tokio::test]
    async fn test_empty_index_is_an_error() {
        let kb = KnowledgeBase::new(Arc::new(HashEmbedder));
        let result = kb.search("who leads Phoenix", 3, None).await;
        assert!(matches!(result, Err(IntegrationError::IndexEmpty)));
    }

    #[tokio::test]
    async fn test_search_ranks_relevant_document_first() {
        let kb = KnowledgeBase::with_sample_documents(Arc::new(HashEmbedder))
            .await
            .unwrap();

        let results = kb
            .search("Phoenix team structure product lead", 3, None)
            .await
            .unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].id, "doc_phoenix_team");
        assert!(results[0].relevance >= results.last().unwrap().relevance);
    }

    #[tokio::test]
    async fn test_project_filter_restricts_results() {
        let kb = KnowledgeBase::with_sample_documents(Arc::new(HashEmbedder))
            .await
            .unwrap();

        let results = kb.search("team", 5, Some("Atlas")).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "doc_atlas_overview");
    }

    #[tokio::test]
    async fn test_top_k_truncates() {
        let kb = KnowledgeBase::with_sample_documents(Arc::new(HashEmbedder))
            .await
            .unwrap();
        let results = kb.search("project", 2, None).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_cosine_similarity_bounds() {
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0];
        let c = vec![0.0, 1.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&a, &c).abs() < 1e-6);
        assert_eq!(cosine_similarity(&a, &[]), 0.0);
    }
}
