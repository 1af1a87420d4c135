//! Vector index abstraction for semantic tool retrieval.
//!
//! Provides a trait-based interface over similarity search and filtered
//! idempotent upsert, with in-memory and SQLite backends.

mod memory;
mod sqlite;

pub use memory::MemoryVectorIndex;
pub use sqlite::SqliteVectorIndex;

use crate::agent::{AuthType, ToolDefinition};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload stored alongside each tool embedding: the tool definition plus
/// the owning agent's identity and auth flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolPayload {
    pub agent_name: String,
    #[serde(rename = "requiredAuth")]
    pub required_auth: bool,
    #[serde(rename = "authType")]
    pub auth_type: AuthType,
    #[serde(flatten)]
    pub tool: ToolDefinition,
}

/// An indexed tool vector. Unique per `(agent_name, tool name)`.
#[derive(Debug, Clone)]
pub struct ToolPoint {
    /// Point identity, preserved across re-indexing.
    pub id: Uuid,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// Tool payload.
    pub payload: ToolPayload,
}

/// Filter identifying at most one point in the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointFilter {
    pub agent_name: String,
    pub tool_name: String,
}

/// A search match with similarity score.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    /// The matched point.
    pub point: ToolPoint,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Trait for vector index implementations.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Search for the most similar points, sorted descending by score and
    /// truncated at `limit`.
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<ScoredPoint>>;

    /// Insert-or-replace keyed by filter: when a point matches, its vector
    /// and payload are replaced in place and its identity preserved;
    /// otherwise a new identity is assigned. Returns the point identity.
    async fn upsert_by_filter(
        &self,
        filter: &PointFilter,
        embedding: Vec<f32>,
        payload: ToolPayload,
    ) -> Result<Uuid>;

    /// All points currently stored, in unspecified order.
    async fn points(&self) -> Result<Vec<ToolPoint>>;

    /// Total point count.
    async fn count(&self) -> Result<usize>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
pub(crate) fn sample_payload(agent_name: &str, tool_name: &str) -> ToolPayload {
    serde_json::from_value(serde_json::json!({
        "agent_name": agent_name,
        "requiredAuth": false,
        "authType": "Individual",
        "name": tool_name,
        "description": format!("{} tool", tool_name),
        "intent_examples": [format!("use {}", tool_name)],
        "tags": [],
        "schema": {
            "name": tool_name,
            "description": format!("{} tool", tool_name),
            "parameters": {
                "type": "object",
                "properties": {"city": {"type": "string"}},
                "required": ["city"]
            }
        },
        "http": {"method": "GET", "url": format!("http://localhost:9000/{}", tool_name)}
    }))
    .unwrap()
}
