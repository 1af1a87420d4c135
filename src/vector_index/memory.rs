//! In-memory vector index implementation.
//!
//! Useful for testing and small deployments.

use super::{cosine_similarity, PointFilter, ScoredPoint, ToolPayload, ToolPoint, VectorIndex};
use crate::error::{MaestroError, Result};
use async_trait::async_trait;
use std::sync::RwLock;
use uuid::Uuid;

/// In-memory vector index.
pub struct MemoryVectorIndex {
    points: RwLock<Vec<ToolPoint>>,
}

impl MemoryVectorIndex {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self {
            points: RwLock::new(Vec::new()),
        }
    }
}

impl Default for MemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_error<T>(e: T) -> MaestroError
where
    T: std::fmt::Display,
{
    MaestroError::Index(format!("Failed to acquire lock: {}", e))
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<ScoredPoint>> {
        let points = self.points.read().map_err(lock_error)?;

        let mut results: Vec<ScoredPoint> = points
            .iter()
            .map(|point| ScoredPoint {
                point: point.clone(),
                score: cosine_similarity(query_embedding, &point.embedding),
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);

        Ok(results)
    }

    async fn upsert_by_filter(
        &self,
        filter: &PointFilter,
        embedding: Vec<f32>,
        payload: ToolPayload,
    ) -> Result<Uuid> {
        let mut points = self.points.write().map_err(lock_error)?;

        let existing = points.iter_mut().find(|p| {
            p.payload.agent_name == filter.agent_name && p.payload.tool.name == filter.tool_name
        });

        match existing {
            Some(point) => {
                point.embedding = embedding;
                point.payload = payload;
                Ok(point.id)
            }
            None => {
                let id = Uuid::new_v4();
                points.push(ToolPoint {
                    id,
                    embedding,
                    payload,
                });
                Ok(id)
            }
        }
    }

    async fn points(&self) -> Result<Vec<ToolPoint>> {
        let points = self.points.read().map_err(lock_error)?;
        Ok(points.clone())
    }

    async fn count(&self) -> Result<usize> {
        let points = self.points.read().map_err(lock_error)?;
        Ok(points.len())
    }
}

#[cfg(test)]
mod tests {
    use super::super::sample_payload;
    use super::*;

    #[tokio::test]
    async fn test_search_orders_and_truncates() {
        let index = MemoryVectorIndex::new();
        for (name, embedding) in [
            ("a", vec![1.0, 0.0, 0.0]),
            ("b", vec![0.9, 0.1, 0.0]),
            ("c", vec![0.0, 1.0, 0.0]),
        ] {
            index
                .upsert_by_filter(
                    &PointFilter {
                        agent_name: "agent".to_string(),
                        tool_name: name.to_string(),
                    },
                    embedding,
                    sample_payload("agent", name),
                )
                .await
                .unwrap();
        }

        let results = index.search(&[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].point.payload.tool.name, "a");
        assert_eq!(results[1].point.payload.tool.name, "b");
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_upsert_replaces_in_place_and_preserves_identity() {
        let index = MemoryVectorIndex::new();
        let filter = PointFilter {
            agent_name: "agent".to_string(),
            tool_name: "tool".to_string(),
        };

        let first = index
            .upsert_by_filter(&filter, vec![1.0, 0.0], sample_payload("agent", "tool"))
            .await
            .unwrap();
        let second = index
            .upsert_by_filter(&filter, vec![0.0, 1.0], sample_payload("agent", "tool"))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(index.count().await.unwrap(), 1);

        let points = index.points().await.unwrap();
        assert_eq!(points[0].embedding, vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn test_distinct_filters_get_distinct_points() {
        let index = MemoryVectorIndex::new();
        for tool in ["a", "b"] {
            index
                .upsert_by_filter(
                    &PointFilter {
                        agent_name: "agent".to_string(),
                        tool_name: tool.to_string(),
                    },
                    vec![1.0],
                    sample_payload("agent", tool),
                )
                .await
                .unwrap();
        }
        assert_eq!(index.count().await.unwrap(), 2);
    }
}
