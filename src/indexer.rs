//! Embeds tool descriptions and upserts them into the vector index.

use crate::agent::{AgentManifest, ToolDefinition};
use crate::error::{MaestroError, Result};
use crate::llm::LlmClient;
use crate::store::ManifestStore;
use crate::vector_index::{PointFilter, ToolPayload, VectorIndex};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Indexes every tool of every persisted manifest for semantic retrieval.
pub struct ToolIndexer {
    store: Arc<ManifestStore>,
    llm: Arc<dyn LlmClient>,
    index: Arc<dyn VectorIndex>,
}

impl ToolIndexer {
    /// Create an indexer over the given store, LLM, and index.
    pub fn new(
        store: Arc<ManifestStore>,
        llm: Arc<dyn LlmClient>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self { store, llm, index }
    }

    /// Embed and upsert every tool of every persisted manifest.
    ///
    /// Idempotent: running twice with unchanged manifests leaves the index
    /// entry set unchanged. Per-tool failures are isolated and logged; the
    /// pass continues. Returns the number of tools indexed.
    #[instrument(skip(self))]
    pub async fn index_all(&self) -> Result<usize> {
        let manifests = self.store.list_manifests()?;

        let mut indexed = 0;
        for manifest in &manifests {
            for tool in &manifest.tools {
                match self.index_tool(manifest, tool).await {
                    Ok(_) => indexed += 1,
                    Err(e) => {
                        warn!(
                            "Failed to index tool {}/{}: {}",
                            manifest.agent_name, tool.name, e
                        );
                    }
                }
            }
        }

        info!("Indexed {} tool(s) from {} manifest(s)", indexed, manifests.len());
        Ok(indexed)
    }

    /// Embed one tool and upsert it keyed by `(agent_name, tool name)`.
    async fn index_tool(&self, manifest: &AgentManifest, tool: &ToolDefinition) -> Result<Uuid> {
        let text = semantic_text(manifest, tool);

        let embedding = self
            .llm
            .embed(&text)
            .await
            .map_err(|e| MaestroError::Index(format!("embedding failed: {}", e)))?;

        let filter = PointFilter {
            agent_name: manifest.agent_name.clone(),
            tool_name: tool.name.clone(),
        };
        let payload = ToolPayload {
            agent_name: manifest.agent_name.clone(),
            required_auth: manifest.required_auth,
            auth_type: manifest.auth_type.unwrap_or_default(),
            tool: tool.clone(),
        };

        self.index
            .upsert_by_filter(&filter, embedding, payload)
            .await
            .map_err(|e| MaestroError::Index(format!("upsert failed: {}", e)))
    }
}

/// The semantic string a tool is embedded under.
fn semantic_text(manifest: &AgentManifest, tool: &ToolDefinition) -> String {
    format!(
        "Agent Name: {}, Tool Name: {}, Tool Description: {}, Tool Intents: {}",
        manifest.agent_name,
        tool.name,
        tool.description,
        tool.intent_examples.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeLlm;
    use crate::vector_index::MemoryVectorIndex;

    fn manifest_with_tools(agent: &str, tools: &[&str]) -> AgentManifest {
        let tools: Vec<serde_json::Value> = tools
            .iter()
            .map(|name| {
                serde_json::json!({
                    "name": name,
                    "description": format!("{} tool", name),
                    "intent_examples": [format!("use {}", name), format!("run {}", name)],
                    "tags": [],
                    "schema": {
                        "name": name,
                        "description": format!("{} tool", name),
                        "parameters": {
                            "type": "object",
                            "properties": {"city": {"type": "string"}},
                            "required": ["city"]
                        }
                    },
                    "http": {"method": "GET", "url": format!("http://localhost:9000/{}", name)}
                })
            })
            .collect();

        serde_json::from_value(serde_json::json!({
            "agent_name": agent,
            "requiredAuth": true,
            "authType": "SSO",
            "tools": tools,
        }))
        .unwrap()
    }

    fn indexer() -> (ToolIndexer, Arc<ManifestStore>, Arc<MemoryVectorIndex>) {
        let store = Arc::new(ManifestStore::in_memory().unwrap());
        let index = Arc::new(MemoryVectorIndex::new());
        let llm = Arc::new(FakeLlm::new(vec![1.0, 0.0, 0.0]));
        let indexer = ToolIndexer::new(store.clone(), llm, index.clone());
        (indexer, store, index)
    }

    #[tokio::test]
    async fn test_index_all_covers_every_tool() {
        let (indexer, store, index) = indexer();
        store
            .put_manifest(&manifest_with_tools("alpha", &["a1", "a2"]))
            .unwrap();
        store
            .put_manifest(&manifest_with_tools("beta", &["b1"]))
            .unwrap();

        let indexed = indexer.index_all().await.unwrap();
        assert_eq!(indexed, 3);
        assert_eq!(index.count().await.unwrap(), 3);

        let points = index.points().await.unwrap();
        let payload = points
            .iter()
            .find(|p| p.payload.tool.name == "a1")
            .unwrap();
        assert_eq!(payload.payload.agent_name, "alpha");
        assert!(payload.payload.required_auth);
    }

    #[tokio::test]
    async fn test_index_all_is_idempotent() {
        let (indexer, store, index) = indexer();
        store
            .put_manifest(&manifest_with_tools("alpha", &["a1", "a2"]))
            .unwrap();

        indexer.index_all().await.unwrap();
        let mut first: Vec<_> = index
            .points()
            .await
            .unwrap()
            .into_iter()
            .map(|p| (p.id, serde_json::to_string(&p.payload).unwrap()))
            .collect();
        first.sort();

        indexer.index_all().await.unwrap();
        let mut second: Vec<_> = index
            .points()
            .await
            .unwrap()
            .into_iter()
            .map(|p| (p.id, serde_json::to_string(&p.payload).unwrap()))
            .collect();
        second.sort();

        // Same identities, same payloads, no duplicates.
        assert_eq!(first, second);
    }

    #[test]
    fn test_semantic_text_shape() {
        let manifest = manifest_with_tools("alpha", &["a1"]);
        let text = semantic_text(&manifest, &manifest.tools[0]);
        assert_eq!(
            text,
            "Agent Name: alpha, Tool Name: a1, Tool Description: a1 tool, \
             Tool Intents: use a1, run a1"
        );
    }
}
