//! Pending-registration registry for agent references.

use super::AgentReference;
use tokio::sync::Mutex;
use tracing::debug;

/// Mutex-guarded holding area for agent references awaiting ingestion.
///
/// `register` appends and `drain` takes-and-empties under the same lock,
/// so concurrent registrations from multiple callers are cumulative and an
/// ingestion pass observes a consistent snapshot.
pub struct AgentRegistry {
    pending: Mutex<Vec<AgentReference>>,
}

impl AgentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Append references to the pending list. No deduplication.
    pub async fn register(&self, references: Vec<AgentReference>) {
        let mut pending = self.pending.lock().await;
        debug!("Registering {} agent reference(s)", references.len());
        pending.extend(references);
    }

    /// Atomically return and empty the current pending list.
    pub async fn drain(&self) -> Vec<AgentReference> {
        let mut pending = self.pending.lock().await;
        std::mem::take(&mut *pending)
    }

    /// Number of references currently pending.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_register_then_drain() {
        let registry = AgentRegistry::new();
        registry
            .register(vec![
                AgentReference::new("a", "http://localhost/a.json"),
                AgentReference::new("b", "http://localhost/b.json"),
            ])
            .await;
        assert_eq!(registry.pending_count().await, 2);

        let drained = registry.drain().await;
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].name, "a");
        assert_eq!(registry.pending_count().await, 0);

        // A second drain sees nothing.
        assert!(registry.drain().await.is_empty());
    }

    #[tokio::test]
    async fn test_register_appends_without_dedup() {
        let registry = AgentRegistry::new();
        let reference = AgentReference::new("a", "http://localhost/a.json");
        registry.register(vec![reference.clone()]).await;
        registry.register(vec![reference]).await;
        assert_eq!(registry.pending_count().await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_registrations_are_cumulative() {
        let registry = Arc::new(AgentRegistry::new());

        let mut handles = Vec::new();
        for i in 0..10 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry
                    .register(vec![AgentReference::new(
                        format!("agent-{}", i),
                        format!("http://localhost/{}.json", i),
                    )])
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(registry.drain().await.len(), 10);
    }
}
