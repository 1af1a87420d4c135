//! Manifest fetching, checksum deduplication, and persistence.

use super::{validate, AgentReference, AgentRegistry};
use crate::error::{MaestroError, Result};
use crate::store::ManifestStore;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Outcome of a single ingestion pass.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Agents fetched, validated, and persisted this pass.
    pub ingested: usize,
    /// Agents skipped because their content checksum was unchanged.
    pub skipped: usize,
    /// Per-agent failures, as `(agent name, error)` pairs. The references
    /// behind these are requeued for the next pass.
    pub failed: Vec<(String, String)>,
}

/// Fetches agent manifests and persists the validated results.
pub struct AgentLoader {
    registry: Arc<AgentRegistry>,
    store: Arc<ManifestStore>,
    http: reqwest::Client,
}

impl AgentLoader {
    /// Create a loader over the given registry and store.
    pub fn new(
        registry: Arc<AgentRegistry>,
        store: Arc<ManifestStore>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            registry,
            store,
            http,
        }
    }

    /// Drain the registry and ingest every pending reference.
    ///
    /// Per-agent failures are isolated: one unreachable or malformed agent
    /// never aborts the batch. Failed references are put back into the
    /// registry so the next pass retries them.
    #[instrument(skip(self))]
    pub async fn ingest(&self) -> Result<IngestReport> {
        let references = self.registry.drain().await;
        if references.is_empty() {
            return Ok(IngestReport::default());
        }

        info!("Ingesting {} agent reference(s)", references.len());

        let mut report = IngestReport::default();
        let mut requeue = Vec::new();

        for reference in references {
            match self.ingest_one(&reference).await {
                Ok(true) => report.ingested += 1,
                Ok(false) => {
                    debug!("Agent {} unchanged, skipping", reference.name);
                    report.skipped += 1;
                }
                Err(e) => {
                    warn!("Failed to ingest agent {}: {}", reference.name, e);
                    report.failed.push((reference.name.clone(), e.to_string()));
                    requeue.push(reference);
                }
            }
        }

        if !requeue.is_empty() {
            self.registry.register(requeue).await;
        }

        info!(
            "Ingestion pass complete: {} ingested, {} skipped, {} failed",
            report.ingested,
            report.skipped,
            report.failed.len()
        );

        Ok(report)
    }

    /// Ingest a single reference. Returns `Ok(false)` when the stored
    /// checksum matched and the agent was skipped.
    async fn ingest_one(&self, reference: &AgentReference) -> Result<bool> {
        let response = self
            .http
            .get(&reference.manifest_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| MaestroError::Fetch(format!("{}: {}", reference.manifest_url, e)))?;

        let body = response
            .text()
            .await
            .map_err(|e| MaestroError::Fetch(format!("{}: {}", reference.manifest_url, e)))?;

        let checksum = content_checksum(&body);
        if self.store.checksum(&reference.name)?.as_deref() == Some(checksum.as_str()) {
            return Ok(false);
        }

        let raw: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            MaestroError::Validation(vec![format!("manifest is not valid JSON: {}", e)])
        })?;
        let manifest = validate(&raw)?;

        // Checksum last: a stored checksum always implies a persisted manifest.
        self.store.put_manifest(&manifest)?;
        self.store.put_checksum(&reference.name, &checksum)?;

        Ok(true)
    }
}

/// Hex-encoded SHA-256 of manifest content, used to detect changes.
pub(crate) fn content_checksum(content: &str) -> String {
    format!("{:x}", Sha256::digest(content.as_bytes()))
}
