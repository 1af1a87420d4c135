//! Orchestration root for the agent-tool engine.
//!
//! Owns every collaborator (registry, loader, indexer, executor) and the
//! external clients they share. Callers see only `register`, `warm_up`,
//! and the two query entry points.

use crate::agent::{AgentLoader, AgentReference, AgentRegistry, IngestReport};
use crate::config::{Prompts, Settings};
use crate::error::{MaestroError, Result};
use crate::executor::QueryExecutor;
use crate::indexer::ToolIndexer;
use crate::llm::{LlmClient, OpenAiLlm, TextStream};
use crate::store::ManifestStore;
use crate::vector_index::{MemoryVectorIndex, SqliteVectorIndex, VectorIndex};
use std::sync::Arc;
use tracing::{info, instrument};

/// The main orchestrator: discovery, indexing, and query execution.
pub struct Orchestrator {
    registry: Arc<AgentRegistry>,
    loader: AgentLoader,
    indexer: ToolIndexer,
    executor: QueryExecutor,
}

impl Orchestrator {
    /// Create an orchestrator from settings, constructing all clients.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let llm: Arc<dyn LlmClient> = match settings.llm.provider.as_str() {
            "openai" => Arc::new(OpenAiLlm::new(&settings.llm)),
            other => {
                return Err(MaestroError::Config(format!(
                    "Unknown LLM provider: {}",
                    other
                )))
            }
        };

        let index: Arc<dyn VectorIndex> = match settings.vector_index.provider.as_str() {
            "sqlite" => Arc::new(SqliteVectorIndex::new(&settings.index_path())?),
            "memory" => Arc::new(MemoryVectorIndex::new()),
            other => {
                return Err(MaestroError::Config(format!(
                    "Unknown vector index provider: {}",
                    other
                )))
            }
        };

        let store = Arc::new(ManifestStore::new(&settings.store_path())?);

        let http = reqwest::Client::builder()
            .timeout(settings.invocation.request_timeout())
            .build()?;

        Ok(Self::with_components(
            &settings, prompts, llm, index, store, http,
        ))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: &Settings,
        prompts: Prompts,
        llm: Arc<dyn LlmClient>,
        index: Arc<dyn VectorIndex>,
        store: Arc<ManifestStore>,
        http: reqwest::Client,
    ) -> Self {
        let registry = Arc::new(AgentRegistry::new());
        let loader = AgentLoader::new(registry.clone(), store.clone(), http.clone());
        let indexer = ToolIndexer::new(store, llm.clone(), index.clone());
        let executor = QueryExecutor::new(
            llm,
            index,
            http,
            prompts,
            settings.retrieval.clone(),
            settings.invocation.clone(),
        );

        Self {
            registry,
            loader,
            indexer,
            executor,
        }
    }

    /// Queue agent references for the next ingestion pass.
    pub async fn register(&self, references: Vec<AgentReference>) -> Result<()> {
        for reference in &references {
            if reference.name.trim().is_empty() {
                return Err(MaestroError::Registration(
                    "agent reference has an empty name".to_string(),
                ));
            }
            if url::Url::parse(&reference.manifest_url).is_err() {
                return Err(MaestroError::Registration(format!(
                    "agent {} has an invalid manifest URL: {}",
                    reference.name, reference.manifest_url
                )));
            }
        }

        self.registry.register(references).await;
        Ok(())
    }

    /// Ingest all pending registrations, then (re-)index every tool.
    #[instrument(skip(self))]
    pub async fn warm_up(&self) -> Result<IngestReport> {
        let report = self.loader.ingest().await?;
        let indexed = self.indexer.index_all().await?;
        info!(
            "Warm-up complete: {} ingested, {} skipped, {} failed, {} tool(s) indexed",
            report.ingested,
            report.skipped,
            report.failed.len(),
            indexed
        );
        Ok(report)
    }

    /// Answer a query with a completed explanation.
    pub async fn invoke_query(&self, query: &str) -> Result<String> {
        self.executor.run(query).await
    }

    /// Answer a query as a stream of explanation fragments.
    pub async fn invoke_query_stream(&self, query: &str) -> Result<TextStream> {
        self.executor.run_stream(query).await
    }
}
