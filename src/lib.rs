//! Maestro - Agent-Tool Orchestration
//!
//! An engine that discovers externally-described HTTP tools, indexes them
//! for semantic retrieval, and answers natural-language queries by
//! selecting a tool, resolving its parameters, invoking its endpoint, and
//! narrating the result.
//!
//! # Overview
//!
//! Maestro allows you to:
//! - Register agents that publish tool manifests over HTTP
//! - Ingest and validate manifests with checksum-based change detection
//! - Index every tool description into a vector index
//! - Resolve a user query to one tool invocation and execute it with retry
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and prompt templates
//! - `agent` - Manifest data model, registry, validation, and loading
//! - `store` - Durable manifest and checksum persistence
//! - `llm` - LLM capability abstraction (generation, structured output,
//!   streaming, embeddings)
//! - `vector_index` - Vector index abstraction with memory and SQLite
//!   backends
//! - `indexer` - Tool embedding and idempotent index upsert
//! - `executor` - Per-query retrieval, selection, invocation, explanation
//! - `orchestrator` - Composition root and public surface
//!
//! # Example
//!
//! ```rust,no_run
//! use maestro::agent::AgentReference;
//! use maestro::config::Settings;
//! use maestro::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     orchestrator
//!         .register(vec![AgentReference::new(
//!             "weather-agent",
//!             "http://localhost:9000/agent.json",
//!         )])
//!         .await?;
//!     orchestrator.warm_up().await?;
//!
//!     let answer = orchestrator.invoke_query("weather in Jakarta").await?;
//!     println!("{}", answer);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod executor;
pub mod indexer;
pub mod llm;
pub mod orchestrator;
pub mod store;
pub mod vector_index;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{MaestroError, Result};
