//! Agent manifests and their ingestion pipeline.
//!
//! An agent is an externally-hosted service that publishes a manifest
//! describing its callable tools. This module owns the manifest data model,
//! the pending-registration registry, structural validation, and the loader
//! that fetches and persists manifests.

mod loader;
mod registry;
mod validator;

pub use loader::{AgentLoader, IngestReport};
pub use registry::AgentRegistry;
pub use validator::validate;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A reference to an agent pending ingestion.
///
/// Ephemeral: held in the registry only until consumed by an ingestion pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReference {
    /// Agent name, used as the cache key for manifest and checksum records.
    pub name: String,
    /// URL the agent's manifest is fetched from.
    pub manifest_url: String,
}

impl AgentReference {
    /// Create a new agent reference.
    pub fn new(name: impl Into<String>, manifest_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            manifest_url: manifest_url.into(),
        }
    }
}

/// A validated agent manifest, persisted one per agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentManifest {
    pub agent_name: String,
    /// Recorded but not enforced.
    #[serde(rename = "requiredAuth", default)]
    pub required_auth: bool,
    #[serde(rename = "authType", default)]
    pub auth_type: Option<AuthType>,
    pub tools: Vec<ToolDefinition>,
}

/// Authentication scheme an agent declares for its tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AuthType {
    #[default]
    Individual,
    #[serde(rename = "SSO")]
    Sso,
}

/// A single invocable tool: semantic description plus HTTP binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub intent_examples: Vec<String>,
    pub tags: Vec<String>,
    /// Parameter schema, nested under `schema` on the wire.
    pub schema: ToolSchema,
    pub http: HttpBinding,
}

impl ToolDefinition {
    /// The tool's parameter schema.
    pub fn parameters(&self) -> &ToolParameters {
        &self.schema.parameters
    }
}

/// JSON-schema-style description of a tool's parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: ToolParameters,
}

/// An object-typed parameter set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameters {
    /// Always `"object"`; enforced by the validator.
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: BTreeMap<String, PropertySpec>,
    pub required: Vec<String>,
}

/// Schema for a single tool parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

/// HTTP binding for a tool endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpBinding {
    pub method: HttpMethod,
    pub url: String,
}

/// HTTP methods a tool may bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    /// All method names accepted on the wire.
    pub const NAMES: [&'static str; 5] = ["GET", "POST", "PUT", "DELETE", "PATCH"];
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        };
        write!(f, "{}", name)
    }
}
