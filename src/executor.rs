//! Query execution: retrieval, tool selection, invocation, explanation.
//!
//! Each query runs the same pass: embed the query, retrieve candidate
//! tools, have the LLM resolve one invocation, gate on required fields,
//! call the endpoint with backoff, and narrate the outcome. Executors hold
//! no per-query state, so independent queries run fully in parallel.

use crate::agent::HttpMethod;
use crate::config::{InvocationSettings, Prompts, RetrievalSettings};
use crate::error::{MaestroError, Result};
use crate::llm::{LlmClient, TextStream};
use crate::vector_index::{ToolPayload, VectorIndex};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// The invocation resolved by tool selection. Transient, one per query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedInvocation {
    pub url: String,
    pub method: HttpMethod,
    /// Parameter values; null where the query did not provide one.
    #[serde(default)]
    pub payload: Map<String, Value>,
    /// Optional hint from selection, carried into the explanation.
    #[serde(default)]
    pub guidance_note: Option<String>,
}

/// JSON schema the selection result must conform to.
fn invocation_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "url": {"type": "string"},
            "method": {
                "type": "string",
                "enum": ["GET", "POST", "PUT", "DELETE", "PATCH"]
            },
            "payload": {"type": "object", "additionalProperties": true},
            "guidance_note": {"type": ["string", "null"]}
        },
        "required": ["url", "method", "payload"],
        "additionalProperties": false
    })
}

/// Executes natural-language queries against the tool index.
pub struct QueryExecutor {
    llm: Arc<dyn LlmClient>,
    index: Arc<dyn VectorIndex>,
    http: reqwest::Client,
    prompts: Prompts,
    retrieval: RetrievalSettings,
    invocation: InvocationSettings,
}

impl QueryExecutor {
    /// Create an executor over the given capabilities.
    pub fn new(
        llm: Arc<dyn LlmClient>,
        index: Arc<dyn VectorIndex>,
        http: reqwest::Client,
        prompts: Prompts,
        retrieval: RetrievalSettings,
        invocation: InvocationSettings,
    ) -> Self {
        Self {
            llm,
            index,
            http,
            prompts,
            retrieval,
            invocation,
        }
    }

    /// Execute a query and return the completed explanation.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn run(&self, query: &str) -> Result<String> {
        let prompt = self.prepare(query).await?;
        self.llm.generate(&prompt).await
    }

    /// Execute a query and stream the explanation incrementally.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn run_stream(&self, query: &str) -> Result<TextStream> {
        let prompt = self.prepare(query).await?;
        self.llm.generate_stream(&prompt).await
    }

    /// Run everything up to the explanation and return the prompt that
    /// narrates the outcome. Buffered and streaming execution differ only
    /// in how that prompt is rendered.
    async fn prepare(&self, query: &str) -> Result<String> {
        // EMBED
        let embedding = self.llm.embed(query).await?;

        // RETRIEVE
        let hits = self.index.search(&embedding, self.retrieval.top_k).await?;
        let candidates: Vec<ToolPayload> = hits
            .into_iter()
            .filter(|hit| hit.score >= self.retrieval.min_score)
            .map(|hit| hit.point.payload)
            .collect();

        // No tool is relevant enough: answer from general knowledge.
        if candidates.is_empty() {
            debug!("No tool candidates above threshold, answering directly");
            let answer = self.llm.generate(query).await?;
            return Ok(self.explain_prompt(query, &answer, None));
        }

        // SELECT
        let invocation = self.select_tool(&candidates, query).await?;

        // Completeness gate: never invoke with unresolved required fields.
        let missing = missing_required(&candidates, &invocation);
        if !missing.is_empty() {
            info!("Invocation needs user input for: {}", missing.join(", "));
            return Ok(self.clarify_prompt(query, &missing));
        }

        // INVOKE
        match self.perform_request(&invocation).await {
            Ok(body) => Ok(self.explain_prompt(query, &body, invocation.guidance_note.as_deref())),
            Err(e) => {
                warn!("{}", e);
                let note = format!("The tool call could not be completed: {}", e);
                Ok(self.explain_prompt(query, &note, invocation.guidance_note.as_deref()))
            }
        }
    }

    /// Ask the LLM to choose one candidate and resolve its invocation.
    /// A result that does not conform to the schema is fatal for the query.
    async fn select_tool(
        &self,
        candidates: &[ToolPayload],
        query: &str,
    ) -> Result<ResolvedInvocation> {
        let schemas = candidates
            .iter()
            .map(serde_json::to_string)
            .collect::<std::result::Result<Vec<_>, _>>()?
            .join("\n");

        let mut vars = HashMap::new();
        vars.insert("schemas".to_string(), schemas);
        vars.insert("query".to_string(), query.to_string());
        let prompt = self
            .prompts
            .render_with_custom(&self.prompts.selection.user, &vars);

        let value = self
            .llm
            .generate_structured(&prompt, "resolved_invocation", &invocation_schema())
            .await?;

        serde_json::from_value(value).map_err(|e| {
            MaestroError::Selection(format!(
                "structured selection did not match the expected shape: {}",
                e
            ))
        })
    }

    /// Call the resolved endpoint with exponential backoff.
    async fn perform_request(&self, invocation: &ResolvedInvocation) -> Result<String> {
        // Unresolved optional fields are dropped, not sent as nulls.
        let payload: Map<String, Value> = invocation
            .payload
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.send_once(invocation, &payload).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    if attempt > self.invocation.retries {
                        return Err(MaestroError::Invocation(format!(
                            "{} {} failed after {} attempts: {}",
                            invocation.method, invocation.url, attempt, e
                        )));
                    }
                    let delay = self
                        .invocation
                        .base_delay()
                        .mul_f64(2f64.powi(attempt as i32 - 1));
                    warn!(
                        "Tool call attempt {} failed, retrying in {:.1}s: {}",
                        attempt,
                        delay.as_secs_f64(),
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn send_once(
        &self,
        invocation: &ResolvedInvocation,
        payload: &Map<String, Value>,
    ) -> std::result::Result<String, String> {
        let mut request = self
            .http
            .request(invocation.method.into(), &invocation.url);

        // GET sends the payload as query parameters, everything else as a
        // JSON body.
        request = if invocation.method == HttpMethod::Get {
            request.query(&query_pairs(payload))
        } else {
            request.json(payload)
        };

        let response = request.send().await.map_err(|e| e.to_string())?;
        let response = response.error_for_status().map_err(|e| e.to_string())?;
        response.text().await.map_err(|e| e.to_string())
    }

    fn explain_prompt(&self, query: &str, answer: &str, guidance: Option<&str>) -> String {
        let mut vars = HashMap::new();
        vars.insert("query".to_string(), query.to_string());
        vars.insert("answer".to_string(), answer.to_string());
        vars.insert(
            "guidance".to_string(),
            guidance.map(|g| format!("{}\n", g)).unwrap_or_default(),
        );
        self.prompts
            .render_with_custom(&self.prompts.explain.user, &vars)
    }

    fn clarify_prompt(&self, query: &str, missing: &[String]) -> String {
        let mut vars = HashMap::new();
        vars.insert("query".to_string(), query.to_string());
        vars.insert("fields".to_string(), missing.join(", "));
        self.prompts
            .render_with_custom(&self.prompts.clarify.user, &vars)
    }
}

/// Required fields the resolved payload left null or absent.
///
/// The invocation is matched back to its candidate by HTTP binding to learn
/// the tool's required list; if no candidate matches, every null field
/// counts as missing.
fn missing_required(candidates: &[ToolPayload], invocation: &ResolvedInvocation) -> Vec<String> {
    let matched = candidates
        .iter()
        .find(|c| c.tool.http.url == invocation.url && c.tool.http.method == invocation.method)
        .or_else(|| candidates.iter().find(|c| c.tool.http.url == invocation.url));

    match matched {
        Some(candidate) => candidate
            .tool
            .parameters()
            .required
            .iter()
            .filter(|field| {
                invocation
                    .payload
                    .get(field.as_str())
                    .is_none_or(Value::is_null)
            })
            .cloned()
            .collect(),
        None => invocation
            .payload
            .iter()
            .filter(|(_, value)| value.is_null())
            .map(|(field, _)| field.clone())
            .collect(),
    }
}

/// Flatten a JSON payload into query parameters, unquoting strings.
fn query_pairs(payload: &Map<String, Value>) -> Vec<(String, String)> {
    payload
        .iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), rendered)
        })
        .collect()
}
