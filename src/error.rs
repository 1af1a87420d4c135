//! Error types for Maestro.

use thiserror::Error;

/// Library-level error type for Maestro operations.
#[derive(Error, Debug)]
pub enum MaestroError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Registration error: {0}")]
    Registration(String),

    #[error("Manifest fetch failed: {0}")]
    Fetch(String),

    #[error("Manifest validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Tool indexing failed: {0}")]
    Index(String),

    #[error("Tool selection failed: {0}")]
    Selection(String),

    #[error("Tool invocation failed: {0}")]
    Invocation(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("LLM provider error: {0}")]
    Llm(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("{0}")]
    General(String),
}

/// Result type alias for Maestro operations.
pub type Result<T> = std::result::Result<T, MaestroError>;
