//! SQLite-based vector index implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! For large indexes consider a dedicated vector database behind the same
//! trait.

use super::{cosine_similarity, PointFilter, ScoredPoint, ToolPayload, ToolPoint, VectorIndex};
use crate::error::{MaestroError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS tool_points (
        id TEXT PRIMARY KEY,
        agent_name TEXT NOT NULL,
        tool_name TEXT NOT NULL,
        embedding BLOB NOT NULL,
        payload_json TEXT NOT NULL,
        indexed_at TEXT NOT NULL,
        UNIQUE(agent_name, tool_name)
    );

    CREATE INDEX IF NOT EXISTS idx_tool_points_agent ON tool_points(agent_name);
"#;

/// SQLite-based vector index.
pub struct SqliteVectorIndex {
    conn: Mutex<Connection>,
}

impl SqliteVectorIndex {
    /// Open (or create) an index at the given path.
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector index at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory index (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| MaestroError::Index(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn row_to_point(id: String, embedding: Vec<u8>, payload: String) -> Result<ToolPoint> {
        Ok(ToolPoint {
            id: uuid::Uuid::parse_str(&id)
                .map_err(|e| MaestroError::Index(format!("Corrupt point id {}: {}", id, e)))?,
            embedding: Self::bytes_to_embedding(&embedding),
            payload: serde_json::from_str::<ToolPayload>(&payload)?,
        })
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<ScoredPoint>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, embedding, payload_json FROM tool_points")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut results = Vec::new();
        for row in rows {
            let (id, embedding, payload) = row?;
            let point = Self::row_to_point(id, embedding, payload)?;
            let score = cosine_similarity(query_embedding, &point.embedding);
            results.push(ScoredPoint { point, score });
        }

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);

        Ok(results)
    }

    async fn upsert_by_filter(
        &self,
        filter: &PointFilter,
        embedding: Vec<f32>,
        payload: ToolPayload,
    ) -> Result<uuid::Uuid> {
        let conn = self.lock()?;

        // Reuse the existing identity when the filter matches a point.
        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM tool_points WHERE agent_name = ?1 AND tool_name = ?2",
                params![filter.agent_name, filter.tool_name],
                |row| row.get(0),
            )
            .optional()?;

        let id = match existing {
            Some(id) => uuid::Uuid::parse_str(&id)
                .map_err(|e| MaestroError::Index(format!("Corrupt point id {}: {}", id, e)))?,
            None => uuid::Uuid::new_v4(),
        };

        conn.execute(
            "INSERT OR REPLACE INTO tool_points
             (id, agent_name, tool_name, embedding, payload_json, indexed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id.to_string(),
                filter.agent_name,
                filter.tool_name,
                Self::embedding_to_bytes(&embedding),
                serde_json::to_string(&payload)?,
                Utc::now().to_rfc3339(),
            ],
        )?;

        debug!(
            "Upserted point {} for {}/{}",
            id, filter.agent_name, filter.tool_name
        );
        Ok(id)
    }

    async fn points(&self) -> Result<Vec<ToolPoint>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, embedding, payload_json FROM tool_points")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut points = Vec::new();
        for row in rows {
            let (id, embedding, payload) = row?;
            points.push(Self::row_to_point(id, embedding, payload)?);
        }
        Ok(points)
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM tool_points", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
