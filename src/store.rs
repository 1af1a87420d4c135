//! Durable manifest and checksum persistence.
//!
//! One manifest record and one checksum record per agent name, stored in
//! SQLite. A checksum is written only after its manifest write succeeded,
//! so a stored checksum always refers to fully ingested content.

use crate::agent::AgentManifest;
use crate::error::{MaestroError, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS manifests (
        agent_name TEXT PRIMARY KEY,
        manifest_json TEXT NOT NULL,
        ingested_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS checksums (
        agent_name TEXT PRIMARY KEY,
        checksum TEXT NOT NULL,
        recorded_at TEXT NOT NULL
    );
"#;

/// SQLite-backed store for agent manifests and content checksums.
pub struct ManifestStore {
    conn: Mutex<Connection>,
}

impl ManifestStore {
    /// Open (or create) a store at the given path.
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized manifest store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
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
            .map_err(|e| MaestroError::Store(format!("Failed to acquire lock: {}", e)))
    }

    /// Persist a manifest, replacing any previous record for the agent.
    pub fn put_manifest(&self, manifest: &AgentManifest) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO manifests (agent_name, manifest_json, ingested_at)
             VALUES (?1, ?2, ?3)",
            params![
                manifest.agent_name,
                serde_json::to_string(manifest)?,
                Utc::now().to_rfc3339(),
            ],
        )?;
        debug!("Persisted manifest for {}", manifest.agent_name);
        Ok(())
    }

    /// Fetch one manifest by agent name.
    pub fn get_manifest(&self, agent_name: &str) -> Result<Option<AgentManifest>> {
        let conn = self.lock()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT manifest_json FROM manifests WHERE agent_name = ?1",
                params![agent_name],
                |row| row.get(0),
            )
            .optional()?;
        json.map(|j| serde_json::from_str(&j).map_err(Into::into))
            .transpose()
    }

    /// List all persisted manifests, ordered by agent name.
    pub fn list_manifests(&self) -> Result<Vec<AgentManifest>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT manifest_json FROM manifests ORDER BY agent_name")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut manifests = Vec::new();
        for row in rows {
            manifests.push(serde_json::from_str(&row?)?);
        }
        Ok(manifests)
    }

    /// When the agent's manifest was last ingested.
    pub fn ingested_at(&self, agent_name: &str) -> Result<Option<DateTime<Utc>>> {
        let conn = self.lock()?;
        let ts: Option<String> = conn
            .query_row(
                "SELECT ingested_at FROM manifests WHERE agent_name = ?1",
                params![agent_name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(ts.and_then(|t| {
            DateTime::parse_from_rfc3339(&t)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        }))
    }

    /// The checksum recorded for an agent's last fully ingested content.
    pub fn checksum(&self, agent_name: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT checksum FROM checksums WHERE agent_name = ?1",
            params![agent_name],
            |row| row.get(0),
        )
        .optional()
        .map_err(Into::into)
    }

    /// Record the checksum for an agent. Call only after the manifest write
    /// succeeded.
    pub fn put_checksum(&self, agent_name: &str, checksum: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO checksums (agent_name, checksum, recorded_at)
             VALUES (?1, ?2, ?3)",
            params![agent_name, checksum, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AuthType;

    fn sample_manifest(name: &str) -> AgentManifest {
        serde_json::from_value(serde_json::json!({
            "agent_name": name,
            "requiredAuth": false,
            "authType": "Individual",
            "tools": []
        }))
        .unwrap()
    }

    #[test]
    fn test_manifest_roundtrip() {
        let store = ManifestStore::in_memory().unwrap();
        store.put_manifest(&sample_manifest("alpha")).unwrap();
        store.put_manifest(&sample_manifest("beta")).unwrap();

        let fetched = store.get_manifest("alpha").unwrap().unwrap();
        assert_eq!(fetched.agent_name, "alpha");
        assert_eq!(fetched.auth_type, Some(AuthType::Individual));

        let all = store.list_manifests().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].agent_name, "alpha");
        assert_eq!(all[1].agent_name, "beta");

        assert!(store.get_manifest("gamma").unwrap().is_none());
    }

    #[test]
    fn test_put_manifest_replaces_existing() {
        let store = ManifestStore::in_memory().unwrap();
        let mut manifest = sample_manifest("alpha");
        store.put_manifest(&manifest).unwrap();

        manifest.required_auth = true;
        store.put_manifest(&manifest).unwrap();

        let all = store.list_manifests().unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].required_auth);
    }

    #[test]
    fn test_checksum_roundtrip() {
        let store = ManifestStore::in_memory().unwrap();
        assert!(store.checksum("alpha").unwrap().is_none());

        store.put_checksum("alpha", "abc123").unwrap();
        assert_eq!(store.checksum("alpha").unwrap().unwrap(), "abc123");

        store.put_checksum("alpha", "def456").unwrap();
        assert_eq!(store.checksum("alpha").unwrap().unwrap(), "def456");
    }

    #[test]
    fn test_on_disk_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifests.db");
        let store = ManifestStore::new(&path).unwrap();
        store.put_manifest(&sample_manifest("alpha")).unwrap();
        drop(store);

        let reopened = ManifestStore::new(&path).unwrap();
        assert_eq!(reopened.list_manifests().unwrap().len(), 1);
    }
}
