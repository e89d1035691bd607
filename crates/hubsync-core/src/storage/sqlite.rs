//! SQLite-backed local document store
//!
//! Each document is stored as its JSON body (attachment fields included)
//! plus a revision marker. Every save also appends to the revision history;
//! `compact` prunes that history down to the current revisions.

use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::error::{StorageError, StorageResult};
use super::schema::{init_schema, needs_init};
use super::{CompactStats, LocalStore};
use crate::codec::Content;
use crate::config::Config;
use crate::models::DocumentHandle;

/// Counts reported by `SqliteStore::stats`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStats {
    /// Documents in the store
    pub documents: i64,
    /// Revision history rows awaiting compaction (current ones included)
    pub revisions: i64,
}

/// Local document store on SQLite
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open or create the store configured by `config`
    pub fn open(config: &Config) -> StorageResult<Self> {
        Self::open_path(&config.sqlite_path())
    }

    /// Open or create a store at `path`
    pub fn open_path(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|source| StorageError::create_directory(source, parent.to_path_buf()))?;
        }

        let conn = Connection::open(path)?;
        if needs_init(&conn) {
            init_schema(&conn)?;
        }

        Ok(Self { conn })
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// All document ids, sorted
    pub fn list_ids(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT id FROM documents ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    /// Document and revision-history counts
    pub fn stats(&self) -> StorageResult<StorageStats> {
        let documents = self
            .conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        let revisions = self
            .conn
            .query_row("SELECT COUNT(*) FROM revisions", [], |row| row.get(0))?;
        Ok(StorageStats {
            documents,
            revisions,
        })
    }
}

impl LocalStore for SqliteStore {
    fn get(&self, document_id: &str) -> StorageResult<DocumentHandle> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT revision, body FROM documents WHERE id = ?",
                [document_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((revision, body)) = row else {
            return Err(StorageError::NotFound {
                id: document_id.to_string(),
            });
        };

        let content: Content =
            serde_json::from_str(&body).map_err(|e| StorageError::CorruptDocument {
                id: document_id.to_string(),
                details: e.to_string(),
            })?;

        Ok(DocumentHandle::new(document_id, revision, content))
    }

    fn exists(&self, document_id: &str) -> StorageResult<bool> {
        let found = self
            .conn
            .prepare("SELECT 1 FROM documents WHERE id = ?")?
            .exists([document_id])?;
        Ok(found)
    }

    fn save(&mut self, handle: &DocumentHandle) -> StorageResult<()> {
        let body = serde_json::to_string(&handle.content).map_err(|e| {
            StorageError::CorruptDocument {
                id: handle.id.clone(),
                details: e.to_string(),
            }
        })?;
        let now = Utc::now().timestamp_millis();

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO documents (id, revision, body, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                revision = excluded.revision,
                body = excluded.body,
                updated_at = excluded.updated_at",
            params![handle.id, handle.revision, body, now],
        )?;
        tx.execute(
            "INSERT INTO revisions (document_id, revision, body, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![handle.id, handle.revision, body, now],
        )?;
        tx.commit()?;

        debug!(id = %handle.id, revision = %handle.revision, "saved document");
        Ok(())
    }

    fn compact(&mut self) -> StorageResult<CompactStats> {
        let removed = self.conn.execute(
            "DELETE FROM revisions WHERE seq NOT IN (
                SELECT MAX(r.seq) FROM revisions r
                JOIN documents d ON d.id = r.document_id AND d.revision = r.revision
                GROUP BY r.document_id
            )",
            [],
        )?;
        self.conn.execute_batch("VACUUM;")?;

        debug!(removed, "compacted local store");
        Ok(CompactStats {
            revisions_removed: removed,
        })
    }
}
