//! Local store layer
//!
//! The reconciliation engine talks to the embedded document store through
//! the narrow `LocalStore` capability. `SqliteStore` is the on-disk
//! implementation.
//!
//! ## Contract
//!
//! - `get` loads the current revision of a document
//! - `save` writes a new current revision
//! - `compact` drops superseded revisions; callers run it right after
//!   every reconciling save so revision history never accumulates

pub mod error;
pub mod schema;
pub mod sqlite;

pub use error::{StorageError, StorageResult};
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
pub use sqlite::{SqliteStore, StorageStats};

use crate::models::DocumentHandle;

/// Result of a compaction pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactStats {
    /// Revision rows removed
    pub revisions_removed: usize,
}

/// Capability surface of the local embedded document store
pub trait LocalStore: Send {
    /// Load a document by id
    ///
    /// Returns `StorageError::NotFound` when the id is unknown.
    fn get(&self, document_id: &str) -> StorageResult<DocumentHandle>;

    /// Whether a document with this id is stored, readable or not
    fn exists(&self, document_id: &str) -> StorageResult<bool>;

    /// Persist the handle as the document's current revision
    fn save(&mut self, handle: &DocumentHandle) -> StorageResult<()>;

    /// Reclaim space held by superseded revisions
    fn compact(&mut self) -> StorageResult<CompactStats>;
}
