//! Data models for hubsync
//!
//! - `DocumentHandle`: a document as held by the local store
//! - `DatabaseInfo`: which hub database a document belongs to
//! - `DocumentInfo`: the payload exchanged with the hub
//! - `SaveIntent`: whether a save creates or updates a hub document

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::Content;

/// A `DocumentInfo` (or its descriptor) was built with invalid fields
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("New document '{document_id}' must use its id as revision, got '{revision_id}'")]
    SentinelMismatch {
        document_id: String,
        revision_id: String,
    },
}

/// Descriptor of a database on the hub
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseInfo {
    /// Identifier the hub uses for this database
    pub id: String,
    /// Human readable name
    #[serde(default)]
    pub name: String,
}

impl DatabaseInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Result<Self, ConstructionError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ConstructionError::MissingField("databaseDescriptor.id"));
        }
        Ok(Self {
            id,
            name: name.into(),
        })
    }
}

/// A document in the local store
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentHandle {
    /// Document identifier, unique within the local store
    pub id: String,
    /// Revision marker of the stored content
    pub revision: String,
    /// Structured content, including attachment fields
    pub content: Content,
}

impl DocumentHandle {
    pub fn new(id: impl Into<String>, revision: impl Into<String>, content: Content) -> Self {
        Self {
            id: id.into(),
            revision: revision.into(),
            content,
        }
    }
}

/// What a save asks the hub to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveIntent {
    /// Create a document that does not exist on the hub yet
    NewDocument { document_id: String },
    /// Update an existing document at a known revision
    Update {
        document_id: String,
        revision_id: String,
    },
}

impl SaveIntent {
    pub fn document_id(&self) -> &str {
        match self {
            SaveIntent::NewDocument { document_id } | SaveIntent::Update { document_id, .. } => {
                document_id
            }
        }
    }

    /// Revision sent on the wire. New documents carry their own id.
    fn wire_revision(&self) -> &str {
        match self {
            SaveIntent::NewDocument { document_id } => document_id,
            SaveIntent::Update { revision_id, .. } => revision_id,
        }
    }
}

/// Document payload for hub fetches and saves
///
/// Always valid: id, revision and JSON payload are non-empty, and a new
/// document's revision equals its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawDocumentInfo")]
pub struct DocumentInfo {
    database_descriptor: DatabaseInfo,
    document_id: String,
    revision_id: String,
    data_as_json: String,
    is_new_document: bool,
}

impl DocumentInfo {
    /// Build a payload, validating every required field
    pub fn new(
        database: DatabaseInfo,
        document_id: impl Into<String>,
        revision_id: impl Into<String>,
        data_as_json: impl Into<String>,
        is_new_document: bool,
    ) -> Result<Self, ConstructionError> {
        let document_id = document_id.into();
        let revision_id = revision_id.into();
        let data_as_json = data_as_json.into();

        if database.id.trim().is_empty() {
            return Err(ConstructionError::MissingField("databaseDescriptor.id"));
        }
        if document_id.is_empty() {
            return Err(ConstructionError::MissingField("documentId"));
        }
        if revision_id.is_empty() {
            return Err(ConstructionError::MissingField("revisionId"));
        }
        if data_as_json.is_empty() {
            return Err(ConstructionError::MissingField("dataAsJson"));
        }
        if is_new_document && revision_id != document_id {
            return Err(ConstructionError::SentinelMismatch {
                document_id,
                revision_id,
            });
        }

        Ok(Self {
            database_descriptor: database,
            document_id,
            revision_id,
            data_as_json,
            is_new_document,
        })
    }

    /// Build the payload for a save
    pub fn from_intent(
        database: DatabaseInfo,
        intent: &SaveIntent,
        data_as_json: impl Into<String>,
    ) -> Result<Self, ConstructionError> {
        Self::new(
            database,
            intent.document_id(),
            intent.wire_revision(),
            data_as_json,
            matches!(intent, SaveIntent::NewDocument { .. }),
        )
    }

    /// The save intent this payload encodes
    pub fn intent(&self) -> SaveIntent {
        if self.is_new_document {
            SaveIntent::NewDocument {
                document_id: self.document_id.clone(),
            }
        } else {
            SaveIntent::Update {
                document_id: self.document_id.clone(),
                revision_id: self.revision_id.clone(),
            }
        }
    }

    pub fn database(&self) -> &DatabaseInfo {
        &self.database_descriptor
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn revision_id(&self) -> &str {
        &self.revision_id
    }

    pub fn data_as_json(&self) -> &str {
        &self.data_as_json
    }

    pub fn is_new_document(&self) -> bool {
        self.is_new_document
    }
}

/// Unvalidated wire form of `DocumentInfo`
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDocumentInfo {
    database_descriptor: DatabaseInfo,
    #[serde(default)]
    document_id: String,
    #[serde(default)]
    revision_id: String,
    #[serde(default)]
    data_as_json: String,
    #[serde(default)]
    is_new_document: bool,
}

impl TryFrom<RawDocumentInfo> for DocumentInfo {
    type Error = ConstructionError;

    fn try_from(raw: RawDocumentInfo) -> Result<Self, Self::Error> {
        DocumentInfo::new(
            raw.database_descriptor,
            raw.document_id,
            raw.revision_id,
            raw.data_as_json,
            raw.is_new_document,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn database() -> DatabaseInfo {
        DatabaseInfo::new("inventory", "Inventory").unwrap()
    }

    #[test]
    fn test_database_info_requires_id() {
        assert_eq!(
            DatabaseInfo::new("  ", "blank"),
            Err(ConstructionError::MissingField("databaseDescriptor.id"))
        );
    }

    #[test]
    fn test_document_info_rejects_empty_fields() {
        assert_eq!(
            DocumentInfo::new(database(), "", "r1", "{}", false),
            Err(ConstructionError::MissingField("documentId"))
        );
        assert_eq!(
            DocumentInfo::new(database(), "doc", "", "{}", false),
            Err(ConstructionError::MissingField("revisionId"))
        );
        assert_eq!(
            DocumentInfo::new(database(), "doc", "r1", "", false),
            Err(ConstructionError::MissingField("dataAsJson"))
        );
    }

    #[test]
    fn test_new_document_requires_sentinel_revision() {
        let err = DocumentInfo::new(database(), "doc1", "r1", "{}", true).unwrap_err();
        assert!(matches!(err, ConstructionError::SentinelMismatch { .. }));

        assert!(DocumentInfo::new(database(), "doc1", "doc1", "{}", true).is_ok());
    }

    #[test]
    fn test_from_new_document_intent() {
        let intent = SaveIntent::NewDocument {
            document_id: "doc1".to_string(),
        };
        let info = DocumentInfo::from_intent(database(), &intent, "{\"x\":true}").unwrap();

        assert!(info.is_new_document());
        assert_eq!(info.document_id(), "doc1");
        assert_eq!(info.revision_id(), "doc1");
        assert_eq!(info.intent(), intent);
    }

    #[test]
    fn test_from_update_intent() {
        let intent = SaveIntent::Update {
            document_id: "doc1".to_string(),
            revision_id: "3-abc".to_string(),
        };
        let info = DocumentInfo::from_intent(database(), &intent, "{}").unwrap();

        assert!(!info.is_new_document());
        assert_eq!(info.revision_id(), "3-abc");
        assert_eq!(info.intent(), intent);
    }

    #[test]
    fn test_wire_shape() {
        let info = DocumentInfo::new(database(), "doc1", "r2", "{\"a\":2}", false).unwrap();
        let value = serde_json::to_value(&info).unwrap();

        assert_eq!(
            value,
            json!({
                "databaseDescriptor": {"id": "inventory", "name": "Inventory"},
                "documentId": "doc1",
                "revisionId": "r2",
                "dataAsJson": "{\"a\":2}",
                "isNewDocument": false
            })
        );

        let parsed: DocumentInfo = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, info);
    }

    #[test]
    fn test_wire_deserialize_validates() {
        let value = json!({
            "databaseDescriptor": {"id": "inventory"},
            "documentId": "doc1",
            "revisionId": "",
            "dataAsJson": "{}"
        });

        let err = serde_json::from_value::<DocumentInfo>(value).unwrap_err();
        assert!(err.to_string().contains("revisionId"));
    }
}
