//! Hub protocol message types
//!
//! JSON messages exchanged with the hub, tagged by `type`.

use serde::{Deserialize, Serialize};

use crate::models::{DatabaseInfo, DocumentInfo};

/// Messages sent to the hub
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Ask for the hub's copy of a document
    #[serde(rename = "fetch")]
    Fetch {
        #[serde(rename = "requestId")]
        request_id: String,
        #[serde(rename = "databaseDescriptor")]
        database: DatabaseInfo,
        #[serde(rename = "documentId")]
        document_id: String,
    },

    /// Create or update a document
    #[serde(rename = "save")]
    Save {
        #[serde(rename = "requestId")]
        request_id: String,
        document: DocumentInfo,
    },
}

impl ClientMessage {
    pub fn fetch(database: &DatabaseInfo, document_id: &str) -> Self {
        ClientMessage::Fetch {
            request_id: new_request_id(),
            database: database.clone(),
            document_id: document_id.to_string(),
        }
    }

    pub fn save(document: &DocumentInfo) -> Self {
        ClientMessage::Save {
            request_id: new_request_id(),
            document: document.clone(),
        }
    }

    pub fn request_id(&self) -> &str {
        match self {
            ClientMessage::Fetch { request_id, .. } | ClientMessage::Save { request_id, .. } => {
                request_id
            }
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Messages received from the hub
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Reply carrying the authoritative document, if there is one
    #[serde(rename = "document")]
    Document {
        #[serde(rename = "requestId")]
        request_id: String,
        #[serde(default)]
        document: Option<DocumentInfo>,
    },

    /// The request failed on the hub
    #[serde(rename = "error")]
    Error {
        #[serde(rename = "requestId", default)]
        request_id: Option<String>,
        message: String,
    },
}

impl ServerMessage {
    pub fn decode(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }

    /// Whether this message answers `request_id`
    ///
    /// Errors without a request id apply to whatever is in flight.
    pub fn answers(&self, request_id: &str) -> bool {
        match self {
            ServerMessage::Document { request_id: id, .. } => id == request_id,
            ServerMessage::Error { request_id: id, .. } => {
                id.as_deref().map_or(true, |id| id == request_id)
            }
        }
    }
}

fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
