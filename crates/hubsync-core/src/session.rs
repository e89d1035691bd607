//! Edit session state
//!
//! One session per document being edited. A session either edits a document
//! already in the local store, or creates a new one on the hub. Only new
//! documents let the user choose the id.

use thiserror::Error;

use crate::models::{DatabaseInfo, DocumentHandle};

/// The document id of an existing document cannot be changed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Document id '{0}' cannot be changed while editing")]
pub struct IdNotEditable(pub String);

/// Whether the session edits an existing document or creates a new one
#[derive(Debug, Clone, PartialEq)]
pub enum SessionMode {
    /// Editing a document loaded from the local store
    Editing(DocumentHandle),
    /// Authoring a document that does not exist yet
    Creating,
}

/// Transient state of one editing session
#[derive(Debug, Clone)]
pub struct EditSession {
    mode: SessionMode,
    database: DatabaseInfo,
    document_id: String,
    buffer: String,
}

impl EditSession {
    /// Session over an existing document, with its serialized text
    pub fn editing(database: DatabaseInfo, handle: DocumentHandle, buffer: String) -> Self {
        Self {
            document_id: handle.id.clone(),
            mode: SessionMode::Editing(handle),
            database,
            buffer,
        }
    }

    /// Session for a new document with an empty buffer
    pub fn creating(database: DatabaseInfo) -> Self {
        Self {
            mode: SessionMode::Creating,
            database,
            document_id: String::new(),
            buffer: String::new(),
        }
    }

    pub fn mode(&self) -> &SessionMode {
        &self.mode
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.mode, SessionMode::Editing(_))
    }

    /// The id is only user-editable while creating
    pub fn is_id_editable(&self) -> bool {
        !self.is_editing()
    }

    pub fn database(&self) -> &DatabaseInfo {
        &self.database
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// Set the id of the document being created
    pub fn set_document_id(&mut self, id: impl Into<String>) -> Result<(), IdNotEditable> {
        if !self.is_id_editable() {
            return Err(IdNotEditable(self.document_id.clone()));
        }
        self.document_id = id.into();
        Ok(())
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Replace the text the user is editing
    pub fn set_buffer(&mut self, text: impl Into<String>) {
        self.buffer = text.into();
    }

    /// The open document, when editing
    pub fn handle(&self) -> Option<&DocumentHandle> {
        match &self.mode {
            SessionMode::Editing(handle) => Some(handle),
            SessionMode::Creating => None,
        }
    }

    /// Install a reconciled handle and its serialized text
    pub(crate) fn reconciled(&mut self, handle: DocumentHandle, buffer: String) {
        self.document_id = handle.id.clone();
        self.mode = SessionMode::Editing(handle);
        self.buffer = buffer;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Content;

    fn database() -> DatabaseInfo {
        DatabaseInfo::new("orders", "Orders").unwrap()
    }

    #[test]
    fn test_creating_session() {
        let mut session = EditSession::creating(database());

        assert!(!session.is_editing());
        assert!(session.is_id_editable());
        assert!(session.handle().is_none());
        assert_eq!(session.buffer(), "");

        session.set_document_id("doc1").unwrap();
        assert_eq!(session.document_id(), "doc1");
    }

    #[test]
    fn test_editing_session_id_is_fixed() {
        let handle = DocumentHandle::new("order-1", "1-a", Content::new());
        let mut session = EditSession::editing(database(), handle, "{}".to_string());

        assert!(session.is_editing());
        assert!(!session.is_id_editable());
        assert_eq!(session.document_id(), "order-1");

        let err = session.set_document_id("other").unwrap_err();
        assert_eq!(err, IdNotEditable("order-1".to_string()));
        assert_eq!(session.document_id(), "order-1");
    }

    #[test]
    fn test_set_buffer() {
        let mut session = EditSession::creating(database());
        session.set_buffer("{\"x\": true}");
        assert_eq!(session.buffer(), "{\"x\": true}");
    }

    #[test]
    fn test_reconciled_replaces_handle_and_buffer() {
        let handle = DocumentHandle::new("order-1", "1-a", Content::new());
        let mut session = EditSession::editing(database(), handle, "{}".to_string());

        let updated = DocumentHandle::new("order-1", "2-b", Content::new());
        session.reconciled(updated, "{\n}".to_string());

        assert_eq!(session.handle().unwrap().revision, "2-b");
        assert_eq!(session.buffer(), "{\n}");
    }
}
