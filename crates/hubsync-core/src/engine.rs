//! Reconciliation engine
//!
//! Drives one edit session against the local store and the hub:
//!
//! - `save` validates the buffer, pushes it to the hub, and writes the hub's
//!   reply back to the local store
//! - `reload` overwrites the local copy with the hub's copy
//! - `share` hands the buffer to a share target
//!
//! The hub's reply always wins. Local writes (save, then compact) happen only
//! after the hub call has returned successfully and cancellation has not been
//! observed. Every failure is returned as a `SyncError`; the session buffer
//! stays exactly as the user left it.

use std::fmt;
use std::future::Future;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::codec::{self, FormatError};
use crate::hub::{HubClient, HubError};
use crate::models::{ConstructionError, DatabaseInfo, DocumentHandle, DocumentInfo, SaveIntent};
use crate::session::EditSession;
use crate::share::ShareTarget;
use crate::storage::{LocalStore, StorageError};

/// User-triggered session actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Save,
    Reload,
    Share,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Save => "save",
            Operation::Reload => "reload",
            Operation::Share => "share",
        })
    }
}

/// The buffer or the session cannot be saved as is
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Error saving JSON: {0}")]
    InvalidJson(#[from] FormatError),

    #[error("Enter a document id to add a new document.")]
    MissingDocumentId,
}

/// Failure of a session action
#[derive(Error, Debug)]
pub enum SyncError {
    /// Nothing was sent or written
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The hub failed or answered without a document; nothing was written
    #[error("Failed to {operation} document: {}", describe_cause(.cause))]
    RemoteUnavailable {
        operation: Operation,
        cause: Option<HubError>,
    },

    /// The action was cancelled; nothing was written
    #[error("{operation} cancelled")]
    Cancelled { operation: Operation },

    /// A hub payload could not be built
    #[error("Invalid document payload: {0}")]
    Construction(#[from] ConstructionError),

    /// The local store failed
    #[error("Local store error: {0}")]
    Storage(#[from] StorageError),

    /// Reload needs a document that already exists locally
    #[error("Only an existing document can be reloaded from the hub")]
    NotEditing,

    /// The share target failed
    #[error("Failed to share document: {0}")]
    Share(String),
}

fn describe_cause(cause: &Option<HubError>) -> String {
    match cause {
        Some(err) => err.to_string(),
        None => "the hub did not return a document".to_string(),
    }
}

impl SyncError {
    fn remote(operation: Operation, err: HubError) -> Self {
        match err {
            HubError::Cancelled => SyncError::Cancelled { operation },
            err => SyncError::RemoteUnavailable {
                operation,
                cause: Some(err),
            },
        }
    }

    /// Whether the session is left intact and the user can simply retry
    pub fn is_recoverable(&self) -> bool {
        match self {
            SyncError::Storage(err) => err.is_recoverable(),
            _ => true,
        }
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            SyncError::Validation(ValidationError::InvalidJson(_)) => {
                Some("Fix the JSON and save again.")
            }
            SyncError::RemoteUnavailable { .. } => {
                Some("Your edits were kept. Check the hub connection and try again.")
            }
            SyncError::Storage(err) => err.recovery_suggestion(),
            _ => None,
        }
    }

    /// Message to show the user
    pub fn user_message(&self) -> String {
        match self.recovery_suggestion() {
            Some(hint) => format!("{}\n{}", self, hint),
            None => self.to_string(),
        }
    }
}

/// A hub document written back to the local store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub document_id: String,
    /// Revision now stored locally (the hub's)
    pub revision: String,
    /// Superseded revisions removed by the follow-up compaction
    pub revisions_removed: usize,
}

/// Result of a successful save
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// An existing document was saved and the local copy now matches the hub
    Reconciled(Reconciliation),
    /// A new document was created on the hub
    ///
    /// The session is finished: the caller should leave it and refresh
    /// whatever lists documents.
    Created { document_id: String, refresh: bool },
}

/// Engine for one edit session
pub struct Reconciler<L, H> {
    local: L,
    hub: H,
    session: EditSession,
}

impl<L: LocalStore, H: HubClient> Reconciler<L, H> {
    /// Start a session
    ///
    /// With a `document_id` the document is loaded from the local store and
    /// serialized into the buffer; without one a new document is created.
    pub fn open(
        local: L,
        hub: H,
        database: DatabaseInfo,
        document_id: Option<&str>,
    ) -> Result<Self, SyncError> {
        let session = match document_id {
            Some(id) => {
                let handle = local.get(id)?;
                let text = codec::serialize(&handle.content);
                debug!(id, revision = %handle.revision, "opened document for editing");
                EditSession::editing(database, handle, text)
            }
            None => EditSession::creating(database),
        };

        Ok(Self {
            local,
            hub,
            session,
        })
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut EditSession {
        &mut self.session
    }

    pub fn local(&self) -> &L {
        &self.local
    }

    pub fn hub(&self) -> &H {
        &self.hub
    }

    /// Consume the engine, returning the local store and the hub client
    pub fn into_parts(self) -> (L, H) {
        (self.local, self.hub)
    }

    /// Validate the buffer, push it to the hub, and reconcile the reply
    pub async fn save(&mut self, cancel: &CancellationToken) -> Result<SaveOutcome, SyncError> {
        let operation = Operation::Save;

        codec::deserialize(self.session.buffer()).map_err(ValidationError::InvalidJson)?;

        let intent = match self.session.handle() {
            Some(handle) => SaveIntent::Update {
                document_id: handle.id.clone(),
                revision_id: handle.revision.clone(),
            },
            None => {
                let id = self.session.document_id().trim();
                if id.is_empty() {
                    return Err(ValidationError::MissingDocumentId.into());
                }
                SaveIntent::NewDocument {
                    document_id: id.to_string(),
                }
            }
        };

        let request = DocumentInfo::from_intent(
            self.session.database().clone(),
            &intent,
            self.session.buffer(),
        )?;

        let reply = settle(operation, cancel, self.hub.save(&request, cancel)).await?;

        match intent {
            SaveIntent::NewDocument { document_id } => {
                info!("Created document '{}' at revision {}", document_id, reply.revision_id());
                Ok(SaveOutcome::Created {
                    document_id,
                    refresh: true,
                })
            }
            SaveIntent::Update { .. } => {
                let reconciliation = self.reconcile(operation, &reply)?;
                Ok(SaveOutcome::Reconciled(reconciliation))
            }
        }
    }

    /// Overwrite the local copy with the hub's copy
    pub async fn reload(&mut self, cancel: &CancellationToken) -> Result<Reconciliation, SyncError> {
        let operation = Operation::Reload;

        let Some(handle) = self.session.handle() else {
            return Err(SyncError::NotEditing);
        };
        let document_id = handle.id.clone();

        let reply = settle(
            operation,
            cancel,
            self.hub.fetch(self.session.database(), &document_id, cancel),
        )
        .await?;

        self.reconcile(operation, &reply)
    }

    /// Hand the current buffer to `target`
    pub async fn share(
        &self,
        target: &dyn ShareTarget,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled {
                operation: Operation::Share,
            });
        }

        target
            .share(self.session.buffer())
            .await
            .map_err(|e| SyncError::Share(format!("{:#}", e)))
    }

    /// Write the hub's document into the local store and refresh the buffer
    ///
    /// Local attachment fields survive at their paths: the text form never
    /// carries them.
    fn reconcile(
        &mut self,
        operation: Operation,
        reply: &DocumentInfo,
    ) -> Result<Reconciliation, SyncError> {
        let Some(current) = self.session.handle() else {
            return Err(SyncError::NotEditing);
        };

        if reply.document_id() != current.id {
            return Err(SyncError::RemoteUnavailable {
                operation,
                cause: Some(HubError::Protocol(format!(
                    "hub returned document '{}' for '{}'",
                    reply.document_id(),
                    current.id
                ))),
            });
        }

        let mut content = codec::deserialize(reply.data_as_json()).map_err(|e| {
            SyncError::RemoteUnavailable {
                operation,
                cause: Some(HubError::Protocol(format!("hub returned invalid JSON: {}", e))),
            }
        })?;
        codec::restore_attachments(&mut content, &current.content);

        let handle = DocumentHandle::new(current.id.clone(), reply.revision_id(), content);

        self.local.save(&handle)?;
        let compacted = self.local.compact();

        let text = codec::serialize(&handle.content);
        let reconciliation = Reconciliation {
            document_id: handle.id.clone(),
            revision: handle.revision.clone(),
            revisions_removed: 0,
        };
        self.session.reconciled(handle, text);

        let stats = compacted?;
        info!(
            "Reconciled '{}' at revision {} after {}",
            reconciliation.document_id, reconciliation.revision, operation
        );

        Ok(Reconciliation {
            revisions_removed: stats.revisions_removed,
            ..reconciliation
        })
    }
}

/// Await a hub call, racing it against `cancel`
///
/// Cancellation seen at any point, including right after the call returned,
/// turns the result into `SyncError::Cancelled` so nothing gets committed.
async fn settle<F>(
    operation: Operation,
    cancel: &CancellationToken,
    call: F,
) -> Result<DocumentInfo, SyncError>
where
    F: Future<Output = Result<Option<DocumentInfo>, HubError>>,
{
    if cancel.is_cancelled() {
        return Err(SyncError::Cancelled { operation });
    }

    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(SyncError::Cancelled { operation }),
        result = call => result,
    };

    if cancel.is_cancelled() {
        debug!("{} cancelled after the hub replied, discarding reply", operation);
        return Err(SyncError::Cancelled { operation });
    }

    match result {
        Ok(Some(document)) => Ok(document),
        Ok(None) => {
            warn!("Hub returned no document for {}", operation);
            Err(SyncError::RemoteUnavailable {
                operation,
                cause: None,
            })
        }
        Err(err) => {
            warn!("Hub {} failed: {}", operation, err);
            Err(SyncError::remote(operation, err))
        }
    }
}
