//! Hub client
//!
//! The hub holds the authoritative copy of every document. The engine
//! reaches it through the `HubClient` capability; `WsHubClient` speaks the
//! hub's JSON-over-WebSocket request protocol.
//!
//! ## Protocol
//!
//! One connection per request:
//! 1. Connect via WebSocket
//! 2. Send a `fetch` or `save` message tagged with a request id
//! 3. Wait for the `document` (or `error`) reply with the same request id
//! 4. Close
//!
//! ## Usage
//!
//! ```ignore
//! let hub = WsHubClient::new("ws://localhost:5000/hub");
//! let doc = hub.fetch(&database, "order-17", &CancellationToken::new()).await?;
//! ```

mod client;
mod message;

pub use client::WsHubClient;
pub use message::{ClientMessage, ServerMessage};

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::models::{DatabaseInfo, DocumentInfo};

/// Hub request errors
#[derive(Debug, Error)]
pub enum HubError {
    /// Could not reach the hub
    #[error("Failed to connect to hub ({url}): {reason}")]
    ConnectionFailed { url: String, reason: String },

    /// No reply within the request timeout
    #[error("Timeout waiting for hub response ({url}) after {secs}s")]
    Timeout { url: String, secs: u64 },

    /// The hub closed the connection before replying
    #[error("Hub ({url}) closed the connection before replying")]
    Closed { url: String },

    /// The hub rejected the request
    #[error("Hub error: {0}")]
    Server(String),

    /// The hub sent something we could not understand
    #[error("Invalid hub message: {0}")]
    Protocol(String),

    /// The caller cancelled the request
    #[error("Request cancelled")]
    Cancelled,
}

/// Capability surface of the remote synchronization hub
///
/// Both calls observe `cancel` promptly. `Ok(None)` means the hub answered
/// without a document.
#[async_trait]
pub trait HubClient: Send + Sync {
    /// Fetch the hub's copy of a document
    async fn fetch(
        &self,
        database: &DatabaseInfo,
        document_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<DocumentInfo>, HubError>;

    /// Create or update a document, returning the hub's authoritative copy
    async fn save(
        &self,
        document: &DocumentInfo,
        cancel: &CancellationToken,
    ) -> Result<Option<DocumentInfo>, HubError>;
}
