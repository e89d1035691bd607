//! HubSync Core Library
//!
//! This crate provides the core functionality for HubSync, a client-side
//! editor that keeps a local embedded document store consistent with a
//! remote document hub.
//!
//! # Architecture
//!
//! - **Hub**: Source of truth. Every save goes through the hub, and the
//!   hub's reply (content and revision) is what ends up stored locally.
//! - **Local store**: SQLite-backed cache of hub documents, compacted after
//!   every reconciling write.
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let local = SqliteStore::open(&config)?;
//! let hub = WsHubClient::new(config.hub_url.as_deref().unwrap_or_default());
//!
//! let mut engine = Reconciler::open(local, hub, config.database_info()?, Some("order-17"))?;
//! engine.session_mut().set_buffer(r#"{"qty": 4}"#);
//! engine.save(&CancellationToken::new()).await?;
//! ```
//!
//! # Modules
//!
//! - `engine`: Save, reload and share for one edit session (main entry point)
//! - `session`: Edit session state
//! - `models`: Database descriptors, document handles and hub payloads
//! - `codec`: Document content to and from editable JSON text
//! - `hub`: Hub client capability and its WebSocket implementation
//! - `storage`: Local store capability and its SQLite implementation
//! - `share`: Share targets
//! - `config`: Application configuration

pub mod codec;
pub mod config;
pub mod engine;
pub mod hub;
pub mod models;
pub mod session;
pub mod share;
pub mod storage;

pub use codec::{Content, FormatError};
pub use config::Config;
pub use engine::{Operation, Reconciler, Reconciliation, SaveOutcome, SyncError, ValidationError};
pub use hub::{HubClient, HubError, WsHubClient};
pub use models::{ConstructionError, DatabaseInfo, DocumentHandle, DocumentInfo, SaveIntent};
pub use session::{EditSession, IdNotEditable, SessionMode};
pub use share::{FileShare, ShareTarget};
pub use storage::{
    CompactStats, LocalStore, SqliteStore, StorageError, StorageResult, StorageStats,
};
