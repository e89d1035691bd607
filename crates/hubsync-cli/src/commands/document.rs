//! Document command handlers

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use hubsync_core::{
    codec, Config, DatabaseInfo, DocumentHandle, FileShare, HubClient, LocalStore, Reconciler,
    SaveOutcome, ShareTarget, SqliteStore, SyncError, ValidationError, WsHubClient,
};

use crate::editor::{confirm, edit_text, prompt};
use crate::output::Output;

/// Revision given to documents imported from a file
pub const IMPORTED_REVISION: &str = "0-local";

/// Starting text for a new document
const NEW_DOCUMENT_TEMPLATE: &str = "{\n}\n";

/// Where edited text comes from
#[derive(Debug, Clone)]
pub enum Input {
    /// Open $EDITOR on the current buffer
    Editor,
    /// Read the whole file
    File(PathBuf),
}

impl Input {
    pub fn from_file(file: Option<PathBuf>) -> Self {
        file.map_or(Input::Editor, Input::File)
    }

    fn is_editor(&self) -> bool {
        matches!(self, Input::Editor)
    }

    fn read(&self, current: &str) -> Result<String> {
        match self {
            Input::Editor => edit_text(current),
            Input::File(path) => read_file(path),
        }
    }
}

/// Shares by printing to stdout
struct StdoutShare;

#[async_trait]
impl ShareTarget for StdoutShare {
    async fn share(&self, text: &str) -> Result<()> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(text.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
        Ok(())
    }
}

/// List local document ids
pub fn list(config: &Config, output: &Output) -> Result<()> {
    let store = open_store(config)?;
    let ids = store.list_ids().context("Failed to list documents")?;
    output.print_ids(&ids);
    Ok(())
}

/// Show a local document
pub fn show(config: &Config, id: String, output: &Output) -> Result<()> {
    let store = open_store(config)?;
    let handle = store.get(&id)?;
    output.print_document(&handle);
    Ok(())
}

/// Seed the local store with a document read from a file
pub fn import(config: &Config, id: String, file: &Path, force: bool, output: &Output) -> Result<()> {
    let mut store = open_store(config)?;
    let handle = import_into(&mut store, &id, file, force)?;
    output.success(&format!(
        "Imported '{}' from {} (revision {})",
        handle.id,
        file.display(),
        handle.revision
    ));
    Ok(())
}

/// Edit an existing document and save it through the hub
pub async fn edit(
    config: &Config,
    id: String,
    input: Input,
    cancel: &CancellationToken,
    output: &Output,
) -> Result<()> {
    let engine = Reconciler::open(
        open_store(config)?,
        hub_client(config)?,
        config.database_info()?,
        Some(&id),
    )
    .map_err(sync_error)?;

    edit_with(engine, &input, cancel, output).await
}

/// Author a new document and create it on the hub
pub async fn create(
    config: &Config,
    id: Option<String>,
    input: Input,
    cancel: &CancellationToken,
    output: &Output,
) -> Result<()> {
    let engine = Reconciler::open(
        open_store(config)?,
        hub_client(config)?,
        config.database_info()?,
        None,
    )
    .map_err(sync_error)?;

    let id = match id {
        Some(id) => Some(id),
        None if output.should_prompt() && input.is_editor() => prompt("Document id")?,
        None => None,
    };

    create_with(engine, id, &input, cancel, output).await
}

/// Replace the local copy with the hub's copy
pub async fn reload(
    config: &Config,
    id: String,
    yes: bool,
    cancel: &CancellationToken,
    output: &Output,
) -> Result<()> {
    let mut engine = Reconciler::open(
        open_store(config)?,
        hub_client(config)?,
        config.database_info()?,
        Some(&id),
    )
    .map_err(sync_error)?;

    if !yes {
        if !output.should_prompt() {
            bail!(
                "Reloading replaces the local copy of '{}'. Pass --yes to confirm.",
                id
            );
        }
        if !confirm(&format!(
            "Replace the local copy of '{}' with the hub's copy?",
            id
        ))? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let reconciliation = engine.reload(cancel).await.map_err(sync_error)?;
    output.print_reconciliation("Reloaded", &reconciliation);
    Ok(())
}

/// Bring a hub document that is not yet local into the local store
pub async fn pull(
    config: &Config,
    id: String,
    cancel: &CancellationToken,
    output: &Output,
) -> Result<()> {
    let mut store = open_store(config)?;
    let hub = hub_client(config)?;

    let handle = pull_into(&mut store, &hub, &config.database_info()?, &id, cancel).await?;
    output.success(&format!(
        "Pulled '{}' (revision {})",
        handle.id, handle.revision
    ));
    Ok(())
}

/// Share a document's text to a file or stdout
pub async fn share(
    config: &Config,
    id: String,
    output_path: Option<PathBuf>,
    cancel: &CancellationToken,
    output: &Output,
) -> Result<()> {
    // Sharing never contacts the hub, so an unset URL is fine here
    let hub = WsHubClient::new(config.hub_url.as_deref().unwrap_or_default());
    let engine = Reconciler::open(open_store(config)?, hub, config.database_info()?, Some(&id))
        .map_err(sync_error)?;

    match output_path {
        Some(path) => {
            let target = FileShare::new(path);
            engine.share(&target, cancel).await.map_err(sync_error)?;
            output.success(&format!("Shared '{}' to {}", id, target.path().display()));
        }
        None => engine.share(&StdoutShare, cancel).await.map_err(sync_error)?,
    }

    Ok(())
}

fn import_into<L: LocalStore>(
    store: &mut L,
    id: &str,
    file: &Path,
    force: bool,
) -> Result<DocumentHandle> {
    if id.trim().is_empty() {
        bail!("Document id must not be empty");
    }

    let text = read_file(file)?;
    let content = codec::deserialize(&text)
        .with_context(|| format!("{} does not hold a JSON object", file.display()))?;

    if !force && store.exists(id).context("Failed to read local store")? {
        bail!(
            "Document '{}' already exists locally. Use --force to replace it.",
            id
        );
    }

    let handle = DocumentHandle::new(id, IMPORTED_REVISION, content);
    store.save(&handle).context("Failed to store document")?;
    Ok(handle)
}

async fn edit_with<L: LocalStore, H: HubClient>(
    mut engine: Reconciler<L, H>,
    input: &Input,
    cancel: &CancellationToken,
    output: &Output,
) -> Result<()> {
    let current = engine.session().buffer().to_string();
    let text = input.read(&current)?;

    if input.is_editor() && text == current {
        output.message("No changes made.");
        return Ok(());
    }

    engine.session_mut().set_buffer(text);
    save_with_retry(&mut engine, input, cancel, output).await
}

async fn create_with<L: LocalStore, H: HubClient>(
    mut engine: Reconciler<L, H>,
    id: Option<String>,
    input: &Input,
    cancel: &CancellationToken,
    output: &Output,
) -> Result<()> {
    if let Some(id) = id {
        engine.session_mut().set_document_id(id)?;
    }

    let text = input.read(NEW_DOCUMENT_TEMPLATE)?;
    engine.session_mut().set_buffer(text);

    save_with_retry(&mut engine, input, cancel, output).await
}

/// Save, letting an interactive user fix validation errors
///
/// Validation failures keep the session, so the user's text is offered back
/// in the editor instead of being lost.
async fn save_with_retry<L: LocalStore, H: HubClient>(
    engine: &mut Reconciler<L, H>,
    input: &Input,
    cancel: &CancellationToken,
    output: &Output,
) -> Result<()> {
    let interactive = input.is_editor() && output.should_prompt();

    loop {
        let err = match engine.save(cancel).await {
            Ok(outcome) => {
                report_save(&outcome, output);
                return Ok(());
            }
            Err(SyncError::Validation(err)) if interactive => err,
            Err(err) => return Err(sync_error(err)),
        };

        eprintln!("{}", err);
        match err {
            ValidationError::MissingDocumentId => match prompt("Document id")? {
                Some(id) => engine.session_mut().set_document_id(id)?,
                None => bail!("No document id given. Nothing was saved."),
            },
            ValidationError::InvalidJson(_) => {
                if !confirm("Edit again?")? {
                    bail!("Edit abandoned. Nothing was saved.");
                }
                let text = edit_text(engine.session().buffer())?;
                engine.session_mut().set_buffer(text);
            }
        }
    }
}

fn report_save(outcome: &SaveOutcome, output: &Output) {
    match outcome {
        SaveOutcome::Reconciled(reconciliation) => {
            output.print_reconciliation("Saved", reconciliation)
        }
        SaveOutcome::Created {
            document_id,
            refresh,
        } => output.print_created(document_id, *refresh),
    }
}

async fn pull_into<L: LocalStore, H: HubClient>(
    store: &mut L,
    hub: &H,
    database: &DatabaseInfo,
    id: &str,
    cancel: &CancellationToken,
) -> Result<DocumentHandle> {
    if store.exists(id).context("Failed to read local store")? {
        bail!(
            "Document '{}' is already local. Use `hubsync reload {}` to refresh it.",
            id,
            id
        );
    }

    let reply = hub
        .fetch(database, id, cancel)
        .await
        .with_context(|| format!("Failed to pull '{}'", id))?
        .ok_or_else(|| anyhow!("The hub has no document '{}'", id))?;
    if reply.document_id() != id {
        bail!(
            "The hub returned document '{}' for '{}'",
            reply.document_id(),
            id
        );
    }

    let content = codec::deserialize(reply.data_as_json())
        .with_context(|| format!("The hub returned invalid JSON for '{}'", id))?;
    let handle = DocumentHandle::new(id, reply.revision_id(), content);

    store.save(&handle).context("Failed to store document")?;
    store.compact().context("Failed to compact local store")?;
    debug!(id, revision = %handle.revision, "pulled document");

    Ok(handle)
}

fn open_store(config: &Config) -> Result<SqliteStore> {
    SqliteStore::open(config).context("Failed to open local document store")
}

fn hub_client(config: &Config) -> Result<WsHubClient> {
    let Some(url) = config.hub_url.as_deref() else {
        bail!(
            "Hub not configured. Set one with:\n  hubsync config set hub_url ws://your-hub:5000"
        );
    };
    Ok(WsHubClient::new(url).with_timeout(config.request_timeout()))
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn sync_error(err: SyncError) -> anyhow::Error {
    anyhow!(err.user_message())
}
