//! Session state for uploaded policy documents.
//!
//! Every operation is best-effort: failures are logged and leave the local
//! list untouched. Mutations on the server are followed by a full re-list
//! rather than a local edit, so the list always mirrors what the server
//! reported last.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::api::{ApiContext, Credential, FileRecord, FilesBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// The operation succeeded and the list was refreshed from the server.
    Synced,
    /// Something failed; the local list is unchanged.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    LoadingChanged(bool),
    FilesReplaced { count: usize },
    Deleted { file_id: String },
    Uploaded(FileRecord),
}

#[derive(Debug, Default)]
struct FileState {
    context: ApiContext,
    files: Vec<FileRecord>,
    loads_in_flight: usize,
}

#[derive(Clone)]
pub struct FileStore {
    backend: Arc<dyn FilesBackend>,
    state: Arc<Mutex<FileState>>,
    events: Option<mpsc::UnboundedSender<FileEvent>>,
}

/// Holds the loading flag up for the lifetime of one list request.
struct LoadingGuard<'a> {
    store: &'a FileStore,
}

impl<'a> LoadingGuard<'a> {
    // Transitions are emitted under the state lock so overlapping lists
    // cannot deliver them out of order.
    fn acquire(store: &'a FileStore) -> (Self, ApiContext) {
        let mut state = store.lock();
        state.loads_in_flight += 1;
        if state.loads_in_flight == 1 {
            store.emit(FileEvent::LoadingChanged(true));
        }
        let context = state.context.clone();
        drop(state);
        (Self { store }, context)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.store.lock();
        state.loads_in_flight = state.loads_in_flight.saturating_sub(1);
        if state.loads_in_flight == 0 {
            self.store.emit(FileEvent::LoadingChanged(false));
        }
    }
}

impl FileStore {
    pub fn new(backend: Arc<dyn FilesBackend>, context: ApiContext) -> Self {
        Self {
            backend,
            state: Arc::new(Mutex::new(FileState {
                context,
                ..Default::default()
            })),
            events: None,
        }
    }

    pub fn with_events(mut self, events: mpsc::UnboundedSender<FileEvent>) -> Self {
        self.events = Some(events);
        self
    }

    fn lock(&self) -> MutexGuard<'_, FileState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: FileEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    fn context(&self) -> ApiContext {
        self.lock().context.clone()
    }

    /// Files as of the last successful listing, in server order.
    pub fn files(&self) -> Vec<FileRecord> {
        self.lock().files.clone()
    }

    pub fn find(&self, file_id: &str) -> Option<FileRecord> {
        self.lock().files.iter().find(|f| f.id == file_id).cloned()
    }

    pub fn is_loading_files(&self) -> bool {
        self.lock().loads_in_flight > 0
    }

    pub fn credential(&self) -> Credential {
        self.lock().context.credential.clone()
    }

    pub fn set_credential(&self, credential: Credential) {
        let mut state = self.lock();
        state.context = state.context.with_credential(credential);
    }

    /// Fetches the full listing and replaces the local list on success.
    pub async fn list_files(&self) -> SyncStatus {
        let (_loading, context) = LoadingGuard::acquire(self);

        match self.backend.list_files(&context).await {
            Ok(files) => {
                let count = files.len();
                self.lock().files = files;
                debug!(count, "file list refreshed");
                self.emit(FileEvent::FilesReplaced { count });
                SyncStatus::Synced
            }
            Err(err) => {
                error!(error = %err, "failed to fetch files");
                SyncStatus::Failed
            }
        }
    }

    /// Deletes a file on the server, then re-lists.
    pub async fn delete_file(&self, file_id: &str) -> SyncStatus {
        let context = self.context();
        if let Err(err) = self.backend.delete_file(&context, file_id).await {
            error!(error = %err, file_id, "failed to delete file");
            return SyncStatus::Failed;
        }

        self.emit(FileEvent::Deleted {
            file_id: file_id.to_string(),
        });
        self.list_files().await
    }

    /// Uploads a local document for indexing, then re-lists.
    pub async fn upload_file(&self, path: &Path) -> SyncStatus {
        let context = self.context();
        match self.backend.upload_file(&context, path).await {
            Ok(record) => {
                debug!(file_id = %record.id, filename = %record.filename, "file uploaded");
                self.emit(FileEvent::Uploaded(record));
                self.list_files().await
            }
            Err(err) => {
                error!(error = %err, path = %path.display(), "failed to upload file");
                SyncStatus::Failed
            }
        }
    }
}
