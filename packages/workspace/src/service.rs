//! Async front for a [`StorageProvider`].
//!
//! Provider calls run on tokio's blocking pool. Each call resolves to one
//! whole result, which the caller applies to its store in a single step
//! (`load_document` for a load, nothing for a save).

use crate::envelope::{envelope_from_store, DocumentSummary, Envelope};
use crate::error::{PersistResult, StorageError};
use crate::storage::StorageProvider;
use formsmith_editor::{FormStore, Millis};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct DocumentService {
    provider: Arc<dyn StorageProvider>,
}

impl DocumentService {
    pub fn new(provider: Arc<dyn StorageProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<dyn StorageProvider> {
        &self.provider
    }

    async fn run<T, F>(&self, task: F) -> PersistResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn StorageProvider) -> PersistResult<T> + Send + 'static,
    {
        let provider = self.provider.clone();
        tokio::task::spawn_blocking(move || task(provider.as_ref()))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }

    pub async fn list(&self) -> PersistResult<Vec<DocumentSummary>> {
        self.run(|provider| provider.list()).await
    }

    pub async fn load(&self, form_id: &str) -> PersistResult<Envelope> {
        let form_id = form_id.to_string();
        self.run(move |provider| provider.load(&form_id)).await
    }

    pub async fn save(&self, envelope: Envelope) -> PersistResult<DocumentSummary> {
        self.run(move |provider| {
            provider.save(&envelope.form_id, &envelope)?;
            Ok(envelope.summary())
        })
        .await
    }

    pub async fn remove(&self, form_id: &str) -> PersistResult<()> {
        let form_id = form_id.to_string();
        self.run(move |provider| provider.remove(&form_id)).await
    }

    /// Snapshot the store now and write it in the background
    pub async fn save_store(&self, store: &FormStore, now_ms: Millis) -> PersistResult<DocumentSummary> {
        let envelope = envelope_from_store(store, now_ms);
        self.save(envelope).await
    }

    /// Load `form_id` and open it in `store`; the store is untouched on error
    pub async fn open(&self, store: &mut FormStore, form_id: &str) -> PersistResult<()> {
        let envelope = self.load(form_id).await?;
        let (tree, meta) = envelope.into_parts();
        store.load_document(tree, meta);
        info!(form_id, "Opened form");
        Ok(())
    }
}

impl std::fmt::Debug for DocumentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentService")
            .field("provider", &self.provider.name())
            .finish()
    }
}
