//! # Formsmith Workspace
//!
//! Saving, loading and importing forms.
//!
//! ```text
//! JSON ──▶ Loader ─┬─ migrate (Migrator, one version per step)
//!                  ├─ validate shape (path-qualified errors)
//!                  ├─ deserialize (Envelope)
//!                  └─ check topology
//!                          │
//!                          ▼
//!        ImportSession / StorageProvider / DocumentService ──▶ FormStore
//! ```
//!
//! A failed stage aborts the whole load and the live store is left alone.

pub mod envelope;
pub mod error;
pub mod import;
pub mod load;
pub mod migrate;
pub mod service;
pub mod storage;
pub mod validate;

pub use envelope::{
    envelope_from_store, DocumentSummary, Envelope, BUILDER_VERSION, CURRENT_SCHEMA_VERSION,
};
pub use error::{MigrationError, PersistError, PersistResult, StorageError};
pub use import::{
    detect, validate_async, ImportCandidate, ImportFormat, ImportPayload, ImportSession,
    ImportState, MIN_FEEDBACK,
};
pub use load::{load_envelope, Loader};
pub use migrate::{MigrationStep, Migrator};
pub use service::DocumentService;
pub use storage::{FileStorage, MemoryStorage, StorageProvider};
pub use validate::validate_envelope;
