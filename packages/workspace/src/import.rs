//! # Import
//!
//! Bringing outside JSON into the editor, with an explicit confirmation
//! step before the live document is replaced.
//!
//! ```text
//!          begin                     confirm
//!   Idle ────────▶ Validating ──┬──▶ PendingConfirmation ────────▶ Committed
//!    ▲                          │            │ cancel                  │
//!    │                          └──▶ Failed  ▼                         │
//!    └───────── acknowledge ─────────────── Idle ◀──── acknowledge ────┘
//! ```
//!
//! Format detection tries the envelope first: an object carrying `nodes`
//! or `schemaVersion` goes through the load pipeline. Anything else must be
//! a declarative schema (a field array, or `{ fields, formName }`).

use crate::envelope::Envelope;
use crate::error::{PersistError, PersistResult};
use crate::load::Loader;
use formsmith_editor::{all_field_names, schema_field_names, FieldDef, FormStore, Millis};
use formsmith_schema::SchemaDocument;
use serde_json::Value;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Floor on how long a validation appears to take
pub const MIN_FEEDBACK: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    Envelope,
    Schema,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportPayload {
    Envelope(Envelope),
    Schema {
        fields: Vec<FieldDef>,
        form_name: Option<String>,
    },
}

/// A parsed, validated document waiting for confirmation
#[derive(Debug, Clone, PartialEq)]
pub struct ImportCandidate {
    pub payload: ImportPayload,

    /// Data names used more than once
    pub duplicate_names: Vec<String>,
}

impl ImportCandidate {
    pub fn format(&self) -> ImportFormat {
        match self.payload {
            ImportPayload::Envelope(_) => ImportFormat::Envelope,
            ImportPayload::Schema { .. } => ImportFormat::Schema,
        }
    }

    pub fn form_name(&self) -> Option<&str> {
        match &self.payload {
            ImportPayload::Envelope(envelope) => Some(&envelope.form_name),
            ImportPayload::Schema { form_name, .. } => form_name.as_deref(),
        }
    }
}

/// Parse and validate `source`, detecting its format
pub fn detect(loader: &Loader, source: &str, now_ms: Millis) -> PersistResult<ImportCandidate> {
    let value: Value = serde_json::from_str(source)?;

    let is_envelope = value
        .as_object()
        .is_some_and(|object| object.contains_key("nodes") || object.contains_key("schemaVersion"));

    if is_envelope {
        let envelope = loader.load_value(value, now_ms)?;
        let duplicate_names = duplicates(all_field_names(&envelope.tree()));
        return Ok(ImportCandidate {
            payload: ImportPayload::Envelope(envelope),
            duplicate_names,
        });
    }

    let document = SchemaDocument::from_value(value)?;
    let duplicate_names = duplicates(schema_field_names(&document.fields));
    Ok(ImportCandidate {
        payload: ImportPayload::Schema {
            fields: document.fields,
            form_name: document.form_name,
        },
        duplicate_names,
    })
}

fn duplicates(names: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut repeated = BTreeSet::new();
    for name in names {
        if !seen.insert(name.clone()) {
            repeated.insert(name);
        }
    }
    repeated.into_iter().collect()
}

#[derive(Debug, Default)]
pub enum ImportState {
    #[default]
    Idle,
    Validating,
    PendingConfirmation(Box<ImportCandidate>),
    Failed(PersistError),
    Committed,
}

impl ImportState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::PendingConfirmation(_) => "pendingConfirmation",
            Self::Failed(_) => "failed",
            Self::Committed => "committed",
        }
    }
}

#[derive(Debug, Default)]
pub struct ImportSession {
    state: ImportState,
    loader: Loader,
}

impl ImportSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loader(loader: Loader) -> Self {
        Self {
            state: ImportState::Idle,
            loader,
        }
    }

    pub fn state(&self) -> &ImportState {
        &self.state
    }

    pub fn candidate(&self) -> Option<&ImportCandidate> {
        match &self.state {
            ImportState::PendingConfirmation(candidate) => Some(candidate.as_ref()),
            _ => None,
        }
    }

    /// Validate `source`. Starting over discards whatever the session held.
    pub fn begin(&mut self, source: &str, now_ms: Millis) -> &ImportState {
        self.state = ImportState::Validating;
        let result = detect(&self.loader, source, now_ms);
        self.finish(result)
    }

    /// Like [`ImportSession::begin`], but the transition out of
    /// `Validating` takes at least `min_feedback`
    pub async fn begin_padded(
        &mut self,
        source: &str,
        now_ms: Millis,
        min_feedback: Duration,
    ) -> &ImportState {
        self.state = ImportState::Validating;
        let result = validate_async(&self.loader, source, now_ms, min_feedback).await;
        self.finish(result)
    }

    fn finish(&mut self, result: PersistResult<ImportCandidate>) -> &ImportState {
        self.state = match result {
            Ok(candidate) => {
                if !candidate.duplicate_names.is_empty() {
                    warn!(names = ?candidate.duplicate_names, "Import contains duplicate field names");
                }
                debug!(format = ?candidate.format(), "Import awaiting confirmation");
                ImportState::PendingConfirmation(Box::new(candidate))
            }
            Err(err) => {
                warn!(error = %err, "Import failed");
                ImportState::Failed(err)
            }
        };
        &self.state
    }

    /// Replace the live document with the pending candidate. Returns false
    /// when nothing is pending.
    pub fn confirm(&mut self, store: &mut FormStore) -> bool {
        let candidate = match std::mem::take(&mut self.state) {
            ImportState::PendingConfirmation(candidate) => *candidate,
            other => {
                self.state = other;
                return false;
            }
        };

        match candidate.payload {
            ImportPayload::Envelope(envelope) => {
                let (tree, meta) = envelope.into_parts();
                store.load_document(tree, meta);
            }
            ImportPayload::Schema { fields, form_name } => {
                store.replace_with_fields(&fields);
                if let Some(name) = form_name {
                    store.set_form_name(name);
                }
            }
        }

        info!(nodes = store.tree().len(), "Import committed");
        self.state = ImportState::Committed;
        true
    }

    /// Drop a pending candidate without touching the store
    pub fn cancel(&mut self) {
        if matches!(self.state, ImportState::PendingConfirmation(_)) {
            self.state = ImportState::Idle;
        }
    }

    /// Return to idle after a failure or a commit
    pub fn acknowledge(&mut self) {
        if matches!(self.state, ImportState::Failed(_) | ImportState::Committed) {
            self.state = ImportState::Idle;
        }
    }
}

/// [`detect`], taking at least `min_feedback`
pub async fn validate_async(
    loader: &Loader,
    source: &str,
    now_ms: Millis,
    min_feedback: Duration,
) -> PersistResult<ImportCandidate> {
    let started = tokio::time::Instant::now();
    let result = detect(loader, source, now_ms);
    tokio::time::sleep_until(started + min_feedback).await;
    result
}
