//! # Migration Chain
//!
//! Envelopes are upgraded one schema version at a time. Each registered
//! step takes a document at version `n` and must hand back version `n + 1`.
//!
//! ```text
//! v0 ──step 0──▶ v1 ──step 1──▶ … ──▶ CURRENT_SCHEMA_VERSION
//! ```
//!
//! A gap in the chain, or a step that does not advance exactly one
//! version, aborts the load rather than looping.

use crate::envelope::{BUILDER_VERSION, CURRENT_SCHEMA_VERSION};
use crate::error::{MigrationError, PersistError, PersistResult};
use formsmith_editor::{Millis, DEFAULT_FORM_NAME};
use formsmith_schema::new_form_id;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

pub type Document = Map<String, Value>;

/// Upgrade a document from its version to the next one
pub type MigrationStep = Box<dyn Fn(Document, Millis) -> Document + Send + Sync>;

pub struct Migrator {
    steps: BTreeMap<u64, MigrationStep>,
    target: u64,
}

impl Migrator {
    /// Chain with no steps, targeting `target`
    pub fn empty(target: u64) -> Self {
        Self {
            steps: BTreeMap::new(),
            target,
        }
    }

    /// Every step this build knows about
    pub fn new() -> Self {
        Self::empty(CURRENT_SCHEMA_VERSION).with_step(0, Box::new(upgrade_v0))
    }

    pub fn with_step(mut self, from: u64, step: MigrationStep) -> Self {
        self.steps.insert(from, step);
        self
    }

    pub fn target(&self) -> u64 {
        self.target
    }

    /// Bring `document` up to the target version
    pub fn migrate(&self, mut document: Document, now_ms: Millis) -> PersistResult<Document> {
        let mut version = read_version(&document)?;
        let start = version;

        if version > self.target {
            return Err(MigrationError::UnsupportedVersion {
                found: version,
                supported: self.target,
            }
            .into());
        }

        while version < self.target {
            let step = self
                .steps
                .get(&version)
                .ok_or(MigrationError::MissingStep(version))?;

            document = step(document, now_ms);
            let next = read_version(&document)?;
            if next != version + 1 {
                return Err(MigrationError::NoProgress {
                    from: version,
                    to: next,
                }
                .into());
            }

            debug!(from = version, to = next, "Applied migration step");
            version = next;
        }

        if start != version {
            info!(from = start, to = version, "Migrated document");
        }
        Ok(document)
    }
}

impl Default for Migrator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Migrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migrator")
            .field("steps", &self.steps.keys().collect::<Vec<_>>())
            .field("target", &self.target)
            .finish()
    }
}

/// `schemaVersion`, with absence meaning 0
pub fn read_version(document: &Document) -> PersistResult<u64> {
    match document.get("schemaVersion") {
        None | Some(Value::Null) => Ok(0),
        Some(value) => value
            .as_u64()
            .ok_or_else(|| PersistError::validation("schemaVersion", "expected a non-negative integer")),
    }
}

/// Documents from before versioning: backfill identity, timestamps and an
/// empty tree where absent
fn upgrade_v0(mut document: Document, now_ms: Millis) -> Document {
    let mut backfill = |key: &str, value: Value| {
        if document.get(key).map_or(true, Value::is_null) {
            document.insert(key.to_string(), value);
        }
    };

    backfill("createdAt", Value::from(now_ms));
    backfill("updatedAt", Value::from(now_ms));
    backfill("builderVersion", Value::from(BUILDER_VERSION));
    backfill("formName", Value::from(DEFAULT_FORM_NAME));
    backfill("formId", Value::from(new_form_id()));
    backfill("nodes", Value::Object(Map::new()));
    backfill("rootIds", Value::Array(Vec::new()));

    document.insert("schemaVersion".to_string(), Value::from(1u64));
    document
}
