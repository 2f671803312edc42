//! Load pipeline: parse → migrate → validate shape → deserialize →
//! validate topology. Nothing reaches a store until every stage passed.

use crate::envelope::Envelope;
use crate::error::{PersistError, PersistResult};
use crate::migrate::Migrator;
use crate::validate::validate_envelope;
use formsmith_editor::{check_topology, Millis};
use serde_json::Value;
use tracing::{debug, warn};

/// Runs documents through the load stages
#[derive(Debug, Default)]
pub struct Loader {
    migrator: Migrator,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_migrator(migrator: Migrator) -> Self {
        Self { migrator }
    }

    pub fn migrator(&self) -> &Migrator {
        &self.migrator
    }

    pub fn load_str(&self, source: &str, now_ms: Millis) -> PersistResult<Envelope> {
        let value: Value = serde_json::from_str(source)?;
        self.load_value(value, now_ms)
    }

    pub fn load_value(&self, value: Value, now_ms: Millis) -> PersistResult<Envelope> {
        let result = self.run(value, now_ms);
        if let Err(err) = &result {
            warn!(error = %err, "Rejected document");
        }
        result
    }

    fn run(&self, value: Value, now_ms: Millis) -> PersistResult<Envelope> {
        let Value::Object(document) = value else {
            return Err(PersistError::parse("expected a JSON object"));
        };

        let document = self.migrator.migrate(document, now_ms)?;
        validate_envelope(&document)?;

        let envelope: Envelope = serde_json::from_value(Value::Object(document))?;
        check_topology(&envelope.nodes, &envelope.root_ids)?;

        debug!(form_id = %envelope.form_id, nodes = envelope.nodes.len(), "Loaded envelope");
        Ok(envelope)
    }
}

/// Load with the default migration chain
pub fn load_envelope(source: &str, now_ms: Millis) -> PersistResult<Envelope> {
    Loader::new().load_str(source, now_ms)
}
