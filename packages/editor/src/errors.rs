//! Error types for the editor

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Mutation error: {0}")]
    Mutation(#[from] crate::mutations::MutationError),

    #[error("Schema error: {0}")]
    Schema(#[from] formsmith_schema::SchemaError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
