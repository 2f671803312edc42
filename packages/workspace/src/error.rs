use formsmith_editor::TopologyIssue;
use formsmith_schema::SchemaError;
use thiserror::Error;

pub type PersistResult<T> = Result<T, PersistError>;

/// Why a document could not be loaded, imported or saved
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Invalid document: {reason}")]
    Parse { reason: String },

    #[error("{path}: {message}")]
    Validation { path: String, message: String },

    #[error("Migration failed: {0}")]
    Migration(#[from] MigrationError),

    #[error("Broken tree: {0}")]
    Topology(#[from] TopologyIssue),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PersistError {
    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse {
            reason: reason.into(),
        }
    }

    pub fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for PersistError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(err.to_string())
    }
}

impl From<SchemaError> for PersistError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::InvalidField { path, message } => Self::Validation { path, message },
            SchemaError::Json(err) => err.into(),
            SchemaError::NotASchema => Self::parse("neither a saved form nor a field schema"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MigrationError {
    #[error("no migration step from schema version {0}")]
    MissingStep(u64),

    #[error("step from version {from} produced version {to}")]
    NoProgress { from: u64, to: u64 },

    #[error("schema version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u64, supported: u64 },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("form {0} not found")]
    NotFound(String),

    #[error("storage lock poisoned")]
    Poisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("background task failed: {0}")]
    Task(String),
}
