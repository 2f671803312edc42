use thiserror::Error;

pub type SchemaResult<T> = Result<T, SchemaError>;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid field at {path}: {message}")]
    InvalidField { path: String, message: String },

    #[error("Document is not a field schema")]
    NotASchema,
}

impl SchemaError {
    pub fn invalid_field(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            path: path.into(),
            message: message.into(),
        }
    }
}
