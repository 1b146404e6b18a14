//! Domain error types
//!
//! Every fallible operation in the crate reports one of these. Missing optional
//! source fields are not errors; they simply contribute nothing to a record.

use thiserror::Error;

/// Common result type for vocabulary operations
pub type Result<T> = std::result::Result<T, SubjectError>;

#[derive(Debug, Error)]
pub enum SubjectError {
    /// Malformed XML source document or record
    #[error("XML parse error: {0}")]
    Parse(String),

    /// Malformed YAML source document
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A field the output record cannot do without
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// OAI-PMH protocol error reported by the repository
    #[error("OAI-PMH error {code}: {message}")]
    Oai { code: String, message: String },

    /// Invalid or missing configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<quick_xml::Error> for SubjectError {
    fn from(e: quick_xml::Error) -> Self {
        SubjectError::Parse(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for SubjectError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        SubjectError::Parse(e.to_string())
    }
}
