use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParleyError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Ground truth dataset error: {0}")]
    GroundTruthError(String),
    #[error("Grammar schema error: {0}")]
    SchemaError(String),
    #[error("Semantic parser failure: {0}")]
    ModelError(String),
    #[error("Span resolution error: {0}")]
    SpanError(String),
    #[error("Unrecognized dialogue type: {0}")]
    UnknownDialogueType(String),
    #[error("Memory bridge error: {0}")]
    MemoryError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}
