//! Error types for the Extractor

use crate::metadata::MetadataError;
use thiserror::Error;

/// Errors that can occur during extraction
///
/// Only `Config` and `Metadata` abort a run. The others describe chunk-local
/// failures and end up in the chunk's outcome.
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Extraction engine error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Extraction call exceeded its time budget
    #[error("Extraction timeout after {0}s")]
    Timeout(u64),

    /// Engine output could not be read as an extraction batch
    #[error("Invalid extraction format: {0}")]
    InvalidFormat(String),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// Chunk metadata error
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for ExtractorError {
    fn from(e: serde_json::Error) -> Self {
        ExtractorError::JsonParse(e.to_string())
    }
}
