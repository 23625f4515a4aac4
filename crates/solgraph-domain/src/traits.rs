//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Infrastructure implementations live in other crates.

use crate::HeaderMatch;

/// Trait for the extraction engine
///
/// Implemented by the infrastructure layer (solgraph-llm). Calls are blocking;
/// the extractor moves them onto a blocking thread and bounds them with a
/// timeout.
pub trait LlmProvider {
    /// Error type for engine operations
    type Error;

    /// Generate a completion for a prompt
    fn generate(&self, prompt: &str) -> Result<String, Self::Error>;
}

/// Trait for recognizing section and subsection headers on a line
///
/// The scanner consults a list of strategies in order. Implemented by
/// solgraph-extractor for regex dialects; other document families can supply
/// their own.
pub trait HeaderStrategy: Send + Sync {
    /// Try to recognize a header on one line (without its line terminator)
    fn match_line(&self, line: &str) -> Option<HeaderMatch>;
}
