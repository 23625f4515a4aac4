//! Gatekeeper error types

use thiserror::Error;

/// Errors that can occur while setting up the gatekeeper
///
/// Validation itself never fails: rejected candidates are reported in the
/// outcome, not as errors.
#[derive(Error, Debug)]
pub enum GatekeeperError {
    /// A protected identifier pattern does not compile
    #[error("Invalid protected identifier pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Underlying regex error
        #[source]
        source: regex::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
