//! Solgraph Extraction Engine Layer
//!
//! Pluggable extraction engine implementations.
//!
//! # Architecture
//!
//! This crate provides implementations of the `LlmProvider` trait from
//! `solgraph-domain`. The extractor only ever sees the trait, so engines can
//! be swapped without touching chunking or validation.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic mock for testing
//! - `OllamaProvider`: Local Ollama API integration
//!
//! # Examples
//!
//! ```
//! use solgraph_llm::MockProvider;
//! use solgraph_domain::traits::LlmProvider;
//!
//! let provider = MockProvider::new(r#"{"entities":[],"relationships":[]}"#);
//! let result = provider.generate("Section C text").unwrap();
//! assert!(result.contains("entities"));
//! ```

#![warn(missing_docs)]

pub mod ollama;

use solgraph_domain::traits::LlmProvider as LlmProviderTrait;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

pub use ollama::OllamaProvider;

/// Marker response that makes [`MockProvider`] fail a call
pub const MOCK_ERROR_MARKER: &str = "ERROR";

/// Errors that can occur during engine operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from the engine
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

/// Mock extraction engine for deterministic testing
///
/// Responses are selected by substring: the first registered key that occurs
/// anywhere in the prompt wins, which lets a test route one chunk's text to one
/// canned response. Prompts with no matching key get the default response.
///
/// # Examples
///
/// ```
/// use solgraph_llm::MockProvider;
/// use solgraph_domain::traits::LlmProvider;
///
/// let mut provider = MockProvider::default();
/// provider.add_response("Section C", "c-response");
/// provider.add_response("Section L", "l-response");
/// assert_eq!(provider.generate("... Section L text ...").unwrap(), "l-response");
/// assert_eq!(provider.call_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    responses: Arc<Mutex<Vec<(String, String)>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    call_count: Arc<Mutex<usize>>,
    delay: Option<Duration>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            responses: Arc::new(Mutex::new(Vec::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
            delay: None,
        }
    }

    /// Sleep for `delay` before answering every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Add a response for prompts containing `key`
    pub fn add_response(&mut self, key: impl Into<String>, response: impl Into<String>) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((key.into(), response.into()));
    }

    /// Configure to return an error for prompts containing `key`
    pub fn add_error(&mut self, key: impl Into<String>) {
        self.add_response(key, MOCK_ERROR_MARKER);
    }

    /// Get the number of times generate was called
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reset the call count and recorded prompts
    pub fn reset_call_count(&self) {
        *self.call_count.lock().unwrap_or_else(PoisonError::into_inner) = 0;
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Every prompt received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(r#"{"entities":[],"relationships":[]}"#)
    }
}

impl LlmProviderTrait for MockProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        *self.call_count.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).push(prompt.to_string());

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let responses = self.responses.lock().unwrap_or_else(PoisonError::into_inner);
        let response = responses
            .iter()
            .find(|(key, _)| prompt.contains(key.as_str()))
            .map(|(_, response)| response.as_str())
            .unwrap_or(&self.default_response);

        if response == MOCK_ERROR_MARKER {
            return Err(LlmError::Other("Mock error".to_string()));
        }
        Ok(response.to_string())
    }
}
