//! Configuration for the Extractor

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to do with a batch that still exceeds `max_chunk_chars` after
/// paragraph and sentence packing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Hard-cut at the cap and carry the rest into continuation chunks
    #[default]
    Split,
    /// Keep the first `max_chunk_chars` characters and drop the rest (lossy)
    Truncate,
}

/// Default requirement markers (case-insensitive)
pub fn default_requirement_markers() -> Vec<String> {
    [
        r"(?i)\bshall\b",
        r"(?i)\bmust\b",
        r"(?i)\b(?:is|are)\s+required\b",
        r"(?i)\bmandatory\b",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

/// Configuration for the Extractor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Hard upper bound on chunk length (characters)
    pub max_chunk_chars: usize,

    /// Maximum requirement sentences per density-split chunk
    pub max_requirements_per_chunk: usize,

    /// Distinct sections needed before structure is trusted
    pub min_section_pattern_matches: usize,

    /// Overlap between sliding windows in the structureless fallback (characters)
    pub sliding_window_overlap_chars: usize,

    /// Overlap prefix carried by density-split chunks after the first (characters)
    pub density_split_overlap_chars: usize,

    /// Maximum extraction calls in flight
    pub max_concurrent_extractions: usize,

    /// Maximum time for a single extraction call (seconds)
    pub extraction_timeout_secs: u64,

    /// Regex patterns marking a sentence as a requirement
    pub requirement_marker_patterns: Vec<String>,

    /// Handling of batches that cannot be packed under the length cap
    pub overflow_policy: OverflowPolicy,
}

impl ExtractorConfig {
    /// Get the extraction timeout as a Duration
    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_chunk_chars == 0 {
            return Err("max_chunk_chars must be greater than 0".to_string());
        }
        if self.max_requirements_per_chunk == 0 {
            return Err("max_requirements_per_chunk must be greater than 0".to_string());
        }
        if self.min_section_pattern_matches == 0 {
            return Err("min_section_pattern_matches must be greater than 0".to_string());
        }
        if self.sliding_window_overlap_chars >= self.max_chunk_chars {
            return Err("sliding_window_overlap_chars must be less than max_chunk_chars".to_string());
        }
        if self.density_split_overlap_chars >= self.max_chunk_chars {
            return Err("density_split_overlap_chars must be less than max_chunk_chars".to_string());
        }
        if self.max_concurrent_extractions == 0 {
            return Err("max_concurrent_extractions must be greater than 0".to_string());
        }
        if self.extraction_timeout_secs == 0 {
            return Err("extraction_timeout_secs must be greater than 0".to_string());
        }
        if self.requirement_marker_patterns.is_empty() {
            return Err("requirement_marker_patterns must not be empty".to_string());
        }
        for pattern in &self.requirement_marker_patterns {
            Regex::new(pattern)
                .map_err(|e| format!("Invalid requirement marker '{}': {}", pattern, e))?;
        }
        Ok(())
    }
}

impl Default for ExtractorConfig {
    /// Default configuration with balanced settings
    fn default() -> Self {
        Self {
            max_chunk_chars: 4_000,
            max_requirements_per_chunk: 3,
            min_section_pattern_matches: 3,
            sliding_window_overlap_chars: 400,
            density_split_overlap_chars: 0,
            max_concurrent_extractions: 4,
            extraction_timeout_secs: 300,
            requirement_marker_patterns: default_requirement_markers(),
            overflow_policy: OverflowPolicy::Split,
        }
    }
}

impl ExtractorConfig {
    /// Aggressive preset: small dense chunks, short timeouts, more parallelism
    pub fn aggressive() -> Self {
        Self {
            max_chunk_chars: 2_000,
            max_requirements_per_chunk: 2,
            sliding_window_overlap_chars: 200,
            max_concurrent_extractions: 8,
            extraction_timeout_secs: 120,
            ..Self::default()
        }
    }

    /// Lenient preset: larger chunks, longer timeouts, fewer calls in flight
    pub fn lenient() -> Self {
        Self {
            max_chunk_chars: 8_000,
            max_requirements_per_chunk: 5,
            min_section_pattern_matches: 2,
            sliding_window_overlap_chars: 800,
            max_concurrent_extractions: 2,
            extraction_timeout_secs: 600,
            ..Self::default()
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}
