//! Run outcome and diagnostics types

use serde::{Deserialize, Serialize};
use solgraph_domain::{ChunkId, ValidatedEntity, ValidatedRelationship};
use solgraph_gatekeeper::ValidationStats;
use std::collections::BTreeMap;
use std::fmt;

/// How the document was chunked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StructureMode {
    /// Structure was detected and chunks follow section boundaries
    Structured {
        /// Distinct sections found
        sections: usize,
        /// Subsections found
        subsections: usize,
    },
    /// Too little structure; fixed-size overlapping windows were used
    SlidingWindow {
        /// Distinct section headers that did match
        distinct_sections: usize,
        /// Minimum required by configuration
        required: usize,
    },
}

impl fmt::Display for StructureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureMode::Structured {
                sections,
                subsections,
            } => write!(
                f,
                "structured ({} sections, {} subsections)",
                sections, subsections
            ),
            StructureMode::SlidingWindow {
                distinct_sections,
                required,
            } => write!(
                f,
                "sliding window ({} of {} required sections found)",
                distinct_sections, required
            ),
        }
    }
}

/// Outcome of one chunk's extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChunkStatus {
    /// Engine output parsed and validated
    Ok,
    /// Engine output could not be read; the chunk contributed nothing
    Malformed {
        /// Parser message
        reason: String,
    },
    /// Engine call exceeded the time budget
    Timeout {
        /// Budget in seconds
        after_secs: u64,
    },
    /// Engine call failed
    EngineFailure {
        /// Engine error message
        error: String,
    },
    /// Run was cancelled before the chunk was submitted
    Cancelled,
}

impl ChunkStatus {
    /// Short label used in summaries
    pub fn label(&self) -> &'static str {
        match self {
            ChunkStatus::Ok => "ok",
            ChunkStatus::Malformed { .. } => "malformed",
            ChunkStatus::Timeout { .. } => "timeout",
            ChunkStatus::EngineFailure { .. } => "engine_failure",
            ChunkStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the chunk produced usable output
    pub fn is_ok(&self) -> bool {
        matches!(self, ChunkStatus::Ok)
    }
}

/// Per-chunk line of the run report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkReport {
    /// Chunk id
    pub chunk_id: String,
    /// Chunk ordinal
    pub ordinal: usize,
    /// Section the chunk belongs to
    pub section_id: Option<String>,
    /// Outcome
    #[serde(flatten)]
    pub status: ChunkStatus,
    /// Entities that survived validation
    pub entities_accepted: usize,
    /// Relationships that survived validation
    pub relationships_accepted: usize,
    /// Candidates rejected by validation
    pub rejections: usize,
}

impl ChunkReport {
    pub(crate) fn new(chunk_id: &ChunkId, ordinal: usize, section_id: Option<String>, status: ChunkStatus) -> Self {
        Self {
            chunk_id: chunk_id.to_string(),
            ordinal,
            section_id,
            status,
            entities_accepted: 0,
            relationships_accepted: 0,
            rejections: 0,
        }
    }
}

/// Diagnostics for one document run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run identifier
    pub run_id: String,
    /// Source document
    pub document_id: String,
    /// Schema version used for validation
    pub schema_version: String,
    /// Chunking mode
    pub structure_mode: StructureMode,
    /// Total chunks
    pub chunk_count: usize,
    /// Chunks per section id
    pub chunks_per_section: BTreeMap<String, usize>,
    /// Requirement sentences per section id
    pub requirements_per_section: BTreeMap<String, usize>,
    /// Batches that had to be hard-cut at the length cap
    pub overflow_count: usize,
    /// Bytes dropped by the truncate overflow policy
    pub truncated_bytes: usize,
    /// Per-chunk outcomes in document order
    pub chunk_reports: Vec<ChunkReport>,
    /// Validation totals across all chunks
    pub validation: ValidationStats,
    /// Wall-clock duration of the run
    pub elapsed_ms: u64,
}

impl RunSummary {
    /// Number of chunks with the given status label
    pub fn count_status(&self, label: &str) -> usize {
        self.chunk_reports
            .iter()
            .filter(|r| r.status.label() == label)
            .count()
    }

    /// Chunks that completed
    pub fn ok_count(&self) -> usize {
        self.count_status("ok")
    }

    /// Chunks whose output was malformed
    pub fn malformed_count(&self) -> usize {
        self.count_status("malformed")
    }

    /// Chunks that timed out
    pub fn timeout_count(&self) -> usize {
        self.count_status("timeout")
    }

    /// Chunks whose engine call failed
    pub fn engine_failure_count(&self) -> usize {
        self.count_status("engine_failure")
    }

    /// Chunks discarded by cancellation
    pub fn cancelled_count(&self) -> usize {
        self.count_status("cancelled")
    }

    /// Human-readable multi-line report
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Run {} for '{}' (schema {})\n",
            self.run_id, self.document_id, self.schema_version
        );
        out.push_str(&format!("Structure: {}\n", self.structure_mode));
        out.push_str(&format!("Chunks: {}", self.chunk_count));
        if !self.chunks_per_section.is_empty() {
            let parts: Vec<String> = self
                .chunks_per_section
                .iter()
                .map(|(section, count)| format!("{}={}", section, count))
                .collect();
            out.push_str(&format!(" [{}]", parts.join(", ")));
        }
        out.push('\n');
        if self.overflow_count > 0 || self.truncated_bytes > 0 {
            out.push_str(&format!(
                "Overflow: {} hard cuts, {} bytes truncated\n",
                self.overflow_count, self.truncated_bytes
            ));
        }
        out.push_str(&format!(
            "Outcomes: {} ok, {} malformed, {} timeout, {} engine failure, {} cancelled\n",
            self.ok_count(),
            self.malformed_count(),
            self.timeout_count(),
            self.engine_failure_count(),
            self.cancelled_count()
        ));
        out.push_str(&format!(
            "Entities: {} accepted, {} rejected\n",
            self.validation.entities_accepted, self.validation.entities_rejected
        ));
        out.push_str(&format!(
            "Relationships: {} accepted, {} rejected\n",
            self.validation.relationships_accepted, self.validation.relationships_rejected
        ));
        for (reason, count) in &self.validation.rejections_by_reason {
            out.push_str(&format!("  {}: {}\n", reason, count));
        }
        out.push_str(&format!("Elapsed: {} ms", self.elapsed_ms));
        out
    }
}

/// Everything a document run produced
#[derive(Debug, Clone)]
pub struct DocumentExtraction {
    /// Run diagnostics
    pub summary: RunSummary,
    /// Validated entities in chunk order
    pub entities: Vec<ValidatedEntity>,
    /// Validated relationships in chunk order
    pub relationships: Vec<ValidatedRelationship>,
}
