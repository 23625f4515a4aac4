//! Run-scoped chunk metadata
//!
//! Populated as a side effect of splitting and read during extraction and
//! diagnostics. Nothing here is durable: each prepared document gets a fresh
//! store, which replaces the extractor's current one when the document is
//! prepared or run.

use serde::{Deserialize, Serialize};
use solgraph_domain::{Chunk, ChunkId};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Section key used for chunks that belong to no section
pub const UNSECTIONED: &str = "UNSECTIONED";

/// Errors raised by the metadata store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// A chunk id was recorded twice in one run
    #[error("Chunk {0} already recorded")]
    Duplicate(ChunkId),
}

/// Structural metadata of one chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Section id, if the chunk belongs to one
    pub section_id: Option<String>,
    /// Section title
    pub section_title: Option<String>,
    /// Subsection id
    pub subsection_id: Option<String>,
    /// Estimated page
    pub page_estimate: usize,
    /// Requirement sentences owned by the chunk
    pub requirement_count: usize,
    /// Splitter decision that produced the chunk
    pub split_kind: String,
}

impl From<&Chunk> for ChunkMetadata {
    fn from(chunk: &Chunk) -> Self {
        Self {
            section_id: chunk.section_id.clone(),
            section_title: chunk.section_title.clone(),
            subsection_id: chunk.subsection_id.clone(),
            page_estimate: chunk.page_estimate,
            requirement_count: chunk.requirement_count,
            split_kind: chunk.split_kind.as_str().to_string(),
        }
    }
}

impl ChunkMetadata {
    fn section_key(&self) -> &str {
        self.section_id.as_deref().unwrap_or(UNSECTIONED)
    }
}

/// Map of chunk id to structural metadata for the current run
#[derive(Debug, Clone, Default)]
pub struct ChunkMetadataStore {
    entries: HashMap<ChunkId, ChunkMetadata>,
    order: Vec<ChunkId>,
}

impl ChunkMetadataStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Record metadata for a chunk; each id can be recorded once per run
    pub fn record(&mut self, id: ChunkId, metadata: ChunkMetadata) -> Result<(), MetadataError> {
        if self.entries.contains_key(&id) {
            return Err(MetadataError::Duplicate(id));
        }
        self.order.push(id.clone());
        self.entries.insert(id, metadata);
        Ok(())
    }

    /// Record a chunk's own metadata
    pub fn record_chunk(&mut self, chunk: &Chunk) -> Result<(), MetadataError> {
        self.record(chunk.id.clone(), ChunkMetadata::from(chunk))
    }

    /// Metadata of one chunk
    pub fn get(&self, id: &ChunkId) -> Option<&ChunkMetadata> {
        self.entries.get(id)
    }

    /// All entries in recording order
    pub fn iter(&self) -> impl Iterator<Item = (&ChunkId, &ChunkMetadata)> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id).map(|meta| (id, meta)))
    }

    /// Number of recorded chunks
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget everything (start of a new run)
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Chunk count per section id
    pub fn chunks_per_section(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for meta in self.entries.values() {
            *counts.entry(meta.section_key().to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Requirement count per section id
    pub fn requirements_per_section(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for meta in self.entries.values() {
            *counts.entry(meta.section_key().to_string()).or_insert(0) += meta.requirement_count;
        }
        counts
    }
}
