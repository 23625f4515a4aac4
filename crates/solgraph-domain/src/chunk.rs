//! Chunk module - bounded text units submitted for extraction

use std::fmt;

/// Identifier of a chunk, stable within one document
///
/// Formatted as `<document_id>:chunk:<ordinal>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkId(String);

impl ChunkId {
    /// Build the identifier of the `ordinal`-th chunk of a document
    pub fn new(document_id: &str, ordinal: usize) -> Self {
        Self(format!("{}:chunk:{}", document_id, ordinal))
    }

    /// Wrap an existing identifier string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a chunk came out of the splitter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SplitKind {
    /// A whole region that fit both bounds
    Whole,
    /// A batch of requirements from a dense region
    DensitySplit,
    /// A paragraph or sentence pack from an oversized batch
    LengthSplit,
    /// A hard cut at the character cap (lossy for the cut sentence)
    HardCut,
    /// A window of the structureless fallback
    SlidingWindow,
}

impl SplitKind {
    /// Short label used in logs and diagnostics
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitKind::Whole => "whole",
            SplitKind::DensitySplit => "density_split",
            SplitKind::LengthSplit => "length_split",
            SplitKind::HardCut => "hard_cut",
            SplitKind::SlidingWindow => "sliding_window",
        }
    }
}

/// A bounded, ordered unit of document text
///
/// Chunks are created once by the splitter and never modified afterwards.
/// `text[overlap_prefix..]` is the part of the text owned by this chunk; the
/// prefix before it repeats the tail of the preceding chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Stable identifier
    pub id: ChunkId,

    /// Position in the document, contiguous from 0
    pub ordinal: usize,

    /// Source document identifier
    pub document_id: String,

    /// Chunk text, including any overlap prefix
    pub text: String,

    /// Byte length of the designated overlap at the start of `text`
    pub overlap_prefix: usize,

    /// Byte offset in the source where the owned part of `text` begins
    pub source_start: usize,

    /// Section this chunk belongs to (none in the sliding-window fallback)
    pub section_id: Option<String>,

    /// Title of that section
    pub section_title: Option<String>,

    /// Subsection this chunk belongs to
    pub subsection_id: Option<String>,

    /// Estimated page number
    pub page_estimate: usize,

    /// Requirement sentences starting inside the owned text
    pub requirement_count: usize,

    /// How the splitter produced this chunk
    pub split_kind: SplitKind,

    /// Sections commonly cross-referenced by this chunk's section
    pub related_sections: Vec<String>,
}

impl Chunk {
    /// The part of the text owned by this chunk (without the overlap prefix)
    pub fn body(&self) -> &str {
        &self.text[self.overlap_prefix..]
    }

    /// Length of the full text in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Concatenate the owned text of every chunk
///
/// For a chunk sequence produced without lossy truncation this reproduces the
/// source document exactly.
pub fn reconstruct_source(chunks: &[Chunk]) -> String {
    chunks.iter().map(Chunk::body).collect()
}
