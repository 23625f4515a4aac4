//! Solgraph Extractor
//!
//! Turns a government solicitation into validated knowledge-graph records.
//!
//! # Overview
//!
//! Solicitations follow the Uniform Contract Format: lettered sections A through
//! M, attachments, and numbered subsections such as `C.3.1`. The extractor
//! detects that structure, splits the text into chunks that respect section and
//! subsection boundaries, asks an extraction engine for entities and
//! relationships per chunk, and filters every candidate through the
//! [`Gatekeeper`](solgraph_gatekeeper::Gatekeeper).
//!
//! # Architecture
//!
//! ```text
//! Text → Scanner → Splitter → Chunks → LLM → Candidates → Gatekeeper → Records
//! ```
//!
//! # Key Features
//!
//! - **Structure Detection**: Section, attachment and subsection headers, with a
//!   sliding-window fallback for unstructured text
//! - **Density-Aware Chunking**: Requirement-heavy regions are split so no chunk
//!   carries more than `max_requirements_per_chunk` shall-statements
//! - **Bounded Concurrency**: At most `max_concurrent_extractions` engine calls in
//!   flight, each under its own timeout
//! - **Run Diagnostics**: Per-chunk outcomes, rejection counts and a printable summary
//!
//! # Example Usage
//!
//! ```no_run
//! use solgraph_domain::OntologySchema;
//! use solgraph_extractor::{Extractor, ExtractorConfig};
//! use solgraph_gatekeeper::Gatekeeper;
//! use solgraph_llm::MockProvider;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let llm = MockProvider::new(r#"{"entities": [], "relationships": []}"#);
//! let schema = Arc::new(OntologySchema::government_contracting());
//! let extractor = Extractor::new(
//!     llm,
//!     Gatekeeper::default_config(),
//!     schema,
//!     ExtractorConfig::default(),
//! )?;
//!
//! let text = "SECTION C - STATEMENT OF WORK\nThe contractor shall deliver monthly reports.\n";
//! let extraction = extractor.process_document("rfp-001", text).await?;
//!
//! println!("{}", extraction.summary.summary());
//! println!("Entities: {}", extraction.entities.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod chunking;
mod config;
mod error;
mod extractor;
mod metadata;
mod parser;
mod prompt;
mod scanner;
mod types;

#[cfg(test)]
mod tests;

pub use chunking::{ChunkSplitter, SplitReport};
pub use config::{default_requirement_markers, ExtractorConfig, OverflowPolicy};
pub use error::ExtractorError;
pub use extractor::{Extractor, PreparedDocument};
pub use metadata::{ChunkMetadata, ChunkMetadataStore, MetadataError, UNSECTIONED};
pub use parser::{parse_extraction_response, ParsedBatch};
pub use prompt::PromptBuilder;
pub use scanner::{
    DocumentDialect, DocumentStructureScanner, RegexHeaderStrategy, UCF_ATTACHMENT_PATTERN,
    UCF_SECTION_PATTERN, UCF_SUBSECTION_PATTERN,
};
pub use types::{ChunkReport, ChunkStatus, DocumentExtraction, RunSummary, StructureMode};
