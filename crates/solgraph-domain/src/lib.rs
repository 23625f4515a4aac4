//! Solgraph Domain Layer
//!
//! This crate contains the data model and the closed-world type system shared by
//! every other Solgraph crate. It deliberately carries almost no external
//! dependencies and defines the value objects and trait seams that the
//! infrastructure crates implement.
//!
//! ## Key Concepts
//!
//! - **Structural map**: sections and subsections detected in a solicitation
//! - **Chunk**: a bounded, ordered unit of text submitted to the extraction engine
//! - **Ontology**: the closed set of entity and relationship types plus the
//!   whitelist of valid type triples
//! - **Candidates / validated records**: untrusted extraction output and what
//!   survives validation
//!
//! ## Architecture
//!
//! - Pure data and rules only
//! - The extraction engine and header detection are reached through traits
//! - Infrastructure implementations live in other crates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chunk;
pub mod extraction;
pub mod ontology;
pub mod run;
pub mod structure;
pub mod traits;

// Re-exports for convenience
pub use chunk::{reconstruct_source, Chunk, ChunkId, SplitKind};
pub use extraction::{
    ExtractedEntity, ExtractedRelationship, ValidatedEntity, ValidatedRelationship,
};
pub use ontology::{
    EntityType, ExtractionConstraints, ExtractionExample, OntologySchema,
    OntologySchemaBuilder, RelationshipType, SchemaError, ValidRelationshipTriple,
};
pub use run::RunId;
pub use structure::{
    estimate_page, HeaderKind, HeaderMatch, StructuralMap, StructuralSection, StructureScan,
    Subsection, CHARS_PER_PAGE,
};
