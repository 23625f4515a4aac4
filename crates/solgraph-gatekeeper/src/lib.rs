//! Solgraph Gatekeeper
//!
//! Filters raw extraction candidates before they become graph data.
//!
//! The Gatekeeper provides:
//! - Identifier protection for fixed-shape codes (`ATTCH-0200000-17`, `FAR 52.212-2`)
//! - Name cleaning for everything else
//! - Closed-world type validation against an [`OntologySchema`](solgraph_domain::OntologySchema)
//! - Triviality filtering and per-chunk deduplication
//! - Relationship endpoint resolution and triple whitelisting
//!
//! # Examples
//!
//! ```
//! use solgraph_domain::{ChunkId, ExtractedEntity, OntologySchema};
//! use solgraph_gatekeeper::Gatekeeper;
//!
//! let schema = OntologySchema::government_contracting();
//! let gatekeeper = Gatekeeper::default_config();
//!
//! let candidate = ExtractedEntity {
//!     name: "ATTCH-0200000-17".to_string(),
//!     entity_type: "DELIVERABLE".to_string(),
//!     description: String::new(),
//!     chunk_id: ChunkId::new("rfp", 0),
//! };
//! let outcome = gatekeeper.validate(&schema, &[candidate], &[]);
//! assert_eq!(outcome.entities[0].name, "ATTCH-0200000-17");
//! ```

#![warn(missing_docs)]

mod cleaning;
mod config;
mod error;
mod validator;

pub use cleaning::{clean_name, IdentifierProtector};
pub use config::ValidationConfig;
pub use error::GatekeeperError;
pub use validator::{
    entity_type_counts, is_closed_world, CandidateKind, Gatekeeper, Rejection, RejectionReason,
    ValidationOutcome, ValidationStats,
};
