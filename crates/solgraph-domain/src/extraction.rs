//! Extraction module - candidate records and what survives validation
//!
//! Candidates are untrusted: every field comes straight from the extraction
//! engine. Validated records only exist after a pass through the gatekeeper and
//! always carry a schema-member type.

use crate::{ChunkId, EntityType, RelationshipType};

/// An entity as proposed by the extraction engine
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedEntity {
    /// Raw name
    pub name: String,
    /// Raw type name
    pub entity_type: String,
    /// Free-text description
    pub description: String,
    /// Chunk the candidate came from
    pub chunk_id: ChunkId,
}

/// A relationship as proposed by the extraction engine
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRelationship {
    /// Raw source entity name
    pub source: String,
    /// Raw target entity name
    pub target: String,
    /// Raw relationship type name
    pub relation: String,
    /// Free-text description
    pub description: String,
    /// Optional keywords
    pub keywords: Vec<String>,
    /// Optional strength reported by the engine
    pub strength: Option<f64>,
    /// Chunk the candidate came from
    pub chunk_id: ChunkId,
}

/// An entity accepted by validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedEntity {
    /// Cleaned name
    pub name: String,
    /// Schema-member type
    pub entity_type: EntityType,
    /// Description carried over from the candidate
    pub description: String,
    /// Chunk the candidate came from
    pub chunk_id: ChunkId,
    /// Whether the name matched a protected identifier pattern
    pub protected: bool,
}

impl ValidatedEntity {
    /// Deduplication key: type plus case-folded name
    pub fn key(&self) -> String {
        format!("{}:{}", self.entity_type, self.name.to_lowercase())
    }
}

/// A relationship accepted by validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRelationship {
    /// Source entity name, as accepted
    pub source: String,
    /// Resolved source type
    pub source_type: EntityType,
    /// Schema-member relationship type
    pub relation: RelationshipType,
    /// Target entity name, as accepted
    pub target: String,
    /// Resolved target type
    pub target_type: EntityType,
    /// Description carried over from the candidate
    pub description: String,
    /// Keywords carried over from the candidate
    pub keywords: Vec<String>,
    /// Strength carried over from the candidate
    pub strength: Option<f64>,
    /// Chunk the candidate came from
    pub chunk_id: ChunkId,
}

impl ValidatedRelationship {
    /// Key of the source entity
    pub fn source_key(&self) -> String {
        format!("{}:{}", self.source_type, self.source.to_lowercase())
    }

    /// Key of the target entity
    pub fn target_key(&self) -> String {
        format!("{}:{}", self.target_type, self.target.to_lowercase())
    }

    /// Deduplication key: `src_key -RELATION-> tgt_key`
    pub fn key(&self) -> String {
        format!(
            "{} -{}-> {}",
            self.source_key(),
            self.relation,
            self.target_key()
        )
    }
}

impl From<&ValidatedEntity> for ExtractedEntity {
    fn from(entity: &ValidatedEntity) -> Self {
        Self {
            name: entity.name.clone(),
            entity_type: entity.entity_type.as_str().to_string(),
            description: entity.description.clone(),
            chunk_id: entity.chunk_id.clone(),
        }
    }
}

impl From<&ValidatedRelationship> for ExtractedRelationship {
    fn from(rel: &ValidatedRelationship) -> Self {
        Self {
            source: rel.source.clone(),
            target: rel.target.clone(),
            relation: rel.relation.as_str().to_string(),
            description: rel.description.clone(),
            keywords: rel.keywords.clone(),
            strength: rel.strength,
            chunk_id: rel.chunk_id.clone(),
        }
    }
}
