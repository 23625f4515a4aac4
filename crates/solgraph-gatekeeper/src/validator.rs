//! Post-extraction validation logic

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use solgraph_domain::{
    ChunkId, EntityType, ExtractedEntity, ExtractedRelationship, OntologySchema,
    RelationshipType, ValidRelationshipTriple, ValidatedEntity, ValidatedRelationship,
};
use tracing::debug;

use crate::cleaning::{clean_until, IdentifierProtector};
use crate::{GatekeeperError, ValidationConfig};

/// Which kind of candidate a rejection refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateKind {
    /// An entity candidate
    Entity,
    /// A relationship candidate
    Relationship,
}

/// Reasons for rejection
#[derive(Debug, Clone, PartialEq)]
pub enum RejectionReason {
    /// Name shorter than the configured minimum after cleaning
    TooShort {
        /// Cleaned name
        name: String,
        /// Configured minimum
        min: usize,
    },

    /// Cleaning left a name without any letter
    NumericFragment(String),

    /// Type is not a member of the schema
    UnknownEntityType(String),

    /// Name is on the deny-list
    Trivial(String),

    /// An entity with the same name was already accepted in this chunk
    DuplicateEntity(String),

    /// Endpoint does not name any entity of this chunk
    UnresolvedEndpoint(String),

    /// Endpoint names an entity that was itself rejected
    RejectedEndpoint(String),

    /// Relationship type is not a member of the schema
    UnknownRelationType(String),

    /// Source and target resolve to the same entity
    SelfLoop(String),

    /// Resolved type triple is not whitelisted
    TripleNotWhitelisted {
        /// The resolved triple
        triple: ValidRelationshipTriple,
        /// Why the schema refuses it
        detail: String,
    },

    /// The same relationship was already accepted in this chunk
    DuplicateRelationship(String),
}

impl RejectionReason {
    /// Stable short code used for statistics
    pub fn code(&self) -> &'static str {
        match self {
            RejectionReason::TooShort { .. } => "too_short",
            RejectionReason::NumericFragment(_) => "numeric_fragment",
            RejectionReason::UnknownEntityType(_) => "unknown_entity_type",
            RejectionReason::Trivial(_) => "trivial",
            RejectionReason::DuplicateEntity(_) => "duplicate_entity",
            RejectionReason::UnresolvedEndpoint(_) => "unresolved_endpoint",
            RejectionReason::RejectedEndpoint(_) => "rejected_endpoint",
            RejectionReason::UnknownRelationType(_) => "unknown_relation_type",
            RejectionReason::SelfLoop(_) => "self_loop",
            RejectionReason::TripleNotWhitelisted { .. } => "triple_not_whitelisted",
            RejectionReason::DuplicateRelationship(_) => "duplicate_relationship",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::TooShort { name, min } => {
                write!(f, "name '{}' is shorter than {} characters", name, min)
            }
            RejectionReason::NumericFragment(name) => {
                write!(f, "name '{}' is a numeric fragment", name)
            }
            RejectionReason::UnknownEntityType(t) => write!(f, "unknown entity type '{}'", t),
            RejectionReason::Trivial(name) => write!(f, "trivial name '{}'", name),
            RejectionReason::DuplicateEntity(name) => write!(f, "duplicate entity '{}'", name),
            RejectionReason::UnresolvedEndpoint(name) => {
                write!(f, "endpoint '{}' does not match any entity", name)
            }
            RejectionReason::RejectedEndpoint(name) => {
                write!(f, "endpoint '{}' refers to a rejected entity", name)
            }
            RejectionReason::UnknownRelationType(t) => {
                write!(f, "unknown relationship type '{}'", t)
            }
            RejectionReason::SelfLoop(name) => write!(f, "self-loop on '{}'", name),
            RejectionReason::TripleNotWhitelisted { triple, detail } => {
                write!(f, "triple not in whitelist: {} ({})", triple, detail)
            }
            RejectionReason::DuplicateRelationship(key) => {
                write!(f, "duplicate relationship {}", key)
            }
        }
    }
}

/// One rejected candidate
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    /// Candidate kind
    pub kind: CandidateKind,
    /// Entity name, or `source -relation-> target` for relationships
    pub label: String,
    /// Chunk the candidate came from
    pub chunk_id: ChunkId,
    /// Why it was rejected
    pub reason: RejectionReason,
}

/// Accept/reject counts, mergeable across chunks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationStats {
    /// Entities accepted
    pub entities_accepted: usize,
    /// Entities rejected
    pub entities_rejected: usize,
    /// Relationships accepted
    pub relationships_accepted: usize,
    /// Relationships rejected
    pub relationships_rejected: usize,
    /// Accepted entities whose names matched a protected identifier shape
    pub protected_identifiers: usize,
    /// Rejection counts keyed by reason code
    pub rejections_by_reason: BTreeMap<String, usize>,
}

impl ValidationStats {
    fn record_rejection(&mut self, kind: CandidateKind, reason: &RejectionReason) {
        match kind {
            CandidateKind::Entity => self.entities_rejected += 1,
            CandidateKind::Relationship => self.relationships_rejected += 1,
        }
        *self
            .rejections_by_reason
            .entry(reason.code().to_string())
            .or_insert(0) += 1;
    }

    /// Add another set of counts into this one
    pub fn merge(&mut self, other: &ValidationStats) {
        self.entities_accepted += other.entities_accepted;
        self.entities_rejected += other.entities_rejected;
        self.relationships_accepted += other.relationships_accepted;
        self.relationships_rejected += other.relationships_rejected;
        self.protected_identifiers += other.protected_identifiers;
        for (code, count) in &other.rejections_by_reason {
            *self.rejections_by_reason.entry(code.clone()).or_insert(0) += count;
        }
    }

    /// Count for one reason code
    pub fn rejected_for(&self, code: &str) -> usize {
        self.rejections_by_reason.get(code).copied().unwrap_or(0)
    }

    /// Total rejections of either kind
    pub fn total_rejected(&self) -> usize {
        self.entities_rejected + self.relationships_rejected
    }
}

/// Output of validating one chunk's candidates
#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    /// Accepted entities, in candidate order
    pub entities: Vec<ValidatedEntity>,
    /// Accepted relationships, in candidate order
    pub relationships: Vec<ValidatedRelationship>,
    /// Every rejection, in candidate order
    pub rejections: Vec<Rejection>,
    /// Counts
    pub stats: ValidationStats,
}

/// The Gatekeeper validates extraction candidates before they become graph data
///
/// Validation is a pure filter: it holds no state between calls, and feeding
/// its own output back in returns the same records with nothing rejected.
pub struct Gatekeeper {
    config: ValidationConfig,
    protector: IdentifierProtector,
    trivial: HashSet<String>,
}

impl Gatekeeper {
    /// Create a new Gatekeeper with the given configuration
    pub fn new(config: ValidationConfig) -> Result<Self, GatekeeperError> {
        config.validate()?;
        let protector = IdentifierProtector::new(&config.protected_identifier_patterns)?;
        let trivial = config
            .trivial_terms
            .iter()
            .map(|t| t.trim().to_lowercase())
            .collect();
        Ok(Self {
            config,
            protector,
            trivial,
        })
    }

    /// Create a Gatekeeper with default configuration
    pub fn default_config() -> Self {
        Self::new(ValidationConfig::default()).expect("default validation config is valid")
    }

    /// Active configuration
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Normalize a raw name: protected shapes are only trimmed, everything
    /// else is cleaned. Returns the name and whether it is protected.
    pub fn normalize_name(&self, raw: &str) -> (String, bool) {
        if let Some(protected) = self.protector.protected_form(raw) {
            return (protected, true);
        }
        // Cleaning can expose a protected shape ("1. REQ-001")
        let cleaned = clean_until(raw, |s| self.protector.is_protected(s));
        let protected = self.protector.is_protected(&cleaned);
        (cleaned, protected)
    }

    /// Validate the candidates extracted from one chunk
    pub fn validate(
        &self,
        schema: &OntologySchema,
        entities: &[ExtractedEntity],
        relationships: &[ExtractedRelationship],
    ) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::default();

        // Accepted entities by case-folded name
        let mut accepted: HashMap<String, usize> = HashMap::new();
        // Case-folded names of rejected entities, raw and cleaned
        let mut rejected_names: HashSet<String> = HashSet::new();

        for candidate in entities {
            match self.check_entity(schema, candidate, &accepted) {
                Ok(entity) => {
                    if entity.protected {
                        outcome.stats.protected_identifiers += 1;
                    }
                    outcome.stats.entities_accepted += 1;
                    accepted.insert(entity.name.to_lowercase(), outcome.entities.len());
                    outcome.entities.push(entity);
                }
                Err((label, reason)) => {
                    rejected_names.insert(candidate.name.trim().to_lowercase());
                    rejected_names.insert(label.to_lowercase());
                    self.reject(
                        &mut outcome,
                        CandidateKind::Entity,
                        label,
                        &candidate.chunk_id,
                        reason,
                    );
                }
            }
        }

        let mut seen_relationships: HashSet<String> = HashSet::new();
        for candidate in relationships {
            let result = self.check_relationship(
                schema,
                candidate,
                &outcome.entities,
                &accepted,
                &rejected_names,
            );
            match result {
                Ok(rel) => {
                    if self.config.deduplicate && !seen_relationships.insert(rel.key()) {
                        let label = relationship_label(candidate);
                        let reason = RejectionReason::DuplicateRelationship(rel.key());
                        self.reject(
                            &mut outcome,
                            CandidateKind::Relationship,
                            label,
                            &candidate.chunk_id,
                            reason,
                        );
                        continue;
                    }
                    outcome.stats.relationships_accepted += 1;
                    outcome.relationships.push(rel);
                }
                Err(reason) => {
                    let label = relationship_label(candidate);
                    self.reject(
                        &mut outcome,
                        CandidateKind::Relationship,
                        label,
                        &candidate.chunk_id,
                        reason,
                    );
                }
            }
        }

        outcome
    }

    fn reject(
        &self,
        outcome: &mut ValidationOutcome,
        kind: CandidateKind,
        label: String,
        chunk_id: &ChunkId,
        reason: RejectionReason,
    ) {
        debug!(chunk_id = %chunk_id, candidate = %label, reason = %reason, "Rejected candidate");
        outcome.stats.record_rejection(kind, &reason);
        outcome.rejections.push(Rejection {
            kind,
            label,
            chunk_id: chunk_id.clone(),
            reason,
        });
    }

    /// Run the entity pipeline: protection, cleaning, type, triviality, duplicates
    fn check_entity(
        &self,
        schema: &OntologySchema,
        candidate: &ExtractedEntity,
        accepted: &HashMap<String, usize>,
    ) -> Result<ValidatedEntity, (String, RejectionReason)> {
        let (name, protected) = self.normalize_name(&candidate.name);

        let Some(entity_type) = schema.resolve_entity_type(&candidate.entity_type) else {
            return Err((
                name,
                RejectionReason::UnknownEntityType(candidate.entity_type.trim().to_string()),
            ));
        };

        if name.chars().count() < self.config.min_name_chars {
            return Err((
                name.clone(),
                RejectionReason::TooShort {
                    name,
                    min: self.config.min_name_chars,
                },
            ));
        }
        if !protected && !name.chars().any(char::is_alphabetic) {
            return Err((name.clone(), RejectionReason::NumericFragment(name)));
        }

        if self.trivial.contains(&name.to_lowercase()) {
            return Err((name.clone(), RejectionReason::Trivial(name)));
        }

        if self.config.deduplicate && accepted.contains_key(&name.to_lowercase()) {
            return Err((name.clone(), RejectionReason::DuplicateEntity(name)));
        }

        Ok(ValidatedEntity {
            name,
            entity_type,
            description: candidate.description.trim().to_string(),
            chunk_id: candidate.chunk_id.clone(),
            protected,
        })
    }

    /// Resolve an endpoint name against this chunk's accepted entities
    fn resolve_endpoint<'a>(
        &self,
        raw: &str,
        entities: &'a [ValidatedEntity],
        accepted: &HashMap<String, usize>,
        rejected_names: &HashSet<String>,
    ) -> Result<&'a ValidatedEntity, RejectionReason> {
        let (name, _) = self.normalize_name(raw);
        let folded = name.to_lowercase();
        if let Some(&idx) = accepted.get(&folded) {
            return Ok(&entities[idx]);
        }
        if rejected_names.contains(&folded) || rejected_names.contains(&raw.trim().to_lowercase())
        {
            return Err(RejectionReason::RejectedEndpoint(raw.trim().to_string()));
        }
        Err(RejectionReason::UnresolvedEndpoint(raw.trim().to_string()))
    }

    fn check_relationship(
        &self,
        schema: &OntologySchema,
        candidate: &ExtractedRelationship,
        entities: &[ValidatedEntity],
        accepted: &HashMap<String, usize>,
        rejected_names: &HashSet<String>,
    ) -> Result<ValidatedRelationship, RejectionReason> {
        let source = self.resolve_endpoint(&candidate.source, entities, accepted, rejected_names)?;
        let target = self.resolve_endpoint(&candidate.target, entities, accepted, rejected_names)?;

        let relation = RelationshipType::parse(&candidate.relation)
            .filter(|r| schema.relationship_types().contains(r))
            .ok_or_else(|| {
                RejectionReason::UnknownRelationType(candidate.relation.trim().to_string())
            })?;

        if self.config.reject_self_loops && source.key() == target.key() {
            return Err(RejectionReason::SelfLoop(source.name.clone()));
        }

        if let Err(detail) =
            schema.explain_triple(source.entity_type, relation, target.entity_type)
        {
            return Err(RejectionReason::TripleNotWhitelisted {
                triple: ValidRelationshipTriple::new(
                    source.entity_type,
                    relation,
                    target.entity_type,
                ),
                detail,
            });
        }

        Ok(ValidatedRelationship {
            source: source.name.clone(),
            source_type: source.entity_type,
            relation,
            target: target.name.clone(),
            target_type: target.entity_type,
            description: candidate.description.trim().to_string(),
            keywords: candidate
                .keywords
                .iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
            strength: candidate.strength,
            chunk_id: candidate.chunk_id.clone(),
        })
    }
}

fn relationship_label(candidate: &ExtractedRelationship) -> String {
    format!(
        "{} -{}-> {}",
        candidate.source.trim(),
        candidate.relation.trim(),
        candidate.target.trim()
    )
}

/// Whether every accepted record respects the schema
///
/// Holds for any [`ValidationOutcome`] produced against `schema`.
pub fn is_closed_world(schema: &OntologySchema, outcome: &ValidationOutcome) -> bool {
    outcome
        .entities
        .iter()
        .all(|e| schema.has_entity_type(e.entity_type))
        && outcome.relationships.iter().all(|r| {
            schema.is_valid_triple(r.source_type, r.relation, r.target_type)
        })
}

/// Entity types present in an outcome, with counts
pub fn entity_type_counts(outcome: &ValidationOutcome) -> BTreeMap<EntityType, usize> {
    let mut counts = BTreeMap::new();
    for entity in &outcome.entities {
        *counts.entry(entity.entity_type).or_insert(0) += 1;
    }
    counts
}
