//! Ontology module - the closed-world type system for solicitation graphs
//!
//! An [`OntologySchema`] is an immutable, versioned object. It is built once and
//! handed explicitly to every consumer, so different document domains (or
//! different tests) can use different schemas side by side.
//!
//! Membership is closed-world: a type name that is not part of the schema is
//! invalid, and is never mapped onto a "closest" type.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Normalize a type name for lookup: trim, upper-case, and join words with `_`
///
/// `"delivered by"`, `"Delivered-By"` and `"DELIVERED_BY"` all normalize to the
/// same name. Nothing else is forgiven.
fn normalize_type_name(s: &str) -> String {
    s.replace('-', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_uppercase()
}

/// Entity types known to the solicitation ontology
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityType {
    /// Contractors, agencies, departments
    Organization,
    /// CLINs, technical and programmatic concepts
    Concept,
    /// Milestones, reviews, delivery events
    Event,
    /// Systems, tools, platforms
    Technology,
    /// Points of contact, contracting officers
    Person,
    /// Delivery sites, places of performance
    Location,
    /// Explicit shall/must obligations
    Requirement,
    /// FAR/DFARS clauses and contract provisions
    Clause,
    /// Solicitation sections and attachments
    Section,
    /// Referenced documents
    Document,
    /// Contract data items and other deliverables
    Deliverable,
}

impl EntityType {
    /// Every entity type, in declaration order
    pub const ALL: [EntityType; 11] = [
        EntityType::Organization,
        EntityType::Concept,
        EntityType::Event,
        EntityType::Technology,
        EntityType::Person,
        EntityType::Location,
        EntityType::Requirement,
        EntityType::Clause,
        EntityType::Section,
        EntityType::Document,
        EntityType::Deliverable,
    ];

    /// Canonical upper-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Organization => "ORGANIZATION",
            EntityType::Concept => "CONCEPT",
            EntityType::Event => "EVENT",
            EntityType::Technology => "TECHNOLOGY",
            EntityType::Person => "PERSON",
            EntityType::Location => "LOCATION",
            EntityType::Requirement => "REQUIREMENT",
            EntityType::Clause => "CLAUSE",
            EntityType::Section => "SECTION",
            EntityType::Document => "DOCUMENT",
            EntityType::Deliverable => "DELIVERABLE",
        }
    }

    /// Parse an entity type by exact (case-insensitive) name
    pub fn parse(s: &str) -> Option<Self> {
        let name = normalize_type_name(s);
        Self::ALL.iter().copied().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Unknown entity type: {}", s))
    }
}

/// Relationship types known to the solicitation ontology
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RelationshipType {
    /// One item mentions or cites another
    References,
    /// One item needs another for context
    DependsOn,
    /// Evaluation criteria assess another item
    Evaluates,
    /// Attachments or clauses back a main item
    Supports,
    /// Mandatory connection for compliance
    Requires,
    /// Item defines a concept or term
    Defines,
    /// Concept is defined by an item
    DefinedBy,
    /// Item implements a requirement
    Implements,
    /// Item validates a requirement or approach
    Validates,
    /// Item specifies details of another
    Specifies,
    /// Structural containment
    Contains,
    /// Item cites a clause, regulation or document
    Cites,
    /// Organization delivers an item
    Delivers,
    /// Item is delivered by an organization
    DeliveredBy,
    /// Work is performed at a location
    PerformedAt,
    /// Person or organization is responsible for an item
    ResponsibleFor,
    /// Clause or requirement applies to an item
    AppliesTo,
    /// Person represents an organization
    Represents,
    /// Location hosts an event or organization
    Hosts,
}

impl RelationshipType {
    /// Every relationship type, in declaration order
    pub const ALL: [RelationshipType; 19] = [
        RelationshipType::References,
        RelationshipType::DependsOn,
        RelationshipType::Evaluates,
        RelationshipType::Supports,
        RelationshipType::Requires,
        RelationshipType::Defines,
        RelationshipType::DefinedBy,
        RelationshipType::Implements,
        RelationshipType::Validates,
        RelationshipType::Specifies,
        RelationshipType::Contains,
        RelationshipType::Cites,
        RelationshipType::Delivers,
        RelationshipType::DeliveredBy,
        RelationshipType::PerformedAt,
        RelationshipType::ResponsibleFor,
        RelationshipType::AppliesTo,
        RelationshipType::Represents,
        RelationshipType::Hosts,
    ];

    /// Canonical upper-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::References => "REFERENCES",
            RelationshipType::DependsOn => "DEPENDS_ON",
            RelationshipType::Evaluates => "EVALUATES",
            RelationshipType::Supports => "SUPPORTS",
            RelationshipType::Requires => "REQUIRES",
            RelationshipType::Defines => "DEFINES",
            RelationshipType::DefinedBy => "DEFINED_BY",
            RelationshipType::Implements => "IMPLEMENTS",
            RelationshipType::Validates => "VALIDATES",
            RelationshipType::Specifies => "SPECIFIES",
            RelationshipType::Contains => "CONTAINS",
            RelationshipType::Cites => "CITES",
            RelationshipType::Delivers => "DELIVERS",
            RelationshipType::DeliveredBy => "DELIVERED_BY",
            RelationshipType::PerformedAt => "PERFORMED_AT",
            RelationshipType::ResponsibleFor => "RESPONSIBLE_FOR",
            RelationshipType::AppliesTo => "APPLIES_TO",
            RelationshipType::Represents => "REPRESENTS",
            RelationshipType::Hosts => "HOSTS",
        }
    }

    /// Parse a relationship type by exact (case-insensitive) name
    pub fn parse(s: &str) -> Option<Self> {
        let name = normalize_type_name(s);
        Self::ALL.iter().copied().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RelationshipType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Unknown relationship type: {}", s))
    }
}

/// A whitelisted (source type, relationship, target type) combination
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValidRelationshipTriple {
    /// Source entity type
    pub source: EntityType,
    /// Relationship type
    pub relation: RelationshipType,
    /// Target entity type
    pub target: EntityType,
}

impl ValidRelationshipTriple {
    /// Create a triple
    pub fn new(source: EntityType, relation: RelationshipType, target: EntityType) -> Self {
        Self {
            source,
            relation,
            target,
        }
    }
}

impl fmt::Display for ValidRelationshipTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -{}-> {}", self.source, self.relation, self.target)
    }
}

/// A curated text → expected-output pair used to steer the extraction engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionExample {
    /// Input text
    pub text: String,
    /// Output the engine is expected to produce for it
    pub expected_output: String,
}

/// Constraint payload handed to the extraction engine with every chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionConstraints {
    /// Version of the schema the constraints were rendered from
    pub schema_version: String,
    /// Allowed entity types
    pub entity_types: Vec<EntityType>,
    /// Allowed relationship types
    pub relationship_types: Vec<RelationshipType>,
    /// Few-shot examples
    pub examples: Vec<ExtractionExample>,
}

impl ExtractionConstraints {
    /// Comma-separated entity type names
    pub fn entity_type_list(&self) -> String {
        self.entity_types
            .iter()
            .map(EntityType::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Comma-separated relationship type names
    pub fn relationship_type_list(&self) -> String {
        self.relationship_types
            .iter()
            .map(RelationshipType::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Render the constraints as a plain-text prompt block
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Entity types (use exactly one of these, nothing else): {}\n",
            self.entity_type_list()
        ));
        out.push_str(&format!(
            "Relationship types (use exactly one of these, nothing else): {}\n",
            self.relationship_type_list()
        ));

        for (idx, example) in self.examples.iter().enumerate() {
            out.push_str(&format!("\nExample {}:\nText:\n{}\nOutput:\n{}\n", idx + 1, example.text, example.expected_output));
        }

        out
    }
}

/// Errors raised while building a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A schema needs at least one entity type
    NoEntityTypes,

    /// A triple uses an entity type the schema does not declare
    UndeclaredEntityType {
        /// The offending triple
        triple: ValidRelationshipTriple,
        /// The undeclared type
        entity_type: EntityType,
    },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::NoEntityTypes => write!(f, "schema declares no entity types"),
            SchemaError::UndeclaredEntityType {
                triple,
                entity_type,
            } => write!(
                f,
                "triple {} uses undeclared entity type {}",
                triple, entity_type
            ),
        }
    }
}

impl std::error::Error for SchemaError {}

/// Closed-world, versioned type system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OntologySchema {
    version: String,
    entity_types: BTreeSet<EntityType>,
    relationship_types: BTreeSet<RelationshipType>,
    triples: BTreeSet<ValidRelationshipTriple>,
    examples: Vec<ExtractionExample>,
}

impl OntologySchema {
    /// Start building a custom schema
    pub fn builder(version: impl Into<String>) -> OntologySchemaBuilder {
        OntologySchemaBuilder {
            version: version.into(),
            entity_types: BTreeSet::new(),
            relationship_types: BTreeSet::new(),
            triples: Vec::new(),
            examples: Vec::new(),
        }
    }

    /// The standard government-contracting schema (`govcon-1`)
    pub fn government_contracting() -> Self {
        use EntityType as E;
        use RelationshipType as R;

        let table: &[(EntityType, RelationshipType, &[EntityType])] = &[
            // Sections
            (E::Section, R::References, &[E::Section, E::Requirement, E::Clause, E::Document]),
            (E::Section, R::DependsOn, &[E::Section, E::Requirement]),
            (E::Section, R::Evaluates, &[E::Section, E::Requirement, E::Concept]),
            (E::Section, R::Supports, &[E::Section, E::Requirement]),
            (E::Section, R::Requires, &[E::Requirement, E::Document, E::Clause]),
            (E::Section, R::Contains, &[E::Requirement, E::Concept, E::Clause, E::Deliverable]),
            (E::Section, R::Cites, &[E::Clause, E::Document]),
            // Requirements
            (E::Requirement, R::References, &[E::Section, E::Clause, E::Document, E::Requirement]),
            (E::Requirement, R::DependsOn, &[E::Requirement, E::Concept, E::Technology]),
            (E::Requirement, R::Requires, &[E::Technology, E::Concept, E::Organization, E::Deliverable]),
            (E::Requirement, R::Specifies, &[E::Concept, E::Technology, E::Event, E::Deliverable]),
            (E::Requirement, R::AppliesTo, &[E::Section, E::Organization, E::Technology]),
            (E::Requirement, R::Cites, &[E::Clause, E::Document]),
            // Organizations
            (E::Organization, R::Implements, &[E::Requirement, E::Technology]),
            (E::Organization, R::ResponsibleFor, &[E::Requirement, E::Event, E::Concept, E::Deliverable]),
            (E::Organization, R::Delivers, &[E::Concept, E::Technology, E::Document, E::Deliverable]),
            (E::Organization, R::PerformedAt, &[E::Location]),
            // Clauses
            (E::Clause, R::AppliesTo, &[E::Section, E::Requirement, E::Organization]),
            (E::Clause, R::References, &[E::Clause, E::Document, E::Section]),
            (E::Clause, R::Requires, &[E::Requirement, E::Concept]),
            // Concepts (CLINs, technical concepts)
            (E::Concept, R::DefinedBy, &[E::Section, E::Requirement, E::Document]),
            (E::Concept, R::DependsOn, &[E::Concept, E::Technology, E::Requirement]),
            (E::Concept, R::Implements, &[E::Requirement]),
            (E::Concept, R::Specifies, &[E::Technology, E::Event]),
            // Events
            (E::Event, R::Requires, &[E::Concept, E::Document, E::Technology]),
            (E::Event, R::DependsOn, &[E::Event, E::Requirement]),
            (E::Event, R::DeliveredBy, &[E::Organization]),
            (E::Event, R::PerformedAt, &[E::Location]),
            // Technology
            (E::Technology, R::Implements, &[E::Requirement, E::Concept]),
            (E::Technology, R::Supports, &[E::Requirement, E::Concept]),
            (E::Technology, R::DependsOn, &[E::Technology, E::Concept]),
            // People
            (E::Person, R::ResponsibleFor, &[E::Requirement, E::Event, E::Concept, E::Deliverable]),
            (E::Person, R::Represents, &[E::Organization]),
            // Documents
            (E::Document, R::References, &[E::Section, E::Requirement, E::Clause, E::Document]),
            (E::Document, R::Supports, &[E::Section, E::Requirement]),
            (E::Document, R::Defines, &[E::Concept, E::Requirement, E::Deliverable]),
            // Locations
            (E::Location, R::Hosts, &[E::Event, E::Organization]),
            // Deliverables
            (E::Deliverable, R::DeliveredBy, &[E::Organization]),
            (E::Deliverable, R::References, &[E::Document, E::Clause, E::Requirement]),
            (E::Deliverable, R::Validates, &[E::Requirement]),
        ];

        let mut builder = Self::builder("govcon-1")
            .entity_types(EntityType::ALL)
            .relationship_types(RelationshipType::ALL);

        for (source, relation, targets) in table {
            for target in targets.iter() {
                builder = builder.triple(*source, *relation, *target);
            }
        }

        builder
            .example(GOVCON_EXAMPLE_DELIVERABLE_TEXT, GOVCON_EXAMPLE_DELIVERABLE_OUTPUT)
            .example(GOVCON_EXAMPLE_EVALUATION_TEXT, GOVCON_EXAMPLE_EVALUATION_OUTPUT)
            .build()
            .expect("built-in schema only uses declared entity types")
    }

    /// Schema version string
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Entity types that are members of this schema
    pub fn entity_types(&self) -> &BTreeSet<EntityType> {
        &self.entity_types
    }

    /// Relationship types that are members of this schema
    pub fn relationship_types(&self) -> &BTreeSet<RelationshipType> {
        &self.relationship_types
    }

    /// The triple whitelist
    pub fn triples(&self) -> &BTreeSet<ValidRelationshipTriple> {
        &self.triples
    }

    /// Few-shot examples
    pub fn examples(&self) -> &[ExtractionExample] {
        &self.examples
    }

    /// Whether an entity type belongs to the schema
    pub fn has_entity_type(&self, entity_type: EntityType) -> bool {
        self.entity_types.contains(&entity_type)
    }

    /// Resolve an entity type name against this schema
    ///
    /// Returns `None` for names that are unknown or not members of the schema.
    pub fn resolve_entity_type(&self, name: &str) -> Option<EntityType> {
        EntityType::parse(name).filter(|t| self.has_entity_type(*t))
    }

    /// Whether a (source, relation, target) triple is whitelisted
    pub fn is_valid_triple(
        &self,
        source: EntityType,
        relation: RelationshipType,
        target: EntityType,
    ) -> bool {
        self.triples
            .contains(&ValidRelationshipTriple::new(source, relation, target))
    }

    /// Valid relationships for a source type, mapped to their target types
    pub fn relationships_for(
        &self,
        source: EntityType,
    ) -> BTreeMap<RelationshipType, Vec<EntityType>> {
        let mut out: BTreeMap<RelationshipType, Vec<EntityType>> = BTreeMap::new();
        for triple in self.triples.iter().filter(|t| t.source == source) {
            out.entry(triple.relation).or_default().push(triple.target);
        }
        out
    }

    /// Target types compatible with a source type and relationship
    pub fn compatible_targets(
        &self,
        source: EntityType,
        relation: RelationshipType,
    ) -> Vec<EntityType> {
        self.triples
            .iter()
            .filter(|t| t.source == source && t.relation == relation)
            .map(|t| t.target)
            .collect()
    }

    /// Explain why a triple is or is not whitelisted
    pub fn explain_triple(
        &self,
        source: EntityType,
        relation: RelationshipType,
        target: EntityType,
    ) -> Result<(), String> {
        if self.is_valid_triple(source, relation, target) {
            return Ok(());
        }

        let valid = self.relationships_for(source);
        match valid.get(&relation) {
            None => {
                let names: Vec<_> = valid.keys().map(RelationshipType::as_str).collect();
                Err(format!(
                    "relationship {} is not valid for source type {}; valid relationships: [{}]",
                    relation,
                    source,
                    names.join(", ")
                ))
            }
            Some(targets) => {
                let names: Vec<_> = targets.iter().map(EntityType::as_str).collect();
                Err(format!(
                    "target type {} is not valid for {} -{}->; valid targets: [{}]",
                    target,
                    source,
                    relation,
                    names.join(", ")
                ))
            }
        }
    }

    /// Constraint payload for the extraction engine
    pub fn render_extraction_constraints(&self) -> ExtractionConstraints {
        ExtractionConstraints {
            schema_version: self.version.clone(),
            entity_types: self.entity_types.iter().copied().collect(),
            relationship_types: self.relationship_types.iter().copied().collect(),
            examples: self.examples.clone(),
        }
    }
}

/// Builder for [`OntologySchema`]
#[derive(Debug, Clone)]
pub struct OntologySchemaBuilder {
    version: String,
    entity_types: BTreeSet<EntityType>,
    relationship_types: BTreeSet<RelationshipType>,
    triples: Vec<ValidRelationshipTriple>,
    examples: Vec<ExtractionExample>,
}

impl OntologySchemaBuilder {
    /// Declare one entity type
    pub fn entity_type(mut self, entity_type: EntityType) -> Self {
        self.entity_types.insert(entity_type);
        self
    }

    /// Declare several entity types
    pub fn entity_types(mut self, types: impl IntoIterator<Item = EntityType>) -> Self {
        self.entity_types.extend(types);
        self
    }

    /// Declare one relationship type
    pub fn relationship_type(mut self, relation: RelationshipType) -> Self {
        self.relationship_types.insert(relation);
        self
    }

    /// Declare several relationship types
    pub fn relationship_types(mut self, types: impl IntoIterator<Item = RelationshipType>) -> Self {
        self.relationship_types.extend(types);
        self
    }

    /// Whitelist a triple; its relationship type is declared implicitly
    pub fn triple(
        mut self,
        source: EntityType,
        relation: RelationshipType,
        target: EntityType,
    ) -> Self {
        self.relationship_types.insert(relation);
        self.triples
            .push(ValidRelationshipTriple::new(source, relation, target));
        self
    }

    /// Add a few-shot example
    pub fn example(mut self, text: impl Into<String>, expected_output: impl Into<String>) -> Self {
        self.examples.push(ExtractionExample {
            text: text.into(),
            expected_output: expected_output.into(),
        });
        self
    }

    /// Finish the schema
    pub fn build(self) -> Result<OntologySchema, SchemaError> {
        if self.entity_types.is_empty() {
            return Err(SchemaError::NoEntityTypes);
        }

        for triple in &self.triples {
            for entity_type in [triple.source, triple.target] {
                if !self.entity_types.contains(&entity_type) {
                    return Err(SchemaError::UndeclaredEntityType {
                        triple: *triple,
                        entity_type,
                    });
                }
            }
        }

        Ok(OntologySchema {
            version: self.version,
            entity_types: self.entity_types,
            relationship_types: self.relationship_types,
            triples: self.triples.into_iter().collect(),
            examples: self.examples,
        })
    }
}

const GOVCON_EXAMPLE_DELIVERABLE_TEXT: &str = "C.3.2 The Contractor shall deliver the Monthly Status Report (ATTCH-0200000-17) to the Contracting Officer within 10 days after the end of each month.";

const GOVCON_EXAMPLE_DELIVERABLE_OUTPUT: &str = r#"{
  "entities": [
    {"name": "Contractor", "type": "ORGANIZATION", "description": "Party performing the contract"},
    {"name": "Monthly Status Report", "type": "DELIVERABLE", "description": "Report due 10 days after each month"},
    {"name": "ATTCH-0200000-17", "type": "DOCUMENT", "description": "Attachment defining the report format"},
    {"name": "Contracting Officer", "type": "PERSON", "description": "Government recipient of the report"}
  ],
  "relationships": [
    {"source": "Contractor", "relation": "DELIVERS", "target": "Monthly Status Report", "description": "Contractor shall deliver the report"},
    {"source": "Monthly Status Report", "relation": "REFERENCES", "target": "ATTCH-0200000-17", "description": "Report format is defined in the attachment"}
  ]
}"#;

const GOVCON_EXAMPLE_EVALUATION_TEXT: &str = "M.2 The Government will evaluate the Technical Approach described in Section L. FAR 52.212-2 applies to this acquisition.";

const GOVCON_EXAMPLE_EVALUATION_OUTPUT: &str = r#"{
  "entities": [
    {"name": "Section M", "type": "SECTION", "description": "Evaluation factors for award"},
    {"name": "Technical Approach", "type": "CONCEPT", "description": "Evaluated proposal volume"},
    {"name": "Section L", "type": "SECTION", "description": "Instructions to offerors"},
    {"name": "FAR 52.212-2", "type": "CLAUSE", "description": "Evaluation - Commercial Products and Services"}
  ],
  "relationships": [
    {"source": "Section M", "relation": "EVALUATES", "target": "Technical Approach", "description": "Technical Approach is an evaluation factor"},
    {"source": "Section M", "relation": "REFERENCES", "target": "Section L", "description": "Evaluation refers back to the instructions"},
    {"source": "FAR 52.212-2", "relation": "APPLIES_TO", "target": "Section M", "description": "Clause governs the evaluation"}
  ]
}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_entity_type_parse() {
        assert_eq!(EntityType::parse("DELIVERABLE"), Some(EntityType::Deliverable));
        assert_eq!(EntityType::parse(" section "), Some(EntityType::Section));
        assert_eq!(EntityType::parse("SECTIONS"), None);
        assert_eq!(EntityType::parse("Deliverables"), None);
    }

    #[test]
    fn test_relationship_type_parse_spellings() {
        for s in ["DELIVERED_BY", "delivered by", "Delivered-By"] {
            assert_eq!(RelationshipType::parse(s), Some(RelationshipType::DeliveredBy));
        }
        assert_eq!(RelationshipType::parse("delivered"), None);
    }

    #[test]
    fn test_standard_schema_triples() {
        let schema = OntologySchema::government_contracting();
        assert_eq!(schema.version(), "govcon-1");
        assert!(schema.is_valid_triple(
            EntityType::Section,
            RelationshipType::References,
            EntityType::Requirement
        ));
        assert!(!schema.is_valid_triple(
            EntityType::Person,
            RelationshipType::Contains,
            EntityType::Section
        ));
        assert_eq!(schema.entity_types().len(), EntityType::ALL.len());
    }

    #[test]
    fn test_relationships_for_section() {
        let schema = OntologySchema::government_contracting();
        let rels = schema.relationships_for(EntityType::Section);
        assert_eq!(
            rels.get(&RelationshipType::DependsOn),
            Some(&vec![EntityType::Requirement, EntityType::Section])
        );
        assert!(!rels.contains_key(&RelationshipType::Hosts));
    }

    #[test]
    fn test_compatible_targets() {
        let schema = OntologySchema::government_contracting();
        assert_eq!(
            schema.compatible_targets(EntityType::Organization, RelationshipType::PerformedAt),
            vec![EntityType::Location]
        );
        assert!(schema
            .compatible_targets(EntityType::Location, RelationshipType::Contains)
            .is_empty());
    }

    #[test]
    fn test_explain_triple_messages() {
        let schema = OntologySchema::government_contracting();
        let unknown = schema
            .explain_triple(EntityType::Person, RelationshipType::Contains, EntityType::Section)
            .unwrap_err();
        assert!(unknown.contains("not valid for source type PERSON"));

        let bad_target = schema
            .explain_triple(EntityType::Person, RelationshipType::Represents, EntityType::Section)
            .unwrap_err();
        assert!(bad_target.contains("target type SECTION"));

        assert!(schema
            .explain_triple(EntityType::Person, RelationshipType::Represents, EntityType::Organization)
            .is_ok());
    }

    #[test]
    fn test_builder_rejects_undeclared_types() {
        let result = OntologySchema::builder("test")
            .entity_type(EntityType::Section)
            .triple(EntityType::Section, RelationshipType::Contains, EntityType::Document)
            .build();
        assert!(matches!(
            result,
            Err(SchemaError::UndeclaredEntityType {
                entity_type: EntityType::Document,
                ..
            })
        ));
    }

    #[test]
    fn test_builder_requires_entity_types() {
        let result = OntologySchema::builder("empty").build();
        assert_eq!(result.unwrap_err(), SchemaError::NoEntityTypes);
    }

    #[test]
    fn test_custom_schema_is_closed() {
        let schema = OntologySchema::builder("narrow")
            .entity_types([EntityType::Section, EntityType::Document])
            .triple(EntityType::Section, RelationshipType::Contains, EntityType::Document)
            .build()
            .unwrap();
        assert_eq!(schema.resolve_entity_type("section"), Some(EntityType::Section));
        assert_eq!(schema.resolve_entity_type("DELIVERABLE"), None);
        assert_eq!(schema.relationship_types().len(), 1);
        assert!(!schema.is_valid_triple(
            EntityType::Section,
            RelationshipType::Evaluates,
            EntityType::Document
        ));
    }

    #[test]
    fn test_render_constraints_includes_examples() {
        let schema = OntologySchema::government_contracting();
        let constraints = schema.render_extraction_constraints();
        let rendered = constraints.render();
        assert!(rendered.contains("DELIVERABLE"));
        assert!(rendered.contains("DELIVERED_BY"));
        assert!(rendered.contains("Example 2:"));
        assert!(rendered.contains("ATTCH-0200000-17"));
        assert_eq!(constraints.schema_version, "govcon-1");
    }

    proptest! {
        #[test]
        fn prop_entity_type_names_round_trip(idx in 0usize..EntityType::ALL.len()) {
            let t = EntityType::ALL[idx];
            prop_assert_eq!(EntityType::parse(&t.as_str().to_lowercase()), Some(t));
        }

        #[test]
        fn prop_unknown_names_never_resolve(name in "[a-z]{1,12}") {
            let schema = OntologySchema::government_contracting();
            if let Some(t) = schema.resolve_entity_type(&name) {
                prop_assert_eq!(t.as_str().to_lowercase(), name);
            }
        }
    }
}
