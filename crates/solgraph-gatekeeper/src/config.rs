//! Gatekeeper configuration

use crate::GatekeeperError;

/// Attachment and exhibit codes such as `ATTCH-0200000-17` or `REQ-001`
pub const PATTERN_ATTACHMENT_CODE: &str = r"^[A-Z]{2,6}-\d{3,}(?:-\d+)*$";

/// Hyphenated composite codes such as `MIL-STD-882E`, `NASA-STD-8739` or `SF-33`
pub const PATTERN_COMPOSITE_CODE: &str = r"^[A-Z]{2,6}(?:-[A-Z0-9]+(?:\.[A-Z0-9]+)*)+$";

/// Contract line item numbers such as `CLIN 0001` or `CLIN-0001AA`
pub const PATTERN_CLIN: &str = r"^(?i:CLIN)[\s-]?\d{4}[A-Z]{0,2}$";

/// Regulation clauses such as `FAR 52.212-2` or `DFARS 252.204-7012`
pub const PATTERN_CLAUSE: &str = r"^(?:FAR|DFARS)[\s-]?\d{2,3}\.\d{3}(?:-\d+)*$";

/// Bare clause numbers such as `52.212-4`
pub const PATTERN_CLAUSE_NUMBER: &str = r"^\d{2,3}\.\d{3}-\d+$";

/// Contract data item references such as `CDRL A001`
pub const PATTERN_CDRL: &str = r"^CDRL[\s-]?[A-Z]\d{3}$";

/// Configuration for validation rules
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Minimum length of a cleaned name, in characters
    pub min_name_chars: usize,

    /// Identifier shapes exempt from aggressive cleaning
    pub protected_identifier_patterns: Vec<String>,

    /// Generic terms rejected as trivial (compared case-insensitively)
    pub trivial_terms: Vec<String>,

    /// Reject relationships whose source and target are the same entity
    pub reject_self_loops: bool,

    /// Reject repeated entities and relationships within one chunk
    pub deduplicate: bool,
}

fn default_protected_patterns() -> Vec<String> {
    [
        PATTERN_ATTACHMENT_CODE,
        PATTERN_COMPOSITE_CODE,
        PATTERN_CLIN,
        PATTERN_CLAUSE,
        PATTERN_CLAUSE_NUMBER,
        PATTERN_CDRL,
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

fn terms(list: &[&str]) -> Vec<String> {
    list.iter().map(|t| t.to_string()).collect()
}

const DEFAULT_TRIVIAL_TERMS: &[&str] = &[
    "rounding",
    "n/a",
    "na",
    "none",
    "tbd",
    "etc",
    "other",
    "others",
    "various",
    "misc",
    "miscellaneous",
    "item",
    "items",
    "thing",
    "things",
    "it",
    "this",
    "that",
    "the",
    "herein",
    "thereof",
    "see above",
    "see below",
];

const STRICT_EXTRA_TRIVIAL_TERMS: &[&str] = &[
    "page", "table", "figure", "total", "subtotal", "information", "data", "general",
];

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_name_chars: 2,
            protected_identifier_patterns: default_protected_patterns(),
            trivial_terms: terms(DEFAULT_TRIVIAL_TERMS),
            reject_self_loops: true,
            deduplicate: true,
        }
    }
}

impl ValidationConfig {
    /// Create a permissive configuration (minimal filtering)
    pub fn permissive() -> Self {
        Self {
            min_name_chars: 1,
            protected_identifier_patterns: default_protected_patterns(),
            trivial_terms: terms(&["rounding"]),
            reject_self_loops: false,
            deduplicate: false,
        }
    }

    /// Create a strict configuration (longer names, wider deny-list)
    pub fn strict() -> Self {
        let mut trivial = terms(DEFAULT_TRIVIAL_TERMS);
        trivial.extend(terms(STRICT_EXTRA_TRIVIAL_TERMS));
        Self {
            min_name_chars: 3,
            protected_identifier_patterns: default_protected_patterns(),
            trivial_terms: trivial,
            reject_self_loops: true,
            deduplicate: true,
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), GatekeeperError> {
        if self.min_name_chars == 0 {
            return Err(GatekeeperError::Config(
                "min_name_chars must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
