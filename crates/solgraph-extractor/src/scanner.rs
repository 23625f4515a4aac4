//! Document structure detection
//!
//! A single left-to-right pass over the lines of a document. Each line is
//! offered to every header strategy; the winning match opens a section or a
//! subsection. Documents with too few distinct sections are reported as having
//! no structure so the splitter can fall back to sliding windows.

use regex::Regex;
use solgraph_domain::traits::HeaderStrategy;
use solgraph_domain::{
    estimate_page, HeaderKind, HeaderMatch, StructuralMap, StructuralSection, StructureScan,
    Subsection,
};
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::ExtractorError;

/// Header strategy backed by a regular expression
///
/// The pattern must define an `id` group and may define a `title` group. It is
/// anchored at line start automatically. Ids are upper-cased so `section c` and
/// `SECTION C` open the same section.
#[derive(Debug, Clone)]
pub struct RegexHeaderStrategy {
    kind: HeaderKind,
    regex: Regex,
}

impl RegexHeaderStrategy {
    /// Compile a strategy
    pub fn new(kind: HeaderKind, pattern: &str) -> Result<Self, ExtractorError> {
        let anchored = if pattern.starts_with('^') {
            pattern.to_string()
        } else {
            format!("^(?:{})", pattern)
        };
        let regex = Regex::new(&anchored)
            .map_err(|e| ExtractorError::Config(format!("Invalid header pattern: {}", e)))?;
        if !regex.capture_names().any(|name| name == Some("id")) {
            return Err(ExtractorError::Config(format!(
                "Header pattern '{}' has no 'id' group",
                pattern
            )));
        }
        Ok(Self { kind, regex })
    }

    /// Boundary kind this strategy detects
    pub fn kind(&self) -> HeaderKind {
        self.kind
    }
}

impl HeaderStrategy for RegexHeaderStrategy {
    fn match_line(&self, line: &str) -> Option<HeaderMatch> {
        let caps = self.regex.captures(line)?;
        let whole = caps.get(0)?;
        let id = caps.name("id")?.as_str().trim().to_uppercase();
        if id.is_empty() {
            return None;
        }
        let title = caps
            .name("title")
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        Some(HeaderMatch {
            kind: self.kind,
            id,
            title,
            start: whole.start(),
            len: whole.len(),
        })
    }
}

/// `SECTION A` .. `SECTION M` headers
pub const UCF_SECTION_PATTERN: &str =
    r"(?i)^[ \t]*section[ \t]+(?P<id>[a-m])\b(?:[ \t]*[-–—:.][ \t]*|[ \t]+)?(?P<title>[^.!?]{0,120})$";

/// `Attachment J-1` / `Exhibit J-2` headers
pub const UCF_ATTACHMENT_PATTERN: &str =
    r"(?i)^[ \t]*(?:attachment|exhibit)[ \t]+(?P<id>j[-.]?[a-z0-9]+(?:[-.][a-z0-9]+)*)\b(?:[ \t]*[-–—:][ \t]*|[ \t]+)?(?P<title>[^.!?]{0,120})$";

/// Dotted subsection numbers such as `C.3.1`
pub const UCF_SUBSECTION_PATTERN: &str =
    r"(?i)^[ \t]*(?P<id>[a-m]\.\d{1,3}(?:\.\d{1,3})*)\.?[ \t]+(?P<title>\S.*)$";

/// A family of documents: its header strategies and cross-reference map
#[derive(Clone)]
pub struct DocumentDialect {
    name: String,
    strategies: Vec<Arc<dyn HeaderStrategy>>,
    related: HashMap<String, Vec<String>>,
}

impl std::fmt::Debug for DocumentDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentDialect")
            .field("name", &self.name)
            .field("strategies", &self.strategies.len())
            .field("related", &self.related)
            .finish()
    }
}

impl DocumentDialect {
    /// Create a dialect from explicit strategies
    pub fn new(name: impl Into<String>, strategies: Vec<Arc<dyn HeaderStrategy>>) -> Self {
        Self {
            name: name.into(),
            strategies,
            related: HashMap::new(),
        }
    }

    /// Declare the sections a section commonly cross-references
    pub fn with_related(mut self, section_id: &str, related: &[&str]) -> Self {
        self.related.insert(
            section_id.to_string(),
            related.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    /// The uniform contract format used by federal solicitations
    pub fn uniform_contract_format() -> Self {
        let strategies: Vec<Arc<dyn HeaderStrategy>> = [
            (HeaderKind::Section, UCF_SECTION_PATTERN),
            (HeaderKind::Section, UCF_ATTACHMENT_PATTERN),
            (HeaderKind::Subsection, UCF_SUBSECTION_PATTERN),
        ]
        .into_iter()
        .map(|(kind, pattern)| {
            let strategy =
                RegexHeaderStrategy::new(kind, pattern).expect("built-in header pattern is valid");
            Arc::new(strategy) as Arc<dyn HeaderStrategy>
        })
        .collect();

        Self::new("uniform-contract-format", strategies)
            .with_related("B", &["C", "F"])
            .with_related("C", &["B", "F", "H", "M"])
            .with_related("F", &["B", "C"])
            .with_related("H", &["C", "M", "I"])
            .with_related("I", &["A", "B", "C", "D", "E", "F", "G", "H"])
            .with_related("J", &["C", "L", "M", "H"])
            .with_related("L", &["M", "K"])
            .with_related("M", &["L", "C"])
    }

    /// Dialect name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Header strategies in priority order
    pub fn strategies(&self) -> &[Arc<dyn HeaderStrategy>] {
        &self.strategies
    }

    /// Sections related to a section; attachments (`J-3`) inherit from their
    /// parent family (`J`)
    pub fn related_sections(&self, section_id: &str) -> Vec<String> {
        if let Some(related) = self.related.get(section_id) {
            return related.clone();
        }
        section_id
            .split_once(['-', '.'])
            .and_then(|(family, _)| self.related.get(family))
            .cloned()
            .unwrap_or_default()
    }
}

/// Detects section and subsection boundaries in raw text
#[derive(Debug, Clone)]
pub struct DocumentStructureScanner {
    dialect: DocumentDialect,
    min_section_pattern_matches: usize,
}

struct OpenSection {
    section: StructuralSection,
    subsection_ids: HashSet<String>,
}

impl DocumentStructureScanner {
    /// Create a scanner
    pub fn new(dialect: DocumentDialect, min_section_pattern_matches: usize) -> Self {
        Self {
            dialect,
            min_section_pattern_matches,
        }
    }

    /// Dialect in use
    pub fn dialect(&self) -> &DocumentDialect {
        &self.dialect
    }

    /// Pick the header for one line: earliest start, then longest, then
    /// strategy order. Matches must begin in the line's leading whitespace.
    fn best_match(&self, line: &str) -> Option<HeaderMatch> {
        self.dialect
            .strategies
            .iter()
            .enumerate()
            .filter_map(|(idx, strategy)| strategy.match_line(line).map(|m| (idx, m)))
            .filter(|(_, m)| {
                line.get(..m.start)
                    .is_some_and(|prefix| prefix.trim().is_empty())
            })
            .min_by_key(|(idx, m)| (m.start, Reverse(m.len), *idx))
            .map(|(_, m)| m)
    }

    /// Scan a document
    pub fn scan(&self, text: &str) -> StructureScan {
        let mut sections: Vec<StructuralSection> = Vec::new();
        let mut subsections: Vec<Subsection> = Vec::new();
        let mut seen_sections: HashSet<String> = HashSet::new();
        let mut current: Option<OpenSection> = None;

        let mut offset = 0;
        for raw_line in text.split_inclusive('\n') {
            let line_start = offset;
            offset += raw_line.len();
            let line = raw_line.trim_end_matches(['\n', '\r']);

            let Some(header) = self.best_match(line) else {
                continue;
            };

            match header.kind {
                HeaderKind::Section => {
                    if !seen_sections.insert(header.id.clone()) {
                        debug!(section = %header.id, "Repeated section header treated as body");
                        continue;
                    }
                    close_subsection(&mut subsections, line_start);
                    if let Some(open) = current.take() {
                        let mut section = open.section;
                        section.end = line_start;
                        sections.push(section);
                    }
                    current = Some(OpenSection {
                        section: StructuralSection {
                            id: header.id,
                            title: header.title,
                            start: line_start,
                            end: text.len(),
                            page_estimate: estimate_page(line_start),
                        },
                        subsection_ids: HashSet::new(),
                    });
                }
                HeaderKind::Subsection => {
                    let Some(open) = current.as_mut() else {
                        continue;
                    };
                    if !open.subsection_ids.insert(header.id.clone()) {
                        continue;
                    }
                    close_subsection(&mut subsections, line_start);
                    subsections.push(Subsection {
                        section_id: open.section.id.clone(),
                        id: header.id,
                        title: header.title,
                        start: line_start,
                        end: text.len(),
                    });
                }
            }
        }

        if let Some(open) = current {
            sections.push(open.section);
        }

        if sections.len() < self.min_section_pattern_matches {
            info!(
                distinct_sections = sections.len(),
                required = self.min_section_pattern_matches,
                "No reliable structure detected, using sliding-window fallback"
            );
            return StructureScan::NoStructure {
                distinct_sections: sections.len(),
                required: self.min_section_pattern_matches,
            };
        }

        info!(
            sections = sections.len(),
            subsections = subsections.len(),
            "Detected document structure"
        );
        StructureScan::Structured(StructuralMap {
            sections,
            subsections,
        })
    }
}

/// End the most recent subsection at `at` if it is still open
fn close_subsection(subsections: &mut [Subsection], at: usize) {
    if let Some(last) = subsections.last_mut() {
        if last.end > at {
            last.end = at;
        }
    }
}
