//! Structure module - sections and subsections detected in a document

/// Rough number of characters per printed page, used for page estimates
pub const CHARS_PER_PAGE: usize = 2000;

/// Estimate the page a byte offset falls on
///
/// Pages are counted from 1; offsets below `2 * CHARS_PER_PAGE` both estimate to 1.
pub fn estimate_page(offset: usize) -> usize {
    (offset / CHARS_PER_PAGE).max(1)
}

/// A recognized top-level document division (e.g. "Section C", "Attachment J-1")
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralSection {
    /// Section identifier ("A".."M", "J-1", ...)
    pub id: String,

    /// Header title text following the identifier
    pub title: String,

    /// Byte offset of the header line start
    pub start: usize,

    /// Byte offset where the next section starts (or end of text)
    pub end: usize,

    /// Estimated page number of the header
    pub page_estimate: usize,
}

/// A numbered subsection nested under exactly one section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subsection {
    /// Identifier of the parent section
    pub section_id: String,

    /// Subsection identifier ("C.3.1", ...)
    pub id: String,

    /// Header title text
    pub title: String,

    /// Byte offset of the header line start
    pub start: usize,

    /// Byte offset where the next subsection or section starts
    pub end: usize,
}

/// Ordered sections and subsections of one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuralMap {
    /// Sections in document order
    pub sections: Vec<StructuralSection>,

    /// Subsections in document order
    pub subsections: Vec<Subsection>,
}

impl StructuralMap {
    /// Look up a section by identifier
    pub fn section(&self, id: &str) -> Option<&StructuralSection> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// Subsections belonging to one section, in document order
    pub fn subsections_of<'a>(&'a self, section_id: &'a str) -> impl Iterator<Item = &'a Subsection> + 'a {
        self.subsections
            .iter()
            .filter(move |sub| sub.section_id == section_id)
    }

    /// Number of sections
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Whether no section was recorded
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Outcome of scanning a document for structure
///
/// `NoStructure` is an expected result, not an error: it tells the splitter to
/// use the sliding-window fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureScan {
    /// Enough distinct sections were found
    Structured(StructuralMap),

    /// Too few distinct sections to trust the structure
    NoStructure {
        /// Distinct section headers that did match
        distinct_sections: usize,
        /// Minimum required by configuration
        required: usize,
    },
}

impl StructureScan {
    /// The structural map, if structure was detected
    pub fn structure(&self) -> Option<&StructuralMap> {
        match self {
            StructureScan::Structured(map) => Some(map),
            StructureScan::NoStructure { .. } => None,
        }
    }

    /// Whether structure was detected
    pub fn is_structured(&self) -> bool {
        matches!(self, StructureScan::Structured(_))
    }
}

/// Which kind of boundary a header line opens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderKind {
    /// Top-level section or attachment
    Section,
    /// Numbered subsection
    Subsection,
}

/// A header recognized on one line by a header strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMatch {
    /// Boundary kind
    pub kind: HeaderKind,

    /// Identifier extracted from the header
    pub id: String,

    /// Title extracted from the header (may be empty)
    pub title: String,

    /// Byte offset of the match within the line
    pub start: usize,

    /// Byte length of the match
    pub len: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_estimate() {
        assert_eq!(estimate_page(0), 1);
        assert_eq!(estimate_page(3999), 1);
        assert_eq!(estimate_page(4000), 2);
        assert_eq!(estimate_page(20_500), 10);
    }

    #[test]
    fn test_subsections_of() {
        let map = StructuralMap {
            sections: vec![],
            subsections: vec![
                Subsection {
                    section_id: "C".into(),
                    id: "C.1".into(),
                    title: String::new(),
                    start: 0,
                    end: 10,
                },
                Subsection {
                    section_id: "L".into(),
                    id: "L.1".into(),
                    title: String::new(),
                    start: 10,
                    end: 20,
                },
            ],
        };
        let ids: Vec<_> = map.subsections_of("C").map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["C.1"]);
    }
}
