//! Structure-aware chunk splitting
//!
//! Structured documents are split along section and subsection regions. A
//! region that fits both bounds becomes one chunk; a region dense with
//! requirement sentences is cut at requirement boundaries into batches of at
//! most `max_requirements_per_chunk`; a batch that is still too long is packed
//! by paragraphs, then sentences, and hard-cut only as a last resort.
//! Documents without structure fall back to overlapping sliding windows.
//!
//! All lengths are counted in Unicode scalar values and every cut falls on a
//! char boundary.

use regex::Regex;
use solgraph_domain::{
    estimate_page, Chunk, ChunkId, SplitKind, StructuralMap, StructuralSection, StructureScan,
};
use std::ops::Range;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use crate::config::{ExtractorConfig, OverflowPolicy};
use crate::error::ExtractorError;
use crate::scanner::DocumentDialect;
use crate::types::StructureMode;

/// Sentence terminators followed by whitespace, or a blank line
static SENTENCE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+\s+|\n[ \t]*\n\s*").unwrap());

/// Blank lines between paragraphs
static PARAGRAPH_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n[ \t]*\n\s*").unwrap());

/// Result of splitting one document
#[derive(Debug, Clone)]
pub struct SplitReport {
    /// Chunks in document order
    pub chunks: Vec<Chunk>,
    /// How the document was split
    pub mode: StructureMode,
    /// Batches that needed a hard cut at the length cap
    pub overflow_count: usize,
    /// Bytes dropped under [`OverflowPolicy::Truncate`]
    pub truncated_bytes: usize,
}

/// A contiguous slice of the document that is chunked on its own
struct Region<'a> {
    range: Range<usize>,
    section: &'a StructuralSection,
    subsection_id: Option<String>,
}

/// A planned chunk, in region-relative byte offsets
#[derive(Debug, Clone, PartialEq, Eq)]
struct Piece {
    owned: Range<usize>,
    overlap_start: usize,
    kind: SplitKind,
}

impl Piece {
    fn new(owned: Range<usize>, kind: SplitKind) -> Self {
        Self {
            overlap_start: owned.start,
            owned,
            kind,
        }
    }
}

#[derive(Default)]
struct OverflowTally {
    overflow_count: usize,
    truncated_bytes: usize,
}

/// Splits documents into bounded chunks
#[derive(Debug, Clone)]
pub struct ChunkSplitter {
    max_chunk_chars: usize,
    max_requirements_per_chunk: usize,
    sliding_window_overlap_chars: usize,
    density_split_overlap_chars: usize,
    overflow_policy: OverflowPolicy,
    markers: Vec<Regex>,
    dialect: DocumentDialect,
}

impl ChunkSplitter {
    /// Create a splitter from configuration
    pub fn new(config: &ExtractorConfig, dialect: DocumentDialect) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;
        let markers = config
            .requirement_marker_patterns
            .iter()
            .map(|p| Regex::new(p).map_err(|e| ExtractorError::Config(e.to_string())))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            max_chunk_chars: config.max_chunk_chars,
            max_requirements_per_chunk: config.max_requirements_per_chunk,
            sliding_window_overlap_chars: config.sliding_window_overlap_chars,
            density_split_overlap_chars: config.density_split_overlap_chars,
            overflow_policy: config.overflow_policy,
            markers,
            dialect,
        })
    }

    /// Whether a sentence contains a requirement marker
    pub fn is_requirement(&self, sentence: &str) -> bool {
        self.markers.iter().any(|m| m.is_match(sentence))
    }

    /// Byte offsets of requirement sentence starts
    fn requirement_starts(&self, text: &str) -> Vec<usize> {
        spans(text, &SENTENCE_BREAK)
            .into_iter()
            .filter(|s| self.is_requirement(&text[s.clone()]))
            .map(|s| s.start)
            .collect()
    }

    /// Split a document according to a structure scan
    pub fn split(&self, document_id: &str, text: &str, scan: &StructureScan) -> SplitReport {
        let report = match scan {
            StructureScan::Structured(map) => self.split_structured(document_id, text, map),
            StructureScan::NoStructure {
                distinct_sections,
                required,
            } => SplitReport {
                chunks: self.split_sliding(document_id, text),
                mode: StructureMode::SlidingWindow {
                    distinct_sections: *distinct_sections,
                    required: *required,
                },
                overflow_count: 0,
                truncated_bytes: 0,
            },
        };

        info!(
            document_id,
            chunks = report.chunks.len(),
            mode = %report.mode,
            overflow = report.overflow_count,
            "Split document"
        );
        report
    }

    fn split_structured(&self, document_id: &str, text: &str, map: &StructuralMap) -> SplitReport {
        let mut chunks = Vec::new();
        let mut tally = OverflowTally::default();

        for region in regions(text, map) {
            let region_text = &text[region.range.clone()];
            if region_text.is_empty() {
                continue;
            }
            let requirements = self.requirement_starts(region_text);
            let pieces = self.plan_region(&region, region_text, &requirements, &mut tally);
            let related = self.dialect.related_sections(&region.section.id);

            for piece in pieces {
                let ordinal = chunks.len();
                let source_start = region.range.start + piece.owned.start;
                let requirement_count = requirements
                    .iter()
                    .filter(|start| piece.owned.contains(*start))
                    .count();
                chunks.push(Chunk {
                    id: ChunkId::new(document_id, ordinal),
                    ordinal,
                    document_id: document_id.to_string(),
                    text: region_text[piece.overlap_start..piece.owned.end].to_string(),
                    overlap_prefix: piece.owned.start - piece.overlap_start,
                    source_start,
                    section_id: Some(region.section.id.clone()),
                    section_title: (!region.section.title.is_empty())
                        .then(|| region.section.title.clone()),
                    subsection_id: region.subsection_id.clone(),
                    page_estimate: estimate_page(source_start),
                    requirement_count,
                    split_kind: piece.kind,
                    related_sections: related.clone(),
                });
            }
        }

        SplitReport {
            chunks,
            mode: StructureMode::Structured {
                sections: map.sections.len(),
                subsections: map.subsections.len(),
            },
            overflow_count: tally.overflow_count,
            truncated_bytes: tally.truncated_bytes,
        }
    }

    /// Decide the pieces of one region
    fn plan_region(
        &self,
        region: &Region<'_>,
        text: &str,
        requirements: &[usize],
        tally: &mut OverflowTally,
    ) -> Vec<Piece> {
        let label = region
            .subsection_id
            .as_deref()
            .unwrap_or(region.section.id.as_str());
        let chars = text.chars().count();

        if requirements.len() <= self.max_requirements_per_chunk && chars <= self.max_chunk_chars {
            debug!(region = label, requirements = requirements.len(), chars, "Region kept whole");
            return vec![Piece::new(0..text.len(), SplitKind::Whole)];
        }

        let dense = requirements.len() > self.max_requirements_per_chunk;
        let mut cuts = vec![0];
        if dense {
            cuts.extend(
                requirements
                    .iter()
                    .skip(self.max_requirements_per_chunk)
                    .step_by(self.max_requirements_per_chunk)
                    .copied(),
            );
        }
        cuts.push(text.len());

        debug!(
            region = label,
            requirements = requirements.len(),
            chars,
            batches = cuts.len() - 1,
            "Splitting region"
        );

        let mut pieces = Vec::new();
        for window in cuts.windows(2) {
            let batch = window[0]..window[1];
            if text[batch.clone()].chars().count() <= self.max_chunk_chars {
                let kind = if dense {
                    SplitKind::DensitySplit
                } else {
                    SplitKind::LengthSplit
                };
                pieces.push(Piece::new(batch, kind));
            } else {
                pieces.extend(self.split_oversized(label, text, batch, tally));
            }
        }

        if dense && self.density_split_overlap_chars > 0 {
            for piece in pieces.iter_mut().skip(1) {
                self.add_overlap(text, piece);
            }
        }
        pieces
    }

    /// Pack a batch that exceeds the length cap
    fn split_oversized(
        &self,
        label: &str,
        text: &str,
        batch: Range<usize>,
        tally: &mut OverflowTally,
    ) -> Vec<Piece> {
        let max = self.max_chunk_chars;

        if self.overflow_policy == OverflowPolicy::Truncate {
            let cut = batch.start + byte_offset(&text[batch.clone()], max);
            let dropped = batch.end - cut;
            tally.overflow_count += 1;
            tally.truncated_bytes += dropped;
            warn!(region = label, max_chars = max, dropped_bytes = dropped, "Batch truncated at length cap");
            return vec![Piece::new(batch.start..cut, SplitKind::HardCut)];
        }

        let mut atoms: Vec<(Range<usize>, bool)> = Vec::new();
        for para in offset_spans(text, batch.clone(), &PARAGRAPH_BREAK) {
            if text[para.clone()].chars().count() <= max {
                atoms.push((para, false));
                continue;
            }
            for sentence in offset_spans(text, para, &SENTENCE_BREAK) {
                if text[sentence.clone()].chars().count() <= max {
                    atoms.push((sentence, false));
                } else {
                    atoms.extend(hard_cut(text, sentence, max).into_iter().map(|r| (r, true)));
                }
            }
        }

        let mut pieces: Vec<Piece> = Vec::new();
        let mut current: Option<(Piece, usize)> = None;
        for (atom, cut) in atoms {
            let atom_chars = text[atom.clone()].chars().count();
            match current.as_mut() {
                Some((piece, chars)) if *chars + atom_chars <= max => {
                    piece.owned.end = atom.end;
                    *chars += atom_chars;
                    if cut {
                        piece.kind = SplitKind::HardCut;
                    }
                }
                _ => {
                    if let Some((piece, _)) = current.take() {
                        pieces.push(piece);
                    }
                    let kind = if cut {
                        SplitKind::HardCut
                    } else {
                        SplitKind::LengthSplit
                    };
                    current = Some((Piece::new(atom, kind), atom_chars));
                }
            }
        }
        if let Some((piece, _)) = current {
            pieces.push(piece);
        }

        if pieces.iter().any(|p| p.kind == SplitKind::HardCut) {
            tally.overflow_count += 1;
            warn!(region = label, max_chars = max, pieces = pieces.len(), "Batch hard-cut at length cap");
        } else {
            debug!(region = label, pieces = pieces.len(), "Oversized batch packed by paragraphs and sentences");
        }
        pieces
    }

    /// Prefix a piece with the text preceding it, within the length cap
    fn add_overlap(&self, text: &str, piece: &mut Piece) {
        let body_chars = text[piece.owned.clone()].chars().count();
        let budget = self
            .density_split_overlap_chars
            .min(self.max_chunk_chars.saturating_sub(body_chars));
        if budget == 0 {
            return;
        }
        piece.overlap_start = text[..piece.owned.start]
            .char_indices()
            .rev()
            .take(budget)
            .last()
            .map(|(i, _)| i)
            .unwrap_or(piece.owned.start);
    }

    /// Overlapping fixed-size windows over the whole text
    fn split_sliding(&self, document_id: &str, text: &str) -> Vec<Chunk> {
        let mut char_starts: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        let total = char_starts.len();
        if total == 0 {
            return Vec::new();
        }
        char_starts.push(text.len());

        let requirements = self.requirement_starts(text);
        let step = self.max_chunk_chars - self.sliding_window_overlap_chars;
        let mut chunks = Vec::new();
        let mut start = 0;
        let mut owned_start = 0;

        loop {
            let end = (start + self.max_chunk_chars).min(total);
            let (window_byte, owned_byte, end_byte) =
                (char_starts[start], char_starts[owned_start], char_starts[end]);
            let ordinal = chunks.len();
            chunks.push(Chunk {
                id: ChunkId::new(document_id, ordinal),
                ordinal,
                document_id: document_id.to_string(),
                text: text[window_byte..end_byte].to_string(),
                overlap_prefix: owned_byte - window_byte,
                source_start: owned_byte,
                section_id: None,
                section_title: None,
                subsection_id: None,
                page_estimate: estimate_page(owned_byte),
                requirement_count: requirements
                    .iter()
                    .filter(|s| (owned_byte..end_byte).contains(*s))
                    .count(),
                split_kind: SplitKind::SlidingWindow,
                related_sections: Vec::new(),
            });

            if end == total {
                break;
            }
            owned_start = end;
            start += step;
        }

        debug!(document_id, windows = chunks.len(), step, "Sliding-window split");
        chunks
    }
}

/// Regions of a structured document
///
/// Sections without subsections are one region each. Otherwise each subsection
/// is a region and the text between the section header and the first
/// subsection joins the first subsection. Text before the first section joins
/// the first region.
fn regions<'a>(text: &str, map: &'a StructuralMap) -> Vec<Region<'a>> {
    let mut regions = Vec::new();
    for section in &map.sections {
        let subs: Vec<_> = map.subsections_of(&section.id).collect();
        match subs.split_first() {
            None => regions.push(Region {
                range: section.start..section.end,
                section,
                subsection_id: None,
            }),
            Some((first, rest)) => {
                regions.push(Region {
                    range: section.start..first.end,
                    section,
                    subsection_id: Some(first.id.clone()),
                });
                regions.extend(rest.iter().map(|sub| Region {
                    range: sub.start..sub.end,
                    section,
                    subsection_id: Some(sub.id.clone()),
                }));
            }
        }
    }
    if let Some(first) = regions.first_mut() {
        first.range.start = 0;
    }
    if let Some(last) = regions.last_mut() {
        last.range.end = last.range.end.max(text.len());
    }
    regions
}

/// Contiguous spans of `text`, each ending after a break match
fn spans(text: &str, breaks: &Regex) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0;
    for m in breaks.find_iter(text) {
        if m.end() > start {
            spans.push(start..m.end());
            start = m.end();
        }
    }
    if start < text.len() {
        spans.push(start..text.len());
    }
    spans
}

/// [`spans`] of a sub-range, in the coordinates of `text`
fn offset_spans(text: &str, range: Range<usize>, breaks: &Regex) -> Vec<Range<usize>> {
    let base = range.start;
    spans(&text[range], breaks)
        .into_iter()
        .map(|s| s.start + base..s.end + base)
        .collect()
}

/// Byte offset of the `n`-th char, or the text length
fn byte_offset(text: &str, n: usize) -> usize {
    text.char_indices().nth(n).map(|(i, _)| i).unwrap_or(text.len())
}

/// Cut a range into consecutive pieces of at most `max` chars
fn hard_cut(text: &str, range: Range<usize>, max: usize) -> Vec<Range<usize>> {
    let mut pieces = Vec::new();
    let mut start = range.start;
    while start < range.end {
        let end = start + byte_offset(&text[start..range.end], max);
        pieces.push(start..end);
        start = end;
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::DocumentStructureScanner;
    use solgraph_domain::reconstruct_source;

    fn splitter(config: &ExtractorConfig) -> ChunkSplitter {
        ChunkSplitter::new(config, DocumentDialect::uniform_contract_format()).unwrap()
    }

    fn split(config: &ExtractorConfig, text: &str) -> SplitReport {
        let scan = DocumentStructureScanner::new(
            DocumentDialect::uniform_contract_format(),
            config.min_section_pattern_matches,
        )
        .scan(text);
        splitter(config).split("rfp", text, &scan)
    }

    fn three_sections(c_body: &str) -> String {
        format!(
            "SECTION A - FORM\nCover page.\nSECTION C - STATEMENT OF WORK\n{}SECTION I - CLAUSES\nClauses apply.\n",
            c_body
        )
    }

    #[test]
    fn test_spans_cover_text() {
        let text = "One. Two! Three?\n\nFour";
        let parts: Vec<_> = spans(text, &SENTENCE_BREAK)
            .into_iter()
            .map(|r| &text[r])
            .collect();
        assert_eq!(parts, vec!["One. ", "Two! ", "Three?\n\n", "Four"]);
    }

    #[test]
    fn test_requirement_detection() {
        let s = splitter(&ExtractorConfig::default());
        assert!(s.is_requirement("The contractor SHALL deliver."));
        assert!(s.is_requirement("Badges are required on site."));
        assert!(!s.is_requirement("The marshall arrived."));
        assert!(!s.is_requirement("Background information."));
    }

    #[test]
    fn test_whole_regions() {
        let text = three_sections("The contractor shall deliver reports.\n");
        let report = split(&ExtractorConfig::default(), &text);

        assert_eq!(report.chunks.len(), 3);
        assert!(report.chunks.iter().all(|c| c.split_kind == SplitKind::Whole));
        assert_eq!(report.chunks[1].section_id.as_deref(), Some("C"));
        assert_eq!(report.chunks[1].requirement_count, 1);
        assert_eq!(report.chunks[1].section_title.as_deref(), Some("STATEMENT OF WORK"));
        assert_eq!(report.chunks[1].related_sections, vec!["B", "F", "H", "M"]);
        assert_eq!(reconstruct_source(&report.chunks), text);
    }

    #[test]
    fn test_leading_text_joins_first_region() {
        let text = format!("Preamble.\n{}", three_sections("Body.\n"));
        let report = split(&ExtractorConfig::default(), &text);
        assert!(report.chunks[0].text.starts_with("Preamble."));
        assert_eq!(report.chunks[0].section_id.as_deref(), Some("A"));
    }

    #[test]
    fn test_subsection_regions() {
        let text = three_sections("Intro text.\nC.1 Scope\nScope text.\nC.2 Reports\nReport text.\n");
        let report = split(&ExtractorConfig::default(), &text);
        let subs: Vec<_> = report
            .chunks
            .iter()
            .map(|c| c.subsection_id.as_deref())
            .collect();
        assert_eq!(subs, vec![None, Some("C.1"), Some("C.2"), None]);
        assert!(report.chunks[1].text.contains("Intro text."));
        assert_eq!(reconstruct_source(&report.chunks), text);
    }

    #[test]
    fn test_density_split_batches() {
        let body: String = (1..=7)
            .map(|i| format!("Item {} shall be delivered. ", i))
            .collect::<String>()
            + "\n";
        let text = three_sections(&body);
        let report = split(&ExtractorConfig::default(), &text);

        let c: Vec<_> = report
            .chunks
            .iter()
            .filter(|c| c.section_id.as_deref() == Some("C"))
            .collect();
        let counts: Vec<_> = c.iter().map(|c| c.requirement_count).collect();
        assert_eq!(counts, vec![3, 3, 1]);
        assert!(c.iter().all(|c| c.split_kind == SplitKind::DensitySplit));
        assert!(c[1].text.starts_with("Item 4 shall"));
        assert_eq!(reconstruct_source(&report.chunks), text);
    }

    #[test]
    fn test_density_overlap_prefix() {
        let body: String = (1..=4)
            .map(|i| format!("Item {} shall be delivered. ", i))
            .collect::<String>()
            + "\n";
        let text = three_sections(&body);
        let config = ExtractorConfig {
            density_split_overlap_chars: 10,
            ..ExtractorConfig::default()
        };
        let report = split(&config, &text);
        let second = &report.chunks[2];

        assert_eq!(second.split_kind, SplitKind::DensitySplit);
        assert_eq!(second.text[..second.overlap_prefix].chars().count(), 10);
        assert!(second.body().starts_with("Item 4"));
        assert_eq!(reconstruct_source(&report.chunks), text);
    }

    #[test]
    fn test_length_split_by_paragraphs() {
        let paragraph = "Background text without obligations. ".repeat(3);
        let body = format!("{p}\n\n{p}\n\n{p}\n", p = paragraph);
        let text = three_sections(&body);
        let config = ExtractorConfig {
            max_chunk_chars: 150,
            sliding_window_overlap_chars: 10,
            ..ExtractorConfig::default()
        };
        let report = split(&config, &text);

        assert_eq!(report.overflow_count, 0);
        assert!(report.chunks.iter().all(|c| c.char_len() <= 150));
        assert!(report
            .chunks
            .iter()
            .any(|c| c.split_kind == SplitKind::LengthSplit));
        assert_eq!(reconstruct_source(&report.chunks), text);
    }

    #[test]
    fn test_hard_cut_keeps_coverage() {
        let body = format!("{}\n", "x".repeat(250));
        let text = three_sections(&body);
        let config = ExtractorConfig {
            max_chunk_chars: 100,
            sliding_window_overlap_chars: 10,
            ..ExtractorConfig::default()
        };
        let report = split(&config, &text);

        assert_eq!(report.overflow_count, 1);
        assert_eq!(report.truncated_bytes, 0);
        assert!(report.chunks.iter().any(|c| c.split_kind == SplitKind::HardCut));
        assert!(report.chunks.iter().all(|c| c.char_len() <= 100));
        assert_eq!(reconstruct_source(&report.chunks), text);
    }

    #[test]
    fn test_truncate_policy_drops_excess() {
        let body = format!("{}\n", "y".repeat(250));
        let text = three_sections(&body);
        let config = ExtractorConfig {
            max_chunk_chars: 100,
            sliding_window_overlap_chars: 10,
            overflow_policy: OverflowPolicy::Truncate,
            ..ExtractorConfig::default()
        };
        let report = split(&config, &text);
        let c = report
            .chunks
            .iter()
            .find(|c| c.section_id.as_deref() == Some("C"))
            .unwrap();

        assert_eq!(c.char_len(), 100);
        assert_eq!(c.split_kind, SplitKind::HardCut);
        assert_eq!(report.overflow_count, 1);
        assert_eq!(report.truncated_bytes, text.len() - reconstruct_source(&report.chunks).len());
    }

    #[test]
    fn test_multibyte_cuts_on_char_boundaries() {
        let body = format!("{}\n", "§".repeat(130));
        let text = three_sections(&body);
        let config = ExtractorConfig {
            max_chunk_chars: 50,
            sliding_window_overlap_chars: 5,
            ..ExtractorConfig::default()
        };
        let report = split(&config, &text);
        assert!(report.chunks.iter().all(|c| c.char_len() <= 50));
        assert_eq!(reconstruct_source(&report.chunks), text);
    }

    #[test]
    fn test_sliding_window_fallback() {
        let text = "abcdefghij".repeat(3);
        let config = ExtractorConfig {
            max_chunk_chars: 12,
            sliding_window_overlap_chars: 4,
            ..ExtractorConfig::default()
        };
        let report = split(&config, &text);

        assert!(matches!(report.mode, StructureMode::SlidingWindow { distinct_sections: 0, required: 3 }));
        let windows: Vec<_> = report.chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(
            windows,
            vec!["abcdefghijab", "ijabcdefghij", "ghijabcdefgh", "efghij"]
        );
        assert_eq!(report.chunks[1].overlap_prefix, 4);
        assert!(report.chunks.iter().all(|c| c.section_id.is_none()));
        assert_eq!(reconstruct_source(&report.chunks), text);
    }

    #[test]
    fn test_empty_document() {
        let report = split(&ExtractorConfig::default(), "");
        assert!(report.chunks.is_empty());
    }

    #[test]
    fn test_ordinals_are_contiguous() {
        let body = (1..=10).map(|i| format!("Task {} shall run. ", i)).collect::<String>() + "\n";
        let report = split(&ExtractorConfig::default(), &three_sections(&body));
        for (i, chunk) in report.chunks.iter().enumerate() {
            assert_eq!(chunk.ordinal, i);
            assert_eq!(chunk.id, ChunkId::new("rfp", i));
        }
    }
}
