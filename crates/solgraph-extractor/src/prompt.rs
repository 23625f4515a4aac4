//! Prompt rendering for entity and relationship extraction

use solgraph_domain::{Chunk, ExtractionConstraints};

/// Builds the extraction prompt for one chunk
pub struct PromptBuilder<'a> {
    chunk: &'a Chunk,
    constraints: &'a ExtractionConstraints,
}

impl<'a> PromptBuilder<'a> {
    /// Create a new prompt builder
    pub fn new(chunk: &'a Chunk, constraints: &'a ExtractionConstraints) -> Self {
        Self { chunk, constraints }
    }

    /// Build the complete extraction prompt
    pub fn build(&self) -> String {
        let mut prompt = String::new();

        // 1. Instructions
        prompt.push_str(EXTRACTION_INSTRUCTIONS);
        prompt.push_str("\n\n");

        // 2. Closed type lists and curated examples
        prompt.push_str(&self.constraints.render());
        prompt.push('\n');

        // 3. Where the text sits in the document
        prompt.push_str(&self.section_context());
        prompt.push('\n');

        // 4. The text to analyze
        prompt.push_str("Text to analyze:\n");
        prompt.push_str("---\n");
        prompt.push_str(&self.chunk.text);
        prompt.push_str("\n---\n\n");

        // 5. Output format reminder
        prompt.push_str(OUTPUT_FORMAT_REMINDER);

        prompt
    }

    /// Section, subsection, page and related sections of the chunk
    fn section_context(&self) -> String {
        let chunk = self.chunk;
        let mut context = match (&chunk.section_id, &chunk.section_title) {
            (Some(id), Some(title)) => format!("Document section: {} ({})\n", id, title),
            (Some(id), None) => format!("Document section: {}\n", id),
            _ => "Document section: unknown\n".to_string(),
        };
        if let Some(sub) = &chunk.subsection_id {
            context.push_str(&format!("Subsection: {}\n", sub));
        }
        context.push_str(&format!("Estimated page: {}\n", chunk.page_estimate));
        if !chunk.related_sections.is_empty() {
            context.push_str(&format!(
                "Commonly cross-referenced sections: {}\n",
                chunk.related_sections.join(", ")
            ));
        }
        context
    }
}

const EXTRACTION_INSTRUCTIONS: &str = r#"Extract entities and the relationships between them from a section of a government solicitation.

Rules:
- Use only the entity and relationship types listed below; never invent a type
- Copy identifiers exactly as written (attachment codes, CLINs, clause numbers such as FAR 52.212-2)
- Do not extract generic words, formatting artifacts or bare numbers as entities
- Every relationship must connect two entities you extracted from this text
- Keep descriptions to one sentence grounded in the text"#;

const OUTPUT_FORMAT_REMINDER: &str = r#"Output format (one JSON object, no additional text):
{
  "entities": [
    {"name": "exact name", "type": "ENTITY_TYPE", "description": "one sentence"}
  ],
  "relationships": [
    {"source": "entity name", "target": "entity name", "relation": "RELATIONSHIP_TYPE", "description": "one sentence", "keywords": ["keyword"], "strength": 0.0-1.0}
  ]
}

Remember: Return ONLY valid JSON, no markdown code blocks, no explanations."#;
