//! Parse extraction engine output into untrusted candidates

use crate::error::ExtractorError;
use serde_json::{Map, Value};
use solgraph_domain::{ChunkId, ExtractedEntity, ExtractedRelationship};
use tracing::warn;

/// Candidates read from one engine response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedBatch {
    /// Entity candidates
    pub entities: Vec<ExtractedEntity>,
    /// Relationship candidates
    pub relationships: Vec<ExtractedRelationship>,
    /// Records skipped because required fields were missing
    pub skipped: usize,
}

/// Parse an engine response into candidates tagged with `chunk_id`
///
/// A response with no readable JSON object, or without an `entities` array,
/// is malformed. Individual records missing required fields are skipped.
pub fn parse_extraction_response(
    response: &str,
    chunk_id: &ChunkId,
) -> Result<ParsedBatch, ExtractorError> {
    let json_str = extract_json(response)?;

    let json: Value = serde_json::from_str(json_str)
        .map_err(|e| ExtractorError::InvalidFormat(format!("JSON parse error: {}", e)))?;

    let obj = json
        .as_object()
        .ok_or_else(|| ExtractorError::InvalidFormat("Expected JSON object".to_string()))?;

    let entities_json = obj
        .get("entities")
        .and_then(Value::as_array)
        .ok_or_else(|| ExtractorError::InvalidFormat("Missing 'entities' array".to_string()))?;

    let mut batch = ParsedBatch::default();

    for (idx, entity_json) in entities_json.iter().enumerate() {
        match parse_entity_json(entity_json, chunk_id) {
            Ok(entity) => batch.entities.push(entity),
            Err(e) => {
                warn!(chunk = %chunk_id, "Failed to parse entity {}: {}", idx, e);
                batch.skipped += 1;
            }
        }
    }

    // A missing relationship list is an empty one
    if let Some(relationships_json) = obj.get("relationships").and_then(Value::as_array) {
        for (idx, rel_json) in relationships_json.iter().enumerate() {
            match parse_relationship_json(rel_json, chunk_id) {
                Ok(rel) => batch.relationships.push(rel),
                Err(e) => {
                    warn!(chunk = %chunk_id, "Failed to parse relationship {}: {}", idx, e);
                    batch.skipped += 1;
                }
            }
        }
    }

    Ok(batch)
}

/// Extract the JSON object from a response, handling markdown code blocks
/// and surrounding chatter
fn extract_json(response: &str) -> Result<&str, ExtractorError> {
    let trimmed = response.trim();

    let body = if let Some(rest) = trimmed.strip_prefix("```") {
        // Skip the fence line (```json or ```) and the closing fence
        let after_fence = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
        after_fence
            .rsplit_once("```")
            .map(|(body, _)| body)
            .unwrap_or(after_fence)
            .trim()
    } else {
        trimmed
    };

    match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&body[start..=end]),
        _ => Err(ExtractorError::InvalidFormat(
            "No JSON object in response".to_string(),
        )),
    }
}

fn required_str(obj: &Map<String, Value>, keys: &[&str]) -> Result<String, String> {
    keys.iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .ok_or_else(|| format!("Missing or invalid '{}'", keys[0]))
}

fn optional_str(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Parse a single entity
fn parse_entity_json(json: &Value, chunk_id: &ChunkId) -> Result<ExtractedEntity, String> {
    let obj = json
        .as_object()
        .ok_or_else(|| "Entity is not a JSON object".to_string())?;

    Ok(ExtractedEntity {
        name: required_str(obj, &["name", "entity_name"])?,
        entity_type: required_str(obj, &["type", "entity_type"])?,
        description: optional_str(obj, "description"),
        chunk_id: chunk_id.clone(),
    })
}

/// Parse a single relationship
fn parse_relationship_json(
    json: &Value,
    chunk_id: &ChunkId,
) -> Result<ExtractedRelationship, String> {
    let obj = json
        .as_object()
        .ok_or_else(|| "Relationship is not a JSON object".to_string())?;

    let keywords = match obj.get("keywords") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect(),
        Some(Value::String(list)) => list
            .split(',')
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect(),
        _ => Vec::new(),
    };

    Ok(ExtractedRelationship {
        source: required_str(obj, &["source", "src"])?,
        target: required_str(obj, &["target", "tgt"])?,
        relation: required_str(obj, &["relation", "relationship", "type"])?,
        description: optional_str(obj, "description"),
        keywords,
        strength: obj.get("strength").and_then(Value::as_f64),
        chunk_id: chunk_id.clone(),
    })
}
