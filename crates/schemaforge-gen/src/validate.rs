//! # Self-Validation
//!
//! Every document is checked before it is written:
//!
//! 1. It must be a valid schema under its declared draft's meta-schema.
//! 2. Every `$ref` must point at the document itself or at one of its
//!    embedded definitions.
//! 3. It must compile into a validator.
//!
//! ## Schema Resolution
//!
//! Definitions carry their canonical identifier as `$id`, so references
//! are satisfied from inside the document. Compilation installs a local
//! retriever serving those same definitions; no URI is ever fetched from
//! the network, and anything the document does not embed is an error.

use std::collections::{BTreeSet, HashMap};

use jsonschema::{Retrieve, Uri};
use schemaforge_core::Draft;
use serde_json::Value;

use crate::error::GenerationError;

/// Resolves `$ref` URIs from the definitions embedded in one document.
struct EmbeddedRetriever {
    schemas_by_uri: HashMap<String, Value>,
}

impl Retrieve for EmbeddedRetriever {
    fn retrieve(&self, uri: &Uri<&str>) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let uri_str = uri.as_str();
        self.schemas_by_uri
            .get(uri_str)
            .cloned()
            .ok_or_else(|| format!("'{uri_str}' is not embedded in the document").into())
    }
}

/// Check `document` against its meta-schema, its own references, and the
/// validator compiler.
///
/// # Errors
///
/// Returns `SelfValidation` naming `schema_name` on the first failure.
pub fn check_document(schema_name: &str, document: &Value, draft: Draft) -> Result<(), GenerationError> {
    let failure = |reason: String| GenerationError::SelfValidation {
        schema_name: schema_name.to_string(),
        reason,
    };

    jsonschema::meta::validate(document).map_err(|e| failure(format!("meta-schema: {e}")))?;

    let schemas_by_uri = embedded_resources(document, draft);
    let dangling: BTreeSet<&str> = references(document)
        .into_iter()
        .filter(|target| !target.starts_with('#') && !schemas_by_uri.contains_key(*target))
        .collect();
    if let Some(target) = dangling.first() {
        return Err(failure(format!("unresolved $ref '{target}'")));
    }

    let jsonschema_draft = match draft {
        Draft::Draft202012 => jsonschema::Draft::Draft202012,
        Draft::Draft7 => jsonschema::Draft::Draft7,
    };
    jsonschema::options()
        .with_draft(jsonschema_draft)
        .with_retriever(EmbeddedRetriever { schemas_by_uri })
        .build(document)
        .map_err(|e| failure(format!("compile: {e}")))?;
    Ok(())
}

/// The document and its definitions, keyed by `$id`.
fn embedded_resources(document: &Value, draft: Draft) -> HashMap<String, Value> {
    let mut resources = HashMap::new();
    if let Some(id) = document.get("$id").and_then(Value::as_str) {
        resources.insert(id.to_string(), document.clone());
    }
    let definitions = document
        .get(draft.definitions_keyword())
        .and_then(Value::as_object);
    for definition in definitions.into_iter().flat_map(|defs| defs.values()) {
        if let Some(id) = definition.get("$id").and_then(Value::as_str) {
            resources.insert(id.to_string(), definition.clone());
        }
    }
    resources
}

/// Every `$ref` string in `value`.
fn references(value: &Value) -> Vec<&str> {
    let mut found = Vec::new();
    let mut stack = vec![value];
    while let Some(current) = stack.pop() {
        match current {
            Value::Object(map) => {
                if let Some(target) = map.get("$ref").and_then(Value::as_str) {
                    found.push(target);
                }
                stack.extend(map.iter().filter(|(k, _)| k.as_str() != "$ref").map(|(_, v)| v));
            }
            Value::Array(items) => stack.extend(items),
            _ => {}
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE: &str = "https://example.com/schemas";

    fn possum() -> Value {
        json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "$id": format!("{BASE}/Possum.schema.json"),
            "type": "object",
            "properties": {
                "children": {
                    "type": ["array", "null"],
                    "items": { "$ref": format!("{BASE}/Possum.schema.json") }
                },
                "environment": {
                    "anyOf": [
                        { "$ref": format!("{BASE}/Possum.Environment.schema.json") },
                        { "type": "null" }
                    ]
                }
            },
            "$defs": {
                "Possum.Environment": {
                    "$id": format!("{BASE}/Possum.Environment.schema.json"),
                    "type": "object",
                    "properties": { "name": { "type": "string", "minLength": 2 } }
                }
            }
        })
    }

    #[test]
    fn test_valid_document_passes() {
        check_document("Possum", &possum(), Draft::Draft202012).unwrap();
    }

    #[test]
    fn test_meta_schema_violation_rejected() {
        let mut document = possum();
        document["properties"]["children"]["type"] = json!(42);
        let err = check_document("Possum", &document, Draft::Draft202012).unwrap_err();
        match err {
            GenerationError::SelfValidation { schema_name, reason } => {
                assert_eq!(schema_name, "Possum");
                assert!(reason.starts_with("meta-schema"), "{reason}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_dangling_reference_rejected() {
        let mut document = possum();
        document["$defs"]
            .as_object_mut()
            .unwrap()
            .remove("Possum.Environment");
        let err = check_document("Possum", &document, Draft::Draft202012).unwrap_err();
        match err {
            GenerationError::SelfValidation { reason, .. } => {
                assert!(reason.contains("Possum.Environment.schema.json"), "{reason}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_draft7_definitions_are_embedded() {
        let document = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "$id": format!("{BASE}/Llama.schema.json"),
            "type": "object",
            "properties": {
                "friend": { "$ref": format!("{BASE}/Alpaca.schema.json") }
            },
            "definitions": {
                "Alpaca": { "$id": format!("{BASE}/Alpaca.schema.json"), "type": "object" }
            }
        });
        check_document("Llama", &document, Draft::Draft7).unwrap();
    }

    #[test]
    fn test_references_collects_nested_targets() {
        let document = possum();
        let refs = references(&document);
        assert_eq!(refs.len(), 2);
        assert!(refs.contains(&"https://example.com/schemas/Possum.schema.json"));
    }
}
