//! Conversion between host input, in-memory documents and the byte form
//! the encryption primitive understands.

use crate::error::{EngineError, EngineResult};
use ejvault_crypto::{COMMENT_PREFIX, PUBLIC_KEY_FIELD};
use serde_json::{Map, Value};

/// An ordered JSON document.
pub type Document = Map<String, Value>;

/// The input shapes the engine accepts.
#[derive(Clone, Debug, PartialEq)]
pub enum DocumentInput {
    /// An already-structured mapping.
    Structured(Document),
    /// A string holding a JSON-encoded mapping.
    Raw(String),
}

impl DocumentInput {
    /// Classifies an arbitrary JSON value as one of the accepted shapes.
    pub fn from_value(value: Value) -> EngineResult<Self> {
        match value {
            Value::Object(map) => Ok(Self::Structured(map)),
            Value::String(raw) => Ok(Self::Raw(raw)),
            other => Err(EngineError::InvalidInputFormat(format!(
                "expected a mapping or a JSON string, got {}",
                kind_of(&other)
            ))),
        }
    }

    /// Decodes the input into a document.
    pub fn into_document(self) -> EngineResult<Document> {
        match self {
            Self::Structured(map) => Ok(map),
            Self::Raw(raw) => decode(raw.as_bytes()),
        }
    }
}

impl From<Document> for DocumentInput {
    fn from(map: Document) -> Self {
        Self::Structured(map)
    }
}

impl From<String> for DocumentInput {
    fn from(raw: String) -> Self {
        Self::Raw(raw)
    }
}

impl From<&str> for DocumentInput {
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_string())
    }
}

/// Canonical byte encoding of a document.
pub fn encode(document: &Document) -> EngineResult<Vec<u8>> {
    serde_json::to_vec(document)
        .map_err(|e| EngineError::InvalidInputFormat(format!("failed to encode document: {e}")))
}

/// Decodes bytes that must hold a JSON mapping.
pub fn decode(bytes: &[u8]) -> EngineResult<Document> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| EngineError::InvalidInputFormat(format!("invalid JSON: {e}")))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(EngineError::InvalidInputFormat(format!(
            "expected a mapping, got {}",
            kind_of(&other)
        ))),
    }
}

/// Reads the recipient public key field of a document.
pub fn public_key_of(document: &Document) -> EngineResult<String> {
    match document.get(PUBLIC_KEY_FIELD) {
        Some(Value::String(key)) => Ok(key.clone()),
        Some(_) => Err(EngineError::InvalidInputFormat(format!(
            "{PUBLIC_KEY_FIELD} must be a string"
        ))),
        None => Err(EngineError::InvalidInputFormat(format!(
            "document has no {PUBLIC_KEY_FIELD}"
        ))),
    }
}

/// Produces the sanitized copy of a decrypted document.
///
/// The top-level public key field is dropped and one leading marker is
/// stripped from every field name at any depth. Two fields that reduce to
/// the same name are rejected rather than merged.
pub fn sanitize(document: Document) -> EngineResult<Document> {
    strip_markers(document, true)
}

fn strip_markers(map: Document, top_level: bool) -> EngineResult<Document> {
    let mut out = Map::with_capacity(map.len());
    for (key, value) in map {
        if top_level && key == PUBLIC_KEY_FIELD {
            continue;
        }
        let name = key.strip_prefix(COMMENT_PREFIX).unwrap_or(key.as_str()).to_string();
        if out.contains_key(&name) {
            return Err(EngineError::InvalidInputFormat(format!(
                "field {key} collides with {name} after removing its marker"
            )));
        }
        out.insert(name, strip_value(value)?);
    }
    Ok(out)
}

fn strip_value(value: Value) -> EngineResult<Value> {
    match value {
        Value::Object(map) => strip_markers(map, false).map(Value::Object),
        Value::Array(items) => items
            .into_iter()
            .map(strip_value)
            .collect::<EngineResult<Vec<_>>>()
            .map(Value::Array),
        scalar => Ok(scalar),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a mapping",
    }
}
