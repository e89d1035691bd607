//! Document codec
//!
//! Converts a document's structured content to and from the indented JSON
//! text the user edits. Attachment fields never appear in the text form.
//!
//! Attachment fields are:
//! - the top-level `_attachments` key
//! - any object tagged `"@type": "blob"`, at any depth

use serde_json::{Map, Value};
use thiserror::Error;

/// Structured document content: string keys to arbitrary JSON values
pub type Content = Map<String, Value>;

/// Top-level key holding legacy attachment metadata
pub const ATTACHMENTS_KEY: &str = "_attachments";

const TYPE_KEY: &str = "@type";
const BLOB_TYPE: &str = "blob";

/// The text is not a valid document
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("document must be a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// Serialize content to indented JSON, stripping attachments first
pub fn serialize(content: &Content) -> String {
    let cleaned = strip_attachments(content);
    // A map of JSON values always serializes
    serde_json::to_string_pretty(&cleaned).unwrap_or_default()
}

/// Parse indented (or compact) JSON text into document content
pub fn deserialize(text: &str) -> Result<Content, FormatError> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(map),
        other => Err(FormatError::NotAnObject(kind_name(&other))),
    }
}

/// Return a copy of `content` with every attachment field removed
///
/// Only the top-level `_attachments` key is dropped; a nested key of the same
/// name is ordinary user data.
pub fn strip_attachments(content: &Content) -> Content {
    content
        .iter()
        .filter(|(key, value)| key.as_str() != ATTACHMENTS_KEY && !is_blob(value))
        .map(|(key, value)| (key.clone(), strip_blobs(value)))
        .collect()
}

/// Put the attachment fields of `local` back into `target`
///
/// Top-level attachment fields are added when `target` lacks the key. Nested
/// blobs are restored at their path wherever `target` still has the enclosing
/// object or array and holds nothing at that position. Blob array elements go
/// back at their original index, clamped to the array length, unless the
/// target array already holds a blob of its own.
pub fn restore_attachments(target: &mut Content, local: &Content) {
    for (key, value) in local {
        if key.as_str() == ATTACHMENTS_KEY || is_blob(value) {
            target.entry(key.clone()).or_insert_with(|| value.clone());
        } else if let Some(existing) = target.get_mut(key) {
            restore_blobs(existing, value);
        }
    }
}

/// Top-level attachment fields of `content`
///
/// Nested blobs are not returned; they belong to the value that holds them.
pub fn attachment_fields(content: &Content) -> Content {
    content
        .iter()
        .filter(|(key, value)| key.as_str() == ATTACHMENTS_KEY || is_blob(value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Whether a value is an embedded-store blob reference
pub fn is_blob(value: &Value) -> bool {
    value
        .as_object()
        .and_then(|obj| obj.get(TYPE_KEY))
        .and_then(Value::as_str)
        .is_some_and(|t| t == BLOB_TYPE)
}

fn strip_blobs(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, item)| !is_blob(item))
                .map(|(key, item)| (key.clone(), strip_blobs(item)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .filter(|item| !is_blob(item))
                .map(strip_blobs)
                .collect(),
        ),
        other => other.clone(),
    }
}

fn restore_blobs(target: &mut Value, local: &Value) {
    if is_blob(target) {
        return;
    }
    match (target, local) {
        (Value::Object(target_map), Value::Object(local_map)) => {
            for (key, value) in local_map {
                if is_blob(value) {
                    target_map.entry(key.clone()).or_insert_with(|| value.clone());
                } else if let Some(existing) = target_map.get_mut(key) {
                    restore_blobs(existing, value);
                }
            }
        }
        (Value::Array(target_items), Value::Array(local_items)) => {
            if target_items.iter().any(is_blob) {
                return;
            }
            // Text-visible elements line up with the stripped local array
            let visible = local_items.iter().filter(|item| !is_blob(item));
            for (existing, value) in target_items.iter_mut().zip(visible) {
                restore_blobs(existing, value);
            }
            for (index, item) in local_items.iter().enumerate() {
                if is_blob(item) {
                    let at = index.min(target_items.len());
                    target_items.insert(at, item.clone());
                }
            }
        }
        _ => {}
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
