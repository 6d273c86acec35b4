//! Structural gate for search responses.
//!
//! Only presence and container shape are checked: the document must be an
//! object with `artists.items`, a non-empty array whose elements are objects
//! carrying every key in [`ARTIST_KEYS`]. Values are never coerced or defaulted.

use serde_json::{Map, Value};
use tracing::debug;

use crate::{IngestError, Res};

pub const ARTIST_KEYS: [&str; 5] = ["followers", "genres", "name", "popularity", "type"];

pub struct ResponseValidator;

impl ResponseValidator {
    pub fn validate(document: &Value) -> Res<()> {
        let root = ensure_object(document, &["artists"], "payload")?;
        let artists = ensure_object(&root["artists"], &["items"], "payload['artists']")?;
        let items = ensure_list(&artists["items"], "payload['artists']['items']")?;

        for (i, artist) in items.iter().enumerate() {
            ensure_object(
                artist,
                &ARTIST_KEYS,
                &format!("payload['artists']['items'][{i}]"),
            )?;
        }

        debug!(items = items.len(), "search response passed schema gate");
        Ok(())
    }
}

fn ensure_object<'a>(value: &'a Value, keys: &[&str], ctx: &str) -> Res<&'a Map<String, Value>> {
    let Some(map) = value.as_object() else {
        debug!("{} has type {}", ctx, type_name(value));
        return Err(IngestError::Schema(format!(
            "expected format for {ctx} is object"
        )));
    };

    let missing: Vec<&str> = keys
        .iter()
        .copied()
        .filter(|key| !map.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        return Err(IngestError::Schema(format!(
            "missing keys in {ctx}: {missing:?}"
        )));
    }

    Ok(map)
}

fn ensure_list<'a>(value: &'a Value, ctx: &str) -> Res<&'a Vec<Value>> {
    match value.as_array() {
        Some(items) if !items.is_empty() => Ok(items),
        Some(_) => Err(IngestError::Schema(format!("{ctx} is an empty list"))),
        None => Err(IngestError::Schema(format!(
            "expected format for {ctx} is list"
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
