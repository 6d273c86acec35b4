use std::fs;

use serde_json::Value;

use crate::{error, schema::ResponseValidator, success};

/// Checks a saved search response against the schema gate.
pub fn validate(file: &str) {
    let raw_text = match fs::read_to_string(file) {
        Ok(text) => text,
        Err(e) => error!("Cannot read {}. Err: {}", file, e),
    };

    let document: Value = match serde_json::from_str(&raw_text) {
        Ok(doc) => doc,
        Err(e) => error!("{} is not valid JSON: {}", file, e),
    };

    if let Err(e) = ResponseValidator::validate(&document) {
        error!("{}", e);
    }

    let count = document["artists"]["items"].as_array().map_or(0, Vec::len);
    success!("{} is valid ({} artist(s))", file, count);
}
