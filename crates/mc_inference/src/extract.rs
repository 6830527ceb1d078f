//! Recovers the JSON array a model was asked for from whatever text it sent back.
//!
//! A plain parse is tried first. The fallback scans for array-of-objects shaped
//! substrings and keeps the last one.

use lazy_static::lazy_static;
use mc_core::{Error, Result};
use regex::Regex;
use serde_json::Value;
use tracing::debug;

lazy_static! {
    static ref JSON_ARRAY: Regex =
        Regex::new(r"(?s)\[\s*(?:\{.*?\})\s*(?:,\s*\{.*?\}\s*)*\]").expect("valid JSON array pattern");
}

pub fn extract_json_array(text: &str) -> Result<Value> {
    let text = text.trim();
    if let Ok(value @ Value::Array(_)) = serde_json::from_str::<Value>(text) {
        return Ok(value);
    }

    let candidate = JSON_ARRAY
        .find_iter(text)
        .last()
        .ok_or_else(|| Error::Extraction("no JSON array found".to_string()))?;
    debug!(
        "Recovered embedded array at bytes {}..{} of {}",
        candidate.start(),
        candidate.end(),
        text.len()
    );

    serde_json::from_str(candidate.as_str())
        .map_err(|e| Error::Extraction(format!("embedded array is not valid JSON: {}", e)))
}
