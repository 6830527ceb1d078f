use std::collections::HashSet;

use mc_core::{ClassificationRecord, Error, Ministry, Result};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

/// A record as the model wrote it, before label filtering.
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(deserialize_with = "lenient_idx")]
    idx: i64,
    ministerio: Vec<String>,
}

/// Accepts any integer, an integral float (`3.0`) or a numeric string (`"3"`).
/// Range checks belong to the caller, which knows the batch.
fn lenient_idx<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    coerce_idx(&value).ok_or_else(|| {
        de::Error::custom(format!("idx must be an integer, got {}", value))
    })
}

fn coerce_idx(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && (i64::MIN as f64..=i64::MAX as f64).contains(f))
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Validate an extracted array against the record contract.
///
/// Every element becomes exactly one record, in order. Unknown labels are dropped
/// and repeated ones keep their first position; a record left with no labels is
/// kept with an empty list.
pub fn normalize(value: Value) -> Result<Vec<ClassificationRecord>> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(Error::Shape(format!(
                "model output is not a JSON list (got {})",
                json_kind(&other)
            )))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(position, item)| {
            let raw: RawRecord = serde_json::from_value(item)
                .map_err(|e| Error::Schema(format!("record #{}: {}", position, e)))?;
            Ok(ClassificationRecord {
                idx: raw.idx,
                ministries: filter_labels(&raw.ministerio),
            })
        })
        .collect()
}

pub fn filter_labels<S: AsRef<str>>(labels: &[S]) -> Vec<Ministry> {
    let mut seen = HashSet::new();
    labels
        .iter()
        .filter_map(|label| Ministry::from_label(label.as_ref()))
        .filter(|ministry| seen.insert(*ministry))
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
