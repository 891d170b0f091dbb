//! Documents of the administrative `complaints` collection.
//!
//! Each document groups several complaint entries in a `complaints` array.
//! This collection is maintained independently of the `pnrs` collection and
//! nothing links an entry here to a [`PnrRecord`](super::PnrRecord).
//!
//! The collection is written by other tools, so nothing about an entry's
//! shape is assumed: a malformed entry is carried along, never rejected.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplaintGroup {
    #[serde(default, deserialize_with = "entries_or_empty")]
    pub complaints: Vec<ComplaintEntry>,
}

/// Anything other than an array (missing, null, a scalar) reads as no entries.
fn entries_or_empty<'de, D>(deserializer: D) -> Result<Vec<ComplaintEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().map(ComplaintEntry).collect(),
        _ => Vec::new(),
    })
}

/// One embedded complaint, kept exactly as stored. Only `status` is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComplaintEntry(pub Value);

impl ComplaintEntry {
    /// True when the entry is an object whose `status` is the string `status`.
    pub fn has_status(&self, status: &str) -> bool {
        self.0.get("status").and_then(Value::as_str) == Some(status)
    }
}
