//! Work items submitted for remote creation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-assigned identifier, used only to correlate results.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Int(u64),
    Str(String),
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Int(n) => write!(f, "{}", n),
            ItemId::Str(s) => f.write_str(s),
        }
    }
}

impl From<u64> for ItemId {
    fn from(n: u64) -> Self {
        ItemId::Int(n)
    }
}

impl From<usize> for ItemId {
    fn from(n: usize) -> Self {
        ItemId::Int(n as u64)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        ItemId::Str(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        ItemId::Str(s)
    }
}

/// One unit of work: an opaque event payload and its id.
///
/// Immutable once created; the payload is never inspected by the client.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    id: ItemId,
    payload: serde_json::Value,
}

impl WorkItem {
    pub fn new(id: impl Into<ItemId>, payload: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            payload,
        }
    }

    pub fn id(&self) -> &ItemId {
        &self.id
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// Number a list of payloads `0..n` in input order.
    pub fn enumerate(payloads: impl IntoIterator<Item = serde_json::Value>) -> Vec<WorkItem> {
        payloads
            .into_iter()
            .enumerate()
            .map(|(i, p)| WorkItem::new(i, p))
            .collect()
    }
}
