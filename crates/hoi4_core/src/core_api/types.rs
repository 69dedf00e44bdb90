use serde::{Deserialize, Serialize};

use crate::value::Value;

/// On-disk encoding of a save, detected from its 7-byte marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    /// `HOI4bin`: binary token stream.
    Binary,
    /// `HOI4txt`: plain text.
    Text,
    /// No marker; treated as plain text.
    Unmarked,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Text => "text",
            Self::Unmarked => "unmarked text",
        }
    }
}

/// A fully loaded save: canonical text plus the parsed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSave {
    pub encoding: Encoding,
    pub filestring: String,
    pub document: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SaveSummary {
    pub encoding: Encoding,
    pub filestring_bytes: usize,
    pub top_level_entries: usize,
    pub unknown_tokens: usize,
    pub invalid_dates: usize,
    pub date: Option<String>,
    pub player: Option<String>,
}
