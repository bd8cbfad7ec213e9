use serde::{Deserialize, Serialize};

use crate::error::{Result, TracelensError};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceId(String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpanId(String);

impl TraceId {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.len() != 32 || !input.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TracelensError::Parse(format!("invalid trace id: {input}")));
        }
        Ok(Self(input.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl SpanId {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.len() != 16 || !input.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TracelensError::Parse(format!("invalid span id: {input}")));
        }
        Ok(Self(input.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Truncates any id-like string for display without validating it.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}
