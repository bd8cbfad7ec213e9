use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TracelensError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, TracelensError>;

pub const GENERIC_QUERY_FAILURE: &str = "An error occurred while fetching data";

/// A failed remote query as shown to the user. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFailure {
    pub status: Option<u16>,
    pub message: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

impl QueryFailure {
    /// Uses the server `detail` verbatim when the body is structured,
    /// otherwise the generic message.
    pub fn from_response(status: Option<u16>, body: &str) -> Self {
        let detail = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| match b.detail {
                serde_json::Value::String(s) if !s.trim().is_empty() => Some(s),
                serde_json::Value::Object(map) => map
                    .get("message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string),
                _ => None,
            });

        Self {
            status,
            message: detail.unwrap_or_else(|| GENERIC_QUERY_FAILURE.to_string()),
        }
    }
}

impl std::fmt::Display for QueryFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (status {status})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_detail_is_used_verbatim() {
        let failure = QueryFailure::from_response(Some(400), r#"{"detail":"Invalid query. Bad field"}"#);
        assert_eq!(failure.message, "Invalid query. Bad field");
        assert_eq!(failure.to_string(), "Invalid query. Bad field (status 400)");
    }

    #[test]
    fn nested_detail_message_is_used() {
        let failure =
            QueryFailure::from_response(None, r#"{"detail":{"message":"rate limited","code":"x"}}"#);
        assert_eq!(failure.message, "rate limited");
    }

    #[test]
    fn unstructured_body_falls_back_to_generic() {
        let failure = QueryFailure::from_response(Some(502), "<html>bad gateway</html>");
        assert_eq!(failure.message, GENERIC_QUERY_FAILURE);
        let failure = QueryFailure::from_response(Some(500), r#"{"detail":""}"#);
        assert_eq!(failure.message, GENERIC_QUERY_FAILURE);
    }
}
