//! Wire types of the inbound endpoint.
//!
//! Every response is wrapped in an [`Envelope`]:
//!
//! ```json
//! {"success": true,  "data": {"content": "...", "tokensUsed": 42, "fromCache": false}}
//! {"success": false, "data": {"error": "rate limit exceeded: at most 10 requests per hour"}}
//! ```
//!
//! The types are transport-agnostic; the `server` feature serves them over HTTP.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::types::SubjectId;

/// Uniform response wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Payload<T>,
}

/// Body of an [`Envelope`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload<T> {
    Data(T),
    Error(ErrorBody),
}

/// Failure payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Payload::Data(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Payload::Error(ErrorBody {
                error: message.into(),
            }),
        }
    }

    /// The success payload, if any.
    pub fn data(&self) -> Option<&T> {
        match &self.data {
            Payload::Data(data) => Some(data),
            Payload::Error(_) => None,
        }
    }

    /// The failure message, if any.
    pub fn error_message(&self) -> Option<&str> {
        match &self.data {
            Payload::Data(_) => None,
            Payload::Error(body) => Some(&body.error),
        }
    }
}

impl<T> From<Result<T>> for Envelope<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Envelope::ok(data),
            Err(e) => Envelope::error(e.to_string()),
        }
    }
}

/// `POST /generate`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub subject_id: SubjectId,
}

/// `POST /chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// `GET /admin/stats`; defaults to today (UTC).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsQuery {
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// `GET /admin/errors`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorsQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

impl ErrorsQuery {
    pub const DEFAULT_LIMIT: usize = 50;

    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScrivenerError;
    use crate::types::Generation;
    use serde_json::json;

    #[test]
    fn success_envelope_shape() {
        let envelope: Envelope<Generation> = Ok(Generation::fresh("Text", 42)).into();
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "success": true,
                "data": {"content": "Text", "tokensUsed": 42, "fromCache": false}
            })
        );
    }

    #[test]
    fn failure_envelope_shape() {
        let envelope: Envelope<Generation> =
            Err(ScrivenerError::RateLimitExceeded { limit: 10 }).into();
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "success": false,
                "data": {"error": "rate limit exceeded: at most 10 requests per hour"}
            })
        );
        assert!(envelope.data().is_none());
    }

    #[test]
    fn failure_envelope_parses_back() {
        let raw = r#"{"success": false, "data": {"error": "nope"}}"#;
        let envelope: Envelope<Generation> = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.error_message(), Some("nope"));
    }

    #[test]
    fn generate_request_uses_camel_case() {
        let request: GenerateRequest = serde_json::from_str(r#"{"subjectId": 12}"#).unwrap();
        assert_eq!(request.subject_id, 12);
    }

    #[test]
    fn errors_query_defaults() {
        assert_eq!(ErrorsQuery::default().limit(), ErrorsQuery::DEFAULT_LIMIT);
    }
}
