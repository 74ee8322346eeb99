//! Types describing one generation attempt.

use serde::{Deserialize, Serialize};

use super::settings::{Model, Settings};
use super::subject::{RequesterId, SubjectId};

/// Fully resolved parameters of one generation attempt.
///
/// Built fresh per call from the active [`Settings`]; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub subject_id: SubjectId,
    pub requester_id: RequesterId,
    pub prompt: String,
    pub model: Model,
    pub max_tokens: u32,
    pub temperature: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

impl GenerationRequest {
    /// Resolve a request against the given settings.
    pub fn from_settings(
        subject_id: SubjectId,
        requester_id: RequesterId,
        prompt: impl Into<String>,
        settings: &Settings,
    ) -> Self {
        Self {
            subject_id,
            requester_id,
            prompt: prompt.into(),
            model: settings.model,
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            frequency_penalty: settings.frequency_penalty,
            presence_penalty: settings.presence_penalty,
        }
    }

    /// Override the token limit.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Successful result of a generation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Generation {
    /// Generated text, trimmed.
    pub content: String,
    /// Tokens reported by the provider; 0 for cache hits.
    pub tokens_used: u32,
    pub from_cache: bool,
}

impl Generation {
    pub fn fresh(content: impl Into<String>, tokens_used: u32) -> Self {
        Self {
            content: content.into(),
            tokens_used,
            from_cache: false,
        }
    }

    pub fn cached(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tokens_used: 0,
            from_cache: true,
        }
    }
}

/// Outcome passed to `on_after_generate` hooks.
pub type Outcome = crate::Result<Generation>;
