//! Generation settings and their validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Result, ScrivenerError};

/// Placeholder replaced by the subject's content in prompt templates.
pub const CONTENT_PLACEHOLDER: &str = "{content}";

/// Default prompt template.
pub const DEFAULT_PROMPT_TEMPLATE: &str =
    "Write an informative article based on the following content: {content}";

/// Accepted range for `max_tokens`.
pub const MAX_TOKENS_RANGE: std::ops::RangeInclusive<u32> = 50..=4000;
/// Accepted range for `temperature`.
pub const TEMPERATURE_RANGE: std::ops::RangeInclusive<f32> = 0.0..=2.0;
/// Accepted range for both penalties.
pub const PENALTY_RANGE: std::ops::RangeInclusive<f32> = -2.0..=2.0;
/// Highest accepted hourly request ceiling (0 disables the limit).
pub const MAX_RATE_LIMIT: u32 = 100;
/// Highest accepted cache TTL in seconds (0 disables caching).
pub const MAX_CACHE_TTL_SECS: u64 = 86_400;

/// Supported completion models.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Model {
    #[default]
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt35Turbo,
    #[serde(rename = "gpt-4")]
    Gpt4,
    #[serde(rename = "gpt-4-turbo")]
    Gpt4Turbo,
    #[serde(rename = "gpt-4o")]
    Gpt4o,
    #[serde(rename = "gpt-4o-mini")]
    Gpt4oMini,
}

impl Model {
    pub const ALL: [Model; 5] = [
        Model::Gpt35Turbo,
        Model::Gpt4,
        Model::Gpt4Turbo,
        Model::Gpt4o,
        Model::Gpt4oMini,
    ];

    /// Wire identifier sent to the provider.
    pub fn as_str(&self) -> &'static str {
        match self {
            Model::Gpt35Turbo => "gpt-3.5-turbo",
            Model::Gpt4 => "gpt-4",
            Model::Gpt4Turbo => "gpt-4-turbo",
            Model::Gpt4o => "gpt-4o",
            Model::Gpt4oMini => "gpt-4o-mini",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = ScrivenerError;

    fn from_str(s: &str) -> Result<Self> {
        Model::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ScrivenerError::Configuration(format!("unsupported model: {s}")))
    }
}

/// Generation settings, owned by the host's configuration store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub model: Model,
    pub max_tokens: u32,
    pub prompt_template: String,
    pub temperature: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    /// Requests per user per hour; 0 means unlimited.
    pub rate_limit: u32,
    /// Response cache lifetime in seconds; 0 disables caching.
    pub cache_ttl_secs: u64,
    pub allowed_subject_types: Vec<String>,
    pub allowed_roles: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: Model::default(),
            max_tokens: 500,
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
            temperature: 0.7,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            rate_limit: 10,
            cache_ttl_secs: 3600,
            allowed_subject_types: vec!["post".into(), "page".into()],
            allowed_roles: vec!["administrator".into(), "editor".into()],
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = template.into();
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn frequency_penalty(mut self, penalty: f32) -> Self {
        self.frequency_penalty = penalty;
        self
    }

    pub fn presence_penalty(mut self, penalty: f32) -> Self {
        self.presence_penalty = penalty;
        self
    }

    pub fn rate_limit(mut self, limit: u32) -> Self {
        self.rate_limit = limit;
        self
    }

    pub fn cache_ttl_secs(mut self, secs: u64) -> Self {
        self.cache_ttl_secs = secs;
        self
    }

    pub fn allowed_subject_types(mut self, kinds: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.allowed_subject_types = kinds.into_iter().map(Into::into).collect();
        self
    }

    pub fn allowed_roles(mut self, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.allowed_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn allows_subject_type(&self, kind: &str) -> bool {
        self.allowed_subject_types.iter().any(|k| k == kind)
    }

    /// Check every field against its accepted range.
    pub fn validate(&self) -> Result<()> {
        if !MAX_TOKENS_RANGE.contains(&self.max_tokens) {
            return Err(out_of_range("max_tokens", self.max_tokens, &MAX_TOKENS_RANGE));
        }
        if !TEMPERATURE_RANGE.contains(&self.temperature) {
            return Err(out_of_range("temperature", self.temperature, &TEMPERATURE_RANGE));
        }
        if !PENALTY_RANGE.contains(&self.frequency_penalty) {
            return Err(out_of_range(
                "frequency_penalty",
                self.frequency_penalty,
                &PENALTY_RANGE,
            ));
        }
        if !PENALTY_RANGE.contains(&self.presence_penalty) {
            return Err(out_of_range(
                "presence_penalty",
                self.presence_penalty,
                &PENALTY_RANGE,
            ));
        }
        if self.rate_limit > MAX_RATE_LIMIT {
            return Err(out_of_range("rate_limit", self.rate_limit, &(0..=MAX_RATE_LIMIT)));
        }
        if self.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(out_of_range(
                "cache_ttl_secs",
                self.cache_ttl_secs,
                &(0..=MAX_CACHE_TTL_SECS),
            ));
        }
        if self.prompt_template.trim().is_empty() {
            return Err(ScrivenerError::Configuration(
                "prompt_template must not be empty".into(),
            ));
        }
        Ok(())
    }
}

fn out_of_range<T: fmt::Display>(
    field: &str,
    value: T,
    range: &std::ops::RangeInclusive<T>,
) -> ScrivenerError {
    ScrivenerError::Configuration(format!(
        "{field} = {value} is outside {}..={}",
        range.start(),
        range.end()
    ))
}
