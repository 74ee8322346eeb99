//! Subjects (posts, pages, ...) and the users who request generation for them.

use serde::{Deserialize, Serialize};

/// Identifier of a subject in the host's content store.
pub type SubjectId = u64;

/// Identifier of a user in the host's account store.
pub type RequesterId = u64;

/// A piece of editable content generation can be requested for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    /// Content type, e.g. "post" or "page".
    pub kind: String,
    /// Stored body text.
    #[serde(default)]
    pub content: String,
    /// Per-subject prompt template, present when the subject has its
    /// custom-prompt flag set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_override: Option<String>,
}

impl Subject {
    pub fn new(id: SubjectId, kind: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id,
            kind: kind.into(),
            content: content.into(),
            prompt_override: None,
        }
    }

    /// Set a custom prompt template for this subject.
    pub fn with_prompt_override(mut self, template: impl Into<String>) -> Self {
        self.prompt_override = Some(template.into());
        self
    }
}

/// An authenticated user issuing a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub id: RequesterId,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Role required for the admin actions (test connection, clear cache, stats).
pub const ADMIN_ROLE: &str = "administrator";

impl Requester {
    pub fn new(id: RequesterId, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            id,
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Whether any of this requester's roles appears in `allowed`.
    pub fn has_any_role(&self, allowed: &[String]) -> bool {
        self.roles.iter().any(|r| allowed.contains(r))
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }
}
