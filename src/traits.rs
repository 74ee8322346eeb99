//! Host collaborator traits.
//!
//! The generator never touches the host's content store or account system
//! directly. It reads and updates subjects through [`SubjectRepository`] and
//! asks [`AccessPolicy`] whether a requester may edit a given subject.

use async_trait::async_trait;

use crate::types::{Requester, Subject, SubjectId};
use crate::{Result, ScrivenerError};

/// Separator placed between existing content and generated text.
pub const APPEND_SEPARATOR: &str = "\n\n";

/// Read/write access to the subjects generation runs against.
#[async_trait]
pub trait SubjectRepository: Send + Sync {
    /// Fetch a subject, `None` if the id is unknown.
    async fn get(&self, id: SubjectId) -> Result<Option<Subject>>;

    /// Replace a subject's body.
    async fn update_content(&self, id: SubjectId, content: String) -> Result<()>;

    /// Append `addition` to a subject's body, separated by a blank line.
    async fn append_content(&self, id: SubjectId, addition: &str) -> Result<()> {
        let subject = self
            .get(id)
            .await?
            .ok_or(ScrivenerError::SubjectNotFound(id))?;
        let content = format!("{}{APPEND_SEPARATOR}{addition}", subject.content);
        self.update_content(id, content).await
    }
}

/// Per-subject edit permission.
///
/// Role gating against the configured allowed roles happens in the generator;
/// this is the host's finer-grained check (ownership, locks, ...).
pub trait AccessPolicy: Send + Sync {
    fn can_edit(&self, requester: &Requester, subject: &Subject) -> bool;
}

/// [`AccessPolicy`] that lets every role-qualified requester edit everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn can_edit(&self, _requester: &Requester, _subject: &Subject) -> bool {
        true
    }
}
