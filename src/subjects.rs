//! Bundled [`SubjectRepository`] implementations.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::traits::SubjectRepository;
use crate::types::{Subject, SubjectId};
use crate::{Result, ScrivenerError};

/// In-process subject map.
#[derive(Default)]
pub struct MemorySubjectRepository {
    subjects: RwLock<HashMap<SubjectId, Subject>>,
}

impl MemorySubjectRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository holding `subjects`.
    pub fn with_subjects(subjects: impl IntoIterator<Item = Subject>) -> Self {
        Self {
            subjects: RwLock::new(subjects.into_iter().map(|s| (s.id, s)).collect()),
        }
    }

    /// Insert or replace a subject.
    pub async fn insert(&self, subject: Subject) {
        self.subjects.write().await.insert(subject.id, subject);
    }
}

#[async_trait]
impl SubjectRepository for MemorySubjectRepository {
    async fn get(&self, id: SubjectId) -> Result<Option<Subject>> {
        Ok(self.subjects.read().await.get(&id).cloned())
    }

    async fn update_content(&self, id: SubjectId, content: String) -> Result<()> {
        let mut subjects = self.subjects.write().await;
        let subject = subjects
            .get_mut(&id)
            .ok_or(ScrivenerError::SubjectNotFound(id))?;
        subject.content = content;
        Ok(())
    }
}

/// Subjects stored as `<dir>/<id>.json`, one JSON document per subject.
pub struct FileSubjectRepository {
    dir: PathBuf,
}

impl FileSubjectRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: SubjectId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Write a subject document, creating the directory if needed.
    pub async fn save(&self, subject: &Subject) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ScrivenerError::Storage(format!("failed to create {:?}: {e}", self.dir)))?;
        let path = self.path_for(subject.id);
        let json = serde_json::to_string_pretty(subject)?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| ScrivenerError::Storage(format!("failed to write {path:?}: {e}")))
    }
}

#[async_trait]
impl SubjectRepository for FileSubjectRepository {
    async fn get(&self, id: SubjectId) -> Result<Option<Subject>> {
        let path = self.path_for(id);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ScrivenerError::Storage(format!(
                    "failed to read {path:?}: {e}"
                )));
            }
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    async fn update_content(&self, id: SubjectId, content: String) -> Result<()> {
        let mut subject = self
            .get(id)
            .await?
            .ok_or(ScrivenerError::SubjectNotFound(id))?;
        subject.content = content;
        self.save(&subject).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_append_separates_with_blank_line() {
        let repo = MemorySubjectRepository::with_subjects([Subject::new(1, "post", "Intro")]);
        repo.append_content(1, "Generated").await.unwrap();
        let subject = repo.get(1).await.unwrap().unwrap();
        assert_eq!(subject.content, "Intro\n\nGenerated");
    }

    #[tokio::test]
    async fn memory_update_unknown_subject_fails() {
        let repo = MemorySubjectRepository::new();
        assert!(matches!(
            repo.update_content(9, "x".into()).await,
            Err(ScrivenerError::SubjectNotFound(9))
        ));
    }

    #[tokio::test]
    async fn file_repository_round_trips_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileSubjectRepository::new(dir.path().join("subjects"));
        assert!(repo.get(3).await.unwrap().is_none());

        repo.save(&Subject::new(3, "page", "Body").with_prompt_override("Summarize: {content}"))
            .await
            .unwrap();
        repo.append_content(3, "More").await.unwrap();

        let subject = repo.get(3).await.unwrap().unwrap();
        assert_eq!(subject.content, "Body\n\nMore");
        assert_eq!(subject.prompt_override.as_deref(), Some("Summarize: {content}"));
    }
}
