use async_trait::async_trait;
use codify_core::model::{LessonId, Progress};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for per-lesson completion flags.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Create the progress table if it does not exist. Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the schema cannot be created.
    async fn initialize(&self) -> Result<(), StorageError>;

    /// Record `lesson_id` as completed, inserting or updating its row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be written.
    async fn mark_complete(&self, lesson_id: &LessonId) -> Result<(), StorageError>;

    /// Read every stored row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the table is missing or unreadable.
    async fn load_progress(&self) -> Result<Progress, StorageError>;

    /// Remove every row. Safe to call on an empty store.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the rows cannot be deleted.
    async fn reset_all(&self) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Reads fail with `StorageError::NotFound` until `initialize` has run, the
/// same way a database without the progress table does.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    rows: Arc<Mutex<Option<HashMap<LessonId, bool>>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: Arc::new(Mutex::new(None)),
        }
    }

    /// A repository whose table already exists.
    #[must_use]
    pub fn initialized() -> Self {
        Self {
            rows: Arc::new(Mutex::new(Some(HashMap::new()))),
        }
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn initialize(&self) -> Result<(), StorageError> {
        let mut guard = self
            .rows
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get_or_insert_with(HashMap::new);
        Ok(())
    }

    async fn mark_complete(&self, lesson_id: &LessonId) -> Result<(), StorageError> {
        let mut guard = self
            .rows
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let rows = guard.as_mut().ok_or(StorageError::NotFound)?;
        rows.insert(lesson_id.clone(), true);
        Ok(())
    }

    async fn load_progress(&self) -> Result<Progress, StorageError> {
        let guard = self
            .rows
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let rows = guard.as_ref().ok_or(StorageError::NotFound)?;
        Ok(rows.iter().map(|(id, done)| (id.clone(), *done)).collect())
    }

    async fn reset_all(&self) -> Result<(), StorageError> {
        let mut guard = self
            .rows
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let rows = guard.as_mut().ok_or(StorageError::NotFound)?;
        rows.clear();
        Ok(())
    }
}

/// Aggregates the progress repository behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    /// In-memory storage with the progress table already created.
    #[must_use]
    pub fn in_memory() -> Self {
        let progress: Arc<dyn ProgressRepository> = Arc::new(InMemoryRepository::initialized());
        Self { progress }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        let cases = [
            StorageError::NotFound,
            StorageError::Connection("refused".into()),
            StorageError::Serialization("bad row".into()),
        ];
        for err in cases {
            let expected = match &err {
                StorageError::NotFound => "not found",
                StorageError::Connection(_) => "connection error: refused",
                StorageError::Serialization(_) => "serialization error: bad row",
            };
            assert_eq!(err.to_string(), expected);
        }
    }

    #[tokio::test]
    async fn reads_fail_before_initialize() {
        let repo = InMemoryRepository::new();
        assert!(matches!(
            repo.load_progress().await,
            Err(StorageError::NotFound)
        ));
        repo.initialize().await.unwrap();
        assert!(repo.load_progress().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn initialize_keeps_existing_rows() {
        let repo = InMemoryRepository::initialized();
        let intro = LessonId::new("intro");
        repo.mark_complete(&intro).await.unwrap();
        repo.initialize().await.unwrap();
        assert!(repo.load_progress().await.unwrap().is_complete(&intro));
    }

    #[tokio::test]
    async fn mark_complete_is_an_upsert_and_reset_clears() {
        let repo = InMemoryRepository::initialized();
        let intro = LessonId::new("intro");
        repo.mark_complete(&intro).await.unwrap();
        repo.mark_complete(&intro).await.unwrap();

        let progress = repo.load_progress().await.unwrap();
        assert_eq!(progress.len(), 1);
        assert_eq!(progress.get(&intro), Some(true));

        repo.reset_all().await.unwrap();
        repo.reset_all().await.unwrap();
        assert!(repo.load_progress().await.unwrap().is_empty());
    }
}
