use std::sync::Arc;

use codify_core::{LessonId, Progress};
use storage::repository::ProgressRepository;
use tracing::{info, warn};

use crate::error::ProgressServiceError;

/// Reads and writes lesson completion.
#[derive(Clone)]
pub struct ProgressService {
    repo: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(repo: Arc<dyn ProgressRepository>) -> Self {
        Self { repo }
    }

    /// Create the backing table if needed.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError` if the store cannot be prepared.
    pub async fn initialize(&self) -> Result<(), ProgressServiceError> {
        self.repo.initialize().await?;
        info!("progress store initialized");
        Ok(())
    }

    /// Completion flags for every lesson that has a row.
    ///
    /// Never fails: a storage error is logged, the store is re-initialized and
    /// an empty map is returned.
    pub async fn get_all(&self) -> Progress {
        match self.repo.load_progress().await {
            Ok(progress) => progress,
            Err(err) => {
                warn!(error = %err, "could not read progress; re-initializing store");
                if let Err(err) = self.repo.initialize().await {
                    warn!(error = %err, "re-initializing progress store failed");
                }
                Progress::new()
            }
        }
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError` if the row cannot be written.
    pub async fn mark_complete(&self, lesson_id: &LessonId) -> Result<(), ProgressServiceError> {
        self.repo.mark_complete(lesson_id).await?;
        info!(lesson_id = %lesson_id, "lesson marked complete");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError` if the rows cannot be deleted.
    pub async fn reset_all(&self) -> Result<(), ProgressServiceError> {
        self.repo.reset_all().await?;
        info!("progress reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use storage::repository::{InMemoryRepository, StorageError};

    /// Fails every read and counts initialize calls.
    #[derive(Default)]
    struct BrokenRepo {
        initialize_calls: AtomicUsize,
        fail_initialize: bool,
    }

    #[async_trait]
    impl ProgressRepository for BrokenRepo {
        async fn initialize(&self) -> Result<(), StorageError> {
            self.initialize_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_initialize {
                return Err(StorageError::Connection("disk on fire".into()));
            }
            Ok(())
        }

        async fn mark_complete(&self, _lesson_id: &LessonId) -> Result<(), StorageError> {
            Err(StorageError::Connection("read only".into()))
        }

        async fn load_progress(&self) -> Result<Progress, StorageError> {
            Err(StorageError::Connection("no such table: progress".into()))
        }

        async fn reset_all(&self) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn get_all_heals_a_missing_table() {
        let repo = Arc::new(InMemoryRepository::new());
        let service = ProgressService::new(repo.clone());

        assert!(service.get_all().await.is_empty());
        // The failed read created the table, so writes now succeed.
        service.mark_complete(&LessonId::new("intro")).await.unwrap();
        assert!(service.get_all().await.is_complete(&LessonId::new("intro")));
    }

    #[tokio::test]
    async fn get_all_swallows_a_failed_reinitialize() {
        let repo = Arc::new(BrokenRepo {
            fail_initialize: true,
            ..BrokenRepo::default()
        });
        let service = ProgressService::new(repo.clone());

        assert!(service.get_all().await.is_empty());
        assert_eq!(repo.initialize_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn writes_propagate_errors() {
        let service = ProgressService::new(Arc::new(BrokenRepo::default()));
        let err = service
            .mark_complete(&LessonId::new("intro"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressServiceError::Storage(_)));
    }

    #[tokio::test]
    async fn reset_then_get_all_is_empty() {
        let service = ProgressService::new(Arc::new(InMemoryRepository::initialized()));
        service.initialize().await.unwrap();
        service.initialize().await.unwrap();
        service.mark_complete(&LessonId::new("variables")).await.unwrap();
        service.reset_all().await.unwrap();
        assert!(service.get_all().await.is_empty());
    }
}
