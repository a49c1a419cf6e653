use async_trait::async_trait;
use codify_core::model::{LessonId, Progress};
use sqlx::Row;

use crate::repository::{ProgressRepository, StorageError};

use super::SqliteRepository;

#[async_trait]
impl ProgressRepository for SqliteRepository {
    async fn initialize(&self) -> Result<(), StorageError> {
        self.migrate()
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))
    }

    async fn mark_complete(&self, lesson_id: &LessonId) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO progress (lesson_id, completed)
            VALUES (?1, 1)
            ON CONFLICT(lesson_id) DO UPDATE SET completed = excluded.completed
            ",
        )
        .bind(lesson_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;
        Ok(())
    }

    async fn load_progress(&self) -> Result<Progress, StorageError> {
        let rows = sqlx::query("SELECT lesson_id, completed FROM progress")
            .fetch_all(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        let mut progress = Progress::new();
        for row in rows {
            let lesson_id: String = row
                .try_get("lesson_id")
                .map_err(|err| StorageError::Serialization(err.to_string()))?;
            let completed: Option<i64> = row
                .try_get("completed")
                .map_err(|err| StorageError::Serialization(err.to_string()))?;
            progress.insert(LessonId::new(lesson_id), completed.unwrap_or(0) != 0);
        }
        Ok(progress)
    }

    async fn reset_all(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM progress")
            .execute(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;
        Ok(())
    }
}
