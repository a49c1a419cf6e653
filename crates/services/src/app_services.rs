use std::sync::Arc;

use codify_core::Catalog;
use sandbox::Limits;
use storage::repository::Storage;

use crate::engine::ExecutionEngine;
use crate::error::AppServicesError;
use crate::progress_service::ProgressService;
use crate::submission_service::SubmissionService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    catalog: &'static Catalog,
    engine: Arc<ExecutionEngine>,
    progress: Arc<ProgressService>,
    submissions: Arc<SubmissionService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and make sure the progress
    /// table exists.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or
    /// initialized.
    pub async fn new_sqlite(db_url: &str, limits: Limits) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let services = Self::from_storage(&storage, limits);
        services.progress.initialize().await?;
        Ok(services)
    }

    /// Build services over an already prepared storage backend.
    #[must_use]
    pub fn from_storage(storage: &Storage, limits: Limits) -> Self {
        let catalog = Catalog::builtin();
        let engine = Arc::new(ExecutionEngine::new(limits, catalog));
        let progress = Arc::new(ProgressService::new(Arc::clone(&storage.progress)));
        let submissions = Arc::new(SubmissionService::new(
            Arc::clone(&engine),
            Arc::clone(&progress),
        ));
        Self {
            catalog,
            engine,
            progress,
            submissions,
        }
    }

    /// In-memory services for tests and previews.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_storage(&Storage::in_memory(), Limits::default())
    }

    #[must_use]
    pub fn catalog(&self) -> &'static Catalog {
        self.catalog
    }

    #[must_use]
    pub fn engine(&self) -> Arc<ExecutionEngine> {
        Arc::clone(&self.engine)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn submissions(&self) -> Arc<SubmissionService> {
        Arc::clone(&self.submissions)
    }
}
