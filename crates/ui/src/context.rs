use std::sync::Arc;

use codify_core::{Catalog, SessionBook};
use dioxus::prelude::*;
use services::{ProgressService, SubmissionService};

pub trait UiApp: Send + Sync {
    fn catalog(&self) -> &'static Catalog;

    fn progress(&self) -> Arc<ProgressService>;
    fn submissions(&self) -> Arc<SubmissionService>;
}

#[derive(Clone)]
pub struct AppContext {
    catalog: &'static Catalog,
    progress: Arc<ProgressService>,
    submissions: Arc<SubmissionService>,
}

impl AppContext {
    #[must_use]
    pub fn new(app: &Arc<dyn UiApp>) -> Self {
        Self {
            catalog: app.catalog(),
            progress: app.progress(),
            submissions: app.submissions(),
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &'static Catalog {
        self.catalog
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

// This context is provided by the application composition root (e.g. `crates/app`).

/// Build an `AppContext` from a UI-facing app implementation.
#[must_use]
pub fn build_app_context(app: Arc<dyn UiApp>) -> AppContext {
    AppContext::new(&app)
}

/// Reactive state shared by every view for the life of the window.
///
/// `drafts` holds each lesson's code, simulated input and last output so that
/// switching lessons never loses work. `progress_revision` is bumped whenever
/// stored progress changes; views that show completion read it to refetch.
#[derive(Clone, Copy)]
pub struct UiState {
    pub drafts: Signal<SessionBook>,
    pub progress_revision: Signal<u64>,
}

impl UiState {
    /// Must be called from inside a component scope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            drafts: Signal::new(SessionBook::new()),
            progress_revision: Signal::new(0),
        }
    }

    pub fn progress_changed(mut self) {
        self.progress_revision += 1;
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

/// Provide [`UiState`] to the current component and its children.
pub fn use_ui_state_provider() -> UiState {
    use_context_provider(UiState::new)
}
