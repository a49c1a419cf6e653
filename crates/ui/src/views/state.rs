use std::sync::Arc;

use codify_core::Progress;
use dioxus::prelude::*;
use services::{ProgressServiceError, SubmissionError};

use crate::context::{AppContext, UiState};

/// Failures a view can show to the learner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewError {
    Unknown,
    Storage,
    Execution,
}

impl ViewError {
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::Unknown => "Something went wrong. Please try again.",
            Self::Storage => "Your progress could not be saved. Please try again.",
            Self::Execution => "The code could not be run. Please try again.",
        }
    }
}

impl From<ProgressServiceError> for ViewError {
    fn from(_: ProgressServiceError) -> Self {
        Self::Storage
    }
}

impl From<SubmissionError> for ViewError {
    fn from(err: SubmissionError) -> Self {
        match err {
            SubmissionError::Progress(_) => Self::Storage,
            SubmissionError::Engine(_) => Self::Execution,
            _ => Self::Unknown,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ViewState<T> {
    Loading,
    Ready(T),
    Error(ViewError),
}

impl<T> ViewState<T> {
    /// The loaded value, if any.
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Loading | Self::Error(_) => None,
        }
    }
}

/// Snapshot a resource into a renderable state. A paused or stopped
/// resource keeps showing the loading state.
#[must_use]
pub fn view_state_from_resource<T: Clone>(
    resource: Resource<Result<T, ViewError>>,
) -> ViewState<T> {
    if !matches!(resource.state().cloned(), UseResourceState::Ready) {
        return ViewState::Loading;
    }
    match resource.value().read().as_ref() {
        Some(Ok(data)) => ViewState::Ready(data.clone()),
        Some(Err(err)) => ViewState::Error(*err),
        None => ViewState::Loading,
    }
}

/// Stored progress, refetched whenever [`UiState::progress_changed`] fires.
///
/// [`UiState::progress_changed`]: crate::context::UiState::progress_changed
pub fn use_progress() -> Resource<Result<Progress, ViewError>> {
    let ctx = use_context::<AppContext>();
    let ui = use_context::<UiState>();
    let progress = ctx.progress();
    use_resource(move || {
        let progress = Arc::clone(&progress);
        let _revision = *ui.progress_revision.read();
        async move { Ok::<_, ViewError>(progress.get_all().await) }
    })
}
