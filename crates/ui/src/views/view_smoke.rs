use std::sync::Arc;

use codify_core::{LessonId, Progress};
use storage::repository::{ProgressRepository, Storage, StorageError};

use super::test_harness::{ViewKind, setup_view_harness, setup_view_harness_with_storage};

#[tokio::test(flavor = "current_thread")]
async fn sidebar_smoke_renders_progress_and_lessons() {
    let mut harness = setup_view_harness(ViewKind::Sidebar);
    harness.settle().await;
    let html = harness.render();
    assert!(html.contains("Codify"), "missing brand in {html}");
    assert!(html.contains("0 of 5 lessons completed."), "missing summary in {html}");
    assert!(html.contains("Introduction to Python"), "missing lesson in {html}");
    assert!(html.contains("Reset All Progress"), "missing reset in {html}");
    assert!(!html.contains("✅"), "unexpected check in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn sidebar_smoke_marks_completed_lessons() {
    let storage = Storage::in_memory();
    storage
        .progress
        .mark_complete(&LessonId::new("intro"))
        .await
        .expect("mark intro");

    let mut harness = setup_view_harness_with_storage(ViewKind::Sidebar, &storage);
    harness.settle().await;
    let html = harness.render();
    assert!(html.contains("1 of 5 lessons completed."), "missing summary in {html}");
    assert!(html.contains("✅"), "missing check in {html}");
    assert!(html.contains("width: 20%"), "missing bar width in {html}");
}

struct UnreadableRepo;

#[async_trait::async_trait]
impl ProgressRepository for UnreadableRepo {
    async fn initialize(&self) -> Result<(), StorageError> {
        Err(StorageError::Connection("disk unavailable".to_string()))
    }

    async fn mark_complete(&self, _lesson_id: &LessonId) -> Result<(), StorageError> {
        Err(StorageError::Connection("disk unavailable".to_string()))
    }

    async fn load_progress(&self) -> Result<Progress, StorageError> {
        Err(StorageError::Connection("disk unavailable".to_string()))
    }

    async fn reset_all(&self) -> Result<(), StorageError> {
        Err(StorageError::Connection("disk unavailable".to_string()))
    }
}

#[tokio::test(flavor = "current_thread")]
async fn sidebar_smoke_falls_back_to_empty_progress_when_store_fails() {
    let storage = Storage {
        progress: Arc::new(UnreadableRepo),
    };
    let mut harness = setup_view_harness_with_storage(ViewKind::Sidebar, &storage);
    harness.settle().await;
    let html = harness.render();
    assert!(html.contains("0 of 5 lessons completed."), "missing summary in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn home_view_smoke_points_at_first_open_lesson() {
    let mut harness = setup_view_harness(ViewKind::Home);
    harness.settle().await;
    let html = harness.render();
    assert!(html.contains("Welcome to Codify"), "missing title in {html}");
    assert!(
        html.contains("Continue with Introduction to Python"),
        "missing next lesson in {html}"
    );
    assert!(html.contains("Lesson 5"), "missing lesson cards in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn home_view_smoke_skips_completed_lessons() {
    let storage = Storage::in_memory();
    storage
        .progress
        .mark_complete(&LessonId::new("intro"))
        .await
        .expect("mark intro");

    let mut harness = setup_view_harness_with_storage(ViewKind::Home, &storage);
    harness.settle().await;
    let html = harness.render();
    assert!(html.contains("Continue with Variables"), "missing next lesson in {html}");
    assert!(html.contains("Completed"), "missing badge in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn lesson_view_smoke_renders_content_and_editor() {
    let mut harness = setup_view_harness(ViewKind::Lesson("intro".to_string()));
    harness.settle().await;
    let html = harness.render();
    assert!(html.contains("Introduction to Python"), "missing title in {html}");
    assert!(html.contains("Key Takeaway"), "missing takeaway in {html}");
    assert!(html.contains("<strong>string</strong>"), "missing markdown in {html}");
    assert!(html.contains("Stuck? Click here for a hint!"), "missing hint in {html}");
    assert!(html.contains("Run Code"), "missing run button in {html}");
    assert!(html.contains("Mark Complete"), "missing submit button in {html}");
    assert!(html.contains("Need help? See the solution"), "missing solution in {html}");
    assert!(!html.contains("Correct! Well done!"), "unexpected feedback in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn lesson_view_smoke_reports_unknown_lessons() {
    let mut harness = setup_view_harness(ViewKind::Lesson("decorators".to_string()));
    harness.settle().await;
    let html = harness.render();
    assert!(html.contains("Lesson not found"), "missing message in {html}");
    assert!(html.contains("Back to all lessons"), "missing link in {html}");
}
