use std::sync::Arc;

use codify_core::{LessonId, LessonSession};
use sandbox::ExecutionResult;
use serde::Serialize;
use tracing::info;

use crate::engine::ExecutionEngine;
use crate::error::{EngineError, SubmissionError};
use crate::progress_service::ProgressService;

/// Result of checking a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionOutcome {
    pub lesson_id: LessonId,
    /// The run finished cleanly and the lesson's predicate accepted its output.
    pub correct: bool,
    /// What the learner sees: normal output, or the error marker and fault.
    pub output: String,
    pub faulted: bool,
}

/// Drives a lesson session through run and submit.
#[derive(Clone)]
pub struct SubmissionService {
    engine: Arc<ExecutionEngine>,
    progress: Arc<ProgressService>,
}

impl SubmissionService {
    #[must_use]
    pub fn new(engine: Arc<ExecutionEngine>, progress: Arc<ProgressService>) -> Self {
        Self { engine, progress }
    }

    /// Executes the session's code and stores the captured output on it.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError::Engine` if the execution task fails.
    pub async fn run(&self, session: &mut LessonSession) -> Result<ExecutionResult, SubmissionError> {
        session.begin_run();
        let result = self
            .engine
            .execute(session.code(), session.simulated_input())
            .await?;
        session.finish_run(result.captured_output(), result.is_faulted());
        Ok(result)
    }

    /// Runs, validates and, when correct, records the lesson as complete.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError::Engine` for unknown lessons or a failed run,
    /// and `SubmissionError::Progress` if completion cannot be recorded.
    pub async fn submit(
        &self,
        session: &mut LessonSession,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        let lesson_id = session.lesson_id().clone();
        self.engine
            .catalog()
            .lesson(&lesson_id)
            .map_err(EngineError::from)?;

        let result = self.run(session).await?;
        let output = result.captured_output();
        let faulted = result.is_faulted();
        let correct = !faulted
            && self
                .engine
                .validate(&lesson_id, &output, session.simulated_input())?;
        session.record_verdict(correct);

        if correct {
            self.progress.mark_complete(&lesson_id).await?;
        }
        info!(lesson_id = %lesson_id, correct, faulted, "submission checked");

        Ok(SubmissionOutcome {
            lesson_id,
            correct,
            output,
            faulted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codify_core::{Catalog, SubmissionPhase};
    use storage::repository::InMemoryRepository;

    fn service() -> (SubmissionService, Arc<ProgressService>) {
        let progress = Arc::new(ProgressService::new(Arc::new(
            InMemoryRepository::initialized(),
        )));
        let engine = Arc::new(ExecutionEngine::default());
        (SubmissionService::new(engine, Arc::clone(&progress)), progress)
    }

    fn session(lesson: &str, code: &str, input: &str) -> LessonSession {
        let mut session = LessonSession::new(LessonId::new(lesson));
        session.set_code(code);
        session.set_simulated_input(input);
        session
    }

    #[tokio::test]
    async fn run_moves_session_to_succeeded_or_faulted() {
        let (service, _) = service();
        let mut ok = session("intro", "print('hi')", "");
        service.run(&mut ok).await.unwrap();
        assert_eq!(ok.phase(), SubmissionPhase::Succeeded);
        assert_eq!(ok.output(), "hi\n");

        let mut bad = session("intro", "print(nope)", "");
        service.run(&mut bad).await.unwrap();
        assert_eq!(bad.phase(), SubmissionPhase::Faulted);
        assert!(bad.output().starts_with("Runtime Error:"));
    }

    #[tokio::test]
    async fn correct_submission_records_progress() {
        let (service, progress) = service();
        let solution = Catalog::builtin().get("functions").unwrap().solution();
        let mut attempt = session("functions", solution, "");

        let outcome = service.submit(&mut attempt).await.unwrap();
        assert!(outcome.correct);
        assert!(!outcome.faulted);
        assert_eq!(attempt.phase(), SubmissionPhase::Validated { correct: true });
        assert!(progress.get_all().await.is_complete(&LessonId::new("functions")));
    }

    #[tokio::test]
    async fn wrong_submission_leaves_progress_alone() {
        let (service, progress) = service();
        let mut attempt = session("functions", "print(49)", "");
        let outcome = service.submit(&mut attempt).await.unwrap();
        assert!(!outcome.correct);
        assert_eq!(attempt.phase(), SubmissionPhase::Validated { correct: false });
        assert!(progress.get_all().await.is_empty());
    }

    #[tokio::test]
    async fn faulted_submission_is_never_correct() {
        let (service, progress) = service();
        // The error text mentions both "hello" and the empty input.
        let mut attempt = session("intro", "hello()", "");
        let outcome = service.submit(&mut attempt).await.unwrap();
        assert!(outcome.faulted);
        assert!(!outcome.correct);
        assert!(progress.get_all().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_lessons_are_rejected_before_running() {
        let (service, _) = service();
        let mut attempt = session("nope", "print(1)", "");
        let err = service.submit(&mut attempt).await.unwrap_err();
        assert!(matches!(err, SubmissionError::Engine(_)));
        assert_eq!(attempt.phase(), SubmissionPhase::Idle);
    }
}
