use codify_core::{Lesson, LessonId, LessonSession, SessionBook, SubmissionPhase};

use super::markdown_vm::{inline_markdown_to_html, markdown_to_html};

/// Static lesson content prepared for rendering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LessonPageVm {
    pub id: LessonId,
    pub title: &'static str,
    pub explanation_html: String,
    pub key_takeaway_html: String,
    pub example_code: &'static str,
    pub exercise_html: String,
    pub hint_html: String,
    pub solution: &'static str,
}

#[must_use]
pub fn map_lesson_page(lesson: &Lesson) -> LessonPageVm {
    LessonPageVm {
        id: lesson.id(),
        title: lesson.title(),
        explanation_html: markdown_to_html(lesson.explanation()),
        key_takeaway_html: inline_markdown_to_html(lesson.key_takeaway()),
        example_code: lesson.example_code(),
        exercise_html: inline_markdown_to_html(lesson.exercise()),
        hint_html: inline_markdown_to_html(lesson.hint()),
        solution: lesson.solution(),
    }
}

/// Banner shown under the editor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feedback {
    None,
    Running,
    Correct,
    Incorrect,
}

impl Feedback {
    #[must_use]
    pub fn message(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Running => Some("Running..."),
            Self::Correct => Some("Correct! Well done! Lesson marked as complete."),
            Self::Incorrect => {
                Some("Not quite right. Check your logic and the hint, then try again!")
            }
        }
    }

    #[must_use]
    pub fn class(self) -> &'static str {
        match self {
            Self::None => "feedback",
            Self::Running => "feedback feedback--running",
            Self::Correct => "feedback feedback--correct",
            Self::Incorrect => "feedback feedback--incorrect",
        }
    }
}

#[must_use]
pub fn feedback_for(phase: SubmissionPhase) -> Feedback {
    match phase {
        SubmissionPhase::Running => Feedback::Running,
        SubmissionPhase::Validated { correct: true } => Feedback::Correct,
        SubmissionPhase::Validated { correct: false } => Feedback::Incorrect,
        SubmissionPhase::Idle | SubmissionPhase::Succeeded | SubmissionPhase::Faulted => {
            Feedback::None
        }
    }
}

/// Write a finished run back into the book.
///
/// If the learner edited the code or input while the run was in flight, only
/// the output is kept and the draft stays as typed.
pub fn merge_finished_session(book: &mut SessionBook, finished: LessonSession) {
    let current = book.entry(finished.lesson_id());
    if current.code() == finished.code() && current.simulated_input() == finished.simulated_input()
    {
        book.store(finished);
        return;
    }
    let faulted = finished.phase() == SubmissionPhase::Faulted;
    current.finish_run(finished.output().to_string(), faulted);
}

#[cfg(test)]
mod tests {
    use super::*;
    use codify_core::Catalog;

    #[test]
    fn lesson_page_renders_markdown_fields() {
        let lesson = Catalog::builtin().get("intro").expect("intro lesson");
        let vm = map_lesson_page(lesson);
        assert_eq!(vm.title, "👋 Introduction to Python");
        assert!(vm.explanation_html.contains("<strong>string</strong>"));
        assert!(vm.key_takeaway_html.contains("<code>print()</code>"));
        assert!(!vm.hint_html.starts_with("<p>"));
        assert!(vm.solution.contains("input("));
    }

    #[test]
    fn feedback_follows_the_submission_phase() {
        assert_eq!(feedback_for(SubmissionPhase::Idle), Feedback::None);
        assert_eq!(feedback_for(SubmissionPhase::Faulted), Feedback::None);
        assert_eq!(
            feedback_for(SubmissionPhase::Validated { correct: true }),
            Feedback::Correct
        );
        assert_eq!(
            Feedback::Incorrect.message(),
            Some("Not quite right. Check your logic and the hint, then try again!")
        );
        assert_eq!(Feedback::None.message(), None);
    }

    #[test]
    fn finished_run_replaces_an_unchanged_draft() {
        let id = LessonId::new("intro");
        let mut book = SessionBook::new();
        book.entry(&id).set_code("print(1)");

        let mut finished = book.snapshot(&id);
        finished.finish_run("1\n".to_string(), false);
        finished.record_verdict(false);
        merge_finished_session(&mut book, finished);

        let stored = book.snapshot(&id);
        assert_eq!(stored.output(), "1\n");
        assert_eq!(stored.phase(), SubmissionPhase::Validated { correct: false });
    }

    #[test]
    fn edits_made_during_a_run_are_kept() {
        let id = LessonId::new("intro");
        let mut book = SessionBook::new();
        book.entry(&id).set_code("print(1)");

        let mut finished = book.snapshot(&id);
        book.entry(&id).set_code("print(2)");
        finished.finish_run("1\n".to_string(), false);
        finished.record_verdict(true);
        merge_finished_session(&mut book, finished);

        let stored = book.snapshot(&id);
        assert_eq!(stored.code(), "print(2)");
        assert_eq!(stored.output(), "1\n");
        assert_eq!(stored.phase(), SubmissionPhase::Succeeded);
    }
}
