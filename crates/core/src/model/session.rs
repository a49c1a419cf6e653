use std::collections::HashMap;

use crate::model::ids::LessonId;

/// Where a lesson's latest run or submission stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmissionPhase {
    #[default]
    Idle,
    Running,
    /// The code ran to completion.
    Succeeded,
    /// The code raised a fault; the output holds the error text.
    Faulted,
    /// A submission was checked against the lesson's predicate.
    Validated { correct: bool },
}

impl SubmissionPhase {
    /// True only for a submission that passed validation.
    #[must_use]
    pub fn is_correct(self) -> bool {
        matches!(self, Self::Validated { correct: true })
    }
}

/// Per-lesson draft state: the learner's code, the simulated input and the last output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonSession {
    lesson_id: LessonId,
    code: String,
    simulated_input: String,
    output: String,
    phase: SubmissionPhase,
}

impl LessonSession {
    #[must_use]
    pub fn new(lesson_id: LessonId) -> Self {
        Self {
            lesson_id,
            code: String::new(),
            simulated_input: String::new(),
            output: String::new(),
            phase: SubmissionPhase::Idle,
        }
    }

    #[must_use]
    pub fn lesson_id(&self) -> &LessonId {
        &self.lesson_id
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[must_use]
    pub fn simulated_input(&self) -> &str {
        &self.simulated_input
    }

    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }

    #[must_use]
    pub fn phase(&self) -> SubmissionPhase {
        self.phase
    }

    /// Editing the code invalidates a previous verdict.
    pub fn set_code(&mut self, code: impl Into<String>) {
        self.code = code.into();
        self.reset_verdict();
    }

    pub fn set_simulated_input(&mut self, input: impl Into<String>) {
        self.simulated_input = input.into();
        self.reset_verdict();
    }

    pub fn begin_run(&mut self) {
        self.phase = SubmissionPhase::Running;
    }

    /// Stores the captured output of a finished run.
    pub fn finish_run(&mut self, output: String, faulted: bool) {
        self.output = output;
        self.phase = if faulted {
            SubmissionPhase::Faulted
        } else {
            SubmissionPhase::Succeeded
        };
    }

    pub fn record_verdict(&mut self, correct: bool) {
        self.phase = SubmissionPhase::Validated { correct };
    }

    fn reset_verdict(&mut self) {
        if matches!(self.phase, SubmissionPhase::Validated { .. }) {
            self.phase = SubmissionPhase::Succeeded;
        }
    }
}

/// All lesson sessions of one learner, created lazily on first access.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionBook {
    sessions: HashMap<LessonId, LessonSession>,
}

impl SessionBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, lesson_id: &LessonId) -> Option<&LessonSession> {
        self.sessions.get(lesson_id)
    }

    pub fn entry(&mut self, lesson_id: &LessonId) -> &mut LessonSession {
        self.sessions
            .entry(lesson_id.clone())
            .or_insert_with(|| LessonSession::new(lesson_id.clone()))
    }

    /// Returns a copy of the session, or a fresh one if the lesson was never opened.
    #[must_use]
    pub fn snapshot(&self, lesson_id: &LessonId) -> LessonSession {
        self.get(lesson_id)
            .cloned()
            .unwrap_or_else(|| LessonSession::new(lesson_id.clone()))
    }

    pub fn store(&mut self, session: LessonSession) {
        self.sessions.insert(session.lesson_id.clone(), session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_then_verdict_transitions() {
        let mut session = LessonSession::new(LessonId::new("intro"));
        assert_eq!(session.phase(), SubmissionPhase::Idle);

        session.begin_run();
        assert_eq!(session.phase(), SubmissionPhase::Running);

        session.finish_run("Hello, Sam!\n".to_string(), false);
        assert_eq!(session.phase(), SubmissionPhase::Succeeded);

        session.record_verdict(true);
        assert!(session.phase().is_correct());
    }

    #[test]
    fn faulted_run_is_not_correct() {
        let mut session = LessonSession::new(LessonId::new("intro"));
        session.finish_run("Runtime Error:\nboom".to_string(), true);
        assert_eq!(session.phase(), SubmissionPhase::Faulted);
        assert!(!session.phase().is_correct());
    }

    #[test]
    fn editing_code_clears_verdict() {
        let mut session = LessonSession::new(LessonId::new("intro"));
        session.finish_run(String::new(), false);
        session.record_verdict(true);
        session.set_code("print(1)");
        assert_eq!(session.phase(), SubmissionPhase::Succeeded);
    }

    #[test]
    fn sessions_are_isolated_per_lesson() {
        let mut book = SessionBook::new();
        book.entry(&LessonId::new("intro")).set_code("print('a')");
        book.entry(&LessonId::new("functions")).set_code("print('b')");

        assert_eq!(book.snapshot(&LessonId::new("intro")).code(), "print('a')");
        assert_eq!(book.snapshot(&LessonId::new("functions")).code(), "print('b')");
        assert_eq!(book.snapshot(&LessonId::new("variables")).code(), "");
    }
}
