use std::fmt;

use crate::model::ids::LessonId;

/// Predicate approximating whether a run of the learner's code solved the exercise.
///
/// Receives the captured output and the simulated input used for the run.
pub type Validator = fn(output: &str, simulated_input: &str) -> bool;

/// A static unit of instructional content plus its correctness predicate.
///
/// Lessons are compiled into the binary; see [`crate::Catalog`].
#[derive(Clone, Copy)]
pub struct Lesson {
    id: &'static str,
    title: &'static str,
    explanation: &'static str,
    key_takeaway: &'static str,
    example_code: &'static str,
    exercise: &'static str,
    hint: &'static str,
    solution: &'static str,
    validate: Validator,
}

impl Lesson {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub const fn new(
        id: &'static str,
        title: &'static str,
        explanation: &'static str,
        key_takeaway: &'static str,
        example_code: &'static str,
        exercise: &'static str,
        hint: &'static str,
        solution: &'static str,
        validate: Validator,
    ) -> Self {
        Self {
            id,
            title,
            explanation,
            key_takeaway,
            example_code,
            exercise,
            hint,
            solution,
            validate,
        }
    }

    #[must_use]
    pub fn id(&self) -> LessonId {
        LessonId::new(self.id)
    }

    #[must_use]
    pub fn id_str(&self) -> &'static str {
        self.id
    }

    /// Title including its leading icon, e.g. `"🧩 Functions"`.
    #[must_use]
    pub fn title(&self) -> &'static str {
        self.title
    }

    /// Title without the leading icon.
    #[must_use]
    pub fn plain_title(&self) -> &'static str {
        self.title
            .split_once(' ')
            .map_or(self.title, |(_, rest)| rest)
    }

    #[must_use]
    pub fn explanation(&self) -> &'static str {
        self.explanation
    }

    #[must_use]
    pub fn key_takeaway(&self) -> &'static str {
        self.key_takeaway
    }

    #[must_use]
    pub fn example_code(&self) -> &'static str {
        self.example_code
    }

    #[must_use]
    pub fn exercise(&self) -> &'static str {
        self.exercise
    }

    #[must_use]
    pub fn hint(&self) -> &'static str {
        self.hint
    }

    #[must_use]
    pub fn solution(&self) -> &'static str {
        self.solution
    }

    /// Applies the lesson's validation predicate.
    #[must_use]
    pub fn validate(&self, output: &str, simulated_input: &str) -> bool {
        (self.validate)(output, simulated_input)
    }
}

impl fmt::Debug for Lesson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lesson")
            .field("id", &self.id)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Lesson {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Lesson {}

#[cfg(test)]
mod tests {
    use super::*;

    fn always(_: &str, _: &str) -> bool {
        true
    }

    #[test]
    fn plain_title_drops_icon() {
        let lesson = Lesson::new("x", "🧩 Functions", "", "", "", "", "", "", always);
        assert_eq!(lesson.plain_title(), "Functions");
    }

    #[test]
    fn plain_title_without_space_is_unchanged() {
        let lesson = Lesson::new("x", "Functions", "", "", "", "", "", "", always);
        assert_eq!(lesson.plain_title(), "Functions");
    }
}
