//! The fixed registry of lessons.

mod lessons;

use thiserror::Error;

use crate::model::{Lesson, LessonId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("lesson not found: {0}")]
    LessonNotFound(LessonId),
}

/// Ordered, immutable set of lessons.
#[derive(Debug)]
pub struct Catalog {
    lessons: &'static [Lesson],
}

static BUILTIN: Catalog = Catalog { lessons: &lessons::LESSONS };

impl Catalog {
    /// The lessons shipped with the application.
    #[must_use]
    pub fn builtin() -> &'static Catalog {
        &BUILTIN
    }

    #[must_use]
    pub fn get(&self, lesson_id: &str) -> Option<&'static Lesson> {
        self.lessons.iter().find(|lesson| lesson.id_str() == lesson_id)
    }

    /// Looks up a lesson that must exist.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::LessonNotFound` for ids outside the catalog.
    pub fn lesson(&self, lesson_id: &LessonId) -> Result<&'static Lesson, CatalogError> {
        self.get(lesson_id.as_str())
            .ok_or_else(|| CatalogError::LessonNotFound(lesson_id.clone()))
    }

    #[must_use]
    pub fn contains(&self, lesson_id: &LessonId) -> bool {
        self.get(lesson_id.as_str()).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static Lesson> {
        self.lessons.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = LessonId> {
        self.lessons.iter().map(Lesson::id)
    }

    #[must_use]
    pub fn first(&self) -> Option<&'static Lesson> {
        self.lessons.first()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }

    /// Applies the predicate of `lesson_id` to a run's output.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::LessonNotFound` if the id is unknown; an unknown
    /// lesson is never treated as solved.
    pub fn validate(
        &self,
        lesson_id: &LessonId,
        output: &str,
        simulated_input: &str,
    ) -> Result<bool, CatalogError> {
        Ok(self.lesson(lesson_id)?.validate(output, simulated_input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn builtin_has_five_lessons_in_order() {
        let ids: Vec<String> = Catalog::builtin().ids().map(LessonId::into_string).collect();
        assert_eq!(
            ids,
            ["intro", "variables", "data_structures", "control_flow", "functions"]
        );
    }

    #[test]
    fn lesson_ids_are_unique() {
        let catalog = Catalog::builtin();
        let unique: HashSet<_> = catalog.ids().collect();
        assert_eq!(unique.len(), catalog.len());
    }

    #[test]
    fn every_lesson_has_content() {
        for lesson in Catalog::builtin().iter() {
            assert!(!lesson.title().is_empty(), "{lesson:?}");
            assert!(!lesson.explanation().is_empty(), "{lesson:?}");
            assert!(!lesson.example_code().is_empty(), "{lesson:?}");
            assert!(!lesson.solution().is_empty(), "{lesson:?}");
            assert!(!lesson.hint().is_empty(), "{lesson:?}");
        }
    }

    #[test]
    fn validate_unknown_lesson_is_an_error() {
        let err = Catalog::builtin()
            .validate(&LessonId::new("nope"), "hello", "")
            .unwrap_err();
        assert_eq!(err, CatalogError::LessonNotFound(LessonId::new("nope")));
    }

    #[test]
    fn validate_dispatches_to_lesson_predicate() {
        let catalog = Catalog::builtin();
        assert!(catalog.validate(&LessonId::new("functions"), "50", "").unwrap());
        assert!(!catalog.validate(&LessonId::new("functions"), "49", "").unwrap());
    }
}
